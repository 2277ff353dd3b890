//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tick_feed::{
    Destination, EmitError, EmitterConfig, InstrumentIds, RandomSourceConfig, SocketOptions,
    StopCondition,
};

/// Default pacing when neither an interval nor a rate is given.
const DEFAULT_INTERVAL_MS: f64 = 10.0;

#[derive(Parser, Debug)]
#[command(name = "tick-emit", version, about = "Synthetic market-data tick emitter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Emit randomized ticks over UDP.
    Emit(EmitArgs),
    /// Receive and decode ticks.
    Listen(ListenArgs),
}

#[derive(Args, Debug, Clone)]
pub struct EmitArgs {
    /// Destination host:port, repeatable or comma separated.
    #[arg(long = "dest", env = "TICK_DEST", value_delimiter = ',', default_value = "127.0.0.1:5001")]
    pub dests: Vec<Destination>,

    /// Delay between packets in milliseconds.
    #[arg(long, env = "TICK_INTERVAL_MS", allow_negative_numbers = true)]
    pub interval_ms: Option<f64>,

    /// Packets per second; alternative to --interval-ms.
    #[arg(long, env = "TICK_RATE")]
    pub rate: Option<f64>,

    /// Stop after this many packets (0 = unbounded).
    #[arg(long, env = "TICK_COUNT", default_value_t = 0)]
    pub count: u64,

    /// Stop after this many seconds.
    #[arg(long, env = "TICK_DURATION_SECS")]
    pub duration_secs: Option<f64>,

    /// Instrument id; several ids are picked from uniformly.
    #[arg(long = "instrument-id", env = "TICK_INSTRUMENT_ID", value_delimiter = ',', default_value = "12345")]
    pub instrument_ids: Vec<u32>,

    #[arg(long, env = "TICK_PRICE_MIN", default_value_t = 95.0, allow_negative_numbers = true)]
    pub price_min: f32,

    #[arg(long, env = "TICK_PRICE_MAX", default_value_t = 105.0, allow_negative_numbers = true)]
    pub price_max: f32,

    /// Quantity choices.
    #[arg(long = "qty", env = "TICK_QTY", value_delimiter = ',', default_value = "0.1,1.0,5.0")]
    pub quantities: Vec<f32>,

    /// Seed for a reproducible stream.
    #[arg(long, env = "TICK_SEED")]
    pub seed: Option<u64>,

    /// Log progress every N packets (0 = never).
    #[arg(long, env = "TICK_PROGRESS_EVERY", default_value_t = 1000)]
    pub progress_every: u64,

    /// Pin emitter threads to CPU cores starting at this index.
    #[arg(long, env = "TICK_PIN_CORE")]
    pub pin_core: Option<usize>,

    /// Number of independent feeds, each with its own socket and thread.
    #[arg(long, env = "TICK_FEEDS", default_value_t = 1)]
    pub feeds: usize,

    #[arg(long, env = "TICK_MULTICAST_TTL", default_value_t = 4)]
    pub multicast_ttl: u32,

    /// SO_SNDBUF size in bytes.
    #[arg(long, env = "TICK_SEND_BUFFER")]
    pub send_buffer: Option<usize>,
}

impl EmitArgs {
    /// Pacing interval from either --interval-ms or --rate.
    pub fn interval(&self) -> Result<Duration, EmitError> {
        let secs = match (self.interval_ms, self.rate) {
            (Some(_), Some(_)) => {
                return Err(EmitError::InvalidConfiguration(
                    "--interval-ms and --rate are mutually exclusive".into(),
                ))
            }
            (None, Some(rate)) if !(rate.is_finite() && rate > 0.0) => {
                return Err(EmitError::InvalidConfiguration(format!(
                    "rate {rate} must be a positive number of packets per second"
                )))
            }
            (None, Some(rate)) => 1.0 / rate,
            (Some(ms), None) => ms / 1000.0,
            (None, None) => DEFAULT_INTERVAL_MS / 1000.0,
        };

        Duration::try_from_secs_f64(secs).map_err(|_| {
            EmitError::InvalidConfiguration(format!("pacing interval {secs}s is not a duration"))
        })
    }

    pub fn emitter_config(&self) -> Result<EmitterConfig, EmitError> {
        Ok(EmitterConfig::new(self.dests.clone())
            .with_interval(self.interval()?)
            .with_progress_every(self.progress_every)
            .with_socket_options(SocketOptions {
                multicast_ttl: self.multicast_ttl,
                send_buffer_size: self.send_buffer,
            }))
    }

    /// Source settings for feed `feed`; seeded feeds get distinct seeds.
    pub fn source_config(&self, feed: usize) -> RandomSourceConfig {
        RandomSourceConfig {
            instrument_ids: InstrumentIds::from_list(self.instrument_ids.clone()),
            price_min: self.price_min,
            price_max: self.price_max,
            quantities: self.quantities.clone(),
            seed: self.seed.map(|s| s.wrapping_add(feed as u64)),
        }
    }

    pub fn stop_condition(&self) -> Result<StopCondition, EmitError> {
        let mut stop = StopCondition::never();
        if self.count > 0 {
            stop = stop.with_count(self.count);
        }
        if let Some(secs) = self.duration_secs {
            let limit = Duration::try_from_secs_f64(secs).map_err(|_| {
                EmitError::InvalidConfiguration(format!("run duration {secs}s is not a duration"))
            })?;
            stop = stop.with_duration(limit);
        }
        Ok(stop)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ListenArgs {
    /// Address to bind.
    #[arg(long, env = "TICK_LISTEN", default_value = "0.0.0.0:5001")]
    pub bind: SocketAddr,

    /// Stop after this many valid ticks (0 = unbounded).
    #[arg(long, default_value_t = 0)]
    pub count: u64,
}
