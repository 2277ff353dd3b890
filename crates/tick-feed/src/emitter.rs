//! Paced tick emitter.
//!
//! One emitter is one feed: a single worker owning its sockets, producing
//! ticks in order and sending each to every destination before sleeping
//! the pacing interval. Independent feeds are independent emitters.

use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tick_metrics::{format_latency, LatencySummary, SendClock, SendLatency};
use tick_proto::{encode_into, TICK_SIZE};
use tracing::{debug, info, trace, warn};

use crate::destination::Destination;
use crate::error::{EmitError, EmitResult, EmitterState};
use crate::sink::{DatagramSink, SocketOptions, SocketPool};
use crate::source::TickSource;
use crate::stop::StopCondition;

/// Emitter settings, checked once by [`Emitter::configure`].
#[derive(Clone, Debug)]
pub struct EmitterConfig {
    pub destinations: Vec<Destination>,
    /// Sleep between consecutive packets.
    pub interval: Duration,
    /// Log a progress line every N packets (0 = never).
    pub progress_every: u64,
    pub socket: SocketOptions,
}

impl EmitterConfig {
    pub fn new(destinations: Vec<Destination>) -> Self {
        Self {
            destinations,
            interval: Duration::from_millis(10),
            progress_every: 1000,
            socket: SocketOptions::default(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the interval from fractional seconds. Negative or non-finite
    /// values are rejected.
    pub fn with_interval_secs(mut self, secs: f64) -> EmitResult<Self> {
        self.interval = Duration::try_from_secs_f64(secs)
            .map_err(|_| EmitError::invalid(format!("pacing interval {secs}s is not a duration")))?;
        Ok(self)
    }

    pub fn with_progress_every(mut self, packets: u64) -> Self {
        self.progress_every = packets;
        self
    }

    pub fn with_socket_options(mut self, socket: SocketOptions) -> Self {
        self.socket = socket;
        self
    }

    /// Resolve every destination, dropping duplicates.
    pub fn resolve(&self) -> EmitResult<Vec<SocketAddr>> {
        if self.destinations.is_empty() {
            return Err(EmitError::invalid("no destinations configured"));
        }

        let mut addrs: Vec<SocketAddr> = Vec::with_capacity(self.destinations.len());
        for dest in &self.destinations {
            let addr = dest.resolve()?;
            if addrs.contains(&addr) {
                warn!(%dest, %addr, "duplicate destination ignored");
                continue;
            }
            addrs.push(addr);
        }
        Ok(addrs)
    }
}

/// Delivery counters for one destination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DestinationStats {
    /// Datagrams handed to the kernel.
    pub sent: u64,
    /// Sends that returned an error.
    pub failed: u64,
    /// Sends dropped because the socket buffer was full.
    pub would_block: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DestinationReport {
    pub addr: SocketAddr,
    pub stats: DestinationStats,
}

/// Outcome of one [`Emitter::run`].
#[derive(Clone, Debug)]
pub struct EmitReport {
    /// Ticks produced (each fanned out to every destination).
    pub ticks: u64,
    pub elapsed: Duration,
    pub destinations: Vec<DestinationReport>,
    pub send_latency: LatencySummary,
}

impl EmitReport {
    pub fn total_sent(&self) -> u64 {
        self.destinations.iter().map(|d| d.stats.sent).sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.destinations.iter().map(|d| d.stats.failed).sum()
    }

    pub fn stats_for(&self, addr: SocketAddr) -> Option<DestinationStats> {
        self.destinations
            .iter()
            .find(|d| d.addr == addr)
            .map(|d| d.stats)
    }
}

struct Target {
    addr: SocketAddr,
    stats: DestinationStats,
    failing: bool,
}

impl Target {
    fn record(&mut self, result: io::Result<usize>) {
        match result {
            Ok(_) => {
                if self.failing {
                    info!(dest = %self.addr, "destination recovered");
                    self.failing = false;
                }
                self.stats.sent += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                trace!(dest = %self.addr, "send buffer full, datagram dropped");
                self.stats.would_block += 1;
            }
            Err(source) => {
                self.stats.failed += 1;
                let err = EmitError::TransmissionFailed {
                    dest: self.addr,
                    source,
                };
                // Warn once per failure streak, the rest go to debug.
                if self.failing {
                    debug!(error = %err, failed = self.stats.failed, "send failed");
                } else {
                    warn!(error = %err, "send failed");
                    self.failing = true;
                }
            }
        }
    }
}

/// UDP tick emitter.
///
/// Built `Ready` by [`configure`](Self::configure); [`run`](Self::run)
/// moves it through `Running` to `Stopped` and releases its sockets. A
/// stopped emitter cannot be rerun, build a new one instead.
pub struct Emitter<S, K = SocketPool> {
    state: EmitterState,
    sink: Option<K>,
    targets: Vec<Target>,
    source: S,
    interval: Duration,
    progress_every: u64,
    clock: SendClock,
    latency: SendLatency,
    buffer: [u8; TICK_SIZE],
}

impl<S: TickSource> Emitter<S, SocketPool> {
    /// Validate `config`, resolve destinations and open sockets.
    ///
    /// Socket creation failure is returned as-is; nothing is retried.
    pub fn configure(config: EmitterConfig, source: S) -> EmitResult<Self> {
        let addrs = config.resolve()?;
        let pool = SocketPool::open(&addrs, &config.socket)?;
        Ok(Self::assemble(&config, addrs, source, pool))
    }
}

impl<S: TickSource, K: DatagramSink> Emitter<S, K> {
    /// Like [`configure`](Emitter::configure) but sending through a
    /// caller-provided sink.
    pub fn with_sink(config: EmitterConfig, source: S, sink: K) -> EmitResult<Self> {
        let addrs = config.resolve()?;
        Ok(Self::assemble(&config, addrs, source, sink))
    }

    fn assemble(config: &EmitterConfig, addrs: Vec<SocketAddr>, source: S, sink: K) -> Self {
        let targets = addrs
            .into_iter()
            .map(|addr| Target {
                addr,
                stats: DestinationStats::default(),
                failing: false,
            })
            .collect();

        Self {
            state: EmitterState::Ready,
            sink: Some(sink),
            targets,
            source,
            interval: config.interval,
            progress_every: config.progress_every,
            clock: SendClock::new(),
            latency: SendLatency::new(),
            buffer: [0; TICK_SIZE],
        }
    }

    pub fn state(&self) -> EmitterState {
        self.state
    }

    pub fn destinations(&self) -> Vec<SocketAddr> {
        self.targets.iter().map(|t| t.addr).collect()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Emit until `stop` is reached.
    ///
    /// The stop condition is checked before each tick is produced and again
    /// after it is sent, so no sleep follows the final packet. Per-destination
    /// send failures are counted and logged but never end the run. The
    /// sockets are dropped when this returns, whatever the exit path.
    pub fn run(&mut self, stop: &StopCondition) -> EmitResult<EmitReport> {
        if self.state != EmitterState::Ready {
            return Err(EmitError::NotReady(self.state));
        }
        let Some(mut sink) = self.sink.take() else {
            return Err(EmitError::NotReady(self.state));
        };

        self.state = EmitterState::Running;
        info!(
            destinations = self.targets.len(),
            interval = ?self.interval,
            max_packets = ?stop.max_packets(),
            "emitter running"
        );

        let started = Instant::now();
        let mut ticks = 0u64;

        while !stop.reached(ticks, started.elapsed()) {
            let tick = self.source.next_tick();
            let len = encode_into(&tick, &mut self.buffer);
            let payload = &self.buffer[..len];

            for target in &mut self.targets {
                let t0 = self.clock.raw();
                let result = sink.send_to(payload, target.addr);
                self.latency.record(self.clock.delta_nanos(t0, self.clock.raw()));
                target.record(result);
            }

            ticks += 1;
            if self.progress_every > 0 && ticks % self.progress_every == 0 {
                info!(sent = ticks, "progress");
            }

            if stop.reached(ticks, started.elapsed()) {
                break;
            }
            stop.pace(self.interval);
        }

        drop(sink);
        self.state = EmitterState::Stopped;

        let report = EmitReport {
            ticks,
            elapsed: started.elapsed(),
            destinations: self
                .targets
                .iter()
                .map(|t| DestinationReport {
                    addr: t.addr,
                    stats: t.stats,
                })
                .collect(),
            send_latency: self.latency.summary(),
        };

        info!(
            ticks = report.ticks,
            sent = report.total_sent(),
            failed = report.total_failed(),
            elapsed = ?report.elapsed,
            send_p50 = %format_latency(report.send_latency.p50),
            send_p99 = %format_latency(report.send_latency.p99),
            "emitter stopped"
        );

        Ok(report)
    }
}
