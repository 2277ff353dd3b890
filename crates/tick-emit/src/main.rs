//! Tick Emit - synthetic market-data feed over UDP.
//!
//! ```bash
//! tick-emit emit --dest 10.0.1.23:5001 --rate 100 --count 10000
//! tick-emit listen --bind 0.0.0.0:5001
//! ```
//!
//! Every flag has a `TICK_*` environment fallback; a `.env` file in the
//! working directory is loaded first. Ctrl-C or SIGTERM stops all feeds.

mod config;
mod telemetry;

use std::io;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tick_feed::{CancelToken, EmitReport, Emitter, RandomTickSource, TickListener};
use tick_metrics::format_latency;
use tracing::{error, info, warn};

use crate::config::{Cli, Command, EmitArgs, ListenArgs};

/// How often a blocked listener wakes to check for cancellation.
const LISTEN_POLL: Duration = Duration::from_millis(200);

fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();
    telemetry::init();

    let cli = Cli::parse();
    let shutdown = CancelToken::new();
    install_signal_handler(shutdown.clone())?;

    match cli.command {
        Command::Emit(args) => emit(&args, &shutdown),
        Command::Listen(args) => listen(&args, &shutdown),
    }
}

/// Cancel `token` on Ctrl-C or SIGTERM.
fn install_signal_handler(token: CancelToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build signal runtime")?;

    thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            runtime.block_on(async {
                if let Err(e) = wait_for_shutdown().await {
                    error!(error = %e, "signal handler failed");
                    return;
                }
                info!("shutdown requested");
                token.cancel();
            })
        })
        .context("failed to spawn signal thread")?;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown() -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = term.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> io::Result<()> {
    tokio::signal::ctrl_c().await
}

fn emit(args: &EmitArgs, shutdown: &CancelToken) -> Result<()> {
    if args.feeds == 0 {
        bail!("--feeds must be at least 1");
    }

    let stop = args
        .stop_condition()
        .context("invalid stop condition")?
        .with_cancel(shutdown.clone());

    // Configure every feed up front so a bad setting fails before any sends
    let mut emitters = Vec::with_capacity(args.feeds);
    for feed in 0..args.feeds {
        let config = args.emitter_config().context("invalid emitter configuration")?;
        let source = RandomTickSource::new(args.source_config(feed))
            .context("invalid tick source configuration")?;
        let emitter = Emitter::configure(config, source)
            .with_context(|| format!("failed to configure feed {feed}"))?;
        emitters.push(emitter);
    }

    info!(
        feeds = args.feeds,
        destinations = ?emitters[0].destinations(),
        interval = ?emitters[0].interval(),
        "starting"
    );

    let cores = args.pin_core.map(|_| core_affinity::get_core_ids().unwrap_or_default());

    let reports = thread::scope(|scope| {
        let handles: Vec<_> = emitters
            .into_iter()
            .enumerate()
            .map(|(feed, mut emitter)| {
                let stop = &stop;
                let core = match (&cores, args.pin_core) {
                    (Some(ids), Some(first)) if !ids.is_empty() => {
                        Some(ids[(first + feed) % ids.len()])
                    }
                    _ => None,
                };

                thread::Builder::new()
                    .name(format!("feed-{feed}"))
                    .spawn_scoped(scope, move || {
                        if let Some(core) = core {
                            if !core_affinity::set_for_current(core) {
                                warn!(core = core.id, "failed to pin feed thread");
                            }
                        }
                        emitter.run(stop)
                    })
            })
            .collect::<io::Result<_>>()?;

        let mut reports = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.join() {
                Ok(report) => reports.push(report?),
                Err(_) => bail!("feed thread panicked"),
            }
        }
        Ok::<_, anyhow::Error>(reports)
    })?;

    for (feed, report) in reports.iter().enumerate() {
        log_report(feed, report);
    }
    Ok(())
}

fn log_report(feed: usize, report: &EmitReport) {
    for dest in &report.destinations {
        info!(
            feed,
            dest = %dest.addr,
            sent = dest.stats.sent,
            failed = dest.stats.failed,
            dropped = dest.stats.would_block,
            "destination summary"
        );
    }
    let rate = if report.elapsed.is_zero() {
        0.0
    } else {
        report.ticks as f64 / report.elapsed.as_secs_f64()
    };
    info!(
        feed,
        ticks = report.ticks,
        elapsed = ?report.elapsed,
        rate_pps = rate.round() as u64,
        send_p50 = %format_latency(report.send_latency.p50),
        send_p99 = %format_latency(report.send_latency.p99),
        send_max = %format_latency(report.send_latency.max),
        "feed summary"
    );
}

fn listen(args: &ListenArgs, shutdown: &CancelToken) -> Result<()> {
    let mut listener = TickListener::bind(args.bind)
        .with_context(|| format!("failed to bind {}", args.bind))?;
    listener.set_timeout(Some(LISTEN_POLL))?;
    info!(addr = %listener.local_addr()?, "listening");

    let mut received = 0u64;
    let mut malformed = 0u64;

    while !shutdown.is_cancelled() && (args.count == 0 || received < args.count) {
        match listener.recv() {
            Ok((Ok(tick), from)) => {
                received += 1;
                info!(
                    %from,
                    instrument_id = tick.instrument_id(),
                    instrument_type = tick.instrument_type().as_str(),
                    side = tick.side().as_str(),
                    price = tick.price(),
                    qty = tick.quantity(),
                    "tick"
                );
            }
            Ok((Err(e), from)) => {
                malformed += 1;
                warn!(%from, error = %e, "dropped datagram");
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
            Err(e) => return Err(e).context("receive failed"),
        }
    }

    info!(received, malformed, "listener stopped");
    Ok(())
}
