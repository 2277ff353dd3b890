//! End-to-end emitter runs over loopback UDP.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::{Duration, Instant};

use tick_feed::{
    CancelToken, DatagramSink, Destination, EmitterConfig, Emitter, RandomSourceConfig,
    RandomTickSource, StopCondition, TickListener,
};
use tick_proto::{InstrumentType, Side, TickRecord};

fn listener() -> (TickListener, SocketAddr) {
    let listener = TickListener::bind("127.0.0.1:0").unwrap();
    listener.set_timeout(Some(Duration::from_secs(2))).unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

fn seeded(seed: u64) -> RandomTickSource {
    RandomTickSource::new(RandomSourceConfig {
        seed: Some(seed),
        ..RandomSourceConfig::default()
    })
    .unwrap()
}

#[test]
fn paced_run_sends_exactly_count_packets() {
    let (mut rx, addr) = listener();
    let config = EmitterConfig::new(vec![Destination::from(addr)])
        .with_interval_secs(0.01)
        .unwrap();

    let mut emitter = Emitter::configure(config, seeded(1)).unwrap();
    let start = Instant::now();
    let report = emitter.run(&StopCondition::count(5)).unwrap();
    let elapsed = start.elapsed();

    assert_eq!(report.ticks, 5);
    assert_eq!(report.total_sent(), 5);
    // Four sleeps separate five sends
    assert!(elapsed >= Duration::from_millis(40), "elapsed {elapsed:?}");

    let ticks = rx.collect(5);
    assert_eq!(ticks.len(), 5);
    assert!(ticks.iter().all(|t| t.instrument_id() == 12345));
}

/// Real socket that refuses every send to one address.
struct RefuseOne {
    socket: UdpSocket,
    refused: SocketAddr,
}

impl DatagramSink for RefuseOne {
    fn send_to(&mut self, payload: &[u8], dest: SocketAddr) -> io::Result<usize> {
        if dest == self.refused {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        }
        self.socket.send_to(payload, dest)
    }
}

#[test]
fn failing_destination_does_not_starve_the_other() {
    const N: u64 = 20;
    let (mut good_rx, good) = listener();
    let (_bad_rx, bad) = listener();

    let sink = RefuseOne {
        socket: UdpSocket::bind("127.0.0.1:0").unwrap(),
        refused: bad,
    };
    let config = EmitterConfig::new(vec![bad.into(), good.into()]).with_interval(Duration::ZERO);

    let mut emitter = Emitter::with_sink(config, seeded(2), sink).unwrap();
    let report = emitter.run(&StopCondition::count(N)).unwrap();

    assert_eq!(report.stats_for(bad).unwrap().failed, N);
    assert_eq!(report.stats_for(good).unwrap().sent, N);
    assert_eq!(good_rx.collect(N as usize).len(), N as usize);
}

#[test]
fn same_seed_reproduces_the_stream() {
    let run = |seed| {
        let (mut rx, addr) = listener();
        let config = EmitterConfig::new(vec![addr.into()]).with_interval(Duration::from_millis(1));
        Emitter::configure(config, seeded(seed))
            .unwrap()
            .run(&StopCondition::count(8))
            .unwrap();
        rx.collect(8)
    };

    let a = run(99);
    assert_eq!(a.len(), 8);
    assert_eq!(a, run(99));
}

#[test]
fn callback_source_and_fan_out_order() {
    let (mut rx_a, a) = listener();
    let (mut rx_b, b) = listener();

    let mut n = 0u32;
    let source = move || {
        n += 1;
        TickRecord::new(n, InstrumentType::Future, Side::Sell, n as f32, 1.0)
    };
    let config = EmitterConfig::new(vec![a.into(), b.into()]).with_interval(Duration::from_millis(1));
    Emitter::configure(config, source)
        .unwrap()
        .run(&StopCondition::count(6))
        .unwrap();

    for rx in [&mut rx_a, &mut rx_b] {
        let ids: Vec<u32> = rx.collect(6).iter().map(TickRecord::instrument_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    }
}

#[test]
fn independent_feeds_run_concurrently() {
    let (mut rx, addr) = listener();
    let token = CancelToken::new();

    let feeds: Vec<_> = (0..3u32)
        .map(|feed| {
            let stop = StopCondition::count(10).with_cancel(token.clone());
            thread::spawn(move || {
                let mut n = 0u32;
                let source = move || {
                    n += 1;
                    TickRecord::new(feed, InstrumentType::Underlying, Side::Buy, 100.0, n as f32)
                };
                let config = EmitterConfig::new(vec![addr.into()]).with_interval(Duration::from_millis(1));
                Emitter::configure(config, source).unwrap().run(&stop).unwrap()
            })
        })
        .collect();

    let reports: Vec<_> = feeds.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(reports.iter().all(|r| r.total_sent() == 10));

    let ticks = rx.collect(30);
    assert_eq!(ticks.len(), 30);
    for feed in 0..3u32 {
        // Per-feed order survives interleaving on loopback
        let qty: Vec<f32> = ticks
            .iter()
            .filter(|t| t.instrument_id() == feed)
            .map(|t| t.quantity())
            .collect();
        assert_eq!(qty, (1..=10).map(|q| q as f32).collect::<Vec<_>>());
    }
}

#[test]
fn cancellation_stops_an_unbounded_run() {
    let (_rx, addr) = listener();
    let token = CancelToken::new();
    let stop = StopCondition::cancelled_by(token.clone());

    let handle = thread::spawn(move || {
        let config = EmitterConfig::new(vec![addr.into()]).with_interval(Duration::from_millis(5));
        Emitter::configure(config, seeded(3)).unwrap().run(&stop).unwrap()
    });

    thread::sleep(Duration::from_millis(50));
    token.cancel();
    let report = handle.join().unwrap();
    assert!(report.ticks > 0);
}

#[test]
fn duration_limit_ends_the_run() {
    let (_rx, addr) = listener();
    let config = EmitterConfig::new(vec![addr.into()]).with_interval(Duration::from_millis(2));
    let report = Emitter::configure(config, seeded(4))
        .unwrap()
        .run(&StopCondition::duration(Duration::from_millis(30)))
        .unwrap();

    assert!(report.elapsed >= Duration::from_millis(30));
    assert!(report.elapsed < Duration::from_secs(2));
}
