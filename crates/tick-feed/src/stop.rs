//! Run termination: packet count, wall-clock limit, external cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep while a cancel token is attached.
const CANCEL_POLL: Duration = Duration::from_millis(20);

/// Cloneable cancellation flag shared between a run and its controller.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// When an emitter run ends. Any satisfied limit stops the run; with no
/// limits set the run continues until cancelled, or forever.
#[derive(Clone, Debug, Default)]
pub struct StopCondition {
    max_packets: Option<u64>,
    max_duration: Option<Duration>,
    cancel: Option<CancelToken>,
}

impl StopCondition {
    /// Never stops on its own.
    pub fn never() -> Self {
        Self::default()
    }

    pub fn count(packets: u64) -> Self {
        Self::never().with_count(packets)
    }

    pub fn duration(limit: Duration) -> Self {
        Self::never().with_duration(limit)
    }

    pub fn cancelled_by(token: CancelToken) -> Self {
        Self::never().with_cancel(token)
    }

    pub fn with_count(mut self, packets: u64) -> Self {
        self.max_packets = Some(packets);
        self
    }

    pub fn with_duration(mut self, limit: Duration) -> Self {
        self.max_duration = Some(limit);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn max_packets(&self) -> Option<u64> {
        self.max_packets
    }

    /// Whether the run should end given what it has done so far.
    #[inline]
    pub fn reached(&self, packets: u64, elapsed: Duration) -> bool {
        self.max_packets.is_some_and(|max| packets >= max)
            || self.max_duration.is_some_and(|max| elapsed >= max)
            || self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Sleep for one pacing interval, waking early on cancellation.
    ///
    /// No drift compensation: each call sleeps the full interval.
    pub fn pace(&self, interval: Duration) {
        if interval.is_zero() {
            return;
        }

        let Some(token) = &self.cancel else {
            thread::sleep(interval);
            return;
        };

        let started = Instant::now();
        loop {
            if token.is_cancelled() {
                return;
            }
            let remaining = interval.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return;
            }
            thread::sleep(remaining.min(CANCEL_POLL));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_limit() {
        let stop = StopCondition::count(5);
        assert!(!stop.reached(4, Duration::ZERO));
        assert!(stop.reached(5, Duration::ZERO));
    }

    #[test]
    fn test_duration_limit() {
        let stop = StopCondition::duration(Duration::from_millis(100));
        assert!(!stop.reached(1_000_000, Duration::from_millis(99)));
        assert!(stop.reached(0, Duration::from_millis(100)));
    }

    #[test]
    fn test_first_limit_wins() {
        let stop = StopCondition::count(10).with_duration(Duration::from_secs(1));
        assert!(stop.reached(10, Duration::ZERO));
        assert!(stop.reached(0, Duration::from_secs(2)));
        assert!(!StopCondition::never().reached(u64::MAX, Duration::MAX));
    }

    #[test]
    fn test_cancel_is_shared_across_clones() {
        let token = CancelToken::new();
        let stop = StopCondition::cancelled_by(token.clone());
        assert!(!stop.reached(0, Duration::ZERO));
        token.cancel();
        assert!(stop.reached(0, Duration::ZERO));
    }

    #[test]
    fn test_pace_wakes_on_cancel() {
        let token = CancelToken::new();
        let stop = StopCondition::cancelled_by(token.clone());

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            token.cancel();
        });

        let start = Instant::now();
        stop.pace(Duration::from_secs(10));
        assert!(start.elapsed() < Duration::from_secs(5));
        canceller.join().unwrap();
    }

    #[test]
    fn test_pace_with_huge_interval_observes_cancel() {
        let token = CancelToken::new();
        token.cancel();
        let stop = StopCondition::cancelled_by(token);

        let start = Instant::now();
        stop.pace(Duration::from_secs(u64::MAX / 2));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_pace_with_cancel_sleeps_full_interval() {
        let stop = StopCondition::cancelled_by(CancelToken::new());
        let start = Instant::now();
        stop.pace(Duration::from_millis(45));
        assert!(start.elapsed() >= Duration::from_millis(45));
    }

    #[test]
    fn test_pace_sleeps_full_interval() {
        let start = Instant::now();
        StopCondition::count(1).pace(Duration::from_millis(15));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }
}
