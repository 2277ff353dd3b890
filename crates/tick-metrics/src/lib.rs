//! Send-latency tracking with HdrHistogram.
//!
//! The emitter times every datagram hand-off to the kernel and records it
//! here; the run report carries a [`LatencySummary`] out of it.

use hdrhistogram::Histogram;

/// Highest latency the histogram tracks (one minute, in nanoseconds).
const MAX_TRACKABLE_NANOS: u64 = 60_000_000_000;

/// Nanosecond send-latency histogram.
pub struct SendLatency {
    histogram: Histogram<u64>,
}

impl SendLatency {
    /// Create a histogram with 3 significant digits.
    pub fn new() -> Self {
        Self::with_precision(3)
    }

    /// Create with custom precision. `sigfig` is clamped to 1..=5.
    pub fn with_precision(sigfig: u8) -> Self {
        let sigfig = sigfig.clamp(1, 5);
        // Only fails for low < 1, high < 2 * low, or sigfig > 5, all excluded above
        let histogram = match Histogram::new_with_bounds(1, MAX_TRACKABLE_NANOS, sigfig) {
            Ok(h) => h,
            Err(_) => unreachable!("constant histogram bounds"),
        };
        Self { histogram }
    }

    /// Record one send, saturating at the tracked maximum.
    #[inline(always)]
    pub fn record(&mut self, nanos: u64) {
        self.histogram.saturating_record(nanos.max(1));
    }

    /// Value at percentile (0.0 - 100.0).
    pub fn percentile(&self, percentile: f64) -> u64 {
        self.histogram.value_at_quantile(percentile / 100.0)
    }

    /// Snapshot the distribution.
    pub fn summary(&self) -> LatencySummary {
        if self.histogram.len() == 0 {
            return LatencySummary::default();
        }
        LatencySummary {
            count: self.histogram.len(),
            p50: self.percentile(50.0),
            p99: self.percentile(99.0),
            max: self.histogram.max(),
            mean: self.histogram.mean(),
        }
    }
}

impl Default for SendLatency {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of a [`SendLatency`] histogram.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LatencySummary {
    pub count: u64,
    pub p50: u64,
    pub p99: u64,
    pub max: u64,
    pub mean: f64,
}

/// Format latency with appropriate units.
pub fn format_latency(nanos: u64) -> String {
    if nanos < 1_000 {
        format!("{} ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2} μs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2} ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2} s", nanos as f64 / 1_000_000_000.0)
    }
}

/// TSC-backed clock for timing individual sends.
#[derive(Clone)]
pub struct SendClock {
    clock: quanta::Clock,
}

impl SendClock {
    pub fn new() -> Self {
        Self {
            clock: quanta::Clock::new(),
        }
    }

    /// Raw counter reading.
    #[inline(always)]
    pub fn raw(&self) -> u64 {
        self.clock.raw()
    }

    /// Nanoseconds between two raw readings.
    #[inline(always)]
    pub fn delta_nanos(&self, start: u64, end: u64) -> u64 {
        self.clock.delta_as_nanos(start, end)
    }
}

impl Default for SendClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_of_recorded_sends() {
        let mut h = SendLatency::new();
        for i in 1..=100 {
            h.record(i * 100);
        }

        let s = h.summary();
        assert_eq!(s.count, 100);
        assert!(s.p50 >= 4900 && s.p50 <= 5100);
        // HdrHistogram may round max value slightly
        assert!(s.max >= 10000 && s.max <= 10100);
    }

    #[test]
    fn test_empty_summary_is_zeroed() {
        let h = SendLatency::new();
        assert_eq!(h.summary(), LatencySummary::default());
    }

    #[test]
    fn test_zero_and_huge_values_do_not_panic() {
        let mut h = SendLatency::with_precision(9);
        h.record(0);
        h.record(u64::MAX);
        assert_eq!(h.summary().count, 2);
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency(500), "500 ns");
        assert_eq!(format_latency(5000), "5.00 μs");
        assert_eq!(format_latency(5_000_000), "5.00 ms");
    }

    #[test]
    fn test_clock_is_monotonic() {
        let clock = SendClock::new();
        let a = clock.raw();
        let b = clock.raw();
        let _ = clock.delta_nanos(a, b.max(a));
    }
}
