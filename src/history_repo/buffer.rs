// Fixed-capacity per-target sample ring with loss counters.

use crate::models::{Sample, TargetStats};
use std::collections::VecDeque;

/// Samples kept per target; older samples are evicted first.
pub const HISTORY_CAPACITY: usize = 60;

#[derive(Debug, Clone)]
pub struct MetricsBuffer {
    samples: VecDeque<Sample>,
    sent: u64,
    received: u64,
    last_value: Option<f64>,
}

impl Default for MetricsBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsBuffer {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(HISTORY_CAPACITY),
            sent: 0,
            received: 0,
            last_value: None,
        }
    }

    pub fn record(&mut self, sample: Sample) {
        if self.samples.len() >= HISTORY_CAPACITY {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        self.sent += 1;
        if let Some(ms) = sample.latency_ms {
            self.received += 1;
            self.last_value = Some(ms);
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    /// Buffered samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn loss_rate(&self) -> f64 {
        if self.sent == 0 {
            return 0.0;
        }
        (self.sent - self.received) as f64 / self.sent as f64
    }

    pub fn stats(&self) -> TargetStats {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for ms in self.samples.iter().filter_map(|s| s.latency_ms) {
            count += 1;
            sum += ms;
            min = min.min(ms);
            max = max.max(ms);
        }
        let (average_ms, min_ms, max_ms) = if count > 0 {
            (Some(sum / count as f64), Some(min), Some(max))
        } else {
            (None, None, None)
        };
        TargetStats {
            sent: self.sent,
            received: self.received,
            loss_rate: self.loss_rate(),
            average_ms,
            min_ms,
            max_ms,
            last_value_ms: self.last_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_has_zero_loss_and_no_aggregates() {
        let buffer = MetricsBuffer::new();
        let stats = buffer.stats();
        assert_eq!(stats.sent, 0);
        assert_eq!(stats.loss_rate, 0.0);
        assert_eq!(stats.average_ms, None);
        assert_eq!(stats.min_ms, None);
        assert_eq!(stats.max_ms, None);
        assert_eq!(stats.last_value_ms, None);
    }

    #[test]
    fn never_exceeds_capacity_and_evicts_oldest_first() {
        let mut buffer = MetricsBuffer::new();
        for seq in 0..(HISTORY_CAPACITY as u64 + 25) {
            buffer.record(Sample::reply(seq, seq as f64));
            assert!(buffer.len() <= HISTORY_CAPACITY);
        }
        assert_eq!(buffer.len(), HISTORY_CAPACITY);
        let seqs: Vec<u64> = buffer.samples().map(|s| s.seq).collect();
        assert_eq!(seqs.first(), Some(&25));
        assert_eq!(seqs.last(), Some(&(HISTORY_CAPACITY as u64 + 24)));
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
        // Counters keep counting past eviction.
        assert_eq!(buffer.sent(), HISTORY_CAPACITY as u64 + 25);
    }

    #[test]
    fn received_never_exceeds_sent() {
        let mut buffer = MetricsBuffer::new();
        for seq in 0..200u64 {
            let sample = if seq % 3 == 0 {
                Sample::lost(seq)
            } else {
                Sample::reply(seq, 5.0)
            };
            buffer.record(sample);
            assert!(buffer.received() <= buffer.sent());
            let loss = buffer.loss_rate();
            assert!((0.0..=1.0).contains(&loss));
        }
    }

    #[test]
    fn aggregates_cover_buffered_replies_only() {
        let mut buffer = MetricsBuffer::new();
        buffer.record(Sample::reply(0, 10.0));
        buffer.record(Sample::lost(1));
        buffer.record(Sample::reply(2, 30.0));
        buffer.record(Sample::lost(3));
        let stats = buffer.stats();
        assert_eq!(stats.sent, 4);
        assert_eq!(stats.received, 2);
        assert!((stats.loss_rate - 0.5).abs() < 1e-9);
        assert_eq!(stats.average_ms, Some(20.0));
        assert_eq!(stats.min_ms, Some(10.0));
        assert_eq!(stats.max_ms, Some(30.0));
        // A lost probe does not clear the last successful value.
        assert_eq!(stats.last_value_ms, Some(30.0));
    }

    #[test]
    fn evicted_replies_leave_the_aggregates() {
        let mut buffer = MetricsBuffer::new();
        buffer.record(Sample::reply(0, 1000.0));
        for seq in 1..=HISTORY_CAPACITY as u64 {
            buffer.record(Sample::reply(seq, 10.0));
        }
        let stats = buffer.stats();
        assert_eq!(stats.max_ms, Some(10.0));
        assert_eq!(stats.average_ms, Some(10.0));
    }

    #[test]
    fn all_lost_window_reports_no_average_but_keeps_last_value() {
        let mut buffer = MetricsBuffer::new();
        buffer.record(Sample::reply(0, 7.5));
        for seq in 1..=HISTORY_CAPACITY as u64 {
            buffer.record(Sample::lost(seq));
        }
        let stats = buffer.stats();
        assert_eq!(stats.average_ms, None);
        assert_eq!(stats.last_value_ms, Some(7.5));
    }
}
