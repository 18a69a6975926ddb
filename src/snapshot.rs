// Frame projection: metrics buffers -> render-ready frame.

use crate::history_repo::MetricsBuffer;
use crate::models::{Frame, FrameEntry, Target};
use std::collections::HashMap;

/// Projects the buffers of `targets` (in the given order) into a frame.
/// Targets that have not been probed yet appear with an empty history.
pub fn snapshot(
    cycle: u64,
    targets: &[Target],
    buffers: &HashMap<String, MetricsBuffer>,
) -> Frame {
    let entries = targets
        .iter()
        .map(|t| match buffers.get(&t.address) {
            Some(buffer) => entry_for(&t.address, buffer),
            None => FrameEntry {
                address: t.address.clone(),
                history: Vec::new(),
                last_value_ms: None,
                loss_rate: 0.0,
                average_ms: None,
            },
        })
        .collect();
    Frame {
        cycle: Some(cycle),
        timestamp: now_millis(),
        entries,
    }
}

fn entry_for(address: &str, buffer: &MetricsBuffer) -> FrameEntry {
    let stats = buffer.stats();
    FrameEntry {
        address: address.to_string(),
        history: buffer.samples().map(|s| s.latency_ms).collect(),
        last_value_ms: stats.last_value_ms,
        loss_rate: stats.loss_rate,
        average_ms: stats.average_ms,
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history_repo::HISTORY_CAPACITY;
    use crate::models::{Sample, TargetMetadata};

    #[test]
    fn frame_follows_target_order_and_includes_unprobed_targets() {
        let targets = vec![
            Target::new("10.0.0.3", TargetMetadata::online()),
            Target::new("10.0.0.2", TargetMetadata::online()),
        ];
        let mut buffers = HashMap::new();
        let mut b = MetricsBuffer::new();
        b.record(Sample::reply(0, 12.0));
        buffers.insert("10.0.0.2".to_string(), b);

        let frame = snapshot(0, &targets, &buffers);
        assert_eq!(frame.cycle, Some(0));
        assert_eq!(frame.entries.len(), 2);
        assert_eq!(frame.entries[0].address, "10.0.0.3");
        assert!(frame.entries[0].history.is_empty());
        assert_eq!(frame.entries[1].history, vec![Some(12.0)]);
        assert_eq!(frame.entries[1].last_value_ms, Some(12.0));
        assert_eq!(frame.entries[1].average_ms, Some(12.0));
    }

    #[test]
    fn lost_samples_project_as_gaps() {
        let targets = vec![Target::new("10.0.0.3", TargetMetadata::online())];
        let mut b = MetricsBuffer::new();
        b.record(Sample::lost(0));
        b.record(Sample::reply(1, 3.0));
        let buffers = HashMap::from([("10.0.0.3".to_string(), b)]);
        let frame = snapshot(1, &targets, &buffers);
        assert_eq!(frame.entries[0].history, vec![None, Some(3.0)]);
        assert!((frame.entries[0].loss_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn full_buffer_projects_the_newest_samples() {
        let targets = vec![Target::new("10.0.0.4", TargetMetadata::online())];
        let mut b = MetricsBuffer::new();
        for seq in 0..(HISTORY_CAPACITY as u64 + 5) {
            b.record(Sample::reply(seq, seq as f64));
        }
        let buffers = HashMap::from([("10.0.0.4".to_string(), b)]);
        let frame = snapshot(64, &targets, &buffers);
        let history = &frame.entries[0].history;
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.first(), Some(&Some(5.0)));
        assert_eq!(history.last(), Some(&Some(64.0)));
    }
}
