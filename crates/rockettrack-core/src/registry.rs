//! Concurrent channel registry and query surface.
//!
//! [`RocketRegistry`] maps channel ids to their reconcilers, creating
//! them lazily on first contact. One coarse reader-writer lock covers the
//! map and every reconciler behind it: ingress takes the write lock (so
//! locate-or-create is atomic and application is serialized per channel),
//! queries take the read lock and clone what they return. The invariants
//! are strictly per-channel, so a finer per-channel locking scheme would
//! also be sound; the coarse lock is sufficient for the workloads this
//! surface serves and keeps the reasoning trivial.
//!
//! The registry is an explicit dependency: construct it at startup and
//! hand it to whatever serves requests. There is no process-wide
//! singleton.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::envelope::Envelope;
use crate::reconciler::{ChannelDiagnostics, ChannelReconciler, IngestOutcome};
use crate::rocket::{RocketState, RocketSummary};

/// A channel id together with its reconciliation cursor, for the
/// all-channels diagnostics listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCursor {
    /// Channel id.
    pub channel: String,
    /// The channel's `last_applied` cursor.
    pub last_applied: u64,
}

/// Concurrent mapping from channel id to per-channel reconciler.
#[derive(Debug, Default)]
pub struct RocketRegistry {
    channels: RwLock<HashMap<String, ChannelReconciler>>,
}

impl RocketRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingests one envelope, creating the channel's reconciler if this is
    /// the first message addressed to it.
    pub fn ingest(&self, envelope: Envelope) -> IngestOutcome {
        let mut channels = self.channels.write().expect("lock poisoned");
        let reconciler = channels
            .entry(envelope.channel.clone())
            .or_insert_with(|| ChannelReconciler::new(envelope.channel.clone()));
        reconciler.ingest(envelope)
    }

    /// A snapshot of one rocket's state.
    ///
    /// Returns `None` both for channels the registry has never seen and
    /// for channels whose rocket has not materialized yet (messages
    /// buffered, no launch applied).
    #[must_use]
    pub fn get(&self, channel: &str) -> Option<RocketState> {
        let channels = self.channels.read().expect("lock poisoned");
        channels.get(channel).and_then(|r| r.state().cloned())
    }

    /// Summaries of every materialized rocket, ordered by channel id.
    ///
    /// The order is a stable presentation default; callers that need a
    /// different order sort the returned copies themselves.
    #[must_use]
    pub fn summaries(&self) -> Vec<RocketSummary> {
        let channels = self.channels.read().expect("lock poisoned");
        let mut summaries: Vec<RocketSummary> = channels
            .values()
            .filter_map(|r| r.state().map(RocketSummary::from))
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    /// Reconciliation diagnostics for one channel.
    ///
    /// Unknown channels report zero processed messages and an empty
    /// buffer rather than an error.
    #[must_use]
    pub fn diagnostics(&self, channel: &str) -> ChannelDiagnostics {
        let channels = self.channels.read().expect("lock poisoned");
        channels
            .get(channel)
            .map_or_else(|| ChannelDiagnostics::unknown(channel), ChannelReconciler::diagnostics)
    }

    /// Cursor positions of every known channel, ordered by channel id.
    #[must_use]
    pub fn cursors(&self) -> Vec<ChannelCursor> {
        let channels = self.channels.read().expect("lock poisoned");
        let mut cursors: Vec<ChannelCursor> = channels
            .values()
            .map(|r| ChannelCursor {
                channel: r.channel().to_string(),
                last_applied: r.last_applied(),
            })
            .collect();
        cursors.sort_by(|a, b| a.channel.cmp(&b.channel));
        cursors
    }

    /// Number of materialized rockets.
    #[must_use]
    pub fn rocket_count(&self) -> usize {
        let channels = self.channels.read().expect("lock poisoned");
        channels.values().filter(|r| r.state().is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::envelope::Payload;

    fn envelope(channel: &str, number: u64, payload: Payload) -> Envelope {
        let time = Utc.with_ymd_and_hms(2024, 3, 14, 19, 0, 0).unwrap();
        Envelope::new(channel, number, time, payload).unwrap()
    }

    fn launch(channel: &str, number: u64, speed: u32) -> Envelope {
        envelope(
            channel,
            number,
            Payload::Launched {
                rocket_type: "Falcon-9".into(),
                mission: "ARTEMIS".into(),
                launch_speed: speed,
            },
        )
    }

    #[test]
    fn test_channels_are_created_lazily() {
        let registry = RocketRegistry::new();
        assert!(registry.get("R").is_none());
        assert!(registry.cursors().is_empty());

        assert!(registry.ingest(launch("R", 1, 500)).accepted());
        assert_eq!(registry.get("R").unwrap().speed, 500);
        assert_eq!(registry.cursors().len(), 1);
    }

    #[test]
    fn test_unmaterialized_channel_is_absent_but_diagnosable() {
        let registry = RocketRegistry::new();
        assert!(registry
            .ingest(envelope("R", 2, Payload::SpeedIncreased { by: 10 }))
            .accepted());

        assert!(registry.get("R").is_none(), "no launch, no rocket");
        assert!(registry.summaries().is_empty());
        assert_eq!(registry.rocket_count(), 0);

        let diag = registry.diagnostics("R");
        assert_eq!(diag.processed_count, 0);
        assert_eq!(diag.pending_numbers, vec![2]);
        assert_eq!(registry.cursors(), vec![ChannelCursor {
            channel: "R".into(),
            last_applied: 0,
        }]);
    }

    #[test]
    fn test_unknown_channel_diagnostics_are_empty() {
        let registry = RocketRegistry::new();
        let diag = registry.diagnostics("ghost");
        assert_eq!(diag.channel, "ghost");
        assert_eq!(diag.processed_count, 0);
        assert!(diag.pending_numbers.is_empty());
        assert_eq!(diag.last_applied, 0);
    }

    #[test]
    fn test_snapshots_do_not_alias_live_state() {
        let registry = RocketRegistry::new();
        registry.ingest(launch("R", 1, 500));

        let mut snapshot = registry.get("R").unwrap();
        snapshot.speed = 9_999;
        snapshot.mission = "TAMPERED".into();

        let fresh = registry.get("R").unwrap();
        assert_eq!(fresh.speed, 500);
        assert_eq!(fresh.mission, "ARTEMIS");
    }

    #[test]
    fn test_summaries_are_ordered_by_id() {
        let registry = RocketRegistry::new();
        for channel in ["charlie", "alpha", "bravo"] {
            registry.ingest(launch(channel, 1, 100));
        }
        let summaries = registry.summaries();
        let ids: Vec<&str> = summaries.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "bravo", "charlie"]);
    }

    #[test]
    fn test_channels_are_independent() {
        let registry = RocketRegistry::new();
        registry.ingest(launch("A", 1, 100));
        registry.ingest(launch("B", 1, 200));
        registry.ingest(envelope("A", 2, Payload::Exploded { reason: "X".into() }));
        registry.ingest(envelope("B", 2, Payload::SpeedIncreased { by: 50 }));

        assert!(registry.get("A").unwrap().exploded);
        let b = registry.get("B").unwrap();
        assert!(!b.exploded);
        assert_eq!(b.speed, 250);
    }

    #[test]
    fn test_concurrent_ingest_keeps_channels_isolated() {
        let registry = RocketRegistry::new();

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let registry = &registry;
                scope.spawn(move || {
                    let channel = format!("channel-{worker}");
                    assert!(registry.ingest(launch(&channel, 1, 100)).accepted());
                    for number in 2..=50 {
                        let outcome = registry.ingest(envelope(
                            &channel,
                            number,
                            Payload::SpeedIncreased { by: 10 },
                        ));
                        assert!(outcome.accepted());
                    }
                });
            }
            // Interleave readers; every snapshot must be internally
            // consistent even while writers are running.
            for _ in 0..4 {
                let registry = &registry;
                scope.spawn(move || {
                    for _ in 0..100 {
                        for summary in registry.summaries() {
                            assert!(summary.speed >= 100);
                        }
                    }
                });
            }
        });

        for worker in 0..8 {
            let channel = format!("channel-{worker}");
            let state = registry.get(&channel).unwrap();
            assert_eq!(state.speed, 100 + 49 * 10);
            assert_eq!(registry.diagnostics(&channel).last_applied, 50);
        }
    }
}
