//! Per-channel message reconciliation.
//!
//! A [`ChannelReconciler`] owns everything one channel needs to turn an
//! at-least-once, possibly reordered message stream into a deterministic
//! state: the rocket state itself, the `last_applied` cursor, the set of
//! applied message numbers (deduplication) and the pending buffer of
//! messages that arrived ahead of the cursor.
//!
//! # Cursor discipline
//!
//! `last_applied` is the largest number `n` such that every number in
//! `1..=n` has either been applied or been intentionally discarded by the
//! explosion drain. Pending keys are always strictly greater than the
//! cursor; a message arriving at or behind it is either a duplicate of an
//! applied number (absorbed) or a stale gap-filler (rejected).
//!
//! # Explosion drain
//!
//! Once a rocket is exploded, buffered non-launch messages can never
//! apply. The drain discards them and advances the cursor to each
//! discarded number, jumping intermediate gaps, so that a later relaunch
//! message can still reach its slot. A buffered relaunch beyond a gap
//! stays put until the gap fills.

use std::collections::{BTreeMap, BTreeSet};

use crate::envelope::{Envelope, MessageKind};
use crate::rocket::RocketState;
use crate::transition;

/// Why an envelope was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The message number is at or behind the cursor and was never
    /// applied: a gap-filler arriving after its slot was settled.
    StaleNumber,
    /// The transition function refused the message (terminal gate or
    /// in-kind payload check).
    FailedTransition,
}

/// Outcome of ingesting one envelope.
///
/// `Applied`, `Buffered` and `Duplicate` are all "accepted" in the sense
/// of the ingress contract: the envelope has been applied or durably
/// absorbed. Only `Rejected` maps to a failure toward the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Applied in order; the state changed and the buffer was drained.
    Applied,
    /// Placed in the pending buffer to wait for the cursor.
    Buffered,
    /// The message number was already applied; silently absorbed.
    Duplicate,
    /// The envelope cannot take effect now and never will.
    Rejected(RejectReason),
}

impl IngestOutcome {
    /// Whether the envelope was accepted for immediate or eventual
    /// processing.
    #[must_use]
    pub const fn accepted(self) -> bool {
        !matches!(self, Self::Rejected(_))
    }

    /// Stable lowercase label, used for logging and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Buffered => "buffered",
            Self::Duplicate => "duplicate",
            Self::Rejected(RejectReason::StaleNumber) => "rejected_stale",
            Self::Rejected(RejectReason::FailedTransition) => "rejected_transition",
        }
    }
}

/// Reconciliation counters for one channel, as reported by the
/// diagnostics surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDiagnostics {
    /// Channel id.
    pub channel: String,
    /// How many distinct message numbers have been applied.
    pub processed_count: usize,
    /// Message numbers currently waiting in the pending buffer, ascending.
    pub pending_numbers: Vec<u64>,
    /// The reconciliation cursor.
    pub last_applied: u64,
}

impl ChannelDiagnostics {
    /// Diagnostics for a channel the registry has never seen.
    #[must_use]
    pub fn unknown(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            processed_count: 0,
            pending_numbers: Vec::new(),
            last_applied: 0,
        }
    }
}

/// Reconciliation state for a single channel.
#[derive(Debug)]
pub struct ChannelReconciler {
    channel: String,
    state: Option<RocketState>,
    applied: BTreeSet<u64>,
    pending: BTreeMap<u64, Envelope>,
    last_applied: u64,
}

impl ChannelReconciler {
    /// Creates an empty reconciler for `channel`. Creation never fails.
    #[must_use]
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            state: None,
            applied: BTreeSet::new(),
            pending: BTreeMap::new(),
            last_applied: 0,
        }
    }

    /// The channel this reconciler belongs to.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The current rocket state, if a launch has been applied.
    #[must_use]
    pub const fn state(&self) -> Option<&RocketState> {
        self.state.as_ref()
    }

    /// The reconciliation cursor.
    #[must_use]
    pub const fn last_applied(&self) -> u64 {
        self.last_applied
    }

    /// Ingests one envelope addressed to this channel.
    ///
    /// The envelope is deduplicated, buffered or applied in order; after
    /// every in-order apply the pending buffer is drained. The returned
    /// outcome is authoritative: [`IngestOutcome::accepted`] is the `ok`
    /// reported to the producer.
    pub fn ingest(&mut self, envelope: Envelope) -> IngestOutcome {
        debug_assert_eq!(envelope.channel, self.channel);
        let number = envelope.message_number;

        // 1. Dedup: an applied number is silently absorbed.
        if self.applied.contains(&number) {
            return IngestOutcome::Duplicate;
        }

        // 2. Bootstrap gate: until a launch has applied there is nothing
        //    to transition, so everything else waits in the buffer.
        if self.state.is_none() && envelope.kind() != MessageKind::Launched {
            self.pending.insert(number, envelope);
            return IngestOutcome::Buffered;
        }

        let expected = self.last_applied + 1;
        if number < expected {
            // The slot is already settled and this number never applied:
            // an earlier occupant of the slot failed, or the number was
            // discarded by the explosion drain.
            tracing::debug!(
                channel = %self.channel,
                message_number = number,
                expected,
                "stale message behind cursor"
            );
            return IngestOutcome::Rejected(RejectReason::StaleNumber);
        }
        if number > expected {
            self.pending.insert(number, envelope);
            return IngestOutcome::Buffered;
        }

        // 3. In order: apply, then promote whatever became current. An
        //    in-order arrival supersedes any buffered occupant of its
        //    slot (same number, different payload), which keeps pending
        //    keys strictly ahead of the cursor.
        self.pending.remove(&number);
        if self.apply_in_place(&envelope) {
            self.drain();
            IngestOutcome::Applied
        } else {
            tracing::debug!(
                channel = %self.channel,
                message_number = number,
                kind = %envelope.kind(),
                "transition rejected in-order message; slot becomes a permanent gap"
            );
            IngestOutcome::Rejected(RejectReason::FailedTransition)
        }
    }

    /// Reconciliation counters for the diagnostics surface.
    #[must_use]
    pub fn diagnostics(&self) -> ChannelDiagnostics {
        ChannelDiagnostics {
            channel: self.channel.clone(),
            processed_count: self.applied.len(),
            pending_numbers: self.pending.keys().copied().collect(),
            last_applied: self.last_applied,
        }
    }

    /// Applies an in-order envelope and, on acceptance, settles its slot.
    fn apply_in_place(&mut self, envelope: &Envelope) -> bool {
        debug_assert_eq!(envelope.message_number, self.last_applied + 1);
        if transition::apply(&mut self.state, envelope) {
            self.applied.insert(envelope.message_number);
            self.advance_cursor(envelope.message_number);
            true
        } else {
            false
        }
    }

    /// Settles the cursor and mirrors it into the state snapshot.
    fn advance_cursor(&mut self, number: u64) {
        self.last_applied = number;
        if let Some(rocket) = &mut self.state {
            rocket.last_applied = number;
        }
    }

    /// Promotes buffered messages that have become current.
    ///
    /// While the rocket is exploded, the smallest pending entry is
    /// inspected regardless of gaps: non-launch entries are discarded with
    /// the cursor advancing to each discarded number (skip-and-advance),
    /// while a buffered relaunch applies only once it is exactly next.
    fn drain(&mut self) {
        loop {
            let Some((&next, entry)) = self.pending.first_key_value() else {
                break;
            };
            // A pending number at or behind the cursor is a bug, not data.
            assert!(
                next > self.last_applied,
                "pending message {next} at or behind cursor {} on channel {}",
                self.last_applied,
                self.channel
            );

            let relaunch = entry.kind() == MessageKind::Launched;
            let exploded = self.state.as_ref().is_some_and(|rocket| rocket.exploded);

            if exploded && !relaunch {
                // Skip-and-advance: the entry can never apply; discard it
                // and settle every number up to it so a later relaunch can
                // reach its slot.
                self.pending.remove(&next);
                self.advance_cursor(next);
                tracing::debug!(
                    channel = %self.channel,
                    message_number = next,
                    "discarded buffered message behind explosion"
                );
                continue;
            }

            if next != self.last_applied + 1 {
                break;
            }
            let Some((_, envelope)) = self.pending.pop_first() else {
                break;
            };
            if !self.apply_in_place(&envelope) {
                // The slot stays a permanent gap; later numbers keep
                // waiting in the buffer.
                tracing::debug!(
                    channel = %self.channel,
                    message_number = next,
                    "drained message rejected; halting drain"
                );
                break;
            }
        }
    }
}
