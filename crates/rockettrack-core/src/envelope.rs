//! Message envelope types for the rocket telemetry stream.
//!
//! An [`Envelope`] is the unit of ingress: channel identity, message
//! number, producer timestamp and a type-tagged [`Payload`]. The payload is
//! one enum variant per message kind, each carrying only the fields that
//! kind requires, so a field belonging to one kind cannot leak into another
//! and the numeric constraints (non-negative speeds, positive deltas) are
//! carried by the types themselves.
//!
//! Envelopes are immutable after construction. [`Envelope::new`] validates
//! the addressing metadata (non-empty channel, positive message number);
//! payload content is judged by the transition function at apply time, so
//! a well-addressed envelope with an unacceptable payload is ingested and
//! then rejected as a failed transition.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The five recognized message kinds, by wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// `RocketLaunched`: initial launch or relaunch of a channel.
    Launched,
    /// `RocketSpeedIncreased`: speed goes up by a positive delta.
    SpeedIncreased,
    /// `RocketSpeedDecreased`: speed goes down by a positive delta,
    /// floored at zero.
    SpeedDecreased,
    /// `RocketExploded`: terminal until the next relaunch.
    Exploded,
    /// `RocketMissionChanged`: mission reassignment.
    MissionChanged,
}

impl MessageKind {
    /// The wire name of this kind, as it appears in `metadata.messageType`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Launched => "RocketLaunched",
            Self::SpeedIncreased => "RocketSpeedIncreased",
            Self::SpeedDecreased => "RocketSpeedDecreased",
            Self::Exploded => "RocketExploded",
            Self::MissionChanged => "RocketMissionChanged",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RocketLaunched" => Ok(Self::Launched),
            "RocketSpeedIncreased" => Ok(Self::SpeedIncreased),
            "RocketSpeedDecreased" => Ok(Self::SpeedDecreased),
            "RocketExploded" => Ok(Self::Exploded),
            "RocketMissionChanged" => Ok(Self::MissionChanged),
            other => Err(EnvelopeError::UnknownMessageType(other.to_string())),
        }
    }
}

/// Type-tagged message payload, one variant per [`MessageKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A launch (or relaunch) with the rocket's identity and initial speed.
    Launched {
        /// Rocket type, e.g. `"Falcon-9"`.
        rocket_type: String,
        /// Mission name, e.g. `"ARTEMIS"`.
        mission: String,
        /// Speed at launch.
        launch_speed: u32,
    },
    /// Speed increase by a positive delta.
    SpeedIncreased {
        /// Amount to add to the current speed.
        by: u32,
    },
    /// Speed decrease by a positive delta; the resulting speed floors at
    /// zero.
    SpeedDecreased {
        /// Amount to subtract from the current speed.
        by: u32,
    },
    /// The rocket exploded. Terminal until a relaunch.
    Exploded {
        /// Why it exploded, e.g. `"PRESSURE_VESSEL_FAILURE"`.
        reason: String,
    },
    /// The rocket was reassigned to a new mission.
    MissionChanged {
        /// The new mission name.
        new_mission: String,
    },
}

impl Payload {
    /// The [`MessageKind`] this payload belongs to.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::Launched { .. } => MessageKind::Launched,
            Self::SpeedIncreased { .. } => MessageKind::SpeedIncreased,
            Self::SpeedDecreased { .. } => MessageKind::SpeedDecreased,
            Self::Exploded { .. } => MessageKind::Exploded,
            Self::MissionChanged { .. } => MessageKind::MissionChanged,
        }
    }
}

/// Errors raised while constructing an [`Envelope`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The channel id was empty.
    #[error("channel must not be empty")]
    EmptyChannel,

    /// The message number was zero; numbering starts at 1.
    #[error("message number must be a positive integer")]
    ZeroMessageNumber,

    /// The `messageType` string names no known kind.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),
}

/// One state-change notification addressed to a single channel.
///
/// The producer numbers messages strictly increasing per channel; the
/// transport may duplicate and reorder them. `message_time` is the
/// producer's wall clock and is used only to stamp `updated_at` on the
/// rocket state, never for ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Channel id; identifies the rocket.
    pub channel: String,
    /// Position of this message in the channel's sequence, starting at 1.
    pub message_number: u64,
    /// Producer wall-clock timestamp.
    pub message_time: DateTime<Utc>,
    /// The type-tagged message content.
    pub payload: Payload,
}

impl Envelope {
    /// Builds an envelope, validating the addressing metadata.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::EmptyChannel`] when `channel` is empty and
    /// [`EnvelopeError::ZeroMessageNumber`] when `message_number` is 0.
    pub fn new(
        channel: impl Into<String>,
        message_number: u64,
        message_time: DateTime<Utc>,
        payload: Payload,
    ) -> Result<Self, EnvelopeError> {
        let channel = channel.into();
        if channel.is_empty() {
            return Err(EnvelopeError::EmptyChannel);
        }
        if message_number == 0 {
            return Err(EnvelopeError::ZeroMessageNumber);
        }

        Ok(Self {
            channel,
            message_number,
            message_time,
            payload,
        })
    }

    /// The [`MessageKind`] of this envelope's payload.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.payload.kind()
    }
}
