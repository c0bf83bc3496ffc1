//! Rocket state value types.
//!
//! [`RocketState`] is the reduced state of one channel; it exists only
//! once an in-order `RocketLaunched` message has been applied, and from
//! then on is mutated exclusively by the channel's reconciler. Everything
//! handed out of the engine is a clone; callers never see the live state.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The reduced state of a single rocket channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RocketState {
    /// Channel id (unique rocket identifier).
    pub id: String,
    /// Rocket type, e.g. `"Falcon-9"`.
    #[serde(rename = "type")]
    pub rocket_type: String,
    /// Current mission.
    pub mission: String,
    /// Current speed. Never negative; decrements floor at zero.
    pub speed: u32,
    /// Whether the rocket has exploded. Terminal until relaunch.
    pub exploded: bool,
    /// Reason for the explosion. Empty exactly when `exploded` is false.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
    /// Time of the first accepted launch. Set once, survives relaunches.
    pub created_at: DateTime<Utc>,
    /// Time of the most recent accepted state change.
    pub updated_at: DateTime<Utc>,
    /// Reconciliation cursor: the largest settled message number. The
    /// reconciler owns the authoritative cursor and mirrors it here on
    /// every advance; not exposed in JSON.
    #[serde(skip)]
    pub last_applied: u64,
}

impl RocketState {
    /// Initial state from a first accepted launch.
    #[must_use]
    pub fn launched(
        id: impl Into<String>,
        rocket_type: impl Into<String>,
        mission: impl Into<String>,
        launch_speed: u32,
        launched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            rocket_type: rocket_type.into(),
            mission: mission.into(),
            speed: launch_speed,
            exploded: false,
            reason: String::new(),
            created_at: launched_at,
            updated_at: launched_at,
            last_applied: 0,
        }
    }
}

/// Listing shape for one rocket: the fields the list endpoint exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RocketSummary {
    /// Channel id.
    pub id: String,
    /// Rocket type.
    #[serde(rename = "type")]
    pub rocket_type: String,
    /// Current speed.
    pub speed: u32,
    /// Current mission.
    pub mission: String,
    /// Whether the rocket has exploded.
    pub exploded: bool,
    /// Time of the most recent accepted state change.
    pub updated_at: DateTime<Utc>,
}

impl From<&RocketState> for RocketSummary {
    fn from(state: &RocketState) -> Self {
        Self {
            id: state.id.clone(),
            rocket_type: state.rocket_type.clone(),
            speed: state.speed,
            mission: state.mission.clone(),
            exploded: state.exploded,
            updated_at: state.updated_at,
        }
    }
}
