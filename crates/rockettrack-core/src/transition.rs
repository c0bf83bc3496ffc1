//! The rocket state machine.
//!
//! [`apply`] is the single transition function: given the channel's
//! current state (possibly not yet materialized) and one envelope, it
//! either applies the message and returns `true`, or leaves the state
//! untouched and returns `false`. The boolean, not the state, is the
//! authoritative outcome; the reconciler advances its cursor only on
//! `true`.
//!
//! The terminal gate lives here and nowhere else: an exploded rocket
//! accepts no message other than a relaunch.

use crate::envelope::{Envelope, MessageKind, Payload};
use crate::rocket::RocketState;

/// Applies one in-order message to the channel state.
///
/// Returns `true` iff the message was accepted. On acceptance the state is
/// mutated (or materialized, for a first launch) and `updated_at` is
/// stamped with the envelope's `message_time`. On rejection the state is
/// left exactly as it was.
pub(crate) fn apply(state: &mut Option<RocketState>, envelope: &Envelope) -> bool {
    // Terminal gate: nothing but a relaunch touches an exploded rocket.
    if let Some(rocket) = state {
        if rocket.exploded && envelope.kind() != MessageKind::Launched {
            return false;
        }
    }

    match &envelope.payload {
        Payload::Launched {
            rocket_type,
            mission,
            launch_speed,
        } => {
            if rocket_type.is_empty() || mission.is_empty() {
                return false;
            }
            match state {
                // Relaunch (or identity reset): every operational field is
                // reset, `created_at` survives.
                Some(rocket) => {
                    rocket.rocket_type.clone_from(rocket_type);
                    rocket.mission.clone_from(mission);
                    rocket.speed = *launch_speed;
                    rocket.exploded = false;
                    rocket.reason.clear();
                    rocket.updated_at = envelope.message_time;
                },
                None => {
                    *state = Some(RocketState::launched(
                        envelope.channel.clone(),
                        rocket_type.as_str(),
                        mission.as_str(),
                        *launch_speed,
                        envelope.message_time,
                    ));
                },
            }
            true
        },

        Payload::SpeedIncreased { by } => {
            let Some(rocket) = state else { return false };
            if *by == 0 {
                return false;
            }
            rocket.speed = rocket.speed.saturating_add(*by);
            rocket.updated_at = envelope.message_time;
            true
        },

        Payload::SpeedDecreased { by } => {
            let Some(rocket) = state else { return false };
            if *by == 0 {
                return false;
            }
            // Flooring at zero is deliberate: a decrement larger than the
            // current speed is valid data, not an error.
            rocket.speed = rocket.speed.saturating_sub(*by);
            rocket.updated_at = envelope.message_time;
            true
        },

        Payload::Exploded { reason } => {
            let Some(rocket) = state else { return false };
            if reason.is_empty() {
                return false;
            }
            rocket.exploded = true;
            rocket.reason.clone_from(reason);
            rocket.updated_at = envelope.message_time;
            true
        },

        Payload::MissionChanged { new_mission } => {
            let Some(rocket) = state else { return false };
            if new_mission.is_empty() {
                return false;
            }
            rocket.mission.clone_from(new_mission);
            rocket.updated_at = envelope.message_time;
            true
        },
    }
}
