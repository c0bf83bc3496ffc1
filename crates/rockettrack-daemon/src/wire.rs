//! The JSON wire envelope.
//!
//! Producers send messages as `{metadata: {...}, message: {...}}` where
//! the body is a single object whose populated fields depend on
//! `metadata.messageType`. This module deserializes that shape into a
//! struct-of-optionals and converts it into the typed core
//! [`Envelope`], validating per kind along the way: the conversion is
//! where a field belonging to the wrong kind simply has nowhere to go.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use rockettrack_core::{Envelope, EnvelopeError, MessageKind, Payload};

/// Errors raised while converting a wire message into an [`Envelope`].
///
/// Every variant names the offending field so the HTTP layer can produce
/// a pointed validation response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// A metadata field is missing or unacceptable.
    #[error("invalid {field}: {message}")]
    InvalidMetadata {
        /// The metadata field, in wire spelling.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// A body field required by the message kind is missing or empty.
    #[error("{field} is required for {kind}")]
    MissingField {
        /// The body field, in wire spelling.
        field: &'static str,
        /// The kind that requires it.
        kind: MessageKind,
    },

    /// A body field is present but fails its in-kind check.
    #[error("invalid {field}: {message}")]
    InvalidField {
        /// The body field, in wire spelling.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

impl WireError {
    /// The wire spelling of the field this error is about.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::InvalidMetadata { field, .. }
            | Self::MissingField { field, .. }
            | Self::InvalidField { field, .. } => *field,
        }
    }
}

impl From<EnvelopeError> for WireError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::EmptyChannel => Self::InvalidMetadata {
                field: "channel",
                message: "channel is required".to_string(),
            },
            EnvelopeError::ZeroMessageNumber => Self::InvalidMetadata {
                field: "messageNumber",
                message: "messageNumber must be a positive integer".to_string(),
            },
            EnvelopeError::UnknownMessageType(raw) => Self::InvalidMetadata {
                field: "messageType",
                message: format!("unknown message type: {raw}"),
            },
        }
    }
}

/// Addressing metadata of a wire message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMetadata {
    /// Channel id.
    pub channel: String,
    /// Message number within the channel.
    pub message_number: i64,
    /// Producer wall-clock timestamp.
    pub message_time: DateTime<Utc>,
    /// Wire name of the message kind.
    pub message_type: String,
}

/// Wire message body: every kind's fields, all optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBody {
    /// Rocket type (`RocketLaunched`).
    #[serde(rename = "type")]
    pub rocket_type: Option<String>,
    /// Launch speed (`RocketLaunched`). Defaults to 0 when omitted.
    pub launch_speed: Option<i64>,
    /// Mission (`RocketLaunched`).
    pub mission: Option<String>,
    /// Speed delta (`RocketSpeedIncreased` / `RocketSpeedDecreased`).
    pub by: Option<i64>,
    /// Explosion reason (`RocketExploded`).
    pub reason: Option<String>,
    /// New mission (`RocketMissionChanged`).
    pub new_mission: Option<String>,
}

/// A complete wire message as posted to the ingest endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    /// Addressing metadata.
    pub metadata: WireMetadata,
    /// Kind-dependent body.
    pub message: WireBody,
}

impl WireMessage {
    /// Converts the wire shape into a typed [`Envelope`].
    ///
    /// # Errors
    ///
    /// Returns a [`WireError`] naming the first field that fails
    /// validation for the declared message kind.
    pub fn into_envelope(self) -> Result<Envelope, WireError> {
        let kind: MessageKind = self.metadata.message_type.parse::<MessageKind>()?;

        let message_number = u64::try_from(self.metadata.message_number).map_err(|_| {
            WireError::InvalidMetadata {
                field: "messageNumber",
                message: "messageNumber must be a positive integer".to_string(),
            }
        })?;

        let payload = self.message.into_payload(kind)?;
        Envelope::new(
            self.metadata.channel,
            message_number,
            self.metadata.message_time,
            payload,
        )
        .map_err(WireError::from)
    }
}

impl WireBody {
    fn into_payload(self, kind: MessageKind) -> Result<Payload, WireError> {
        match kind {
            MessageKind::Launched => {
                let rocket_type = require_non_empty(self.rocket_type, "type", kind)?;
                let mission = require_non_empty(self.mission, "mission", kind)?;
                let launch_speed = non_negative(self.launch_speed.unwrap_or(0), "launchSpeed")?;
                Ok(Payload::Launched {
                    rocket_type,
                    mission,
                    launch_speed,
                })
            },
            MessageKind::SpeedIncreased => {
                let by = positive(self.by.unwrap_or(0), "by")?;
                Ok(Payload::SpeedIncreased { by })
            },
            MessageKind::SpeedDecreased => {
                let by = positive(self.by.unwrap_or(0), "by")?;
                Ok(Payload::SpeedDecreased { by })
            },
            MessageKind::Exploded => {
                let reason = require_non_empty(self.reason, "reason", kind)?;
                Ok(Payload::Exploded { reason })
            },
            MessageKind::MissionChanged => {
                let new_mission = require_non_empty(self.new_mission, "newMission", kind)?;
                Ok(Payload::MissionChanged { new_mission })
            },
        }
    }
}

fn require_non_empty(
    value: Option<String>,
    field: &'static str,
    kind: MessageKind,
) -> Result<String, WireError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(WireError::MissingField { field, kind }),
    }
}

fn non_negative(value: i64, field: &'static str) -> Result<u32, WireError> {
    u32::try_from(value).map_err(|_| WireError::InvalidField {
        field,
        message: format!("{field} must be a non-negative integer"),
    })
}

fn positive(value: i64, field: &'static str) -> Result<u32, WireError> {
    match u32::try_from(value) {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(WireError::InvalidField {
            field,
            message: format!("{field} must be a positive integer"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Envelope, WireError> {
        serde_json::from_str::<WireMessage>(json)
            .expect("well-formed JSON")
            .into_envelope()
    }

    #[test]
    fn test_launched_message_decodes() {
        let envelope = parse(
            r#"{
                "metadata": {
                    "channel": "193270a9-c9cf-404a-8f83-838e71d9ae67",
                    "messageNumber": 1,
                    "messageTime": "2024-03-14T19:39:05.86337+01:00",
                    "messageType": "RocketLaunched"
                },
                "message": {
                    "type": "Falcon-9",
                    "launchSpeed": 500,
                    "mission": "ARTEMIS"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(envelope.channel, "193270a9-c9cf-404a-8f83-838e71d9ae67");
        assert_eq!(envelope.message_number, 1);
        assert_eq!(envelope.payload, Payload::Launched {
            rocket_type: "Falcon-9".into(),
            mission: "ARTEMIS".into(),
            launch_speed: 500,
        });
    }

    #[test]
    fn test_fields_of_other_kinds_are_ignored() {
        // A speed change carrying launch fields: the tagged payload only
        // picks up what its kind declares.
        let envelope = parse(
            r#"{
                "metadata": {
                    "channel": "c-1",
                    "messageNumber": 2,
                    "messageTime": "2024-03-14T19:39:05Z",
                    "messageType": "RocketSpeedIncreased"
                },
                "message": {
                    "by": 3000,
                    "type": "Falcon-9",
                    "mission": "ARTEMIS"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(envelope.payload, Payload::SpeedIncreased { by: 3000 });
    }

    #[test]
    fn test_unknown_message_type() {
        let err = parse(
            r#"{
                "metadata": {
                    "channel": "c-1",
                    "messageNumber": 1,
                    "messageTime": "2024-03-14T19:39:05Z",
                    "messageType": "RocketTeleported"
                },
                "message": {}
            }"#,
        )
        .unwrap_err();
        assert_eq!(err.field(), "messageType");
    }

    #[test]
    fn test_non_positive_message_number() {
        for number in ["0", "-3"] {
            let err = parse(&format!(
                r#"{{
                    "metadata": {{
                        "channel": "c-1",
                        "messageNumber": {number},
                        "messageTime": "2024-03-14T19:39:05Z",
                        "messageType": "RocketExploded"
                    }},
                    "message": {{"reason": "X"}}
                }}"#,
            ))
            .unwrap_err();
            assert_eq!(err.field(), "messageNumber");
        }
    }

    #[test]
    fn test_empty_channel() {
        let err = parse(
            r#"{
                "metadata": {
                    "channel": "",
                    "messageNumber": 1,
                    "messageTime": "2024-03-14T19:39:05Z",
                    "messageType": "RocketExploded"
                },
                "message": {"reason": "X"}
            }"#,
        )
        .unwrap_err();
        assert_eq!(err.field(), "channel");
    }

    #[test]
    fn test_launch_requires_type_and_mission() {
        let err = parse(
            r#"{
                "metadata": {
                    "channel": "c-1",
                    "messageNumber": 1,
                    "messageTime": "2024-03-14T19:39:05Z",
                    "messageType": "RocketLaunched"
                },
                "message": {"mission": "ARTEMIS"}
            }"#,
        )
        .unwrap_err();
        assert_eq!(err, WireError::MissingField {
            field: "type",
            kind: MessageKind::Launched,
        });

        let err = parse(
            r#"{
                "metadata": {
                    "channel": "c-1",
                    "messageNumber": 1,
                    "messageTime": "2024-03-14T19:39:05Z",
                    "messageType": "RocketLaunched"
                },
                "message": {"type": "Falcon-9", "mission": ""}
            }"#,
        )
        .unwrap_err();
        assert_eq!(err.field(), "mission");
    }

    #[test]
    fn test_launch_speed_must_not_be_negative() {
        let err = parse(
            r#"{
                "metadata": {
                    "channel": "c-1",
                    "messageNumber": 1,
                    "messageTime": "2024-03-14T19:39:05Z",
                    "messageType": "RocketLaunched"
                },
                "message": {"type": "Falcon-9", "mission": "ARTEMIS", "launchSpeed": -10}
            }"#,
        )
        .unwrap_err();
        assert_eq!(err.field(), "launchSpeed");
    }

    #[test]
    fn test_speed_delta_must_be_positive() {
        for (kind, by) in [
            ("RocketSpeedIncreased", "0"),
            ("RocketSpeedIncreased", "-5"),
            ("RocketSpeedDecreased", "0"),
        ] {
            let err = parse(&format!(
                r#"{{
                    "metadata": {{
                        "channel": "c-1",
                        "messageNumber": 2,
                        "messageTime": "2024-03-14T19:39:05Z",
                        "messageType": "{kind}"
                    }},
                    "message": {{"by": {by}}}
                }}"#,
            ))
            .unwrap_err();
            assert_eq!(err.field(), "by");
        }
    }

    #[test]
    fn test_missing_delta_is_reported_as_invalid() {
        let err = parse(
            r#"{
                "metadata": {
                    "channel": "c-1",
                    "messageNumber": 2,
                    "messageTime": "2024-03-14T19:39:05Z",
                    "messageType": "RocketSpeedIncreased"
                },
                "message": {}
            }"#,
        )
        .unwrap_err();
        assert_eq!(err.field(), "by");
    }
}
