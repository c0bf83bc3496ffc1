//! # rockettrack-core
//!
//! Per-channel reconciliation engine for rocket telemetry streams.
//!
//! Many independent rocket "channels" emit numbered state-change messages
//! with at-least-once delivery; the transport may reorder and duplicate
//! them. This crate rebuilds, for each channel, the deterministic latest
//! state of that rocket:
//!
//! - **deduplication**: a message number is applied at most once;
//! - **reordering**: out-of-order messages wait in a pending buffer until
//!   the channel cursor reaches them;
//! - **state transitions**: each in-order message drives a small state
//!   machine (launch, speed changes, mission changes, explosion);
//! - **terminal gating**: an exploded rocket accepts nothing but a
//!   relaunch.
//!
//! # Architecture
//!
//! ```text
//! Envelope --> RocketRegistry --> ChannelReconciler --> RocketState
//!              (locate/create)    (dedup, buffer,       (snapshot on
//!                                  apply, drain)          every read)
//! ```
//!
//! Ingress is synchronous end-to-end; the registry serializes writers
//! behind a coarse reader-writer lock and every query hands out a copy,
//! never a live reference.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use rockettrack_core::{Envelope, Payload, RocketRegistry};
//!
//! let registry = RocketRegistry::new();
//! let envelope = Envelope::new(
//!     "193270a9-c9cf-404a-8f83-838e71d9ae67",
//!     1,
//!     Utc::now(),
//!     Payload::Launched {
//!         rocket_type: "Falcon-9".into(),
//!         mission: "ARTEMIS".into(),
//!         launch_speed: 500,
//!     },
//! )
//! .expect("valid envelope");
//!
//! assert!(registry.ingest(envelope).accepted());
//! let rocket = registry.get("193270a9-c9cf-404a-8f83-838e71d9ae67").unwrap();
//! assert_eq!(rocket.speed, 500);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod envelope;
pub mod reconciler;
pub mod registry;
pub mod rocket;
mod transition;

pub use envelope::{Envelope, EnvelopeError, MessageKind, Payload};
pub use reconciler::{ChannelDiagnostics, ChannelReconciler, IngestOutcome, RejectReason};
pub use registry::{ChannelCursor, RocketRegistry};
pub use rocket::{RocketState, RocketSummary};
