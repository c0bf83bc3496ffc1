//! End-to-end reconciliation scenarios against the public registry
//! surface: ordered and reordered streams, duplicates, explosion
//! semantics, relaunch and bootstrapping.

use chrono::{DateTime, TimeZone, Utc};
use rockettrack_core::{Envelope, IngestOutcome, Payload, RocketRegistry};

fn stamp(number: u64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 14, 19, 39, 5).unwrap()
        + chrono::Duration::seconds(i64::try_from(number).unwrap())
}

fn at(number: u64, payload: Payload) -> Envelope {
    Envelope::new("R", number, stamp(number), payload).unwrap()
}

fn launched(number: u64, rocket_type: &str, mission: &str, speed: u32) -> Envelope {
    at(
        number,
        Payload::Launched {
            rocket_type: rocket_type.into(),
            mission: mission.into(),
            launch_speed: speed,
        },
    )
}

#[test]
fn ordered_happy_path() {
    let registry = RocketRegistry::new();
    assert!(registry.ingest(launched(1, "Falcon-9", "ARTEMIS", 500)).accepted());
    assert!(registry.ingest(at(2, Payload::SpeedIncreased { by: 100 })).accepted());
    assert!(registry
        .ingest(at(3, Payload::MissionChanged { new_mission: "SHUTTLE_MIR".into() }))
        .accepted());

    let rocket = registry.get("R").unwrap();
    assert_eq!(rocket.rocket_type, "Falcon-9");
    assert_eq!(rocket.speed, 600);
    assert_eq!(rocket.mission, "SHUTTLE_MIR");
    assert!(!rocket.exploded);

    let diag = registry.diagnostics("R");
    assert_eq!(diag.last_applied, 3);
    assert!(diag.pending_numbers.is_empty());
}

#[test]
fn reverse_arrival_converges_to_the_ordered_state() {
    let registry = RocketRegistry::new();
    assert!(registry.ingest(at(3, Payload::SpeedDecreased { by: 300 })).accepted());
    assert!(registry.ingest(launched(1, "Falcon-9", "ARTEMIS", 500)).accepted());
    assert!(registry.ingest(at(2, Payload::SpeedIncreased { by: 100 })).accepted());

    let rocket = registry.get("R").unwrap();
    assert_eq!(rocket.speed, 300);

    let diag = registry.diagnostics("R");
    assert_eq!(diag.last_applied, 3);
    assert!(diag.pending_numbers.is_empty());
}

#[test]
fn duplicate_after_apply_is_accepted_and_counted_once() {
    let registry = RocketRegistry::new();
    let launch = launched(1, "Falcon-9", "ARTEMIS", 500);
    assert!(registry.ingest(launch.clone()).accepted());
    assert!(registry.ingest(launch).accepted());

    let diag = registry.diagnostics("R");
    assert_eq!(diag.last_applied, 1);
    assert_eq!(diag.processed_count, 1);
}

#[test]
fn explosion_buries_buffered_messages() {
    let registry = RocketRegistry::new();
    assert!(registry.ingest(launched(1, "Falcon-9", "ARTEMIS", 500)).accepted());
    assert!(registry.ingest(at(5, Payload::SpeedIncreased { by: 50 })).accepted());
    assert!(registry.ingest(at(2, Payload::Exploded { reason: "X".into() })).accepted());

    let rocket = registry.get("R").unwrap();
    assert!(rocket.exploded);
    assert_eq!(rocket.reason, "X");
    assert_eq!(rocket.speed, 500, "buried speed change must not apply");

    let diag = registry.diagnostics("R");
    assert_eq!(diag.last_applied, 5, "cursor advances past the discarded buffer");
    assert!(diag.pending_numbers.is_empty());
}

#[test]
fn relaunch_after_explosion_preserves_created_at() {
    let registry = RocketRegistry::new();
    assert!(registry.ingest(launched(1, "Falcon-9", "ARTEMIS", 500)).accepted());
    let created_at = registry.get("R").unwrap().created_at;
    assert!(registry.ingest(at(5, Payload::SpeedIncreased { by: 50 })).accepted());
    assert!(registry.ingest(at(2, Payload::Exploded { reason: "X".into() })).accepted());

    assert_eq!(
        registry.ingest(launched(6, "Atlas", "LUNA", 800)),
        IngestOutcome::Applied
    );

    let rocket = registry.get("R").unwrap();
    assert!(!rocket.exploded);
    assert!(rocket.reason.is_empty());
    assert_eq!(rocket.rocket_type, "Atlas");
    assert_eq!(rocket.mission, "LUNA");
    assert_eq!(rocket.speed, 800);
    assert_eq!(rocket.created_at, created_at);
    assert_eq!(rocket.updated_at, stamp(6));
}

#[test]
fn bootstrapping_with_missing_first_message() {
    let registry = RocketRegistry::new();
    assert!(registry.ingest(at(2, Payload::SpeedIncreased { by: 100 })).accepted());
    assert!(registry.get("R").is_none());

    let diag = registry.diagnostics("R");
    assert_eq!(diag.processed_count, 0);
    assert_eq!(diag.pending_numbers, vec![2]);

    assert!(registry.ingest(launched(1, "Falcon-9", "ARTEMIS", 500)).accepted());

    let rocket = registry.get("R").unwrap();
    assert_eq!(rocket.speed, 600);
    assert_eq!(registry.diagnostics("R").last_applied, 2);
}

#[test]
fn cross_channel_interleaving_matches_isolated_runs() {
    let ordered = |registry: &RocketRegistry, channel: &str| {
        let mk = |number: u64, payload: Payload| {
            Envelope::new(channel, number, stamp(number), payload).unwrap()
        };
        registry.ingest(mk(
            1,
            Payload::Launched {
                rocket_type: "Falcon-9".into(),
                mission: "ARTEMIS".into(),
                launch_speed: 400,
            },
        ));
        registry.ingest(mk(2, Payload::SpeedIncreased { by: 10 }));
        registry.ingest(mk(3, Payload::SpeedDecreased { by: 5 }));
    };

    // Isolated runs, one registry per channel.
    let alone_a = RocketRegistry::new();
    ordered(&alone_a, "A");
    let alone_b = RocketRegistry::new();
    ordered(&alone_b, "B");

    // Interleaved run: round-robin the two sub-streams.
    let shared = RocketRegistry::new();
    let mk = |channel: &str, number: u64, payload: Payload| {
        Envelope::new(channel, number, stamp(number), payload).unwrap()
    };
    shared.ingest(mk(
        "A",
        1,
        Payload::Launched {
            rocket_type: "Falcon-9".into(),
            mission: "ARTEMIS".into(),
            launch_speed: 400,
        },
    ));
    shared.ingest(mk(
        "B",
        1,
        Payload::Launched {
            rocket_type: "Falcon-9".into(),
            mission: "ARTEMIS".into(),
            launch_speed: 400,
        },
    ));
    shared.ingest(mk("B", 2, Payload::SpeedIncreased { by: 10 }));
    shared.ingest(mk("A", 2, Payload::SpeedIncreased { by: 10 }));
    shared.ingest(mk("A", 3, Payload::SpeedDecreased { by: 5 }));
    shared.ingest(mk("B", 3, Payload::SpeedDecreased { by: 5 }));

    assert_eq!(shared.get("A"), alone_a.get("A"));
    assert_eq!(shared.get("B"), alone_b.get("B"));
}
