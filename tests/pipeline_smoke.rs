//! End-to-end pipeline tests over synthetic sources and scripted model
//! sets: capture -> dispatch -> tracking/violation -> alert channel.

use std::time::Duration;

use safety_sentinel::config::{CameraFeed, ModelSpec, SentinelConfig};
use safety_sentinel::detect::backends::ScriptedBackend;
use safety_sentinel::detect::{Detection, ModelRegistry};
use safety_sentinel::faceid::open_identifier;
use safety_sentinel::{AlertKind, BBox, Pipeline};

const ALERT_WAIT: Duration = Duration::from_secs(5);

fn demo_config() -> SentinelConfig {
    SentinelConfig {
        cameras: vec![CameraFeed {
            id: 0,
            url: "stub://camera-0".to_string(),
        }],
        target_fps: 30,
        models: vec![ModelSpec {
            name: "scripted".to_string(),
            path: "stub://ppe-demo".to_string(),
        }],
        ..SentinelConfig::default()
    }
}

fn person() -> Detection {
    Detection::new(BBox::new(100.0, 80.0, 220.0, 400.0), 0.9, "person")
}

fn bare_person_registry() -> ModelRegistry {
    // Every frame: a person with no PPE anywhere near them.
    let mut registry = ModelRegistry::new();
    registry.register(Box::new(ScriptedBackend::looping(
        "scripted",
        vec![vec![person()]],
    )));
    registry
}

#[test]
fn missing_ppe_produces_a_confirmed_alert() {
    let pipeline = Pipeline::start(&demo_config(), bare_person_registry(), None).expect("start");

    let alert = pipeline
        .alerts()
        .recv_timeout(ALERT_WAIT)
        .expect("confirmed alert");
    assert_eq!(alert.kind, AlertKind::PpeViolation);
    assert_eq!(alert.camera_id, 0);
    assert!(alert.track_id.is_some());
    assert_eq!(alert.violations, vec!["missing-helmet", "missing-vest"]);

    pipeline.stop();
}

#[test]
fn face_identity_lands_in_the_alert() {
    let faceid = open_identifier("stub://amir", 0.5).expect("identifier");
    let pipeline =
        Pipeline::start(&demo_config(), bare_person_registry(), Some(faceid)).expect("start");

    let alert = pipeline
        .alerts()
        .recv_timeout(ALERT_WAIT)
        .expect("confirmed alert");
    assert_eq!(alert.person_name.as_deref(), Some("amir"));

    pipeline.stop();
}

#[test]
fn environmental_alerts_flood_across_stream_reopens() {
    // A finite source (2 frames per stream) forces the capture loop through
    // its end-of-stream reopen path while fire alerts keep flowing, one per
    // frame, with no suppression.
    let config = SentinelConfig {
        cameras: vec![CameraFeed {
            id: 1,
            url: "stub://camera-1?frames=2".to_string(),
        }],
        target_fps: 30,
        ..SentinelConfig::default()
    };

    let fire = Detection::new(BBox::new(400.0, 300.0, 500.0, 420.0), 0.7, "fire");
    let mut registry = ModelRegistry::new();
    registry.register(Box::new(ScriptedBackend::looping(
        "scripted",
        vec![vec![fire]],
    )));

    let pipeline = Pipeline::start(&config, registry, None).expect("start");

    for _ in 0..3 {
        let alert = pipeline
            .alerts()
            .recv_timeout(ALERT_WAIT)
            .expect("environmental alert");
        assert_eq!(alert.kind, AlertKind::Environmental);
        assert_eq!(alert.camera_id, 1);
        assert_eq!(alert.violations, vec!["fire"]);
        assert!(alert.track_id.is_none());
    }

    pipeline.stop();
}

#[test]
fn stop_joins_all_stages_promptly() {
    let pipeline = Pipeline::start(&demo_config(), bare_person_registry(), None).expect("start");

    // Let the stages spin up and move some frames first.
    std::thread::sleep(Duration::from_millis(200));
    pipeline.stop();
}
