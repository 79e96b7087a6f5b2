use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use safety_sentinel::config::SentinelConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "SENTINEL_CONFIG",
        "SENTINEL_TARGET_FPS",
        "SENTINEL_ALERTS_PATH",
        "SENTINEL_FACE_SOURCE",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "cameras": [
            { "id": 0, "url": "stub://yard" },
            { "id": 3, "url": "stub://gate" }
        ],
        "target_fps": 15,
        "frame_queue_capacity": 80,
        "inference": {
            "batch_size": 8,
            "conf_threshold": 0.4,
            "iou_threshold": 0.5,
            "models": [
                { "name": "ppe", "path": "stub://ppe-demo" }
            ]
        },
        "tracker": {
            "track_buffer": 45,
            "match_threshold": 0.7
        },
        "violations": {
            "confirm_frames": 5,
            "cooldown_seconds": 30,
            "required_ppe": ["helmet"]
        },
        "face": {
            "source": "stub://amir",
            "accept_threshold": 0.6
        },
        "alerts": {
            "path": "yard_alerts.jsonl"
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("SENTINEL_CONFIG", file.path());
    std::env::set_var("SENTINEL_TARGET_FPS", "20");
    std::env::set_var("SENTINEL_ALERTS_PATH", "/tmp/override_alerts.jsonl");

    let cfg = SentinelConfig::load().expect("load config");

    assert_eq!(cfg.cameras.len(), 2);
    assert_eq!(cfg.cameras[1].id, 3);
    assert_eq!(cfg.cameras[1].url, "stub://gate");
    assert_eq!(cfg.target_fps, 20, "env overrides the file value");
    assert_eq!(cfg.frame_queue_capacity, 80);
    assert_eq!(cfg.batch_size, 8);
    assert_eq!(cfg.conf_threshold, 0.4);
    assert_eq!(cfg.iou_threshold, 0.5);
    assert_eq!(cfg.models.len(), 1);
    assert_eq!(
        cfg.tracker.track_threshold, 0.4,
        "track threshold follows conf_threshold when not set"
    );
    assert_eq!(cfg.tracker.track_buffer, 45);
    assert_eq!(cfg.tracker.match_threshold, 0.7);
    assert_eq!(cfg.violations.confirm_frames, 5);
    assert_eq!(cfg.violations.cooldown, Duration::from_secs(30));
    assert_eq!(cfg.violations.required_ppe, vec!["helmet"]);
    assert_eq!(cfg.face.source.as_deref(), Some("stub://amir"));
    assert_eq!(cfg.face.accept_threshold, 0.6);
    assert_eq!(
        cfg.alerts_path.to_str().unwrap(),
        "/tmp/override_alerts.jsonl",
        "env overrides the file value"
    );

    clear_env();
}

#[test]
fn missing_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SENTINEL_CONFIG", "/nonexistent/sentinel.json");
    assert!(SentinelConfig::load().is_err());

    clear_env();
}

#[test]
fn invalid_values_fail_validation() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{ "target_fps": 0 }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("SENTINEL_CONFIG", file.path());
    assert!(SentinelConfig::load().is_err());

    clear_env();
}
