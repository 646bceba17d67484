//! Integration tests for capture replay and the config file.

use boks_core::telemetry::history::HistoryDetail;
use boks_core::BoksEvent;
use boks_ctl::capture::{parse_capture, replay, CaptureDirection};
use boks_ctl::config::{self, AppConfig};
use boks_session::SessionConfig;

const HISTORY_DOWNLOAD: &str = include_str!("fixtures/history_download.log");

#[tokio::test]
async fn test_replay_of_logged_history_download() {
    // Arrange
    let frames = parse_capture(HISTORY_DOWNLOAD).expect("fixture parses");
    let config = SessionConfig {
        auto_request_logs: false,
        ..SessionConfig::default()
    };

    // Act
    let report = replay(&frames, config).await.expect("replay succeeds");

    // Assert
    assert_eq!(report.skipped_tx, 2);
    assert_eq!(report.events.first(), Some(&BoksEvent::LogsCount { count: 3 }));
    assert_eq!(report.events.last(), Some(&BoksEvent::EndOfHistory));

    let entries: Vec<_> = report.history_entries().collect();
    let ages: Vec<u32> = entries.iter().map(|e| e.age_seconds).collect();
    assert_eq!(ages, vec![180, 5, 60]);
    assert!(matches!(
        &entries[0].detail,
        HistoryDetail::CodeAttempt { code, valid: true, .. } if code == "123456"
    ));
    assert_eq!(entries[1].opcode_name, "POWER_OFF");
    assert!(report.written.is_empty(), "auto requests were disabled");
}

#[test]
fn test_fixture_directions() {
    let frames = parse_capture(HISTORY_DOWNLOAD).unwrap();

    let tx: Vec<usize> = frames
        .iter()
        .filter(|f| f.direction == CaptureDirection::Tx)
        .map(|f| f.line)
        .collect();

    assert_eq!(tx, vec![2, 4]);
    assert_eq!(frames.len(), 7);
}

#[test]
fn test_config_written_by_init_loads_back() {
    // Arrange
    let dir = std::env::temp_dir().join(format!("boks-ctl-it-{}", uuid::Uuid::new_v4()));
    let path = dir.join("nested").join("config.toml");

    // Act
    config::save(&path, &AppConfig::default()).expect("save");
    let text = std::fs::read_to_string(&path).expect("read back");
    let loaded = config::load(&path).expect("load");

    // Assert
    assert!(text.contains("[general]"));
    assert!(text.contains("[session]"));
    assert_eq!(loaded, AppConfig::default());
    let _ = std::fs::remove_dir_all(dir);
}
