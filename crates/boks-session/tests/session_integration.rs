//! Integration tests for the protocol session.
//!
//! A scripted transport plays the part of the box firmware so the whole
//! command → notification → log chaining path runs through the public API.

use std::sync::Arc;
use std::time::Duration;

use boks_core::protocol::{encode_command, opcodes};
use boks_core::telemetry::history::HistoryDetail;
use boks_core::BoksEvent;
use boks_session::{BoksSession, MockTransport, SessionConfig, SessionError, SessionState};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

/// One history frame: a BLE code entry with the given age and code.
fn code_entry(age: u32, code: &str) -> Vec<u8> {
    let mut payload = age.to_be_bytes()[1..].to_vec();
    payload.extend_from_slice(code.as_bytes());
    payload.extend_from_slice(&[0u8; 6]);
    encode_command(opcodes::CODE_BLE_VALID_HISTORY, &payload).unwrap()
}

/// Firmware that stores `entries` and answers the log commands.
fn firmware(entries: Vec<Vec<u8>>, send_end: bool) -> MockTransport {
    MockTransport::new().with_responder(move |frame| match frame[0] {
        opcodes::GET_LOGS_COUNT => {
            let count = entries.len() as u16;
            vec![encode_command(opcodes::NOTIFY_LOGS_COUNT, &count.to_be_bytes()).unwrap()]
        }
        opcodes::REQUEST_LOGS => {
            let mut frames = entries.clone();
            if send_end {
                frames.push(encode_command(opcodes::END_HISTORY, &[]).unwrap());
            }
            frames
        }
        _ => Vec::new(),
    })
}

#[tokio::test]
async fn test_log_chain_collects_entries_in_order() {
    // Arrange
    let entries = vec![
        code_entry(180, "123456"),
        code_entry(120, "AB1234"),
        encode_command(0x91, &[0x00, 0x00, 0x3C]).unwrap(),
        encode_command(0x90, &[0x00, 0x00, 0x1E]).unwrap(),
        encode_command(opcodes::POWER_OFF, &[0x00, 0x00, 0x05, 0x03]).unwrap(),
    ];
    let transport = Arc::new(firmware(entries, true));
    let session = BoksSession::new(transport.clone(), SessionConfig::default());
    session.connect().await.unwrap();

    // Act
    let history = timeout(WAIT, session.fetch_history().await.unwrap())
        .await
        .expect("history must complete")
        .unwrap();

    // Assert
    let ages: Vec<u32> = history.iter().map(|e| e.age_seconds).collect();
    assert_eq!(ages, vec![180, 120, 60, 30, 5]);
    assert!(matches!(
        &history[0].detail,
        HistoryDetail::CodeAttempt { code, valid: true, .. } if code == "123456"
    ));
    assert_eq!(history[2].opcode_name, "DOOR_OPEN_HISTORY");
    assert_eq!(
        transport.written(),
        vec![vec![0x07, 0x00, 0x07], vec![0x03, 0x00, 0x03]],
        "the session must request the logs on its own"
    );
    assert_eq!(session.state(), SessionState::Connected);
}

#[tokio::test]
async fn test_logs_count_frame_from_the_wire_triggers_request() {
    // Arrange: the exact frame the firmware sends for five pending entries
    let transport = Arc::new(MockTransport::new().with_responder(|frame| {
        if frame[0] == opcodes::GET_LOGS_COUNT {
            vec![vec![0x79, 0x02, 0x00, 0x05, 0x80]]
        } else {
            Vec::new()
        }
    }));
    let session = BoksSession::new(transport.clone(), SessionConfig::default());
    session.connect().await.unwrap();

    // Act
    let reply = session.get_logs_count().await.unwrap();
    let event = timeout(WAIT, reply).await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Assert
    assert_eq!(event, BoksEvent::LogsCount { count: 5 });
    assert_eq!(transport.written().last(), Some(&vec![0x03, 0x00, 0x03]));
}

#[tokio::test]
async fn test_await_history_attaches_to_next_download() {
    let transport = Arc::new(firmware(vec![code_entry(10, "000000")], true));
    let session = BoksSession::new(transport, SessionConfig::default());
    session.connect().await.unwrap();

    let retrieval = session.await_history();
    session.get_logs_count().await.unwrap();
    let history = timeout(WAIT, retrieval).await.unwrap().unwrap();

    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_disconnect_during_retrieval_is_connection_lost() {
    // Arrange: the firmware streams one entry and never ends the history
    let transport = Arc::new(firmware(vec![code_entry(42, "654321")], false));
    let session = BoksSession::new(transport.clone(), SessionConfig::default());
    session.connect().await.unwrap();
    let mut events = session.subscribe();
    let retrieval = session.fetch_history().await.unwrap();

    // Act: wait for the entry, then drop the link mid-download
    loop {
        let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
        if matches!(event, BoksEvent::History(_)) {
            break;
        }
    }
    transport.drop_link().await;

    // Assert
    let result = timeout(WAIT, retrieval).await.expect("retrieval must not hang");
    assert_eq!(result, Err(SessionError::ConnectionLost));
    let mut state = session.watch_state();
    timeout(WAIT, state.wait_for(|s| *s == SessionState::Disconnected))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_history_download_survives_reconnect() {
    // Arrange
    let transport = Arc::new(firmware(vec![code_entry(7, "111111")], true));
    let session = BoksSession::new(transport.clone(), SessionConfig::default());
    session.connect().await.unwrap();
    session.disconnect().await.unwrap();

    // Act
    session.connect().await.unwrap();
    let history = timeout(WAIT, session.fetch_history().await.unwrap())
        .await
        .unwrap()
        .unwrap();

    // Assert
    assert_eq!(history.len(), 1);
    assert_eq!(transport.connect_calls(), 2);
}

#[tokio::test]
async fn test_commands_fail_after_disconnect() {
    let transport = Arc::new(MockTransport::new());
    let session = BoksSession::new(transport, SessionConfig::default());
    session.connect().await.unwrap();
    session.disconnect().await.unwrap();

    let result = session.count_codes().await;

    assert!(matches!(result, Err(SessionError::NotConnected)));
    assert!(matches!(
        session.fetch_history().await,
        Err(SessionError::NotConnected)
    ));
}
