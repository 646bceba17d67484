//! Packet-log captures and their replay.
//!
//! A capture is plain text, one frame per line, as produced by the web
//! console's packet logger or typed by hand:
//!
//! ```text
//! # comments and blank lines are ignored
//! [10:01:02] TX: [GET_LOGS_COUNT] 07 00 07
//! [10:01:02] RX: [NOTIFY_LOGS_COUNT] 79 02 00 05 80 | count=5
//! 91 03 00 00 3C D0
//! ```
//!
//! Bracketed groups (timestamps, opcode names) and everything after a `|`
//! are dropped.  A `TX:` or `RX:` label gives the direction; unlabelled lines
//! are device notifications.
//!
//! Replay feeds the notifications, in order, into a real
//! [`BoksSession`] over the scripted transport, so log chaining and reply
//! matching behave exactly as they would against a box.  Frames the session
//! writes in response are recorded in the report.

use std::sync::Arc;
use std::time::Duration;

use boks_core::{BoksEvent, HistoryEntry};
use boks_session::{BoksSession, MockTransport, SessionConfig, SessionError, TransportError};
use thiserror::Error;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info};

/// How long replay waits for the session to process one notification.
const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

/// Upper bound on the wait for the session's own writes after the last frame.
const SETTLE_TIMEOUT: Duration = Duration::from_millis(500);

const SETTLE_POLL: Duration = Duration::from_millis(10);

/// Consecutive polls without a new write before the transport counts as idle.
const QUIET_POLLS: u32 = 3;

/// Who sent a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureDirection {
    /// Written by the controller.
    Tx,
    /// Notified by the box.
    Rx,
}

/// One frame read from a capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    /// 1-based line number in the capture text.
    pub line: usize,
    pub direction: CaptureDirection,
    pub bytes: Vec<u8>,
}

/// Error type for capture parsing.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The hex digits on a line could not be decoded.
    #[error("line {line}: invalid hex: {source}")]
    InvalidHex {
        line: usize,
        #[source]
        source: hex::FromHexError,
    },

    /// A labelled line carried no bytes.
    #[error("line {line}: no frame bytes")]
    EmptyFrame { line: usize },
}

/// Error type for capture replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The session produced no event for a notification.
    #[error("no event for the frame on line {line}")]
    Stalled { line: usize },
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Decodes hex digits, ignoring whitespace, commas and `0x` prefixes.
///
/// # Errors
///
/// Returns the `hex` error for odd digit counts or non-hex characters.
pub fn parse_frame_hex(text: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let digits: String = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(|token| {
            token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token)
        })
        .collect();
    hex::decode(digits)
}

/// Parses a whole capture.
///
/// # Errors
///
/// Returns the first line that cannot be read as a frame.
pub fn parse_capture(text: &str) -> Result<Vec<CapturedFrame>, CaptureError> {
    let mut frames = Vec::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let content = trimmed.split('|').next().unwrap_or_default();
        let content = strip_bracketed(content);
        let (direction, hex_part) = split_direction(content.trim());

        let bytes = parse_frame_hex(hex_part)
            .map_err(|source| CaptureError::InvalidHex { line, source })?;
        if bytes.is_empty() {
            return Err(CaptureError::EmptyFrame { line });
        }
        frames.push(CapturedFrame {
            line,
            direction,
            bytes,
        });
    }

    Ok(frames)
}

/// Removes every `[...]` group.
fn strip_bracketed(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn split_direction(text: &str) -> (CaptureDirection, &str) {
    let upper = text.get(..2).map(str::to_ascii_uppercase);
    let direction = match upper.as_deref() {
        Some("TX") => CaptureDirection::Tx,
        Some("RX") => CaptureDirection::Rx,
        _ => return (CaptureDirection::Rx, text),
    };
    let rest = &text[2..];
    match rest.strip_prefix(':') {
        Some(rest) => (direction, rest),
        // "TX 07 00 07" is labelled; "7902..." style hex is not
        None if rest.starts_with(char::is_whitespace) => (direction, rest),
        None => (CaptureDirection::Rx, text),
    }
}

// ── Replay ────────────────────────────────────────────────────────────────────

/// What a replay produced.
#[derive(Debug, Clone, Default)]
pub struct ReplayReport {
    /// One event per replayed notification, in order.
    pub events: Vec<BoksEvent>,
    /// Frames the session wrote on its own (automatic log requests).
    pub written: Vec<Vec<u8>>,
    /// Controller frames present in the capture but not replayed.
    pub skipped_tx: usize,
}

impl ReplayReport {
    /// The history entries among the events.
    pub fn history_entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.events.iter().filter_map(|event| match event {
            BoksEvent::History(entry) => Some(entry),
            _ => None,
        })
    }
}

/// Replays the notifications of `frames` through a fresh session.
///
/// # Errors
///
/// Returns [`ReplayError::Stalled`] if the session stops producing events,
/// or the session or transport error that interrupted the replay.
pub async fn replay(
    frames: &[CapturedFrame],
    config: SessionConfig,
) -> Result<ReplayReport, ReplayError> {
    let transport = Arc::new(MockTransport::new());
    let session = BoksSession::new(transport.clone(), config);
    session.connect().await?;
    let mut events = session.subscribe();

    let mut report = ReplayReport::default();
    for frame in frames {
        if frame.direction == CaptureDirection::Tx {
            report.skipped_tx += 1;
            continue;
        }
        debug!("replaying line {}", frame.line);
        transport.inject(frame.bytes.clone()).await?;
        match timeout(EVENT_TIMEOUT, events.recv()).await {
            Ok(Ok(event)) => report.events.push(event),
            Ok(Err(_)) | Err(_) => return Err(ReplayError::Stalled { line: frame.line }),
        }
    }

    report.written = settled_writes(&transport).await;
    session.disconnect().await?;

    info!(
        "replayed {} notifications ({} history entries)",
        report.events.len(),
        report.history_entries().count()
    );
    Ok(report)
}

/// Waits until the session stops writing, or [`SETTLE_TIMEOUT`] passes.
///
/// Automatic history requests are written from a spawned task, so they can
/// land after the event that caused them has been observed.
async fn settled_writes(transport: &MockTransport) -> Vec<Vec<u8>> {
    let deadline = Instant::now() + SETTLE_TIMEOUT;
    let mut written = transport.written();
    let mut quiet = 0;
    while quiet < QUIET_POLLS && Instant::now() < deadline {
        sleep(SETTLE_POLL).await;
        let latest = transport.written();
        if latest.len() == written.len() {
            quiet += 1;
        } else {
            quiet = 0;
            written = latest;
        }
    }
    written
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const CAPTURE: &str = "\
# capture from the web console
[10:01:02] TX: [GET_LOGS_COUNT] 07 00 07
[10:01:02] RX: [NOTIFY_LOGS_COUNT] 79 02 00 05 80 | count=5

RX 91 03 00 00 3C D0
9200 92
";

    #[test]
    fn test_parse_frame_hex_accepts_common_spellings() {
        assert_eq!(parse_frame_hex("07 00 07").unwrap(), vec![0x07, 0x00, 0x07]);
        assert_eq!(parse_frame_hex("070007").unwrap(), vec![0x07, 0x00, 0x07]);
        assert_eq!(parse_frame_hex("0x07, 0x00, 0x07").unwrap(), vec![0x07, 0x00, 0x07]);
    }

    #[test]
    fn test_parse_frame_hex_rejects_odd_digits() {
        assert!(parse_frame_hex("07 0").is_err());
    }

    #[test]
    fn test_parse_capture_reads_logger_lines() {
        // Act
        let frames = parse_capture(CAPTURE).unwrap();

        // Assert
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0].direction, CaptureDirection::Tx);
        assert_eq!(frames[0].line, 2);
        assert_eq!(frames[1].bytes, vec![0x79, 0x02, 0x00, 0x05, 0x80]);
        assert_eq!(frames[2].direction, CaptureDirection::Rx);
        assert_eq!(frames[3].bytes, vec![0x92, 0x00, 0x92]);
        assert_eq!(frames[3].line, 6);
    }

    #[test]
    fn test_parse_capture_reports_bad_line() {
        let result = parse_capture("07 00 07\nRX: 79 zz\n");

        assert!(matches!(result, Err(CaptureError::InvalidHex { line: 2, .. })));
    }

    #[test]
    fn test_parse_capture_rejects_label_without_bytes() {
        let result = parse_capture("TX: [OPEN_DOOR]\n");

        assert!(matches!(result, Err(CaptureError::EmptyFrame { line: 1 })));
    }

    #[tokio::test]
    async fn test_replay_produces_one_event_per_notification() {
        // Arrange
        let frames = parse_capture(CAPTURE).unwrap();

        // Act
        let report = replay(&frames, SessionConfig::default()).await.unwrap();

        // Assert
        assert_eq!(report.skipped_tx, 1);
        assert_eq!(report.events.len(), 3);
        assert_eq!(report.events[0], BoksEvent::LogsCount { count: 5 });
        assert_eq!(report.events[2], BoksEvent::EndOfHistory);
        let ages: Vec<u32> = report.history_entries().map(|e| e.age_seconds).collect();
        assert_eq!(ages, vec![60]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_replay_reports_the_automatic_history_request() {
        // Arrange: the box reports pending logs as the last frame
        let frames = parse_capture("RX: 79 02 00 05 80\n").unwrap();

        // Act
        let report = replay(&frames, SessionConfig::default()).await.unwrap();

        // Assert
        assert_eq!(report.events, vec![BoksEvent::LogsCount { count: 5 }]);
        assert_eq!(report.written, vec![vec![0x03, 0x00, 0x03]]);
    }

    #[tokio::test]
    async fn test_replay_survives_corrupted_frames() {
        // Arrange: bad checksum, then a valid logs count
        let frames = parse_capture("79 02 00 05 81\n79 02 00 00 7B\n").unwrap();
        let config = SessionConfig {
            auto_request_logs: false,
            ..SessionConfig::default()
        };

        // Act
        let report = replay(&frames, config).await.unwrap();

        // Assert
        assert!(matches!(report.events[0], BoksEvent::Malformed { opcode: Some(0x79), .. }));
        assert_eq!(report.events[1], BoksEvent::LogsCount { count: 0 });
        assert!(report.written.is_empty());
    }
}
