//! Classification of inbound frames into typed events.
//!
//! Every frame received on the notify characteristic maps to exactly one
//! [`BoksEvent`].  Nothing here fails: a frame that cannot be interpreted
//! becomes [`BoksEvent::Malformed`] or [`BoksEvent::Unknown`], so a single
//! bad notification never interrupts the stream.
//!
//! Classification order matters for the history range: `END_HISTORY` (0x92)
//! sits inside 0x86–0xA2 and is checked before the generic history decoder.

use std::fmt;

use serde::Serialize;

use super::codec::{decode_frame, Frame};
use super::commands::ReplyKind;
use super::opcodes::{self, is_history_opcode, lookup, name_of};
use crate::telemetry::history::{decode_history_entry, HistoryEntry};

/// Why the box refused a command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// `ERROR_COMMAND_NOT_SUPPORTED` (0x80).
    NotSupported,
    /// `ERROR_CRC` (0xE0): the command checksum was wrong.
    BadChecksum,
    /// `ERROR_UNAUTHORIZED` (0xE1): the configuration key was refused.
    Unauthorized,
    /// `ERROR_BAD_REQUEST` (0xE2).
    BadRequest,
}

impl RejectionReason {
    fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            opcodes::ERROR_COMMAND_NOT_SUPPORTED => Some(RejectionReason::NotSupported),
            opcodes::ERROR_CRC => Some(RejectionReason::BadChecksum),
            opcodes::ERROR_UNAUTHORIZED => Some(RejectionReason::Unauthorized),
            opcodes::ERROR_BAD_REQUEST => Some(RejectionReason::BadRequest),
            _ => None,
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RejectionReason::NotSupported => "command not supported",
            RejectionReason::BadChecksum => "checksum rejected by device",
            RejectionReason::Unauthorized => "unauthorized",
            RejectionReason::BadRequest => "bad request",
        })
    }
}

/// A decoded notification from the box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BoksEvent {
    DoorStatus { open: bool },
    LogsCount { count: u16 },
    CodesCount {
        master: u16,
        single: u16,
        multi: Option<u16>,
    },
    CodeOperationResult { success: bool },
    ConfigurationApplied,
    /// A code typed at the box was accepted or refused.
    OpenCodeResult { valid: bool },
    History(HistoryEntry),
    EndOfHistory,
    CommandRejected { opcode: u8, reason: RejectionReason },
    /// A documented opcode with no dedicated decoder.
    Acknowledgement {
        opcode: u8,
        name: String,
        payload: Vec<u8>,
    },
    /// An opcode missing from the registry.
    Unknown { opcode: u8, raw: Vec<u8> },
    /// A frame that failed validation or whose payload could not be read.
    Malformed {
        opcode: Option<u8>,
        reason: String,
        raw: Vec<u8>,
    },
}

impl BoksEvent {
    /// The reply kind this event satisfies, if any.
    pub fn reply_kind(&self) -> Option<ReplyKind> {
        match self {
            BoksEvent::DoorStatus { .. } => Some(ReplyKind::DoorStatus),
            BoksEvent::LogsCount { .. } => Some(ReplyKind::LogsCount),
            BoksEvent::CodesCount { .. } => Some(ReplyKind::CodesCount),
            BoksEvent::CodeOperationResult { .. } => Some(ReplyKind::CodeOperationResult),
            BoksEvent::ConfigurationApplied => Some(ReplyKind::ConfigurationApplied),
            BoksEvent::EndOfHistory => Some(ReplyKind::EndOfHistory),
            _ => None,
        }
    }
}

/// Validates raw notification bytes and classifies them.
///
/// Decode failures are returned as [`BoksEvent::Malformed`] with the opcode
/// kept when it is known.
///
/// # Examples
///
/// ```rust
/// use boks_core::protocol::notifications::decode_notification;
/// use boks_core::BoksEvent;
///
/// let event = decode_notification(&[0x79, 0x02, 0x00, 0x05, 0x80]);
/// assert_eq!(event, BoksEvent::LogsCount { count: 5 });
/// ```
pub fn decode_notification(raw: &[u8]) -> BoksEvent {
    match decode_frame(raw) {
        Ok(frame) => classify_frame(&frame),
        Err(e) => BoksEvent::Malformed {
            opcode: e.opcode(),
            reason: e.to_string(),
            raw: raw.to_vec(),
        },
    }
}

/// Classifies a validated frame into exactly one event.
pub fn classify_frame(frame: &Frame) -> BoksEvent {
    let opcode = frame.opcode();
    let payload = frame.payload();

    if let Some(reason) = RejectionReason::from_opcode(opcode) {
        return BoksEvent::CommandRejected { opcode, reason };
    }

    match opcode {
        opcodes::NOTIFY_LOGS_COUNT => match read_u16(payload, 0) {
            Some(count) => BoksEvent::LogsCount { count },
            None => short_payload(frame, 2),
        },
        opcodes::NOTIFY_DOOR_STATUS | opcodes::ANSWER_DOOR_STATUS => match payload.get(1) {
            Some(&state) => BoksEvent::DoorStatus { open: state == 1 },
            None => short_payload(frame, 2),
        },
        // Fixed offsets: the declared length of 0xC3 is not the payload size
        opcodes::NOTIFY_CODES_COUNT => match (read_u16(payload, 0), read_u16(payload, 2)) {
            (Some(master), Some(single)) => BoksEvent::CodesCount {
                master,
                single,
                multi: read_u16(payload, 4),
            },
            _ => short_payload(frame, 4),
        },
        opcodes::CODE_OPERATION_SUCCESS => BoksEvent::CodeOperationResult { success: true },
        opcodes::CODE_OPERATION_ERROR => BoksEvent::CodeOperationResult { success: false },
        opcodes::NOTIFY_SET_CONFIGURATION_SUCCESS => BoksEvent::ConfigurationApplied,
        opcodes::VALID_OPEN_CODE => BoksEvent::OpenCodeResult { valid: true },
        opcodes::INVALID_OPEN_CODE => BoksEvent::OpenCodeResult { valid: false },
        opcodes::END_HISTORY => BoksEvent::EndOfHistory,
        op if is_history_opcode(op) => match decode_history_entry(op, payload) {
            Ok(entry) => BoksEvent::History(entry),
            Err(e) => BoksEvent::Malformed {
                opcode: Some(op),
                reason: e.to_string(),
                raw: frame.to_bytes(),
            },
        },
        op => match lookup(op) {
            Some(info) => BoksEvent::Acknowledgement {
                opcode: op,
                name: info.name.to_string(),
                payload: payload.to_vec(),
            },
            None => BoksEvent::Unknown {
                opcode: op,
                raw: frame.to_bytes(),
            },
        },
    }
}

fn read_u16(payload: &[u8], offset: usize) -> Option<u16> {
    payload
        .get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
}

fn short_payload(frame: &Frame, needed: usize) -> BoksEvent {
    BoksEvent::Malformed {
        opcode: Some(frame.opcode()),
        reason: format!(
            "{} payload too short: need {needed} bytes, got {}",
            name_of(frame.opcode()),
            frame.payload().len()
        ),
        raw: frame.to_bytes(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::encode_command;
    use crate::telemetry::history::HistoryDetail;

    fn notify(opcode: u8, payload: &[u8]) -> BoksEvent {
        decode_notification(&encode_command(opcode, payload).unwrap())
    }

    #[test]
    fn test_logs_count() {
        assert_eq!(notify(0x79, &[0x01, 0x2C]), BoksEvent::LogsCount { count: 300 });
    }

    #[test]
    fn test_door_status_reads_second_payload_byte() {
        assert_eq!(notify(0x84, &[0x00, 0x01]), BoksEvent::DoorStatus { open: true });
        assert_eq!(notify(0x85, &[0x01, 0x00]), BoksEvent::DoorStatus { open: false });
    }

    #[test]
    fn test_codes_count_with_quirky_length() {
        // Arrange: the firmware declares 7 for a 4-byte payload
        let frame = Frame::with_declared_len(0xC3, 0x07, vec![0x00, 0x02, 0x00, 0x05]).unwrap();

        // Act
        let event = decode_notification(&frame.to_bytes());

        // Assert
        assert_eq!(
            event,
            BoksEvent::CodesCount {
                master: 2,
                single: 5,
                multi: None
            }
        );
    }

    #[test]
    fn test_codes_count_with_multi() {
        let event = notify(0xC3, &[0x00, 0x01, 0x00, 0x02, 0x00, 0x03]);

        assert_eq!(
            event,
            BoksEvent::CodesCount {
                master: 1,
                single: 2,
                multi: Some(3)
            }
        );
    }

    #[test]
    fn test_code_operation_and_configuration_results() {
        assert_eq!(notify(0x77, &[]), BoksEvent::CodeOperationResult { success: true });
        assert_eq!(notify(0x78, &[]), BoksEvent::CodeOperationResult { success: false });
        assert_eq!(notify(0xC4, &[]), BoksEvent::ConfigurationApplied);
    }

    #[test]
    fn test_open_code_results() {
        assert_eq!(notify(0x81, &[]), BoksEvent::OpenCodeResult { valid: true });
        assert_eq!(notify(0x82, &[]), BoksEvent::OpenCodeResult { valid: false });
    }

    #[test]
    fn test_end_of_history_wins_over_history_range() {
        assert_eq!(notify(0x92, &[]), BoksEvent::EndOfHistory);
    }

    #[test]
    fn test_history_entry() {
        let event = notify(0x94, &[0x00, 0x00, 0x3C, 0x01]);

        match event {
            BoksEvent::History(entry) => {
                assert_eq!(entry.age_seconds, 60);
                assert!(matches!(entry.detail, HistoryDetail::PowerOff { .. }));
            }
            other => panic!("expected history entry, got {other:?}"),
        }
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            notify(0xE1, &[]),
            BoksEvent::CommandRejected {
                opcode: 0xE1,
                reason: RejectionReason::Unauthorized
            }
        );
        assert_eq!(
            notify(0x80, &[0x16]),
            BoksEvent::CommandRejected {
                opcode: 0x80,
                reason: RejectionReason::NotSupported
            }
        );
    }

    #[test]
    fn test_registered_opcode_without_decoder_is_acknowledgement() {
        let event = notify(0xB7, &[0x01, 0x02]);

        assert_eq!(
            event,
            BoksEvent::Acknowledgement {
                opcode: 0xB7,
                name: "NOTIFY_SCALE_MEASURE_WEIGHT".to_string(),
                payload: vec![0x01, 0x02],
            }
        );
    }

    #[test]
    fn test_unregistered_opcode_is_unknown() {
        let raw = encode_command(0x42, &[0xAA]).unwrap();

        assert_eq!(
            decode_notification(&raw),
            BoksEvent::Unknown { opcode: 0x42, raw }
        );
    }

    #[test]
    fn test_checksum_failure_is_malformed_with_opcode() {
        let event = decode_notification(&[0x79, 0x02, 0x00, 0x05, 0x00]);

        match event {
            BoksEvent::Malformed { opcode, raw, .. } => {
                assert_eq!(opcode, Some(0x79));
                assert_eq!(raw.len(), 5);
            }
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_short_known_payload_is_malformed() {
        let event = notify(0x79, &[0x05]);

        assert!(matches!(event, BoksEvent::Malformed { opcode: Some(0x79), .. }));
    }

    #[test]
    fn test_truncated_history_is_malformed() {
        let event = notify(0x91, &[0x00]);

        assert!(matches!(event, BoksEvent::Malformed { opcode: Some(0x91), .. }));
    }

    #[test]
    fn test_reply_kinds() {
        assert_eq!(BoksEvent::EndOfHistory.reply_kind(), Some(ReplyKind::EndOfHistory));
        assert_eq!(
            BoksEvent::OpenCodeResult { valid: true }.reply_kind(),
            None
        );
    }

    #[test]
    fn test_event_serialises_with_tag() {
        let json = serde_json::to_value(BoksEvent::LogsCount { count: 5 }).unwrap();

        assert_eq!(json["event"], "logs_count");
        assert_eq!(json["count"], 5);
    }
}
