//! Typed requests written to the Boks write characteristic.
//!
//! Each [`Command`] maps to exactly one frame-building rule.  Fixed-width
//! text fields (the 8-character configuration key and the 6-character codes)
//! are validated here so a malformed argument fails before anything is sent.
//! Which characters a code may contain is the caller's concern; this layer
//! only insists on ASCII and the exact width.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::codec::{EncodeError, Frame};
use super::opcodes;

// ── Field widths ──────────────────────────────────────────────────────────────

/// Width of the configuration key in bytes.
pub const CONFIG_KEY_LEN: usize = 8;

/// Width of an access code in bytes.
pub const CODE_LEN: usize = 6;

/// Highest master code slot the firmware accepts on creation.
pub const MAX_MASTER_INDEX: u8 = 99;

/// `SetConfiguration` option that toggles Vigik badge support.
pub const OPTION_VIGIK: u8 = 0x01;

// ── Code types ────────────────────────────────────────────────────────────────

/// The three kinds of access codes a Boks stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeType {
    /// Permanent code stored in one of the numbered master slots.
    Master,
    /// Code that stops working after one opening.
    Single,
    /// Code that can be used a limited number of times.
    Multi,
}

impl CodeType {
    /// The creation opcode for this code type.
    pub fn create_opcode(self) -> u8 {
        match self {
            CodeType::Master => opcodes::CREATE_MASTER_CODE,
            CodeType::Single => opcodes::CREATE_SINGLE_USE_CODE,
            CodeType::Multi => opcodes::CREATE_MULTI_USE_CODE,
        }
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CodeType::Master => "master",
            CodeType::Single => "single",
            CodeType::Multi => "multi",
        })
    }
}

impl FromStr for CodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "master" => Ok(CodeType::Master),
            "single" => Ok(CodeType::Single),
            "multi" => Ok(CodeType::Multi),
            other => Err(format!("unknown code type '{other}' (expected master, single or multi)")),
        }
    }
}

// ── Reply kinds ───────────────────────────────────────────────────────────────

/// The kind of notification that answers a command.
///
/// The session uses this to resolve the caller waiting on a command.  Replies
/// carry no correlation id on the wire, so matching is by kind alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    DoorStatus,
    CodeOperationResult,
    CodesCount,
    ConfigurationApplied,
    LogsCount,
    EndOfHistory,
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// A request the controller can send to the box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Open the door with a 6-character code.  Sent without a checksum byte.
    OpenDoor { code: String },
    /// Ask whether the door is currently open.
    AskDoorStatus,
    /// Store a new access code.  `index` is the slot and is required for master codes.
    CreateCode {
        config_key: String,
        code: String,
        code_type: CodeType,
        index: Option<u8>,
    },
    /// Erase the master code stored in slot `index`.
    DeleteMasterCode { config_key: String, index: u8 },
    /// Write one configuration option.
    SetConfiguration {
        config_key: String,
        option_id: u8,
        value: u8,
    },
    /// Ask how many history entries are waiting.
    GetLogsCount,
    /// Start streaming the history entries.
    RequestLogs,
    /// Ask how many codes of each type are stored.
    CountCodes,
}

impl Command {
    /// Shorthand for the `SetConfiguration` that toggles Vigik badge support.
    pub fn set_vigik(config_key: impl Into<String>, enabled: bool) -> Self {
        Command::SetConfiguration {
            config_key: config_key.into(),
            option_id: OPTION_VIGIK,
            value: u8::from(enabled),
        }
    }

    /// The opcode this command is written with.
    pub fn opcode(&self) -> u8 {
        match self {
            Command::OpenDoor { .. } => opcodes::OPEN_DOOR,
            Command::AskDoorStatus => opcodes::ASK_DOOR_STATUS,
            Command::CreateCode { code_type, .. } => code_type.create_opcode(),
            Command::DeleteMasterCode { .. } => opcodes::DELETE_MASTER_CODE,
            Command::SetConfiguration { .. } => opcodes::SET_CONFIGURATION,
            Command::GetLogsCount => opcodes::GET_LOGS_COUNT,
            Command::RequestLogs => opcodes::REQUEST_LOGS,
            Command::CountCodes => opcodes::COUNT_CODES,
        }
    }

    /// The notification kind that completes this command.
    pub fn expected_reply(&self) -> ReplyKind {
        match self {
            Command::OpenDoor { .. } | Command::AskDoorStatus => ReplyKind::DoorStatus,
            Command::CreateCode { .. } | Command::DeleteMasterCode { .. } => {
                ReplyKind::CodeOperationResult
            }
            Command::SetConfiguration { .. } => ReplyKind::ConfigurationApplied,
            Command::GetLogsCount => ReplyKind::LogsCount,
            Command::RequestLogs => ReplyKind::EndOfHistory,
            Command::CountCodes => ReplyKind::CodesCount,
        }
    }

    /// Lays the command out as a frame.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::InvalidField`] when a key or code has the wrong
    /// width or contains non-ASCII characters, or when a master code has no
    /// slot index (or one above [`MAX_MASTER_INDEX`]).
    pub fn to_frame(&self) -> Result<Frame, EncodeError> {
        let mut payload = Vec::with_capacity(CONFIG_KEY_LEN + CODE_LEN + 1);

        match self {
            Command::OpenDoor { code } => {
                push_fixed(&mut payload, "code", code, CODE_LEN)?;
                return Frame::unchecked(self.opcode(), payload);
            }
            Command::CreateCode {
                config_key,
                code,
                code_type,
                index,
            } => {
                push_fixed(&mut payload, "config_key", config_key, CONFIG_KEY_LEN)?;
                push_fixed(&mut payload, "code", code, CODE_LEN)?;
                if *code_type == CodeType::Master {
                    let index = index.ok_or_else(|| EncodeError::InvalidField {
                        field: "index",
                        reason: "master codes need a slot index".to_string(),
                    })?;
                    if index > MAX_MASTER_INDEX {
                        return Err(EncodeError::InvalidField {
                            field: "index",
                            reason: format!("slot {index} is above {MAX_MASTER_INDEX}"),
                        });
                    }
                    payload.push(index);
                }
            }
            Command::DeleteMasterCode { config_key, index } => {
                push_fixed(&mut payload, "config_key", config_key, CONFIG_KEY_LEN)?;
                payload.push(*index);
            }
            Command::SetConfiguration {
                config_key,
                option_id,
                value,
            } => {
                push_fixed(&mut payload, "config_key", config_key, CONFIG_KEY_LEN)?;
                payload.push(*option_id);
                payload.push(*value);
            }
            Command::AskDoorStatus
            | Command::GetLogsCount
            | Command::RequestLogs
            | Command::CountCodes => {}
        }

        Frame::new(self.opcode(), payload)
    }

    /// Lays the command out and serialises it to wire bytes.
    ///
    /// # Errors
    ///
    /// See [`Command::to_frame`].
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        self.to_frame().map(|frame| frame.to_bytes())
    }
}

/// Appends `value` as exactly `width` ASCII bytes.
fn push_fixed(
    buf: &mut Vec<u8>,
    field: &'static str,
    value: &str,
    width: usize,
) -> Result<(), EncodeError> {
    if !value.is_ascii() {
        return Err(EncodeError::InvalidField {
            field,
            reason: "must be ASCII".to_string(),
        });
    }
    if value.len() != width {
        return Err(EncodeError::InvalidField {
            field,
            reason: format!("expected {width} characters, got {}", value.len()),
        });
    }
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::checksum;

    const KEY: &str = "ABCDEF12";

    fn assert_checksum_valid(bytes: &[u8]) {
        let (body, cs) = bytes.split_at(bytes.len() - 1);
        assert_eq!(cs[0], checksum(body), "trailing byte must be the body checksum");
    }

    #[test]
    fn test_get_logs_count_bytes() {
        assert_eq!(Command::GetLogsCount.encode().unwrap(), vec![0x07, 0x00, 0x07]);
    }

    #[test]
    fn test_request_logs_bytes() {
        assert_eq!(Command::RequestLogs.encode().unwrap(), vec![0x03, 0x00, 0x03]);
    }

    #[test]
    fn test_count_codes_bytes() {
        assert_eq!(Command::CountCodes.encode().unwrap(), vec![0x14, 0x00, 0x14]);
    }

    #[test]
    fn test_ask_door_status_bytes() {
        assert_eq!(Command::AskDoorStatus.encode().unwrap(), vec![0x02, 0x00, 0x02]);
    }

    #[test]
    fn test_open_door_layout() {
        // Arrange
        let cmd = Command::OpenDoor {
            code: "123456".to_string(),
        };

        // Act
        let bytes = cmd.encode().unwrap();

        // Assert
        assert_eq!(bytes.len(), 8);
        assert_eq!(bytes, vec![0x01, 0x06, b'1', b'2', b'3', b'4', b'5', b'6']);
    }

    #[test]
    fn test_create_master_code_layout() {
        // Arrange
        let cmd = Command::CreateCode {
            config_key: KEY.to_string(),
            code: "1234AB".to_string(),
            code_type: CodeType::Master,
            index: Some(3),
        };

        // Act
        let bytes = cmd.encode().unwrap();

        // Assert
        assert_eq!(bytes.len(), 18);
        assert_eq!(&bytes[..2], &[0x11, 0x0F]);
        assert_eq!(&bytes[2..10], KEY.as_bytes());
        assert_eq!(&bytes[10..16], b"1234AB");
        assert_eq!(bytes[16], 3);
        assert_checksum_valid(&bytes);
    }

    #[test]
    fn test_create_single_and_multi_code_layout() {
        for (code_type, opcode) in [(CodeType::Single, 0x12), (CodeType::Multi, 0x13)] {
            // Arrange
            let cmd = Command::CreateCode {
                config_key: KEY.to_string(),
                code: "654321".to_string(),
                code_type,
                index: Some(7),
            };

            // Act
            let bytes = cmd.encode().unwrap();

            // Assert: the index is not written for non-master codes
            assert_eq!(bytes.len(), 17);
            assert_eq!(&bytes[..2], &[opcode, 0x0E]);
            assert_eq!(&bytes[10..16], b"654321");
            assert_checksum_valid(&bytes);
        }
    }

    #[test]
    fn test_delete_master_code_layout() {
        let cmd = Command::DeleteMasterCode {
            config_key: KEY.to_string(),
            index: 200,
        };

        let bytes = cmd.encode().unwrap();

        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[..2], &[0x0C, 0x09]);
        assert_eq!(&bytes[2..10], KEY.as_bytes());
        assert_eq!(bytes[10], 200);
        assert_checksum_valid(&bytes);
    }

    #[test]
    fn test_set_vigik_layout() {
        let bytes = Command::set_vigik(KEY, true).encode().unwrap();

        assert_eq!(bytes.len(), 13);
        assert_eq!(&bytes[..2], &[0x16, 0x0A]);
        assert_eq!(&bytes[10..12], &[OPTION_VIGIK, 0x01]);
        assert_checksum_valid(&bytes);
    }

    #[test]
    fn test_short_code_is_rejected() {
        let err = Command::OpenDoor {
            code: "12345".to_string(),
        }
        .encode()
        .unwrap_err();

        assert!(matches!(err, EncodeError::InvalidField { field: "code", .. }));
    }

    #[test]
    fn test_non_ascii_key_is_rejected() {
        // Eight bytes, but not eight ASCII characters
        let err = Command::DeleteMasterCode {
            config_key: "ABCDEFé".to_string(),
            index: 0,
        }
        .encode()
        .unwrap_err();

        assert!(matches!(err, EncodeError::InvalidField { field: "config_key", .. }));
    }

    #[test]
    fn test_master_code_without_index_is_rejected() {
        let err = Command::CreateCode {
            config_key: KEY.to_string(),
            code: "123456".to_string(),
            code_type: CodeType::Master,
            index: None,
        }
        .encode()
        .unwrap_err();

        assert!(matches!(err, EncodeError::InvalidField { field: "index", .. }));
    }

    #[test]
    fn test_master_index_above_limit_is_rejected() {
        let err = Command::CreateCode {
            config_key: KEY.to_string(),
            code: "123456".to_string(),
            code_type: CodeType::Master,
            index: Some(100),
        }
        .encode()
        .unwrap_err();

        assert!(matches!(err, EncodeError::InvalidField { field: "index", .. }));
    }

    #[test]
    fn test_expected_replies() {
        assert_eq!(
            Command::OpenDoor { code: "123456".into() }.expected_reply(),
            ReplyKind::DoorStatus
        );
        assert_eq!(Command::AskDoorStatus.expected_reply(), ReplyKind::DoorStatus);
        assert_eq!(
            Command::DeleteMasterCode { config_key: KEY.into(), index: 0 }.expected_reply(),
            ReplyKind::CodeOperationResult
        );
        assert_eq!(Command::set_vigik(KEY, false).expected_reply(), ReplyKind::ConfigurationApplied);
        assert_eq!(Command::GetLogsCount.expected_reply(), ReplyKind::LogsCount);
        assert_eq!(Command::RequestLogs.expected_reply(), ReplyKind::EndOfHistory);
        assert_eq!(Command::CountCodes.expected_reply(), ReplyKind::CodesCount);
    }

    #[test]
    fn test_code_type_parses_case_insensitively() {
        assert_eq!("Master".parse::<CodeType>().unwrap(), CodeType::Master);
        assert_eq!("multi".parse::<CodeType>().unwrap(), CodeType::Multi);
        assert!("nfc".parse::<CodeType>().is_err());
    }

    #[test]
    fn test_command_serialises_with_tag() {
        let json = serde_json::to_value(Command::set_vigik(KEY, true)).unwrap();

        assert_eq!(json["command"], "set_configuration");
        assert_eq!(json["option_id"], 1);
    }
}
