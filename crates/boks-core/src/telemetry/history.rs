//! History log entry decoding.
//!
//! After `REQUEST_LOGS` the box streams one frame per stored event, opcodes
//! 0x86–0xA2, and finishes with `END_HISTORY` (0x92).  Every entry payload
//! starts with a 24-bit big-endian age in seconds; a few opcodes append an
//! extension:
//!
//! ```text
//! payload offset  0..3   age (u24 BE)
//!                 3..9   6 ASCII code characters   (0x86, 0x87, 0x88, 0x89)
//!                 3      power-off reason          (0x94)
//!                 3      error code                (0xA0)
//! ```
//!
//! Payload offsets are relative to the frame payload, so payload offset 0 is
//! frame byte 2.  Bytes past the described fields are ignored.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::opcodes::{self, name_of};

const AGE_LEN: usize = 3;
const CODE_LEN: usize = 6;

/// Errors raised while decoding a history entry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// The payload is shorter than the 3-byte age every entry starts with.
    #[error("truncated history entry 0x{opcode:02X}: need {AGE_LEN} bytes, got {available}")]
    Truncated { opcode: u8, available: usize },
}

/// Whether a code was typed on the keypad or sent over BLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeOrigin {
    Ble,
    Keypad,
}

/// Why the box powered off, as recorded in a `POWER_OFF` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerOffReason {
    PinReset,
    Watchdog,
    SoftReset,
    Lockup,
    Gpio,
    Lpcomp,
    Debug,
    Nfc,
    /// A reason code with no documented meaning.
    Other(u8),
}

impl From<u8> for PowerOffReason {
    fn from(value: u8) -> Self {
        match value {
            1 => PowerOffReason::PinReset,
            2 => PowerOffReason::Watchdog,
            3 => PowerOffReason::SoftReset,
            4 => PowerOffReason::Lockup,
            5 => PowerOffReason::Gpio,
            6 => PowerOffReason::Lpcomp,
            7 => PowerOffReason::Debug,
            8 => PowerOffReason::Nfc,
            other => PowerOffReason::Other(other),
        }
    }
}

impl fmt::Display for PowerOffReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerOffReason::PinReset => f.write_str("PIN_RESET"),
            PowerOffReason::Watchdog => f.write_str("WATCHDOG"),
            PowerOffReason::SoftReset => f.write_str("SOFT_RESET"),
            PowerOffReason::Lockup => f.write_str("LOCKUP"),
            PowerOffReason::Gpio => f.write_str("GPIO"),
            PowerOffReason::Lpcomp => f.write_str("LPCOMP"),
            PowerOffReason::Debug => f.write_str("DEBUG"),
            PowerOffReason::Nfc => f.write_str("NFC"),
            PowerOffReason::Other(code) => write!(f, "{code}"),
        }
    }
}

/// Opcode-specific data carried after the age.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoryDetail {
    /// Age only, or an extension that was not present.
    None,
    /// A code was tried at the box.
    CodeAttempt {
        origin: CodeOrigin,
        valid: bool,
        code: String,
    },
    PowerOff { reason: PowerOffReason },
    Error { code: u8 },
}

/// One decoded history log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub opcode: u8,
    pub opcode_name: String,
    /// Seconds elapsed between the event and the download.
    pub age_seconds: u32,
    pub detail: HistoryDetail,
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} age={}s", self.opcode_name, self.age_seconds)?;
        match &self.detail {
            HistoryDetail::None => Ok(()),
            HistoryDetail::CodeAttempt { code, .. } => write!(f, " code=\"{code}\""),
            HistoryDetail::PowerOff { reason } => write!(f, " reason={reason}"),
            HistoryDetail::Error { code } => write!(f, " error_code={code}"),
        }
    }
}

/// Decodes the payload of a history frame.
///
/// # Errors
///
/// Returns [`HistoryError::Truncated`] when the payload cannot hold the age.
/// A missing extension is not an error; the detail is left as
/// [`HistoryDetail::None`].
///
/// # Examples
///
/// ```rust
/// use boks_core::decode_history_entry;
///
/// let entry = decode_history_entry(0x91, &[0x00, 0x00, 0x3C]).unwrap();
/// assert_eq!(entry.opcode_name, "DOOR_OPEN_HISTORY");
/// assert_eq!(entry.age_seconds, 60);
/// ```
pub fn decode_history_entry(opcode: u8, payload: &[u8]) -> Result<HistoryEntry, HistoryError> {
    let age_seconds = match *payload {
        [a, b, c, ..] => u32::from_be_bytes([0, a, b, c]),
        _ => {
            return Err(HistoryError::Truncated {
                opcode,
                available: payload.len(),
            })
        }
    };
    let extension = &payload[AGE_LEN..];

    let detail = match opcode {
        opcodes::CODE_BLE_VALID_HISTORY
        | opcodes::CODE_KEY_VALID_HISTORY
        | opcodes::CODE_BLE_INVALID_HISTORY
        | opcodes::CODE_KEY_INVALID_HISTORY => match extension.get(..CODE_LEN) {
            Some(code) => HistoryDetail::CodeAttempt {
                origin: if matches!(
                    opcode,
                    opcodes::CODE_BLE_VALID_HISTORY | opcodes::CODE_BLE_INVALID_HISTORY
                ) {
                    CodeOrigin::Ble
                } else {
                    CodeOrigin::Keypad
                },
                valid: matches!(
                    opcode,
                    opcodes::CODE_BLE_VALID_HISTORY | opcodes::CODE_KEY_VALID_HISTORY
                ),
                code: String::from_utf8_lossy(code).into_owned(),
            },
            None => HistoryDetail::None,
        },
        opcodes::POWER_OFF => match extension.first() {
            Some(&reason) => HistoryDetail::PowerOff {
                reason: reason.into(),
            },
            None => HistoryDetail::None,
        },
        opcodes::HISTORY_ERROR => match extension.first() {
            Some(&code) => HistoryDetail::Error { code },
            None => HistoryDetail::None,
        },
        _ => HistoryDetail::None,
    };

    Ok(HistoryEntry {
        opcode,
        opcode_name: name_of(opcode).into_owned(),
        age_seconds,
        detail,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
