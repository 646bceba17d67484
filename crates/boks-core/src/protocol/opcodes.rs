//! Static opcode registry for the Boks protocol.
//!
//! Every frame starts with a one-byte opcode.  This module maps each opcode
//! to its mnemonic and declared direction.  The table is a plain sorted
//! slice: supporting a new firmware opcode means adding a row, not a new code
//! path.
//!
//! Opcode ranges used by the firmware:
//!
//! | Range       | Meaning                                        |
//! |-------------|------------------------------------------------|
//! | 0x01–0x62   | Commands written by the controller             |
//! | 0x77–0x85   | Responses and live notifications               |
//! | 0x86–0xA2   | History log entries (0x92 ends the download)   |
//! | 0xB0–0xCA   | Scale, code-generation, configuration, NFC     |
//! | 0xE0–0xE2   | Frame-level rejections                         |

use std::borrow::Cow;

use serde::Serialize;

// ── Well-known opcodes ────────────────────────────────────────────────────────

pub const OPEN_DOOR: u8 = 0x01;
pub const ASK_DOOR_STATUS: u8 = 0x02;
pub const REQUEST_LOGS: u8 = 0x03;
pub const GET_LOGS_COUNT: u8 = 0x07;
pub const DELETE_MASTER_CODE: u8 = 0x0C;
pub const CREATE_MASTER_CODE: u8 = 0x11;
pub const CREATE_SINGLE_USE_CODE: u8 = 0x12;
pub const CREATE_MULTI_USE_CODE: u8 = 0x13;
pub const COUNT_CODES: u8 = 0x14;
pub const SET_CONFIGURATION: u8 = 0x16;

pub const CODE_OPERATION_SUCCESS: u8 = 0x77;
pub const CODE_OPERATION_ERROR: u8 = 0x78;
pub const NOTIFY_LOGS_COUNT: u8 = 0x79;
pub const ERROR_COMMAND_NOT_SUPPORTED: u8 = 0x80;
pub const VALID_OPEN_CODE: u8 = 0x81;
pub const INVALID_OPEN_CODE: u8 = 0x82;
pub const NOTIFY_DOOR_STATUS: u8 = 0x84;
pub const ANSWER_DOOR_STATUS: u8 = 0x85;

pub const CODE_BLE_VALID_HISTORY: u8 = 0x86;
pub const CODE_KEY_VALID_HISTORY: u8 = 0x87;
pub const CODE_BLE_INVALID_HISTORY: u8 = 0x88;
pub const CODE_KEY_INVALID_HISTORY: u8 = 0x89;
pub const END_HISTORY: u8 = 0x92;
pub const POWER_OFF: u8 = 0x94;
pub const HISTORY_ERROR: u8 = 0xA0;

pub const NOTIFY_CODES_COUNT: u8 = 0xC3;
pub const NOTIFY_SET_CONFIGURATION_SUCCESS: u8 = 0xC4;

pub const ERROR_CRC: u8 = 0xE0;
pub const ERROR_UNAUTHORIZED: u8 = 0xE1;
pub const ERROR_BAD_REQUEST: u8 = 0xE2;

/// First opcode of the history log range (inclusive).
pub const HISTORY_FIRST: u8 = 0x86;

/// Last opcode of the history log range (inclusive).
pub const HISTORY_LAST: u8 = 0xA2;

// ── Registry types ────────────────────────────────────────────────────────────

/// Who sends a frame with a given opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Written by the controller.
    Command,
    /// Sent by the device in reply to a specific command.
    Response,
    /// Sent by the device on its own (live events and history entries).
    Notification,
}

/// One row of the opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OpcodeInfo {
    pub opcode: u8,
    pub name: &'static str,
    pub direction: Direction,
}

const fn row(opcode: u8, name: &'static str, direction: Direction) -> OpcodeInfo {
    OpcodeInfo {
        opcode,
        name,
        direction,
    }
}

use Direction::{Command as Cmd, Notification as Ntf, Response as Rsp};

/// The opcode table, sorted by opcode so lookups can binary-search it.
static OPCODE_TABLE: &[OpcodeInfo] = &[
    row(0x01, "OPEN_DOOR", Cmd),
    row(0x02, "ASK_DOOR_STATUS", Cmd),
    row(0x03, "REQUEST_LOGS", Cmd),
    row(0x06, "REBOOT", Cmd),
    row(0x07, "GET_LOGS_COUNT", Cmd),
    row(0x08, "TEST_BATTERY", Cmd),
    row(0x09, "MASTER_CODE_EDIT", Cmd),
    row(0x0A, "SINGLE_USE_CODE_TO_MULTI", Cmd),
    row(0x0B, "MULTI_CODE_TO_SINGLE_USE", Cmd),
    row(0x0C, "DELETE_MASTER_CODE", Cmd),
    row(0x0D, "DELETE_SINGLE_USE_CODE", Cmd),
    row(0x0E, "DELETE_MULTI_USE_CODE", Cmd),
    row(0x0F, "REACTIVATE_CODE", Cmd),
    row(0x10, "GENERATE_CODES", Cmd),
    row(0x11, "CREATE_MASTER_CODE", Cmd),
    row(0x12, "CREATE_SINGLE_USE_CODE", Cmd),
    row(0x13, "CREATE_MULTI_USE_CODE", Cmd),
    row(0x14, "COUNT_CODES", Cmd),
    row(0x15, "GENERATE_CODES_SUPPORT", Cmd),
    row(0x16, "SET_CONFIGURATION", Cmd),
    row(0x17, "REGISTER_NFC_TAG_SCAN_START", Cmd),
    row(0x18, "REGISTER_NFC_TAG", Cmd),
    row(0x19, "UNREGISTER_NFC_TAG", Cmd),
    row(0x20, "RE_GENERATE_CODES_PART1", Cmd),
    row(0x21, "RE_GENERATE_CODES_PART2", Cmd),
    row(0x50, "SCALE_BOND", Cmd),
    row(0x52, "SCALE_GET_MAC_ADDRESS_BOKS", Cmd),
    row(0x53, "SCALE_FORGET_BONDING", Cmd),
    row(0x55, "SCALE_TARE_EMPTY", Cmd),
    row(0x56, "SCALE_TARE_LOADED", Cmd),
    row(0x57, "SCALE_MEASURE_WEIGHT", Cmd),
    row(0x60, "SCALE_PREPARE_DFU", Cmd),
    row(0x61, "SCALE_GET_RAW_SENSORS", Cmd),
    row(0x62, "SCALE_RECONNECT", Cmd),
    row(0x77, "CODE_OPERATION_SUCCESS", Rsp),
    row(0x78, "CODE_OPERATION_ERROR", Rsp),
    row(0x79, "NOTIFY_LOGS_COUNT", Ntf),
    row(0x80, "ERROR_COMMAND_NOT_SUPPORTED", Rsp),
    row(0x81, "VALID_OPEN_CODE", Ntf),
    row(0x82, "INVALID_OPEN_CODE", Ntf),
    row(0x84, "NOTIFY_DOOR_STATUS", Ntf),
    row(0x85, "ANSWER_DOOR_STATUS", Rsp),
    row(0x86, "CODE_BLE_VALID_HISTORY", Ntf),
    row(0x87, "CODE_KEY_VALID_HISTORY", Ntf),
    row(0x88, "CODE_BLE_INVALID_HISTORY", Ntf),
    row(0x89, "CODE_KEY_INVALID_HISTORY", Ntf),
    row(0x90, "DOOR_CLOSE_HISTORY", Ntf),
    row(0x91, "DOOR_OPEN_HISTORY", Ntf),
    row(0x92, "END_HISTORY", Ntf),
    row(0x93, "HISTORY_ERASE", Ntf),
    row(0x94, "POWER_OFF", Ntf),
    row(0x95, "BLOCK_RESET", Ntf),
    row(0x96, "POWER_ON", Ntf),
    row(0x97, "BLE_REBOOT", Ntf),
    row(0x98, "SCALE_CONTINUOUS_MEASURE", Ntf),
    row(0x99, "KEY_OPENING", Ntf),
    row(0xA0, "ERROR", Ntf),
    row(0xA1, "NFC_OPENING", Ntf),
    row(0xA2, "NFC_TAG_REGISTERING_SCAN", Ntf),
    row(0xB0, "NOTIFY_SCALE_BONDING_SUCCESS", Ntf),
    row(0xB1, "NOTIFY_SCALE_BONDING_ERROR", Ntf),
    row(0xB2, "NOTIFY_MAC_ADDRESS_BOKS_SCALE", Ntf),
    row(0xB3, "NOTIFY_SCALE_BONDING_FORGET_SUCCESS", Ntf),
    row(0xB4, "NOTIFY_SCALE_BONDING_PROGRESS", Ntf),
    row(0xB5, "NOTIFY_SCALE_TARE_EMPTY_OK", Ntf),
    row(0xB6, "NOTIFY_SCALE_TARE_LOADED_OK", Ntf),
    row(0xB7, "NOTIFY_SCALE_MEASURE_WEIGHT", Ntf),
    row(0xB8, "NOTIFY_SCALE_DISCONNECTED", Ntf),
    row(0xB9, "NOTIFY_SCALE_RAW_SENSORS", Ntf),
    row(0xBA, "NOTIFY_SCALE_FAULTY", Ntf),
    row(0xC0, "NOTIFY_CODE_GENERATION_SUCCESS", Ntf),
    row(0xC1, "NOTIFY_CODE_GENERATION_ERROR", Ntf),
    row(0xC2, "NOTIFY_CODE_GENERATION_PROGRESS", Ntf),
    row(0xC3, "NOTIFY_CODES_COUNT", Rsp),
    row(0xC4, "NOTIFY_SET_CONFIGURATION_SUCCESS", Rsp),
    row(0xC5, "NOTIFY_NFC_TAG_REGISTER_SCAN_RESULT", Ntf),
    row(0xC6, "NOTIFY_NFC_TAG_REGISTER_SCAN_ERROR_ALREADY_EXISTS", Ntf),
    row(0xC7, "NOTIFY_NFC_TAG_REGISTER_SCAN_TIMEOUT", Ntf),
    row(0xC8, "NOTIFY_NFC_TAG_REGISTERED_SUCCESS", Ntf),
    row(0xC9, "NOTIFY_NFC_TAG_REGISTERED_ERROR_ALREADY_EXISTS", Ntf),
    row(0xCA, "NOTIFY_NFC_TAG_UNREGISTERED_SUCCESS", Ntf),
    row(0xE0, "ERROR_CRC", Rsp),
    row(0xE1, "ERROR_UNAUTHORIZED", Rsp),
    row(0xE2, "ERROR_BAD_REQUEST", Rsp),
];

// ── Public API ────────────────────────────────────────────────────────────────

/// Returns the table row for `opcode`, if the firmware documents it.
pub fn lookup(opcode: u8) -> Option<&'static OpcodeInfo> {
    OPCODE_TABLE
        .binary_search_by_key(&opcode, |info| info.opcode)
        .ok()
        .map(|idx| &OPCODE_TABLE[idx])
}

/// Returns the mnemonic for `opcode`, or `UNKNOWN_OP(0xHH)` when it is not in the table.
///
/// # Examples
///
/// ```rust
/// use boks_core::protocol::name_of;
///
/// assert_eq!(name_of(0x79), "NOTIFY_LOGS_COUNT");
/// assert_eq!(name_of(0x05), "UNKNOWN_OP(0x05)");
/// ```
pub fn name_of(opcode: u8) -> Cow<'static, str> {
    match lookup(opcode) {
        Some(info) => Cow::Borrowed(info.name),
        None => Cow::Owned(format!("UNKNOWN_OP(0x{opcode:02X})")),
    }
}

/// Whether `opcode` lies in the history log range 0x86–0xA2.
///
/// Membership is by range, not by table row: an undocumented opcode inside
/// the range is still a history entry.  [`END_HISTORY`] is in the range too;
/// classifiers check for it first.
pub fn is_history_opcode(opcode: u8) -> bool {
    (HISTORY_FIRST..=HISTORY_LAST).contains(&opcode)
}

/// Iterates over every documented opcode in ascending order.
pub fn all() -> impl Iterator<Item = &'static OpcodeInfo> {
    OPCODE_TABLE.iter()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
