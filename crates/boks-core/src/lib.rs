//! # boks-core
//!
//! Shared library for the Boks BLE controller containing the frame codec,
//! the opcode registry, typed commands and notifications, and the telemetry
//! decoders for battery readings and history entries.
//!
//! It has zero dependencies on BLE stacks, async runtimes, or UI frameworks.
//! Everything in here is a pure function of its input, so it is equally
//! usable from a live session and from an offline capture dissector.
//!
//! # Architecture overview (for beginners)
//!
//! A Boks is a smart parcel box that talks over Bluetooth Low Energy.  The
//! controller writes small binary *frames* to one GATT characteristic and
//! the box answers by sending frames as *notifications* on another one.
//!
//! - **`protocol`** – How bytes travel over the link.  Frames are
//!   `[opcode][length][payload][checksum]`; the `codec` builds and validates
//!   them, `opcodes` names them, `commands` builds outbound requests, and
//!   `notifications` turns inbound frames into typed events.
//!
//! - **`telemetry`** – Interpretation of payloads that need more than a
//!   field read: the three battery wire formats with their health thresholds,
//!   and the history log entries retrieved from the box.
//!
//! - **`device_info`** – GATT identifiers and helpers that read meaning out
//!   of the standard Device Information strings (firmware revision → PCB
//!   version and battery chemistry).

pub mod device_info;
pub mod protocol;
pub mod telemetry;

// Re-export the most-used types at the crate root so callers can write
// `boks_core::Command` instead of `boks_core::protocol::commands::Command`.
pub use device_info::{DeviceInfo, DeviceInfoField, HardwareProfile};
pub use protocol::codec::{decode_frame, encode_command, DecodeError, EncodeError, Frame};
pub use protocol::commands::{CodeType, Command, ReplyKind};
pub use protocol::notifications::{classify_frame, decode_notification, BoksEvent, RejectionReason};
pub use protocol::opcodes::{is_history_opcode, name_of, Direction, OpcodeInfo};
pub use telemetry::battery::{
    classify_battery, decode_battery, BatteryChemistry, BatteryHealth, BatteryReading, HealthLevel,
};
pub use telemetry::history::{decode_history_entry, HistoryDetail, HistoryEntry, HistoryError};
