//! Decoders for payloads that need more than a field read.
//!
//! - [`battery`] – the three battery characteristic formats and the health
//!   classifier for both supported cell chemistries.
//! - [`history`] – history log entries streamed after `REQUEST_LOGS`.

pub mod battery;
pub mod history;

pub use battery::{
    classify_battery, decode_battery, BatteryChemistry, BatteryHealth, BatteryReading, HealthLevel,
};
pub use history::{
    decode_history_entry, CodeOrigin, HistoryDetail, HistoryEntry, HistoryError, PowerOffReason,
};
