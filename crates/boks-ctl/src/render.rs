//! Human-readable rendering for the terminal.
//!
//! `--json` output goes straight through `serde_json`; these helpers produce
//! the default one-line text form instead.

use boks_core::device_info::{
    BATTERY_CHAR_UUID, BATTERY_LEVEL_CHAR_UUID, BATTERY_SERVICE_UUID, BOKS_SERVICE_UUID,
    DEVICE_INFO_SERVICE_UUID, NOTIFY_CHAR_UUID, WRITE_CHAR_UUID,
};
use boks_core::protocol::format_hex;
use boks_core::{name_of, BatteryHealth, BatteryReading, BoksEvent, DeviceInfoField};
use serde::Serialize;
use uuid::Uuid;

/// Describes one decoded event on a single line.
pub fn describe_event(event: &BoksEvent) -> String {
    match event {
        BoksEvent::DoorStatus { open } => {
            format!("door {}", if *open { "OPEN" } else { "CLOSED" })
        }
        BoksEvent::LogsCount { count } => format!("{count} log entries pending"),
        BoksEvent::CodesCount {
            master,
            single,
            multi,
        } => match multi {
            Some(multi) => format!("codes: master={master} single={single} multi={multi}"),
            None => format!("codes: master={master} single={single}"),
        },
        BoksEvent::CodeOperationResult { success } => {
            format!("code operation {}", if *success { "succeeded" } else { "failed" })
        }
        BoksEvent::ConfigurationApplied => "configuration applied".to_string(),
        BoksEvent::OpenCodeResult { valid } => {
            format!("code {}", if *valid { "accepted" } else { "refused" })
        }
        BoksEvent::History(entry) => format!("history {entry}"),
        BoksEvent::EndOfHistory => "end of history".to_string(),
        BoksEvent::CommandRejected { opcode, reason } => {
            format!("rejected by {}: {reason}", name_of(*opcode))
        }
        BoksEvent::Acknowledgement { name, payload, .. } if payload.is_empty() => name.clone(),
        BoksEvent::Acknowledgement { name, payload, .. } => {
            format!("{name} [{}]", format_hex(payload))
        }
        BoksEvent::Unknown { opcode, raw } => {
            format!("{} [{}]", name_of(*opcode), format_hex(raw))
        }
        BoksEvent::Malformed { reason, raw, .. } => {
            format!("malformed frame ({reason}) [{}]", format_hex(raw))
        }
    }
}

/// Describes a battery reading and its health verdict.
pub fn describe_battery(reading: &BatteryReading, health: &BatteryHealth) -> String {
    let mut line = match reading {
        BatteryReading::SingleMeasure { level_percent } => format!("level {level_percent}%"),
        BatteryReading::UnrecognizedFormat { raw } => {
            format!("unrecognized format [{}]", format_hex(raw))
        }
        _ => match reading.alert_voltage_mv() {
            Some(mv) => format!("{mv} mV"),
            None => "no voltage samples".to_string(),
        },
    };
    if let Some(temperature) = reading.temperature_c() {
        line.push_str(&format!(", {temperature} °C"));
    }
    line.push_str(&format!(" -> {}", health.level));
    if let Some(message) = &health.message {
        line.push_str(&format!(" ({message})"));
    }
    line
}

/// One service or characteristic a BLE binding talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GattEntry {
    pub role: String,
    pub uuid: Uuid,
}

/// The services and characteristics of a box, services first.
pub fn gatt_layout() -> Vec<GattEntry> {
    let fixed = [
        ("Boks service", BOKS_SERVICE_UUID),
        ("command write characteristic", WRITE_CHAR_UUID),
        ("notification characteristic", NOTIFY_CHAR_UUID),
        ("vendor battery characteristic", BATTERY_CHAR_UUID),
        ("Battery service", BATTERY_SERVICE_UUID),
        ("battery level characteristic", BATTERY_LEVEL_CHAR_UUID),
        ("Device Information service", DEVICE_INFO_SERVICE_UUID),
    ];
    fixed
        .into_iter()
        .map(|(role, uuid)| GattEntry {
            role: role.to_string(),
            uuid,
        })
        .chain(DeviceInfoField::ALL.into_iter().map(|field| GattEntry {
            role: field.to_string(),
            uuid: field.uuid(),
        }))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
