//! GATT identifiers and Device Information helpers.
//!
//! The box exposes its protocol on a vendor service (`a7630001-…`), a vendor
//! battery characteristic, and the standard Device Information service.  The
//! firmware revision string is the only reliable way to tell hardware
//! generations apart, which in turn selects the battery chemistry.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::telemetry::battery::BatteryChemistry;

// ── UUIDs ─────────────────────────────────────────────────────────────────────

/// Expands a 16-bit Bluetooth SIG identifier onto the base UUID.
pub const fn bluetooth_uuid(short: u16) -> Uuid {
    Uuid::from_u128(((short as u128) << 96) | 0x0000_0000_0000_1000_8000_0080_5f9b_34fb)
}

/// Vendor service carrying the command protocol.
pub const BOKS_SERVICE_UUID: Uuid = Uuid::from_u128(0xa763_0001_f491_4f21_95ea_846b_a586_e361);

/// Characteristic the controller writes command frames to.
pub const WRITE_CHAR_UUID: Uuid = Uuid::from_u128(0xa763_0002_f491_4f21_95ea_846b_a586_e361);

/// Characteristic the box sends notification frames on.
pub const NOTIFY_CHAR_UUID: Uuid = Uuid::from_u128(0xa763_0003_f491_4f21_95ea_846b_a586_e361);

/// Vendor battery characteristic decoded by [`crate::decode_battery`].
pub const BATTERY_CHAR_UUID: Uuid = bluetooth_uuid(0x0004);

pub const BATTERY_SERVICE_UUID: Uuid = bluetooth_uuid(0x180F);
pub const BATTERY_LEVEL_CHAR_UUID: Uuid = bluetooth_uuid(0x2A19);
pub const DEVICE_INFO_SERVICE_UUID: Uuid = bluetooth_uuid(0x180A);

// ── Device Information ────────────────────────────────────────────────────────

/// The Device Information characteristics read from the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceInfoField {
    SystemId,
    ModelNumber,
    SerialNumber,
    FirmwareRevision,
    HardwareRevision,
    SoftwareRevision,
    ManufacturerName,
}

impl DeviceInfoField {
    /// Every field in characteristic order (0x2A23 to 0x2A29).
    pub const ALL: [DeviceInfoField; 7] = [
        DeviceInfoField::SystemId,
        DeviceInfoField::ModelNumber,
        DeviceInfoField::SerialNumber,
        DeviceInfoField::FirmwareRevision,
        DeviceInfoField::HardwareRevision,
        DeviceInfoField::SoftwareRevision,
        DeviceInfoField::ManufacturerName,
    ];

    /// The characteristic UUID for this field.
    pub const fn uuid(self) -> Uuid {
        bluetooth_uuid(match self {
            DeviceInfoField::SystemId => 0x2A23,
            DeviceInfoField::ModelNumber => 0x2A24,
            DeviceInfoField::SerialNumber => 0x2A25,
            DeviceInfoField::FirmwareRevision => 0x2A26,
            DeviceInfoField::HardwareRevision => 0x2A27,
            DeviceInfoField::SoftwareRevision => 0x2A28,
            DeviceInfoField::ManufacturerName => 0x2A29,
        })
    }
}

impl fmt::Display for DeviceInfoField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceInfoField::SystemId => "System ID",
            DeviceInfoField::ModelNumber => "Model Number",
            DeviceInfoField::SerialNumber => "Serial Number",
            DeviceInfoField::FirmwareRevision => "Firmware Revision",
            DeviceInfoField::HardwareRevision => "Hardware Revision",
            DeviceInfoField::SoftwareRevision => "Software Revision",
            DeviceInfoField::ManufacturerName => "Manufacturer Name",
        })
    }
}

/// Decodes a Device Information string, dropping the NUL padding some firmwares add.
pub fn decode_info_string(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).replace('\0', "")
}

/// Device Information strings, each absent when the characteristic was not readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub manufacturer: Option<String>,
    pub model_number: Option<String>,
    pub serial_number: Option<String>,
    pub firmware_revision: Option<String>,
    pub hardware_revision: Option<String>,
    pub software_revision: Option<String>,
}

impl DeviceInfo {
    /// Stores the raw value read for `field`.  The System ID is binary and not kept.
    pub fn set(&mut self, field: DeviceInfoField, raw: &[u8]) {
        let value = Some(decode_info_string(raw));
        match field {
            DeviceInfoField::SystemId => {}
            DeviceInfoField::ModelNumber => self.model_number = value,
            DeviceInfoField::SerialNumber => self.serial_number = value,
            DeviceInfoField::FirmwareRevision => self.firmware_revision = value,
            DeviceInfoField::HardwareRevision => self.hardware_revision = value,
            DeviceInfoField::SoftwareRevision => self.software_revision = value,
            DeviceInfoField::ManufacturerName => self.manufacturer = value,
        }
    }

    /// Hardware generation inferred from the firmware revision.
    pub fn hardware_profile(&self) -> HardwareProfile {
        self.firmware_revision
            .as_deref()
            .map_or(HardwareProfile::Unknown, HardwareProfile::from_firmware)
    }

    /// Whether the box can be configured for Vigik badges.
    pub fn supports_vigik(&self) -> bool {
        self.firmware_revision.as_deref().is_some_and(supports_vigik)
    }
}

// ── Hardware inference ────────────────────────────────────────────────────────

/// Hardware generation of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareProfile {
    /// PCB 4.0, powered by eight AAA cells.
    Pcb40,
    /// PCB 3.0, powered by one LSH14 cell.
    Pcb30,
    Unknown,
}

impl HardwareProfile {
    /// Infers the generation from a firmware revision such as `"10/125"`.
    pub fn from_firmware(firmware_revision: &str) -> Self {
        let rev = firmware_revision.to_ascii_lowercase();
        if rev.contains("10/125") {
            HardwareProfile::Pcb40
        } else if rev.contains("10/cd") {
            HardwareProfile::Pcb30
        } else {
            HardwareProfile::Unknown
        }
    }

    pub fn pcb_version(self) -> Option<&'static str> {
        match self {
            HardwareProfile::Pcb40 => Some("4.0"),
            HardwareProfile::Pcb30 => Some("3.0"),
            HardwareProfile::Unknown => None,
        }
    }

    pub fn chemistry(self) -> Option<BatteryChemistry> {
        match self {
            HardwareProfile::Pcb40 => Some(BatteryChemistry::Aaa8x),
            HardwareProfile::Pcb30 => Some(BatteryChemistry::Lsh14),
            HardwareProfile::Unknown => None,
        }
    }
}

/// Minimum software version that understands the Vigik option.
const VIGIK_MIN_VERSION: f64 = 4.2;

/// Whether a firmware revision supports Vigik: hardware `10/125`, or a
/// revision string starting with a version of at least 4.2.
pub fn supports_vigik(firmware_revision: &str) -> bool {
    if firmware_revision.to_ascii_lowercase().contains("10/125") {
        return true;
    }
    leading_version(firmware_revision).is_some_and(|v| v >= VIGIK_MIN_VERSION)
}

/// Parses the decimal number a string starts with, ignoring anything after it.
fn leading_version(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        match c {
            '0'..='9' => end = i + 1,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
    }
    s[..end].parse().ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
