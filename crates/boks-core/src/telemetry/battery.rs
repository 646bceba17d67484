//! Battery characteristic decoding and health classification.
//!
//! The vendor battery characteristic (`0x0004`) returns one of three layouts,
//! told apart by length alone:
//!
//! | Length | Layout                                                         |
//! |--------|----------------------------------------------------------------|
//! | 1      | level in percent                                               |
//! | 4      | T1, T5, T10 voltages (×100 mV, `0xFF` = absent), temperature   |
//! | 6      | first, min, mean, max, last voltages (×100 mV), temperature    |
//!
//! Temperatures are stored with a +25 °C offset.  Any other length is kept
//! as [`BatteryReading::UnrecognizedFormat`] rather than rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Voltage samples are stored in units of 100 mV.
const MV_PER_UNIT: u32 = 100;

/// Offset subtracted from the raw temperature byte.
const TEMPERATURE_OFFSET_C: i16 = 25;

/// Marks an absent sample in the four-byte layout.
const ABSENT_SAMPLE: u8 = 0xFF;

// ── Readings ──────────────────────────────────────────────────────────────────

/// A decoded battery characteristic value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum BatteryReading {
    /// One-byte layout: charge level only.
    SingleMeasure { level_percent: u8 },
    /// Four-byte layout: voltage at T1, T5 and T10 after load.
    TimeSeries {
        t1_mv: u32,
        t5_mv: Option<u32>,
        t10_mv: Option<u32>,
        temperature_c: i16,
    },
    /// Six-byte layout: statistics over one load cycle.
    FiveValue {
        first_mv: u32,
        min_mv: u32,
        mean_mv: u32,
        max_mv: u32,
        last_mv: u32,
        temperature_c: i16,
    },
    /// Any other length, kept verbatim.
    UnrecognizedFormat { raw: Vec<u8> },
}

/// Decodes a battery characteristic value.  Never fails.
///
/// # Examples
///
/// ```rust
/// use boks_core::{decode_battery, BatteryReading};
///
/// assert_eq!(
///     decode_battery(&[80]),
///     BatteryReading::SingleMeasure { level_percent: 80 }
/// );
/// ```
pub fn decode_battery(bytes: &[u8]) -> BatteryReading {
    match *bytes {
        [level] => BatteryReading::SingleMeasure {
            level_percent: level,
        },
        [t1, t5, t10, temp] => BatteryReading::TimeSeries {
            t1_mv: to_mv(t1),
            t5_mv: optional_mv(t5),
            t10_mv: optional_mv(t10),
            temperature_c: to_celsius(temp),
        },
        [first, min, mean, max, last, temp] => BatteryReading::FiveValue {
            first_mv: to_mv(first),
            min_mv: to_mv(min),
            mean_mv: to_mv(mean),
            max_mv: to_mv(max),
            last_mv: to_mv(last),
            temperature_c: to_celsius(temp),
        },
        _ => BatteryReading::UnrecognizedFormat {
            raw: bytes.to_vec(),
        },
    }
}

fn to_mv(raw: u8) -> u32 {
    u32::from(raw) * MV_PER_UNIT
}

fn optional_mv(raw: u8) -> Option<u32> {
    (raw != ABSENT_SAMPLE).then(|| to_mv(raw))
}

fn to_celsius(raw: u8) -> i16 {
    i16::from(raw) - TEMPERATURE_OFFSET_C
}

impl BatteryReading {
    /// The voltage to judge battery health by, if the layout carries one.
    ///
    /// For the six-byte layout this is the lower of `min` and `last`; for the
    /// four-byte layout it is T1 when non-zero.
    pub fn alert_voltage_mv(&self) -> Option<u32> {
        match self {
            BatteryReading::FiveValue { min_mv, last_mv, .. } => Some((*min_mv).min(*last_mv)),
            BatteryReading::TimeSeries { t1_mv, .. } if *t1_mv > 0 => Some(*t1_mv),
            _ => None,
        }
    }

    /// Temperature in °C, when the layout carries one.
    pub fn temperature_c(&self) -> Option<i16> {
        match self {
            BatteryReading::TimeSeries { temperature_c, .. }
            | BatteryReading::FiveValue { temperature_c, .. } => Some(*temperature_c),
            _ => None,
        }
    }

    /// Health of the alert voltage; OK with no alert when there is none.
    pub fn health(&self, chemistry: BatteryChemistry) -> BatteryHealth {
        match self.alert_voltage_mv() {
            Some(mv) => classify_battery(f64::from(mv), chemistry),
            None => BatteryHealth::ok(),
        }
    }
}

// ── Chemistry ─────────────────────────────────────────────────────────────────

/// Cell chemistry fitted to the box; selects the health thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BatteryChemistry {
    /// Eight alkaline AAA cells in series (PCB 4.0).
    #[default]
    #[serde(rename = "aaa8x", alias = "AAA8x")]
    Aaa8x,
    /// One Saft LSH14 lithium cell (PCB 3.0).
    #[serde(rename = "lsh14", alias = "LSH14")]
    Lsh14,
}

impl fmt::Display for BatteryChemistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BatteryChemistry::Aaa8x => "8x AAA",
            BatteryChemistry::Lsh14 => "LSH14",
        })
    }
}

impl FromStr for BatteryChemistry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aaa" | "aaa8x" | "8xaaa" => Ok(BatteryChemistry::Aaa8x),
            "lsh14" => Ok(BatteryChemistry::Lsh14),
            other => Err(format!("unknown battery chemistry '{other}' (expected aaa8x or lsh14)")),
        }
    }
}

// ── Health ────────────────────────────────────────────────────────────────────

/// Severity of a battery health verdict, from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthLevel {
    Ok,
    Low,
    Alarm,
    Critical,
}

impl fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HealthLevel::Ok => "OK",
            HealthLevel::Low => "LOW",
            HealthLevel::Alarm => "ALARM",
            HealthLevel::Critical => "CRITICAL",
        })
    }
}

/// A health verdict with the alert text to show, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryHealth {
    pub level: HealthLevel,
    /// `None` when there is nothing to warn about.
    pub message: Option<String>,
}

impl BatteryHealth {
    fn ok() -> Self {
        Self {
            level: HealthLevel::Ok,
            message: None,
        }
    }

    fn alert(level: HealthLevel, message: String) -> Self {
        Self {
            level,
            message: Some(message),
        }
    }
}

/// Classifies a pack voltage for the given chemistry.
///
/// Zero, negative and NaN voltages are treated as "no reading" and yield OK
/// with no alert.
///
/// # Examples
///
/// ```rust
/// use boks_core::{classify_battery, BatteryChemistry, HealthLevel};
///
/// assert_eq!(classify_battery(7199.0, BatteryChemistry::Aaa8x).level, HealthLevel::Critical);
/// assert_eq!(classify_battery(9600.0, BatteryChemistry::Aaa8x).level, HealthLevel::Ok);
/// ```
pub fn classify_battery(voltage_mv: f64, chemistry: BatteryChemistry) -> BatteryHealth {
    if voltage_mv.is_nan() || voltage_mv <= 0.0 {
        return BatteryHealth::ok();
    }
    let mv = voltage_mv.round();

    match chemistry {
        BatteryChemistry::Aaa8x => {
            if voltage_mv < 7200.0 {
                BatteryHealth::alert(
                    HealthLevel::Critical,
                    format!("CRITICAL ({mv}mV): Replace 8x AAA immediately!"),
                )
            } else if voltage_mv < 8000.0 {
                BatteryHealth::alert(
                    HealthLevel::Alarm,
                    format!("LOW ({mv}mV): Shutdown imminent."),
                )
            } else if voltage_mv < 9600.0 {
                BatteryHealth::alert(
                    HealthLevel::Low,
                    format!("WARNING ({mv}mV): ~20-30% remaining."),
                )
            } else {
                BatteryHealth::ok()
            }
        }
        BatteryChemistry::Lsh14 => {
            if voltage_mv < 3000.0 {
                BatteryHealth::alert(
                    HealthLevel::Critical,
                    format!("CRITICAL ({mv}mV): Battery empty! Replace LSH14."),
                )
            } else if voltage_mv <= 3300.0 {
                BatteryHealth::alert(
                    HealthLevel::Alarm,
                    format!("URGENT ({mv}mV): End of life (<5%). Replace LSH14."),
                )
            } else {
                BatteryHealth::ok()
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
