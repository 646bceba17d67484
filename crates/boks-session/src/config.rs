//! Session behaviour settings.
//!
//! `SessionConfig` is plain serde data so a host can embed it in its own
//! configuration file (`boks-ctl` stores it under `[session]`).  Every field
//! has a default, so an empty table is a valid configuration.

use std::time::Duration;

use boks_core::BatteryChemistry;
use serde::{Deserialize, Serialize};

/// Tunables for a [`crate::BoksSession`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    /// Cell chemistry used to classify battery readings.  When unset it is
    /// inferred from the firmware revision of the connected box.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chemistry: Option<BatteryChemistry>,
    /// Request the history automatically whenever the box reports pending logs.
    #[serde(default = "default_true")]
    pub auto_request_logs: bool,
    /// Events buffered per subscriber before the slowest one starts lagging.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// Pause between two deletions while wiping master codes.
    #[serde(default = "default_wipe_step_delay_ms")]
    pub wipe_step_delay_ms: u64,
    /// Pause after a wipe pass before re-counting the codes.
    #[serde(default = "default_wipe_settle_delay_ms")]
    pub wipe_settle_delay_ms: u64,
}

impl SessionConfig {
    pub fn wipe_step_delay(&self) -> Duration {
        Duration::from_millis(self.wipe_step_delay_ms)
    }

    pub fn wipe_settle_delay(&self) -> Duration {
        Duration::from_millis(self.wipe_settle_delay_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chemistry: None,
            auto_request_logs: default_true(),
            event_capacity: default_event_capacity(),
            wipe_step_delay_ms: default_wipe_step_delay_ms(),
            wipe_settle_delay_ms: default_wipe_settle_delay_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_event_capacity() -> usize {
    256
}

fn default_wipe_step_delay_ms() -> u64 {
    50
}

fn default_wipe_settle_delay_ms() -> u64 {
    1500
}
