// src/hardware/mod.rs
pub mod recording;
pub mod sysfs;

pub use kettle_shared::{ChannelId, Direction, HardwareError, Level, OutputDriver};
pub use recording::{DriverCall, RecordingDriver};
pub use sysfs::SysfsGpio;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which raw level represents an energized phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// HIGH energizes, LOW de-energizes.
    #[default]
    High,
    /// LOW energizes, HIGH de-energizes (typical for opto-isolated relay boards).
    Low,
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::High => f.write_str("active-high"),
            Polarity::Low => f.write_str("active-low"),
        }
    }
}

/// Raw level that expresses `energize` under `polarity`.
pub fn write_value(energize: bool, polarity: Polarity) -> Level {
    if energize == (polarity == Polarity::High) {
        Level::High
    } else {
        Level::Low
    }
}

/// Inverse of [`write_value`]: whether a raw level means energized.
pub fn is_energized(level: Level, polarity: Polarity) -> bool {
    (level == Level::High) == (polarity == Polarity::High)
}
