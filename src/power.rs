//! Discrete heater power levels.
//!
//! A three-phase heater supports exactly four power levels. Requests for any
//! other value are snapped to the nearest supported level, and each level maps
//! to a fixed prefix of the configured phase channels.

use kettle_shared::ChannelId;
use std::fmt;

/// Number of independently switchable phases per heater.
pub const PHASE_COUNT: usize = 3;

/// Supported power level, expressed as a percentage of full heater power.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PowerLevel {
    #[default]
    Off,
    Low,
    Mid,
    Max,
}

/// Supported levels in ascending order. Quantization ties resolve to the
/// earlier entry.
pub const SUPPORTED_LEVELS: [PowerLevel; PHASE_COUNT + 1] =
    [PowerLevel::Off, PowerLevel::Low, PowerLevel::Mid, PowerLevel::Max];

/// Level commanded for a given number of active phases, indexed by count.
pub const ACTIVE_PHASE_LEVELS: [PowerLevel; PHASE_COUNT + 1] =
    [PowerLevel::Off, PowerLevel::Low, PowerLevel::Mid, PowerLevel::Max];

impl PowerLevel {
    pub const fn percent(self) -> u8 {
        match self {
            PowerLevel::Off => 0,
            PowerLevel::Low => 33,
            PowerLevel::Mid => 67,
            PowerLevel::Max => 100,
        }
    }

    /// Number of phases energized at this level.
    pub const fn phase_count(self) -> usize {
        match self {
            PowerLevel::Off => 0,
            PowerLevel::Low => 1,
            PowerLevel::Mid => 2,
            PowerLevel::Max => 3,
        }
    }

    pub const fn max() -> Self {
        SUPPORTED_LEVELS[PHASE_COUNT]
    }

    /// Snap a requested percentage to the nearest supported level.
    ///
    /// `None` and NaN map to `Off`. On an exact tie the lower level wins.
    pub fn quantize(requested: Option<f64>) -> Self {
        let Some(requested) = requested else {
            return PowerLevel::Off;
        };
        let mut best = SUPPORTED_LEVELS[0];
        let mut best_distance = (requested - f64::from(best.percent())).abs();
        for level in &SUPPORTED_LEVELS[1..] {
            let distance = (requested - f64::from(level.percent())).abs();
            if distance < best_distance {
                best = *level;
                best_distance = distance;
            }
        }
        best
    }

    /// Level for a count of phases whose thresholds call for heat.
    pub fn for_active_phases(active: usize) -> Self {
        ACTIVE_PHASE_LEVELS[active.min(PHASE_COUNT)]
    }
}

impl fmt::Display for PowerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Immutable mapping from power level to the channels energized at it.
///
/// Level 0 energizes nothing; each higher level adds the next channel in
/// configured order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseMap {
    channels: Vec<ChannelId>,
}

impl PhaseMap {
    /// Build the map from channels in phase order. Callers validate the count.
    pub fn new(channels: &[ChannelId]) -> Self {
        Self {
            channels: channels.to_vec(),
        }
    }

    /// All configured channels in phase order.
    pub fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    pub fn phases_for(&self, level: PowerLevel) -> &[ChannelId] {
        let count = level.phase_count().min(self.channels.len());
        &self.channels[..count]
    }

    pub fn is_energized(&self, level: PowerLevel, channel: ChannelId) -> bool {
        self.phases_for(level).contains(&channel)
    }
}
