// Trait-based interface for the digital outputs that switch heater phases.

use std::fmt;
use thiserror::Error;

/// Identifier of one physical output channel (a GPIO number on sysfs hosts).
pub type ChannelId = u32;

/// Raw binary signal written to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub const fn as_bit(self) -> u8 {
        match self {
            Level::Low => 0,
            Level::High => 1,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_bit())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("IO error on channel {channel}: {source}")]
    Io {
        channel: ChannelId,
        #[source]
        source: std::io::Error,
    },
    #[error("Channel {0} is not exported")]
    NotExported(ChannelId),
    #[error("Channel {channel} rejected the request: {reason}")]
    Rejected { channel: ChannelId, reason: String },
}

/// Low-level output driver.
///
/// Implementations must make `export` idempotent. Callers treat every error as
/// local and non-fatal: it is logged at the call site and never propagated
/// into the control loop.
pub trait OutputDriver: Send {
    fn export(&mut self, channel: ChannelId) -> Result<(), HardwareError>;
    fn set_direction(&mut self, channel: ChannelId, direction: Direction) -> Result<(), HardwareError>;
    fn write(&mut self, channel: ChannelId, level: Level) -> Result<(), HardwareError>;
}
