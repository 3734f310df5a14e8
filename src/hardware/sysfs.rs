// src/hardware/sysfs.rs - Linux sysfs GPIO output driver
use super::{ChannelId, Direction, HardwareError, Level, OutputDriver};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";

/// Output driver backed by the legacy `/sys/class/gpio` interface.
///
/// The root directory is configurable so the driver can be pointed at a
/// fixture tree.
#[derive(Debug, Clone)]
pub struct SysfsGpio {
    root: PathBuf,
}

impl SysfsGpio {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn channel_dir(&self, channel: ChannelId) -> PathBuf {
        self.root.join(format!("gpio{}", channel))
    }

    fn write_attr(&self, channel: ChannelId, attr: &str, value: &str) -> Result<(), HardwareError> {
        let dir = self.channel_dir(channel);
        if !dir.is_dir() {
            return Err(HardwareError::NotExported(channel));
        }
        let path = dir.join(attr);
        tracing::trace!("gpio {} <- {}={}", channel, attr, value);
        fs::write(&path, value).map_err(|source| HardwareError::Io { channel, source })
    }
}

impl Default for SysfsGpio {
    fn default() -> Self {
        Self::new(DEFAULT_GPIO_ROOT)
    }
}

impl OutputDriver for SysfsGpio {
    fn export(&mut self, channel: ChannelId) -> Result<(), HardwareError> {
        if self.channel_dir(channel).is_dir() {
            tracing::debug!("gpio {} already exported", channel);
            return Ok(());
        }
        fs::write(self.root.join("export"), channel.to_string())
            .map_err(|source| HardwareError::Io { channel, source })
    }

    fn set_direction(&mut self, channel: ChannelId, direction: Direction) -> Result<(), HardwareError> {
        self.write_attr(channel, "direction", direction.as_str())
    }

    fn write(&mut self, channel: ChannelId, level: Level) -> Result<(), HardwareError> {
        self.write_attr(channel, "value", &level.to_string())
    }
}
