// src/actuator.rs - Quantized multi-phase power actuator
use crate::hardware::{write_value, ChannelId, Direction, OutputDriver, Polarity};
use crate::notify::{Notification, Notifier};
use crate::power::{PhaseMap, PowerLevel, PHASE_COUNT};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

pub const POWER_CHANGE_TIMEOUT_MS: u64 = 7_500;
pub const OFF_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActuatorError {
    #[error("Expected {expected} channels, got {got}")]
    ChannelCount { expected: usize, got: usize },
    #[error("Channel {0} is configured more than once")]
    DuplicateChannel(ChannelId),
}

/// Snapshot of an actuator's bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorState {
    pub current_level: PowerLevel,
    pub is_on: bool,
    pub polarity: Polarity,
    /// Logical energized flag per channel, in phase order. Tracks what was
    /// commanded, not what the hardware confirmed.
    pub energized: Vec<bool>,
}

/// Drives the phase outputs of one physical heater.
///
/// Requests are snapped to the supported power levels and never rejected.
/// Driver and notification failures are logged and swallowed. The actuator is
/// not safe for concurrent mutation; share it behind a mutex.
pub struct PowerActuator {
    name: String,
    phase_map: PhaseMap,
    polarity: Polarity,
    driver: Box<dyn OutputDriver>,
    notifier: Arc<dyn Notifier>,
    current_level: PowerLevel,
    is_on: bool,
    energized: Vec<bool>,
}

impl PowerActuator {
    pub fn new(
        name: impl Into<String>,
        channels: &[ChannelId],
        polarity: Polarity,
        driver: Box<dyn OutputDriver>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ActuatorError> {
        if channels.len() != PHASE_COUNT {
            return Err(ActuatorError::ChannelCount {
                expected: PHASE_COUNT,
                got: channels.len(),
            });
        }
        let mut seen = HashSet::new();
        for &channel in channels {
            if !seen.insert(channel) {
                return Err(ActuatorError::DuplicateChannel(channel));
            }
        }
        Ok(Self {
            name: name.into(),
            phase_map: PhaseMap::new(channels),
            polarity,
            driver,
            notifier,
            current_level: PowerLevel::Off,
            is_on: false,
            energized: vec![false; channels.len()],
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current_level(&self) -> PowerLevel {
        self.current_level
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn state(&self) -> ActuatorState {
        ActuatorState {
            current_level: self.current_level,
            is_on: self.is_on,
            polarity: self.polarity,
            energized: self.energized.clone(),
        }
    }

    /// Export and configure every channel, then leave all phases de-energized.
    pub fn init(&mut self) {
        tracing::info!(
            "Initializing heater '{}' on channels {:?} ({})",
            self.name,
            self.phase_map.channels(),
            self.polarity
        );
        let channels = self.phase_map.channels().to_vec();
        for channel in channels {
            if let Err(e) = self.driver.export(channel) {
                tracing::warn!("Heater '{}': export of channel {} failed: {}", self.name, channel, e);
            }
            if let Err(e) = self.driver.set_direction(channel, Direction::Out) {
                tracing::warn!("Heater '{}': direction setup of channel {} failed: {}", self.name, channel, e);
            }
        }
        self.drive(PowerLevel::Off);
        self.current_level = PowerLevel::Off;
        self.is_on = false;
    }

    /// Store the quantized level; re-drive outputs only while switched on.
    pub fn set_power(&mut self, requested: Option<f64>) -> PowerLevel {
        let level = PowerLevel::quantize(requested);
        self.store_level(level);
        if self.is_on {
            self.drive(level);
        }
        level
    }

    /// Switch on at `requested`, or at the stored level when `None`.
    pub fn on(&mut self, requested: Option<f64>) -> PowerLevel {
        if requested.is_some() {
            let level = PowerLevel::quantize(requested);
            self.store_level(level);
        }
        self.is_on = true;
        let level = self.current_level;
        self.drive(level);
        level
    }

    /// De-energize every channel. Safe to call repeatedly.
    pub fn off(&mut self) {
        self.drive(PowerLevel::Off);
        self.is_on = false;
        self.current_level = PowerLevel::Off;
        self.emit(Notification::warning(
            self.name.clone(),
            "Heater switched off",
            OFF_TIMEOUT_MS,
        ));
    }

    fn store_level(&mut self, level: PowerLevel) {
        if level != self.current_level {
            self.emit(Notification::info(
                self.name.clone(),
                format!("Power set to {} ({} of {} phases)", level, level.phase_count(), PHASE_COUNT),
                POWER_CHANGE_TIMEOUT_MS,
            ));
        }
        self.current_level = level;
    }

    fn drive(&mut self, level: PowerLevel) {
        tracing::debug!("Heater '{}': driving outputs for {}", self.name, level);
        for (index, &channel) in self.phase_map.channels().iter().enumerate() {
            let energize = self.phase_map.is_energized(level, channel);
            let raw = write_value(energize, self.polarity);
            if let Err(e) = self.driver.write(channel, raw) {
                tracing::warn!("Heater '{}': write {} to channel {} failed: {}", self.name, raw, channel, e);
            }
            self.energized[index] = energize;
        }
    }

    fn emit(&self, notification: Notification) {
        if let Err(e) = self.notifier.notify(notification) {
            tracing::warn!("Heater '{}': notification not delivered: {}", self.name, e);
        }
    }
}

impl std::fmt::Debug for PowerActuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerActuator")
            .field("name", &self.name)
            .field("phase_map", &self.phase_map)
            .field("polarity", &self.polarity)
            .field("current_level", &self.current_level)
            .field("is_on", &self.is_on)
            .finish_non_exhaustive()
    }
}
