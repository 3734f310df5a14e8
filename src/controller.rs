//! # Multi-phase hysteresis controller
//!
//! Each tick reads the measured and target temperature, computes
//! `offset = target - measured`, and tests every phase against its own band:
//!
//! ```text
//! on(p) = offset >= on_offset[p] && !(offset <= off_offset[p])
//! ```
//!
//! The test is recomputed from scratch every tick; no previous decision is
//! remembered. The number of phases that pass is mapped to a power level and
//! handed to the heater.
//!
//! A failed or non-finite reading engages a fail-safe (power 0, then off)
//! once per failure episode. The loop keeps running and resumes normal control
//! on the next good reading.
//!
//! ## Example
//!
//! ```rust
//! use kettle_rs::controller::{PhaseThreshold, PhaseThresholds};
//! let thresholds = PhaseThresholds::new(&[
//!     PhaseThreshold::new(5.0, 2.0),
//!     PhaseThreshold::new(10.0, 5.0),
//!     PhaseThreshold::new(15.0, 8.0),
//! ])
//! .unwrap();
//! assert_eq!(thresholds.evaluate(12.0), [true, true, false]);
//! ```

use crate::notify::{Notification, Notifier, TracingNotifier};
use crate::power::{PowerLevel, PHASE_COUNT};
use crate::registry::HeaterPower;
use crate::sensor::{SensorError, SetpointSource, TemperatureSource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);
/// Upper bound on one temperature or setpoint read before it counts as failed.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);
/// How long `RunningController::stop` waits for the loop before aborting it.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);
pub const START_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControllerError {
    #[error("Expected {expected} phase thresholds, got {got}")]
    PhaseCount { expected: usize, got: usize },
    #[error("Phase {phase}: thresholds must be finite")]
    NonFinite { phase: usize },
    #[error("Phase {phase}: off offset {off_offset} must be below on offset {on_offset}")]
    InvertedBand {
        phase: usize,
        on_offset: f64,
        off_offset: f64,
    },
    #[error("Tick interval must be positive")]
    InvalidInterval,
    #[error("Controller task failed: {0}")]
    Task(String),
    #[error("Controller '{0}' did not stop in time and was aborted")]
    StopTimeout(String),
}

/// Temperature-offset band of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseThreshold {
    pub on_offset: f64,
    pub off_offset: f64,
}

impl PhaseThreshold {
    pub const fn new(on_offset: f64, off_offset: f64) -> Self {
        Self { on_offset, off_offset }
    }

    /// `phase` is 1-based and only used for error reporting.
    pub fn validate(&self, phase: usize) -> Result<(), ControllerError> {
        if !self.on_offset.is_finite() || !self.off_offset.is_finite() {
            return Err(ControllerError::NonFinite { phase });
        }
        if self.off_offset >= self.on_offset {
            return Err(ControllerError::InvertedBand {
                phase,
                on_offset: self.on_offset,
                off_offset: self.off_offset,
            });
        }
        Ok(())
    }

    pub fn should_be_on(&self, offset: f64) -> bool {
        offset >= self.on_offset && !(offset <= self.off_offset)
    }
}

/// Validated thresholds for all phases, in phase order.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseThresholds {
    phases: [PhaseThreshold; PHASE_COUNT],
}

impl PhaseThresholds {
    pub fn new(phases: &[PhaseThreshold]) -> Result<Self, ControllerError> {
        let phases: [PhaseThreshold; PHASE_COUNT] =
            phases.try_into().map_err(|_| ControllerError::PhaseCount {
                expected: PHASE_COUNT,
                got: phases.len(),
            })?;
        for (index, phase) in phases.iter().enumerate() {
            phase.validate(index + 1)?;
        }
        Ok(Self { phases })
    }

    pub fn evaluate(&self, offset: f64) -> [bool; PHASE_COUNT] {
        self.phases.map(|phase| phase.should_be_on(offset))
    }
}

/// Readings taken at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    pub target_temp: f64,
    pub measured_temp: f64,
    pub running: bool,
}

impl ControlState {
    pub fn offset(&self) -> f64 {
        self.target_temp - self.measured_temp
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub state: ControlState,
    pub decisions: [bool; PHASE_COUNT],
    pub active_phases: usize,
    pub level: PowerLevel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Applied(TickReport),
    /// Readings could not be trusted; the heater was forced off.
    FailSafe { reason: String },
    /// The controller was stopped; the heater was not touched.
    Stopped,
}

/// Hysteresis control loop for one vessel.
pub struct HysteresisController<H, T, S> {
    name: String,
    thresholds: PhaseThresholds,
    heater: H,
    sensor: T,
    setpoint: S,
    tick_interval: Duration,
    read_timeout: Duration,
    notifier: Arc<dyn Notifier>,
    running: bool,
    stopped: bool,
    fail_safe_engaged: bool,
}

impl<H, T, S> HysteresisController<H, T, S>
where
    H: HeaterPower,
    T: TemperatureSource,
    S: SetpointSource,
{
    pub fn new(name: impl Into<String>, thresholds: PhaseThresholds, heater: H, sensor: T, setpoint: S) -> Self {
        Self {
            name: name.into(),
            thresholds,
            heater,
            sensor,
            setpoint,
            tick_interval: DEFAULT_TICK_INTERVAL,
            read_timeout: DEFAULT_READ_TIMEOUT,
            notifier: Arc::new(TracingNotifier),
            running: false,
            stopped: false,
            fail_safe_engaged: false,
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Result<Self, ControllerError> {
        if interval.is_zero() {
            return Err(ControllerError::InvalidInterval);
        }
        self.tick_interval = interval;
        Ok(self)
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Result<Self, ControllerError> {
        if timeout.is_zero() {
            return Err(ControllerError::InvalidInterval);
        }
        self.read_timeout = timeout;
        Ok(self)
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_fail_safe_engaged(&self) -> bool {
        self.fail_safe_engaged
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Run one poll/decide/act cycle.
    ///
    /// Also usable without `start` to step the controller by hand. Once
    /// `stop` has been called the tick is a no-op until the next `start`.
    pub async fn tick(&mut self) -> TickOutcome {
        if self.stopped {
            tracing::debug!("Kettle '{}': tick ignored, controller stopped", self.name);
            return TickOutcome::Stopped;
        }
        let state = match Self::read_state(&self.sensor, &self.setpoint, self.running, self.read_timeout).await {
            Ok(state) => state,
            Err(e) => {
                let reason = e.to_string();
                self.engage_fail_safe(&reason).await;
                return TickOutcome::FailSafe { reason };
            }
        };
        if self.fail_safe_engaged {
            tracing::info!("Kettle '{}': readings recovered, resuming control", self.name);
            self.fail_safe_engaged = false;
        }

        let decisions = self.thresholds.evaluate(state.offset());
        let active_phases = decisions.iter().filter(|on| **on).count();
        let level = PowerLevel::for_active_phases(active_phases);
        tracing::debug!(
            "Kettle '{}': measured={:.2} target={:.2} offset={:.2} phases={:?} -> {}",
            self.name,
            state.measured_temp,
            state.target_temp,
            state.offset(),
            decisions,
            level
        );

        if let Err(e) = self.heater.set_power(level).await {
            tracing::warn!("Kettle '{}': set power failed: {}", self.name, e);
        }
        if let Err(e) = self.heater.on(level).await {
            tracing::warn!("Kettle '{}': switching heater on failed: {}", self.name, e);
        }

        TickOutcome::Applied(TickReport {
            state,
            decisions,
            active_phases,
            level,
        })
    }

    /// Force the heater to power 0 and off. Safe to call when already off.
    pub async fn stop(&mut self) {
        self.running = false;
        self.stopped = true;
        self.force_off().await;
        tracing::info!("Kettle '{}': hysteresis control stopped", self.name);
    }

    async fn read_state(
        sensor: &T,
        setpoint: &S,
        running: bool,
        read_timeout: Duration,
    ) -> Result<ControlState, SensorError> {
        let measured_temp = tokio::time::timeout(read_timeout, sensor.read_temperature())
            .await
            .map_err(|_| SensorError::Unavailable(format!("temperature read timed out after {:?}", read_timeout)))??;
        if !measured_temp.is_finite() {
            return Err(SensorError::NonFinite(measured_temp));
        }
        let target_temp = tokio::time::timeout(read_timeout, setpoint.target_temperature())
            .await
            .map_err(|_| SensorError::Unavailable(format!("setpoint read timed out after {:?}", read_timeout)))??;
        if !target_temp.is_finite() {
            return Err(SensorError::NonFinite(target_temp));
        }
        Ok(ControlState {
            target_temp,
            measured_temp,
            running,
        })
    }

    async fn engage_fail_safe(&mut self, reason: &str) {
        if self.fail_safe_engaged {
            tracing::debug!("Kettle '{}': readings still unavailable: {}", self.name, reason);
            return;
        }
        tracing::warn!("Kettle '{}': cannot confirm safe state ({}), forcing heater off", self.name, reason);
        self.force_off().await;
        self.fail_safe_engaged = true;
    }

    async fn force_off(&mut self) {
        if let Err(e) = self.heater.set_power(PowerLevel::Off).await {
            tracing::warn!("Kettle '{}': set power 0 failed: {}", self.name, e);
        }
        if let Err(e) = self.heater.off().await {
            tracing::warn!("Kettle '{}': switching heater off failed: {}", self.name, e);
        }
    }
}

impl<H, T, S> HysteresisController<H, T, S>
where
    H: HeaterPower + 'static,
    T: TemperatureSource + 'static,
    S: SetpointSource + 'static,
{
    /// Spawn the tick loop on its own task.
    pub fn start(mut self) -> RunningController<H, T, S> {
        let (running_tx, running_rx) = watch::channel(true);
        self.running = true;
        self.stopped = false;
        let name = self.name.clone();
        tracing::info!(
            "Kettle '{}': starting hysteresis control every {:?}",
            name,
            self.tick_interval
        );
        if let Err(e) = self.notifier.notify(Notification::success(
            name.clone(),
            "Hysteresis control started",
            START_TIMEOUT_MS,
        )) {
            tracing::warn!("Kettle '{}': notification not delivered: {}", name, e);
        }
        let task = tokio::spawn(self.run(running_rx));
        RunningController { name, running_tx, task }
    }

    async fn run(mut self, mut running_rx: watch::Receiver<bool>) -> Self {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                changed = running_rx.changed() => {
                    let running = changed.is_ok() && *running_rx.borrow_and_update();
                    if !running {
                        break;
                    }
                }
                _ = interval.tick() => {
                    let running = *running_rx.borrow();
                    if !running {
                        break;
                    }
                    // A stalled read must not hold off a stop request.
                    tokio::select! {
                        biased;
                        changed = running_rx.changed() => {
                            let running = changed.is_ok() && *running_rx.borrow_and_update();
                            if !running {
                                tracing::warn!("Kettle '{}': stop requested mid-tick, abandoning tick", self.name);
                                break;
                            }
                        }
                        _ = self.tick() => {}
                    }
                }
            }
        }
        self.stop().await;
        self
    }
}

/// Handle to a controller whose loop is running on a task.
pub struct RunningController<H, T, S> {
    name: String,
    running_tx: watch::Sender<bool>,
    task: JoinHandle<HysteresisController<H, T, S>>,
}

impl<H, T, S> RunningController<H, T, S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        *self.running_tx.borrow() && !self.task.is_finished()
    }

    /// Signal the loop to stop, wait for it to switch the heater off, and
    /// hand the stopped controller back.
    ///
    /// If the loop has not finished within [`STOP_TIMEOUT`] the task is
    /// aborted and `StopTimeout` returned; the caller must then switch the
    /// heater off itself.
    pub async fn stop(mut self) -> Result<HysteresisController<H, T, S>, ControllerError> {
        tracing::info!("Kettle '{}': stop requested", self.name);
        self.running_tx.send_replace(false);
        match tokio::time::timeout(STOP_TIMEOUT, &mut self.task).await {
            Ok(joined) => joined.map_err(|e| ControllerError::Task(e.to_string())),
            Err(_) => {
                tracing::error!("Kettle '{}': loop did not stop within {:?}, aborting", self.name, STOP_TIMEOUT);
                self.task.abort();
                Err(ControllerError::StopTimeout(self.name))
            }
        }
    }
}
