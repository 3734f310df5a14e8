//! Lumped thermal model of a vessel heated by switched phases.
//!
//! The vessel is also the simulated hardware: it implements [`OutputDriver`]
//! so an actuator can switch its phases, and [`TemperatureSource`] so a
//! controller can read it. Clones share the same state.

use async_trait::async_trait;
use kettle_shared::{ChannelId, Direction, HardwareError, Level, OutputDriver, SensorError, TemperatureSource};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq)]
pub struct VesselParams {
    /// Heating power of one energized phase (W).
    pub watts_per_phase: f64,
    /// Heat capacity of vessel and contents (J/K).
    pub heat_capacity: f64,
    /// Heat loss to ambient (W/K).
    pub loss_coefficient: f64,
    pub ambient_temp: f64,
    /// First-order sensor lag (1/s). Zero disables the lag.
    pub sensor_lag: f64,
    /// Peak-to-peak uniform noise added to each reading.
    pub sensor_noise: f64,
}

impl Default for VesselParams {
    fn default() -> Self {
        // 30 l of water on a 3 x 2 kW element.
        Self {
            watts_per_phase: 2000.0,
            heat_capacity: 125_000.0,
            loss_coefficient: 8.0,
            ambient_temp: 20.0,
            sensor_lag: 0.0,
            sensor_noise: 0.0,
        }
    }
}

#[derive(Debug)]
struct VesselState {
    temp: f64,
    measured_temp: f64,
    elapsed_s: f64,
    /// Channels wired to heating phases and whether LOW energizes them.
    phases: Vec<ChannelId>,
    active_low: bool,
    exported: Vec<ChannelId>,
    levels: HashMap<ChannelId, Level>,
}

#[derive(Debug, Clone)]
pub struct SimVessel {
    params: VesselParams,
    state: Arc<Mutex<VesselState>>,
}

impl SimVessel {
    pub fn new(params: VesselParams, start_temp: f64, phases: &[ChannelId], active_low: bool) -> Self {
        tracing::info!(
            "Simulated vessel at {:.1}°C with {} phases of {:.0} W",
            start_temp,
            phases.len(),
            params.watts_per_phase
        );
        Self {
            params,
            state: Arc::new(Mutex::new(VesselState {
                temp: start_temp,
                measured_temp: start_temp,
                elapsed_s: 0.0,
                phases: phases.to_vec(),
                active_low,
                exported: Vec::new(),
                levels: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VesselState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn temperature(&self) -> f64 {
        self.lock().temp
    }

    pub fn elapsed_s(&self) -> f64 {
        self.lock().elapsed_s
    }

    /// Number of phases whose raw level currently means energized.
    pub fn energized_phases(&self) -> usize {
        let state = self.lock();
        state
            .phases
            .iter()
            .filter(|ch| match state.levels.get(*ch) {
                Some(Level::High) => !state.active_low,
                Some(Level::Low) => state.active_low,
                None => false,
            })
            .count()
    }

    /// Advance the physics by `dt` seconds.
    pub fn step(&self, dt: f64) {
        let active = self.energized_phases() as f64;
        let p = &self.params;
        let mut guard = self.lock();
        let state = &mut *guard;
        let heat_gain = active * p.watts_per_phase;
        let heat_loss = p.loss_coefficient * (state.temp - p.ambient_temp);
        state.temp += (heat_gain - heat_loss) * dt / p.heat_capacity;
        state.measured_temp = if p.sensor_lag > 0.0 {
            let alpha = (p.sensor_lag * dt).min(1.0);
            state.measured_temp + alpha * (state.temp - state.measured_temp)
        } else {
            state.temp
        };
        state.elapsed_s += dt;
    }
}

impl OutputDriver for SimVessel {
    fn export(&mut self, channel: ChannelId) -> Result<(), HardwareError> {
        let mut state = self.lock();
        if !state.exported.contains(&channel) {
            state.exported.push(channel);
        }
        Ok(())
    }

    fn set_direction(&mut self, channel: ChannelId, direction: Direction) -> Result<(), HardwareError> {
        let state = self.lock();
        if !state.exported.contains(&channel) {
            return Err(HardwareError::NotExported(channel));
        }
        if direction != Direction::Out {
            return Err(HardwareError::Rejected {
                channel,
                reason: "simulated phases are outputs".to_string(),
            });
        }
        Ok(())
    }

    fn write(&mut self, channel: ChannelId, level: Level) -> Result<(), HardwareError> {
        let mut state = self.lock();
        if !state.exported.contains(&channel) {
            return Err(HardwareError::NotExported(channel));
        }
        state.levels.insert(channel, level);
        Ok(())
    }
}

#[async_trait]
impl TemperatureSource for SimVessel {
    async fn read_temperature(&self) -> Result<f64, SensorError> {
        let measured = self.lock().measured_temp;
        let noise = if self.params.sensor_noise > 0.0 {
            self.params.sensor_noise * (rand::random::<f64>() - 0.5)
        } else {
            0.0
        };
        Ok(measured + noise)
    }
}
