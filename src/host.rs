// src/host.rs - Builds heaters and kettle controllers from configuration
use crate::actuator::{ActuatorError, ActuatorState, PowerActuator};
use crate::config::{Config, ConfigError, HeaterConfig};
use crate::controller::{ControllerError, HysteresisController, RunningController};
use crate::hardware::{OutputDriver, SysfsGpio};
use crate::notify::{Notifier, TracingNotifier};
use crate::registry::{HeaterRegistry, RegistryError, RegistryHeater};
use crate::sensor::{FileThermometer, Setpoint};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

type KettleController = RunningController<RegistryHeater, FileThermometer, Setpoint>;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Heater '{heater}': {source}")]
    Actuator {
        heater: String,
        #[source]
        source: ActuatorError,
    },
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Controller error: {0}")]
    Controller(#[from] ControllerError),
    #[error("Unknown kettle: {0}")]
    UnknownKettle(String),
    #[error("Kettle controllers are already running")]
    AlreadyRunning,
}

/// Owns every heater and kettle controller of one installation.
pub struct KettleHost {
    config: Config,
    registry: Arc<HeaterRegistry>,
    notifier: Arc<dyn Notifier>,
    setpoints: HashMap<String, Setpoint>,
    controllers: Vec<KettleController>,
}

impl KettleHost {
    /// Build heaters on sysfs GPIO and log notifications.
    pub fn new(config: Config) -> Result<Self, HostError> {
        Self::with_driver_factory(config, Arc::new(TracingNotifier), |heater| {
            Box::new(SysfsGpio::new(&heater.gpio_root)) as Box<dyn OutputDriver>
        })
    }

    /// Build heaters with drivers from `factory`. Every heater is initialized
    /// (exported, set to output, de-energized) before this returns.
    pub fn with_driver_factory<F>(config: Config, notifier: Arc<dyn Notifier>, mut factory: F) -> Result<Self, HostError>
    where
        F: FnMut(&HeaterConfig) -> Box<dyn OutputDriver>,
    {
        config.validate()?;

        let mut registry = HeaterRegistry::new();
        for heater in &config.heaters {
            let mut actuator = PowerActuator::new(
                heater.id.clone(),
                &heater.channels,
                heater.polarity,
                factory(heater),
                notifier.clone(),
            )
            .map_err(|source| HostError::Actuator {
                heater: heater.id.clone(),
                source,
            })?;
            actuator.init();
            registry.insert(heater.id.clone(), actuator)?;
        }

        let setpoints = config
            .kettles
            .iter()
            .map(|k| (k.name.clone(), Setpoint::new(k.target_temp)))
            .collect();

        tracing::info!(
            "Kettle host ready: {} heaters, {} kettles",
            registry.len(),
            config.kettles.len()
        );

        Ok(Self {
            config,
            registry: Arc::new(registry),
            notifier,
            setpoints,
            controllers: Vec::new(),
        })
    }

    pub fn registry(&self) -> &Arc<HeaterRegistry> {
        &self.registry
    }

    /// Target temperature handle of a kettle. Changes apply on the next tick.
    pub fn setpoint(&self, kettle: &str) -> Result<Setpoint, HostError> {
        self.setpoints
            .get(kettle)
            .cloned()
            .ok_or_else(|| HostError::UnknownKettle(kettle.to_string()))
    }

    pub async fn heater_state(&self, heater: &str) -> Result<ActuatorState, HostError> {
        let actuator = self.registry.get(heater)?;
        let state = actuator.lock().await.state();
        Ok(state)
    }

    pub fn is_running(&self) -> bool {
        self.controllers.iter().any(|c| c.is_running())
    }

    /// Spawn one controller task per kettle. Must be called inside a tokio
    /// runtime.
    pub fn start(&mut self) -> Result<(), HostError> {
        if !self.controllers.is_empty() {
            return Err(HostError::AlreadyRunning);
        }
        let mut pending = Vec::with_capacity(self.config.kettles.len());
        for kettle in &self.config.kettles {
            let setpoint = self.setpoint(&kettle.name)?;
            let controller = HysteresisController::new(
                kettle.name.clone(),
                kettle.thresholds()?,
                RegistryHeater::new(self.registry.clone(), kettle.heater.clone()),
                FileThermometer::new(&kettle.sensor_path),
                setpoint,
            )
            .with_tick_interval(kettle.tick_interval())?
            .with_notifier(self.notifier.clone());
            pending.push(controller);
        }
        self.controllers = pending.into_iter().map(HysteresisController::start).collect();
        Ok(())
    }

    /// Stop every controller, then force every heater off regardless of how
    /// the controllers ended.
    pub async fn shutdown(&mut self) -> Result<(), HostError> {
        tracing::info!("Shutting down {} kettle controllers", self.controllers.len());
        let controllers = std::mem::take(&mut self.controllers);
        let results = join_all(controllers.into_iter().map(RunningController::stop)).await;

        let mut first_error = None;
        for result in results {
            if let Err(e) = result {
                tracing::warn!("Controller did not stop cleanly: {}", e);
                first_error.get_or_insert(e);
            }
        }

        self.registry.all_off().await;
        tracing::info!("All heaters switched off");
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}
