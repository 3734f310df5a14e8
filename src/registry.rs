// src/registry.rs - Heater registry and the handles controllers use to reach actuators
use crate::actuator::PowerActuator;
use crate::power::PowerLevel;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// An actuator shared between its owner and a registry. All mutations go
/// through the mutex, which serializes writers.
pub type SharedActuator = Arc<Mutex<PowerActuator>>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Unknown heater: {0}")]
    UnknownHeater(String),
    #[error("Heater '{0}' is already registered")]
    Duplicate(String),
}

/// The operations a controller needs from the heater it drives.
#[async_trait]
pub trait HeaterPower: Send {
    async fn set_power(&mut self, level: PowerLevel) -> Result<PowerLevel, RegistryError>;
    async fn on(&mut self, level: PowerLevel) -> Result<PowerLevel, RegistryError>;
    async fn off(&mut self) -> Result<(), RegistryError>;
}

#[async_trait]
impl HeaterPower for SharedActuator {
    async fn set_power(&mut self, level: PowerLevel) -> Result<PowerLevel, RegistryError> {
        Ok(self.lock().await.set_power(Some(f64::from(level.percent()))))
    }

    async fn on(&mut self, level: PowerLevel) -> Result<PowerLevel, RegistryError> {
        Ok(self.lock().await.on(Some(f64::from(level.percent()))))
    }

    async fn off(&mut self) -> Result<(), RegistryError> {
        self.lock().await.off();
        Ok(())
    }
}

/// Heaters keyed by id.
#[derive(Debug, Default)]
pub struct HeaterRegistry {
    heaters: HashMap<String, SharedActuator>,
}

impl HeaterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, actuator: PowerActuator) -> Result<SharedActuator, RegistryError> {
        let id = id.into();
        if self.heaters.contains_key(&id) {
            return Err(RegistryError::Duplicate(id));
        }
        let shared = Arc::new(Mutex::new(actuator));
        self.heaters.insert(id, shared.clone());
        Ok(shared)
    }

    pub fn get(&self, id: &str) -> Result<SharedActuator, RegistryError> {
        self.heaters
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownHeater(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.heaters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.heaters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heaters.is_empty()
    }

    pub async fn set_heater_power(&self, id: &str, level: PowerLevel) -> Result<PowerLevel, RegistryError> {
        let heater = self.get(id)?;
        let applied = heater.lock().await.set_power(Some(f64::from(level.percent())));
        Ok(applied)
    }

    /// Force every registered heater off.
    pub async fn all_off(&self) {
        for (id, heater) in &self.heaters {
            tracing::info!("Switching heater '{}' off", id);
            let mut actuator = heater.lock().await;
            actuator.set_power(Some(0.0));
            actuator.off();
        }
    }
}

/// Addresses a heater by id through a shared registry.
#[derive(Debug, Clone)]
pub struct RegistryHeater {
    registry: Arc<HeaterRegistry>,
    heater_id: String,
}

impl RegistryHeater {
    pub fn new(registry: Arc<HeaterRegistry>, heater_id: impl Into<String>) -> Self {
        Self {
            registry,
            heater_id: heater_id.into(),
        }
    }
}

#[async_trait]
impl HeaterPower for RegistryHeater {
    async fn set_power(&mut self, level: PowerLevel) -> Result<PowerLevel, RegistryError> {
        self.registry.set_heater_power(&self.heater_id, level).await
    }

    async fn on(&mut self, level: PowerLevel) -> Result<PowerLevel, RegistryError> {
        let heater = self.registry.get(&self.heater_id)?;
        let applied = heater.lock().await.on(Some(f64::from(level.percent())));
        Ok(applied)
    }

    async fn off(&mut self) -> Result<(), RegistryError> {
        let heater = self.registry.get(&self.heater_id)?;
        heater.lock().await.off();
        Ok(())
    }
}
