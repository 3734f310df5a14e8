use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid sensor reading: {0}")]
    Parse(String),
    #[error("Non-finite reading: {0}")]
    NonFinite(f64),
    #[error("Sensor unavailable: {0}")]
    Unavailable(String),
}

/// Source of the vessel's measured temperature.
#[async_trait]
pub trait TemperatureSource: Send + Sync {
    async fn read_temperature(&self) -> Result<f64, SensorError>;
}

/// Source of the vessel's target temperature.
#[async_trait]
pub trait SetpointSource: Send + Sync {
    async fn target_temperature(&self) -> Result<f64, SensorError>;
}
