// src/sensor.rs - Temperature and setpoint sources
pub use kettle_shared::{SensorError, SetpointSource, TemperatureSource};

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Reads temperature from a file.
///
/// Understands the 1-Wire `w1_slave` format (CRC line ending in `YES`, data
/// line carrying `t=<millidegrees>`); anything else is parsed as a plain
/// number of degrees.
#[derive(Debug, Clone)]
pub struct FileThermometer {
    path: PathBuf,
}

impl FileThermometer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Parse the contents of a thermometer file into degrees.
pub fn parse_reading(contents: &str) -> Result<f64, SensorError> {
    let value = if let Some(pos) = contents.find("t=") {
        let crc_ok = contents
            .lines()
            .next()
            .map(|line| line.trim_end().ends_with("YES"))
            .unwrap_or(false);
        if !crc_ok {
            return Err(SensorError::Parse("1-Wire CRC check failed".to_string()));
        }
        let raw = contents[pos + 2..].trim();
        let millis: f64 = raw
            .parse()
            .map_err(|_| SensorError::Parse(format!("bad 1-Wire value '{}'", raw)))?;
        millis / 1000.0
    } else {
        let raw = contents.trim();
        raw.parse::<f64>()
            .map_err(|_| SensorError::Parse(format!("bad temperature '{}'", raw)))?
    };
    if !value.is_finite() {
        return Err(SensorError::NonFinite(value));
    }
    Ok(value)
}

#[async_trait]
impl TemperatureSource for FileThermometer {
    async fn read_temperature(&self) -> Result<f64, SensorError> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        parse_reading(&contents)
    }
}

/// Adjustable target temperature. Clones observe the same value.
#[derive(Debug, Clone)]
pub struct Setpoint {
    tx: Arc<watch::Sender<f64>>,
}

impl Setpoint {
    pub fn new(target: f64) -> Self {
        let (tx, _rx) = watch::channel(target);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> f64 {
        *self.tx.borrow()
    }

    pub fn set(&self, target: f64) {
        tracing::info!("Setting target temperature: {:.1}°C", target);
        self.tx.send_replace(target);
    }
}

#[async_trait]
impl SetpointSource for Setpoint {
    async fn target_temperature(&self) -> Result<f64, SensorError> {
        let target = self.get();
        if !target.is_finite() {
            return Err(SensorError::NonFinite(target));
        }
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W1_GOOD: &str = "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n72 01 4b 46 7f ff 0e 10 57 t=23125\n";
    const W1_BAD_CRC: &str = "72 01 4b 46 7f ff 0e 10 57 : crc=57 NO\n72 01 4b 46 7f ff 0e 10 57 t=23125\n";

    #[test]
    fn parses_one_wire_millidegrees() {
        assert!((parse_reading(W1_GOOD).unwrap() - 23.125).abs() < 1e-9);
    }

    #[test]
    fn rejects_one_wire_crc_failure() {
        assert!(matches!(parse_reading(W1_BAD_CRC), Err(SensorError::Parse(_))));
    }

    #[test]
    fn parses_plain_number() {
        assert_eq!(parse_reading(" 64.5\n").unwrap(), 64.5);
        assert!(parse_reading("hot").is_err());
        assert!(matches!(parse_reading("NaN"), Err(SensorError::NonFinite(_))));
    }

    #[tokio::test]
    async fn setpoint_clones_share_value() {
        let setpoint = Setpoint::new(66.0);
        let handle = setpoint.clone();
        handle.set(72.5);
        assert_eq!(setpoint.target_temperature().await.unwrap(), 72.5);
    }
}
