// kettle-rs: hysteresis temperature control for multi-phase electric heaters.

pub mod actuator;
pub mod config;
pub mod controller;
pub mod hardware;
pub mod host;
pub mod notify;
pub mod power;
pub mod registry;
pub mod sensor;

pub use actuator::{ActuatorState, PowerActuator};
pub use config::{Config, ConfigError};
pub use controller::{HysteresisController, PhaseThreshold, PhaseThresholds, RunningController, TickOutcome};
pub use host::{HostError, KettleHost};
pub use power::{PowerLevel, PHASE_COUNT};
pub use registry::{HeaterPower, HeaterRegistry, RegistryHeater, SharedActuator};
