// kettle_simulator: closed-loop vessel simulation for exercising the controller
// without hardware.

pub mod trace;
pub mod vessel;

pub use trace::{TraceRow, TraceWriter};
pub use vessel::{SimVessel, VesselParams};
