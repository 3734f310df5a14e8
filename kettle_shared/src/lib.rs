// kettle_shared: contracts between the control core and the outside world
// (output driver, notification transport, temperature and setpoint sources).

pub mod event_interface;
pub mod hardware_traits;
pub mod sensor_interface;

pub use event_interface::{Notification, Notifier, NotifyError, Severity};
pub use hardware_traits::{ChannelId, Direction, HardwareError, Level, OutputDriver};
pub use sensor_interface::{SensorError, SetpointSource, TemperatureSource};
