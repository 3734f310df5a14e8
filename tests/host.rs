use kettle_rs::actuator::ActuatorState;
use kettle_rs::config::parse_config;
use kettle_rs::hardware::{Level, OutputDriver, RecordingDriver};
use kettle_rs::host::{HostError, KettleHost};
use kettle_rs::notify::{ChannelNotifier, Notification, Severity};
use kettle_rs::power::PowerLevel;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn config_text(sensor: &Path) -> String {
    format!(
        r#"
[[heater]]
id = "hlt"
channels = [17, 27, 22]
polarity = "low"

[[kettle]]
name = "hot liquor tank"
heater = "hlt"
sensor_path = "{}"
target_temp = 72.0
tick_interval_ms = 10

[[kettle.phases]]
on_offset = 5.0
off_offset = 2.0

[[kettle.phases]]
on_offset = 10.0
off_offset = 5.0

[[kettle.phases]]
on_offset = 15.0
off_offset = 8.0
"#,
        sensor.display()
    )
}

struct Fixture {
    host: KettleHost,
    drivers: HashMap<String, RecordingDriver>,
    notifications: mpsc::Receiver<Notification>,
    _dir: tempfile::TempDir,
    sensor: std::path::PathBuf,
}

fn fixture(reading: Option<&str>) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let sensor = dir.path().join("w1_slave");
    if let Some(reading) = reading {
        fs::write(&sensor, reading).unwrap();
    }
    let config = parse_config(&config_text(&sensor)).unwrap();
    let (notifier, notifications) = ChannelNotifier::new(64);
    let mut drivers = HashMap::new();
    let host = KettleHost::with_driver_factory(config, Arc::new(notifier), |heater| {
        let driver = RecordingDriver::new();
        drivers.insert(heater.id.clone(), driver.clone());
        Box::new(driver) as Box<dyn OutputDriver>
    })
    .unwrap();
    Fixture {
        host,
        drivers,
        notifications,
        _dir: dir,
        sensor,
    }
}

const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// Poll the heater until `pred` holds or the wait limit passes.
async fn wait_for_heater<F>(host: &KettleHost, what: &str, pred: F) -> ActuatorState
where
    F: Fn(&ActuatorState) -> bool,
{
    tokio::time::timeout(WAIT_LIMIT, async {
        loop {
            let state = host.heater_state("hlt").await.unwrap();
            if pred(&state) {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("heater never reached: {}", what))
}

async fn wait_for_notification(rx: &mut mpsc::Receiver<Notification>, severity: Severity) -> Notification {
    tokio::time::timeout(WAIT_LIMIT, async {
        loop {
            let n = rx.recv().await.expect("notifier dropped");
            if n.severity == severity {
                return n;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {} notification", severity))
}

/// Replace the sensor file in one step so a tick never sees a partial write.
fn write_sensor(path: &Path, contents: &str) {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).unwrap();
    fs::rename(&tmp, path).unwrap();
}

fn all_high(driver: &RecordingDriver) -> bool {
    [17, 27, 22].iter().all(|ch| driver.level(*ch) == Some(Level::High))
}

#[tokio::test]
async fn test_host_initializes_heaters_off() {
    let fx = fixture(Some("60.0"));
    let driver = &fx.drivers["hlt"];
    assert!(all_high(driver));
    let state = fx.host.heater_state("hlt").await.unwrap();
    assert!(!state.is_on);
    assert_eq!(state.current_level, PowerLevel::Off);
}

#[tokio::test]
async fn test_host_runs_controller_and_shuts_down_safely() {
    let mut fx = fixture(Some("60.0"));
    fx.host.start().unwrap();
    assert!(fx.host.is_running());

    let state = wait_for_heater(&fx.host, "on at mid power", |s| s.is_on && s.current_level == PowerLevel::Mid).await;
    assert_eq!(state.energized, vec![true, true, false]);
    let driver = &fx.drivers["hlt"];
    assert_eq!(driver.level(17), Some(Level::Low));
    assert_eq!(driver.level(22), Some(Level::High));

    fx.host.setpoint("hot liquor tank").unwrap().set(90.0);
    wait_for_heater(&fx.host, "max power", |s| s.current_level == PowerLevel::Max).await;
    assert_eq!(driver.level(22), Some(Level::Low));

    fx.host.shutdown().await.unwrap();
    assert!(!fx.host.is_running());
    assert!(all_high(driver));
    assert!(!fx.host.heater_state("hlt").await.unwrap().is_on);

    let mut severities = Vec::new();
    while let Ok(n) = fx.notifications.try_recv() {
        severities.push(n.severity);
    }
    assert!(severities.contains(&Severity::Success));
    assert_eq!(severities.last(), Some(&Severity::Warning));
}

#[tokio::test]
async fn test_unreadable_sensor_keeps_heater_off() {
    let mut fx = fixture(None);
    fx.host.start().unwrap();
    let forced = wait_for_notification(&mut fx.notifications, Severity::Warning).await;
    assert_eq!(forced.title, "hlt");
    assert!(!fx.host.heater_state("hlt").await.unwrap().is_on);
    assert!(all_high(&fx.drivers["hlt"]));

    write_sensor(&fx.sensor, "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n72 01 4b 46 7f ff 0e 10 57 t=70000\n");
    let state = wait_for_heater(&fx.host, "switched back on", |s| s.is_on).await;
    assert_eq!(state.current_level, PowerLevel::Off);

    fx.host.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_host_rejects_second_start_and_unknown_names() {
    let mut fx = fixture(Some("60.0"));
    fx.host.start().unwrap();
    assert!(matches!(fx.host.start(), Err(HostError::AlreadyRunning)));
    assert!(matches!(fx.host.setpoint("boil kettle"), Err(HostError::UnknownKettle(_))));
    assert!(matches!(fx.host.heater_state("boil").await, Err(HostError::Registry(_))));
    fx.host.shutdown().await.unwrap();
}

#[test]
fn test_host_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = parse_config(&config_text(&dir.path().join("t"))).unwrap();
    config.kettles[0].phases[0].off_offset = 9.0;
    let result = KettleHost::with_driver_factory(config, Arc::new(ChannelNotifier::new(1).0), |_| {
        Box::new(RecordingDriver::new()) as Box<dyn OutputDriver>
    });
    assert!(matches!(result, Err(HostError::Config(_))));
}
