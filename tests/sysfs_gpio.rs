use kettle_rs::actuator::PowerActuator;
use kettle_rs::hardware::{Direction, HardwareError, Level, OutputDriver, Polarity, SysfsGpio};
use kettle_rs::notify::TracingNotifier;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Lay out `gpio<N>` directories the way the kernel does after an export.
fn fake_export(root: &Path, channels: &[u32]) {
    for ch in channels {
        let dir = root.join(format!("gpio{}", ch));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("direction"), "in").unwrap();
        fs::write(dir.join("value"), "0").unwrap();
    }
}

fn read_attr(root: &Path, ch: u32, attr: &str) -> String {
    fs::read_to_string(root.join(format!("gpio{}", ch)).join(attr)).unwrap()
}

#[test]
fn test_export_writes_channel_number() {
    let dir = tempfile::tempdir().unwrap();
    let mut gpio = SysfsGpio::new(dir.path());
    gpio.export(17).unwrap();
    assert_eq!(fs::read_to_string(dir.path().join("export")).unwrap(), "17");
}

#[test]
fn test_export_skips_already_exported_channel() {
    let dir = tempfile::tempdir().unwrap();
    fake_export(dir.path(), &[17]);
    let mut gpio = SysfsGpio::new(dir.path());
    gpio.export(17).unwrap();
    assert!(!dir.path().join("export").exists());
}

#[test]
fn test_direction_and_value_attributes() {
    let dir = tempfile::tempdir().unwrap();
    fake_export(dir.path(), &[27]);
    let mut gpio = SysfsGpio::new(dir.path());
    gpio.set_direction(27, Direction::Out).unwrap();
    gpio.write(27, Level::High).unwrap();
    assert_eq!(read_attr(dir.path(), 27, "direction"), "out");
    assert_eq!(read_attr(dir.path(), 27, "value"), "1");
}

#[test]
fn test_write_to_unexported_channel_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut gpio = SysfsGpio::new(dir.path());
    assert!(matches!(gpio.write(22, Level::Low), Err(HardwareError::NotExported(22))));
}

#[test]
fn test_actuator_init_on_sysfs_tree_active_low() {
    let dir = tempfile::tempdir().unwrap();
    fake_export(dir.path(), &[17, 27, 22]);
    let mut actuator = PowerActuator::new(
        "hlt",
        &[17, 27, 22],
        Polarity::Low,
        Box::new(SysfsGpio::new(dir.path())),
        Arc::new(TracingNotifier),
    )
    .unwrap();
    actuator.init();
    for ch in [17, 27, 22] {
        assert_eq!(read_attr(dir.path(), ch, "direction"), "out");
        assert_eq!(read_attr(dir.path(), ch, "value"), "1");
    }

    actuator.on(Some(33.0));
    assert_eq!(read_attr(dir.path(), 17, "value"), "0");
    assert_eq!(read_attr(dir.path(), 27, "value"), "1");
}

#[test]
fn test_actuator_survives_missing_gpio_tree() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-such-root");
    let mut actuator = PowerActuator::new(
        "hlt",
        &[17, 27, 22],
        Polarity::High,
        Box::new(SysfsGpio::new(&missing)),
        Arc::new(TracingNotifier),
    )
    .unwrap();
    actuator.init();
    actuator.on(Some(100.0));
    actuator.off();
    assert!(!actuator.is_on());
}
