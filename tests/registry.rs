use kettle_rs::actuator::PowerActuator;
use kettle_rs::hardware::{Level, Polarity, RecordingDriver};
use kettle_rs::notify::TracingNotifier;
use kettle_rs::power::PowerLevel;
use kettle_rs::registry::{HeaterPower, HeaterRegistry, RegistryError, RegistryHeater};
use std::sync::Arc;

fn heater(id: &str, channels: &[u32], driver: &RecordingDriver) -> PowerActuator {
    let mut actuator =
        PowerActuator::new(id, channels, Polarity::High, Box::new(driver.clone()), Arc::new(TracingNotifier)).unwrap();
    actuator.init();
    actuator
}

#[tokio::test]
async fn test_registry_rejects_duplicates_and_unknown_ids() {
    let driver = RecordingDriver::new();
    let mut registry = HeaterRegistry::new();
    registry.insert("hlt", heater("hlt", &[1, 2, 3], &driver)).unwrap();
    let err = registry.insert("hlt", heater("hlt", &[4, 5, 6], &driver)).unwrap_err();
    assert_eq!(err, RegistryError::Duplicate("hlt".to_string()));

    let err = registry.set_heater_power("boil", PowerLevel::Max).await.unwrap_err();
    assert_eq!(err, RegistryError::UnknownHeater("boil".to_string()));
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_set_heater_power_defers_until_on() {
    let driver = RecordingDriver::new();
    let mut registry = HeaterRegistry::new();
    registry.insert("hlt", heater("hlt", &[1, 2, 3], &driver)).unwrap();
    driver.clear();

    let applied = registry.set_heater_power("hlt", PowerLevel::Low).await.unwrap();
    assert_eq!(applied, PowerLevel::Low);
    assert!(driver.writes().is_empty());

    let mut handle = RegistryHeater::new(Arc::new(registry), "hlt");
    handle.on(PowerLevel::Low).await.unwrap();
    assert_eq!(driver.writes(), vec![(1, Level::High), (2, Level::Low), (3, Level::Low)]);
}

#[tokio::test]
async fn test_all_off_switches_every_heater_off() {
    let hlt_driver = RecordingDriver::new();
    let boil_driver = RecordingDriver::new();
    let mut registry = HeaterRegistry::new();
    let hlt = registry.insert("hlt", heater("hlt", &[1, 2, 3], &hlt_driver)).unwrap();
    registry.insert("boil", heater("boil", &[4, 5, 6], &boil_driver)).unwrap();
    let registry = Arc::new(registry);

    let mut direct = hlt.clone();
    direct.on(PowerLevel::Max).await.unwrap();
    let mut handle = RegistryHeater::new(registry.clone(), "boil");
    handle.on(PowerLevel::Mid).await.unwrap();
    assert_eq!(boil_driver.level(5), Some(Level::High));

    registry.all_off().await;

    assert!(!hlt.lock().await.is_on());
    for ch in [1, 2, 3] {
        assert_eq!(hlt_driver.level(ch), Some(Level::Low));
    }
    for ch in [4, 5, 6] {
        assert_eq!(boil_driver.level(ch), Some(Level::Low));
    }
    let mut ids: Vec<_> = registry.ids().collect();
    ids.sort();
    assert_eq!(ids, ["boil", "hlt"]);
}
