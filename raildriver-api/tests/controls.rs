//! Named control behaviour through the public API

use proptest::prelude::*;
use raildriver_api::{ApiError, LocoInfo, RailDriver, SimulatedDriver};

fn driver_with(controls: &[&str]) -> RailDriver<SimulatedDriver> {
    let backend = SimulatedDriver::new();
    backend.load_loco(
        LocoInfo::new("DTG", "Test Pack", "Test Loco"),
        controls.iter().map(|&name| (name, 0.0, -1.0, 1.0)),
    );
    RailDriver::new(backend)
}

#[test]
fn loco_swap_changes_available_controls() {
    let driver = driver_with(&["Regulator", "SpeedometerKPH"]);
    assert!(driver.has_control("Regulator").unwrap());

    driver.backend().load_loco(
        LocoInfo::new("AP", "Other Pack", "Other Loco"),
        [("SimpleThrottle", 0.0, 0.0, 1.0)],
    );

    assert!(!driver.has_control("Regulator").unwrap());
    assert_eq!(
        driver.regulator(),
        Err(ApiError::ControllerNotFound("Regulator".to_string()))
    );
    driver.set_simple_throttle(20.0).unwrap();
    assert_eq!(driver.simple_throttle().unwrap(), 0.2);
}

#[test]
fn speed_prefers_kph() {
    let driver = driver_with(&["SpeedometerMPH", "SpeedometerKPH"]);
    driver.backend().set_current("SpeedometerMPH", 10.0).unwrap();
    driver.backend().set_current("SpeedometerKPH", 16.09).unwrap();
    assert_eq!(driver.speed().unwrap(), 16.1);
}

proptest! {
    #[test]
    fn percent_controls_accept_only_their_range(percent in -250.0f32..250.0) {
        let driver = driver_with(&["VirtualBrake", "Reverser"]);

        let brake = driver.set_virtual_brake(percent);
        prop_assert_eq!(brake.is_ok(), (0.0..=100.0).contains(&percent));

        let reverser = driver.set_reverser(percent);
        prop_assert_eq!(reverser.is_ok(), (-100.0..=100.0).contains(&percent));
        if reverser.is_ok() {
            prop_assert_eq!(driver.reverser().unwrap(), percent / 100.0);
        }
    }
}
