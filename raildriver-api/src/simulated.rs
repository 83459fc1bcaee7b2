//! In-memory backend
//!
//! `SimulatedDriver` behaves like the plugin attached to a running simulator,
//! minus the simulator. State lives behind a mutex so a test or a demo can
//! move the controls from one thread while a listener reads from another.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::driver::{virtual_index, RawDriver, CONTROLLER_LIST_SEPARATOR};
use crate::error::{ApiError, Result};
use crate::value::{LocoInfo, ValueKind};

#[derive(Debug, Clone, PartialEq)]
struct Controller {
    name: String,
    current: f32,
    min: f32,
    max: f32,
}

#[derive(Debug, Default)]
struct SimulatedState {
    loco: Option<LocoInfo>,
    controllers: Vec<Controller>,
    virtuals: BTreeMap<u32, f32>,
    connected: bool,
    fail_next_read: Option<String>,
}

/// A [`RawDriver`] backed by plain memory
#[derive(Debug)]
pub struct SimulatedDriver {
    state: Mutex<SimulatedState>,
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDriver {
    /// Driver with no loco loaded and every virtual reading at zero
    pub fn new() -> Self {
        let virtuals = virtual_index::ALL.iter().map(|&index| (index, 0.0)).collect();
        Self {
            state: Mutex::new(SimulatedState {
                virtuals,
                ..Default::default()
            }),
        }
    }

    /// Replace the current loco and its controllers
    ///
    /// Each controller is `(name, current, min, max)`; list order becomes
    /// controller index order.
    pub fn load_loco<'a>(
        &self,
        info: LocoInfo,
        controllers: impl IntoIterator<Item = (&'a str, f32, f32, f32)>,
    ) {
        let mut state = self.state.lock();
        state.loco = Some(info);
        state.controllers = controllers
            .into_iter()
            .map(|(name, current, min, max)| Controller {
                name: name.to_string(),
                current,
                min,
                max,
            })
            .collect();
    }

    /// Drop the loco and all of its controllers
    pub fn unload_loco(&self) {
        let mut state = self.state.lock();
        state.loco = None;
        state.controllers.clear();
    }

    /// Set the current value of a named controller
    pub fn set_current(&self, name: &str, value: f32) -> Result<()> {
        let mut state = self.state.lock();
        let controller = state
            .controllers
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| ApiError::ControllerNotFound(name.to_string()))?;
        controller.current = value;
        Ok(())
    }

    /// Set one of the always-available readings (see [`virtual_index`])
    pub fn set_virtual(&self, index: u32, value: f32) {
        self.state.lock().virtuals.insert(index, value);
    }

    /// Remove a controller, shifting later controllers down one index
    pub fn remove_controller(&self, name: &str) -> bool {
        let mut state = self.state.lock();
        let before = state.controllers.len();
        state.controllers.retain(|c| c.name != name);
        state.controllers.len() != before
    }

    /// Make the next value read fail with a driver error
    pub fn fail_next_read(&self, message: impl Into<String>) {
        self.state.lock().fail_next_read = Some(message.into());
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }
}

impl RawDriver for SimulatedDriver {
    fn controller_list(&self) -> Result<String> {
        let state = self.state.lock();
        Ok(state
            .controllers
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(CONTROLLER_LIST_SEPARATOR))
    }

    fn loco_name(&self) -> Result<String> {
        let state = self.state.lock();
        Ok(state.loco.as_ref().map(LocoInfo::to_raw).unwrap_or_default())
    }

    fn controller_value(&self, index: u32, kind: ValueKind) -> Result<f32> {
        let mut state = self.state.lock();
        if let Some(message) = state.fail_next_read.take() {
            return Err(ApiError::Driver(message));
        }

        if let Some(value) = state.virtuals.get(&index) {
            return Ok(*value);
        }

        let controller = state
            .controllers
            .get(index as usize)
            .ok_or_else(|| ApiError::Driver(format!("controller index {} out of range", index)))?;

        Ok(match kind {
            ValueKind::Current => controller.current,
            ValueKind::Min => controller.min,
            ValueKind::Max => controller.max,
        })
    }

    fn set_controller_value(&self, index: u32, value: f32) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(virtual_value) = state.virtuals.get_mut(&index) {
            *virtual_value = value;
            return Ok(());
        }

        let controller = state
            .controllers
            .get_mut(index as usize)
            .ok_or_else(|| ApiError::Driver(format!("controller index {} out of range", index)))?;
        controller.current = value;
        Ok(())
    }

    fn set_connected(&self, connected: bool) -> Result<()> {
        self.state.lock().connected = connected;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_driver() {
        let driver = SimulatedDriver::new();
        assert_eq!(driver.controller_list().unwrap(), "");
        assert_eq!(driver.loco_name().unwrap(), "");
        assert_eq!(
            driver
                .controller_value(virtual_index::HEADING, ValueKind::Current)
                .unwrap(),
            0.0
        );
        assert!(driver.controller_value(0, ValueKind::Current).is_err());
    }

    #[test]
    fn test_load_and_mutate() {
        let driver = SimulatedDriver::new();
        driver.load_loco(
            LocoInfo::new("AP", "Class 47", "47 BR Blue"),
            [("Regulator", 0.0, 0.0, 1.0), ("Reverser", 0.0, -1.0, 1.0)],
        );
        assert_eq!(driver.controller_list().unwrap(), "Regulator::Reverser");
        assert_eq!(driver.loco_name().unwrap(), "AP.:.Class 47.:.47 BR Blue");

        driver.set_current("Reverser", 1.0).unwrap();
        assert_eq!(driver.controller_value(1, ValueKind::Current).unwrap(), 1.0);
        assert_eq!(driver.controller_value(1, ValueKind::Min).unwrap(), -1.0);
        assert!(driver.set_current("Horn", 1.0).is_err());

        assert!(driver.remove_controller("Regulator"));
        assert!(!driver.remove_controller("Regulator"));
        assert_eq!(driver.controller_list().unwrap(), "Reverser");
    }

    #[test]
    fn test_fail_next_read_is_one_shot() {
        let driver = SimulatedDriver::new();
        driver.fail_next_read("plugin crashed");
        assert_eq!(
            driver.controller_value(virtual_index::GRADIENT, ValueKind::Current),
            Err(ApiError::Driver("plugin crashed".to_string()))
        );
        assert!(driver
            .controller_value(virtual_index::GRADIENT, ValueKind::Current)
            .is_ok());
    }
}
