//! Typed facade over a [`RawDriver`]
//!
//! `RailDriver` turns the plugin's index-based float interface into named
//! controls, composite readings and validated setters.

use std::thread;
use std::time::Duration;

use chrono::NaiveTime;

use crate::driver::{parse_controller_list, virtual_index, RawDriver};
use crate::error::{ApiError, Result};
use crate::value::{ControllerRef, Coordinates, LocoInfo, ValueKind};

const AWS_RESET_PULSE: Duration = Duration::from_millis(100);

/// Typed access to the simulator through a raw backend
///
/// # Example
///
/// ```rust
/// use raildriver_api::{LocoInfo, RailDriver, SimulatedDriver};
///
/// let backend = SimulatedDriver::new();
/// backend.load_loco(
///     LocoInfo::new("DTG", "Class 66", "Class 66 EWS"),
///     [("Regulator", 0.0, 0.0, 1.0), ("SpeedometerKPH", 42.37, 0.0, 200.0)],
/// );
///
/// let driver = RailDriver::new(backend);
/// driver.set_regulator(50.0)?;
/// assert_eq!(driver.regulator()?, 0.5);
/// assert_eq!(driver.speed()?, 42.4);
/// # Ok::<(), raildriver_api::ApiError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RailDriver<D> {
    backend: D,
}

impl<D: RawDriver> RailDriver<D> {
    pub fn new(backend: D) -> Self {
        Self { backend }
    }

    /// Borrow the raw backend
    pub fn backend(&self) -> &D {
        &self.backend
    }

    /// `(index, name)` pairs of every controller on the current loco
    ///
    /// Indices start at 0. Empty when no loco is loaded.
    pub fn controller_list(&self) -> Result<Vec<(u32, String)>> {
        let raw = self.backend.controller_list()?;
        Ok(parse_controller_list(&raw))
    }

    /// Resolve a controller name to its index
    pub fn controller_index(&self, name: &str) -> Result<u32> {
        self.controller_list()?
            .into_iter()
            .find(|(_, n)| n == name)
            .map(|(index, _)| index)
            .ok_or_else(|| ApiError::ControllerNotFound(name.to_string()))
    }

    /// Whether the current loco has a controller with this name
    pub fn has_control(&self, name: &str) -> Result<bool> {
        Ok(self.controller_list()?.iter().any(|(_, n)| n == name))
    }

    fn resolve(&self, controller: ControllerRef) -> Result<u32> {
        match controller {
            ControllerRef::Index(index) => Ok(index),
            ControllerRef::Name(name) => self.controller_index(&name),
        }
    }

    /// Read the current, minimum or maximum value of a controller
    pub fn controller_value(
        &self,
        controller: impl Into<ControllerRef>,
        kind: ValueKind,
    ) -> Result<f32> {
        let index = self.resolve(controller.into())?;
        self.backend.controller_value(index, kind)
    }

    pub fn current_controller_value(&self, controller: impl Into<ControllerRef>) -> Result<f32> {
        self.controller_value(controller, ValueKind::Current)
    }

    pub fn min_controller_value(&self, controller: impl Into<ControllerRef>) -> Result<f32> {
        self.controller_value(controller, ValueKind::Min)
    }

    pub fn max_controller_value(&self, controller: impl Into<ControllerRef>) -> Result<f32> {
        self.controller_value(controller, ValueKind::Max)
    }

    pub fn set_controller_value(
        &self,
        controller: impl Into<ControllerRef>,
        value: f32,
    ) -> Result<()> {
        let index = self.resolve(controller.into())?;
        tracing::trace!("Setting controller {} to {}", index, value);
        self.backend.set_controller_value(index, value)
    }

    /// Set a control from a percentage, rejecting values outside `min..=max`
    fn set_percent(&self, name: &str, percent: f32, min: f32, max: f32) -> Result<()> {
        if !(min..=max).contains(&percent) {
            return Err(ApiError::InvalidParameter(format!(
                "{} must be within {}..={}, got {}",
                name, min, max, percent
            )));
        }
        self.set_controller_value(name, percent / 100.0)
    }

    pub fn regulator(&self) -> Result<f32> {
        self.current_controller_value("Regulator")
    }

    /// Set the regulator in percent (0 to 100)
    pub fn set_regulator(&self, percent: f32) -> Result<()> {
        self.set_percent("Regulator", percent, 0.0, 100.0)
    }

    pub fn reverser(&self) -> Result<f32> {
        self.current_controller_value("Reverser")
    }

    /// Set the reverser in percent (-100 full reverse to 100 full forward)
    pub fn set_reverser(&self, percent: f32) -> Result<()> {
        self.set_percent("Reverser", percent, -100.0, 100.0)
    }

    pub fn train_brake(&self) -> Result<f32> {
        self.current_controller_value("TrainBrakeControl")
    }

    pub fn set_train_brake(&self, percent: f32) -> Result<()> {
        self.set_percent("TrainBrakeControl", percent, 0.0, 100.0)
    }

    pub fn simple_throttle(&self) -> Result<f32> {
        self.current_controller_value("SimpleThrottle")
    }

    pub fn set_simple_throttle(&self, percent: f32) -> Result<()> {
        self.set_percent("SimpleThrottle", percent, 0.0, 100.0)
    }

    pub fn virtual_brake(&self) -> Result<f32> {
        self.current_controller_value("VirtualBrake")
    }

    pub fn set_virtual_brake(&self, percent: f32) -> Result<()> {
        self.set_percent("VirtualBrake", percent, 0.0, 100.0)
    }

    pub fn dynamic_brake(&self) -> Result<f32> {
        self.current_controller_value("DynamicBrake")
    }

    pub fn set_dynamic_brake(&self, percent: f32) -> Result<()> {
        self.set_percent("DynamicBrake", percent, 0.0, 100.0)
    }

    /// Speedometer reading rounded to one decimal
    ///
    /// Uses the KPH speedometer when the loco has one, otherwise MPH.
    pub fn speed(&self) -> Result<f32> {
        let value = match self.current_controller_value("SpeedometerKPH") {
            Err(ApiError::ControllerNotFound(_)) => {
                self.current_controller_value("SpeedometerMPH")?
            }
            other => other?,
        };
        Ok((value * 10.0).round() / 10.0)
    }

    /// Current geographic position of the train
    pub fn coordinates(&self) -> Result<Coordinates> {
        Ok(Coordinates::new(
            self.current_controller_value(virtual_index::LATITUDE)?,
            self.current_controller_value(virtual_index::LONGITUDE)?,
        ))
    }

    pub fn fuel_level(&self) -> Result<f32> {
        self.current_controller_value(virtual_index::FUEL_LEVEL)
    }

    pub fn gradient(&self) -> Result<f32> {
        self.current_controller_value(virtual_index::GRADIENT)
    }

    pub fn heading(&self) -> Result<f32> {
        self.current_controller_value(virtual_index::HEADING)
    }

    /// Whether the train is (mostly) inside a tunnel
    pub fn in_tunnel(&self) -> Result<bool> {
        Ok(self.current_controller_value(virtual_index::IN_TUNNEL)? != 0.0)
    }

    /// Simulation time of day
    ///
    /// The three clock readings are truncated to whole numbers.
    pub fn current_time(&self) -> Result<NaiveTime> {
        let read = |index: u32| -> Result<u32> {
            Ok(self.current_controller_value(index)?.max(0.0) as u32)
        };
        let hours = read(virtual_index::HOURS)?;
        let minutes = read(virtual_index::MINUTES)?;
        let seconds = read(virtual_index::SECONDS)?;

        NaiveTime::from_hms_opt(hours, minutes, seconds).ok_or(ApiError::InvalidTime {
            hours,
            minutes,
            seconds,
        })
    }

    /// Provider, product and engine of the current loco, if one is loaded
    pub fn loco_name(&self) -> Result<Option<LocoInfo>> {
        Ok(LocoInfo::parse(&self.backend.loco_name()?))
    }

    /// Sound the horn for `duration`, blocking the calling thread
    pub fn horn(&self, duration: Duration) -> Result<()> {
        self.pulse("Horn", duration)
    }

    /// Ring the bell for `duration`, blocking the calling thread
    pub fn bell(&self, duration: Duration) -> Result<()> {
        self.pulse("Bell", duration)
    }

    /// Acknowledge the AWS warning
    pub fn aws_reset(&self) -> Result<()> {
        self.pulse("AWSReset", AWS_RESET_PULSE)
    }

    fn pulse(&self, name: &str, duration: Duration) -> Result<()> {
        let index = self.controller_index(name)?;
        self.backend.set_controller_value(index, 1.0)?;
        thread::sleep(duration);
        self.backend.set_controller_value(index, 0.0)
    }

    /// Flip the wipers and return whether they are now on
    pub fn toggle_wipers(&self) -> Result<bool> {
        let index = self.controller_index("Wipers")?;
        let enabled = self.backend.controller_value(index, ValueKind::Current)? == 0.0;
        self.backend
            .set_controller_value(index, if enabled { 1.0 } else { 0.0 })?;
        Ok(enabled)
    }

    /// Must be called once after construction before any data flows
    pub fn set_rail_driver_connected(&self, connected: bool) -> Result<()> {
        tracing::debug!("Setting RailDriver connected = {}", connected);
        self.backend.set_connected(connected)
    }
}
