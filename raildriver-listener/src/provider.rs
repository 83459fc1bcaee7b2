//! Data source consumed by the listener
//!
//! The listener never talks to the simulator directly. It reads through a
//! [`Provider`], which any [`RailDriver`] already is; tests plug in scripted
//! providers instead.

use std::sync::Arc;

use chrono::NaiveTime;
use raildriver_api::{Coordinates, FieldValue, LocoInfo, RailDriver, RawDriver};

use crate::error::ProviderError;

/// Read-only capability set the listener polls
pub trait Provider: Send + Sync {
    /// Current value of a plain field
    ///
    /// Returns [`ProviderError::FieldNotFound`] when the field does not exist
    /// on the current loco.
    fn read_field(&self, name: &str) -> Result<FieldValue, ProviderError>;

    /// `(index, name)` pairs of every plain field currently available
    fn list_fields(&self) -> Result<Vec<(u32, String)>, ProviderError>;

    fn coordinates(&self) -> Result<Coordinates, ProviderError>;

    fn fuel_level(&self) -> Result<f32, ProviderError>;

    fn gradient(&self) -> Result<f32, ProviderError>;

    fn heading(&self) -> Result<f32, ProviderError>;

    fn in_tunnel(&self) -> Result<bool, ProviderError>;

    fn loco_name(&self) -> Result<Option<LocoInfo>, ProviderError>;

    fn current_time(&self) -> Result<NaiveTime, ProviderError>;
}

impl<D: RawDriver> Provider for RailDriver<D> {
    fn read_field(&self, name: &str) -> Result<FieldValue, ProviderError> {
        Ok(FieldValue::Number(self.current_controller_value(name)?))
    }

    fn list_fields(&self) -> Result<Vec<(u32, String)>, ProviderError> {
        Ok(self.controller_list()?)
    }

    fn coordinates(&self) -> Result<Coordinates, ProviderError> {
        Ok(RailDriver::coordinates(self)?)
    }

    fn fuel_level(&self) -> Result<f32, ProviderError> {
        Ok(RailDriver::fuel_level(self)?)
    }

    fn gradient(&self) -> Result<f32, ProviderError> {
        Ok(RailDriver::gradient(self)?)
    }

    fn heading(&self) -> Result<f32, ProviderError> {
        Ok(RailDriver::heading(self)?)
    }

    fn in_tunnel(&self) -> Result<bool, ProviderError> {
        Ok(RailDriver::in_tunnel(self)?)
    }

    fn loco_name(&self) -> Result<Option<LocoInfo>, ProviderError> {
        Ok(RailDriver::loco_name(self)?)
    }

    fn current_time(&self) -> Result<NaiveTime, ProviderError> {
        Ok(RailDriver::current_time(self)?)
    }
}

impl<P: Provider + ?Sized> Provider for Arc<P> {
    fn read_field(&self, name: &str) -> Result<FieldValue, ProviderError> {
        (**self).read_field(name)
    }

    fn list_fields(&self) -> Result<Vec<(u32, String)>, ProviderError> {
        (**self).list_fields()
    }

    fn coordinates(&self) -> Result<Coordinates, ProviderError> {
        (**self).coordinates()
    }

    fn fuel_level(&self) -> Result<f32, ProviderError> {
        (**self).fuel_level()
    }

    fn gradient(&self) -> Result<f32, ProviderError> {
        (**self).gradient()
    }

    fn heading(&self) -> Result<f32, ProviderError> {
        (**self).heading()
    }

    fn in_tunnel(&self) -> Result<bool, ProviderError> {
        (**self).in_tunnel()
    }

    fn loco_name(&self) -> Result<Option<LocoInfo>, ProviderError> {
        (**self).loco_name()
    }

    fn current_time(&self) -> Result<NaiveTime, ProviderError> {
        (**self).current_time()
    }
}
