//! Raw backend boundary
//!
//! The simulator exposes a handful of C entry points through its RailDriver
//! plugin. [`RawDriver`] mirrors those calls one to one, with strings already
//! decoded, so the rest of the crate never touches the binding directly.

use crate::error::Result;
use crate::value::ValueKind;

/// Separator between names in the raw controller list
pub const CONTROLLER_LIST_SEPARATOR: &str = "::";

/// Virtual controller indices that are readable regardless of loco
pub mod virtual_index {
    pub const LATITUDE: u32 = 400;
    pub const LONGITUDE: u32 = 401;
    pub const FUEL_LEVEL: u32 = 402;
    pub const IN_TUNNEL: u32 = 403;
    pub const GRADIENT: u32 = 404;
    pub const HEADING: u32 = 405;
    pub const HOURS: u32 = 406;
    pub const MINUTES: u32 = 407;
    pub const SECONDS: u32 = 408;

    /// Every virtual index, lowest first
    pub const ALL: [u32; 9] = [
        LATITUDE, LONGITUDE, FUEL_LEVEL, IN_TUNNEL, GRADIENT, HEADING, HOURS, MINUTES, SECONDS,
    ];
}

/// Low-level calls exposed by the simulator plugin
///
/// Implementations must be safe to call from several threads at once; the
/// listener reads from its worker thread while the caller validates
/// subscriptions from its own.
pub trait RawDriver: Send + Sync {
    /// `::`-separated controller names, empty when no loco is loaded
    fn controller_list(&self) -> Result<String>;

    /// `.:.`-separated loco identity, empty when no loco is loaded
    fn loco_name(&self) -> Result<String>;

    /// Read one of the values of the controller at `index`
    fn controller_value(&self, index: u32, kind: ValueKind) -> Result<f32>;

    /// Write the current value of the controller at `index`
    fn set_controller_value(&self, index: u32, value: f32) -> Result<()>;

    /// Tell the plugin to start or stop exchanging data with the simulator
    fn set_connected(&self, connected: bool) -> Result<()>;
}

impl<D: RawDriver + ?Sized> RawDriver for std::sync::Arc<D> {
    fn controller_list(&self) -> Result<String> {
        (**self).controller_list()
    }

    fn loco_name(&self) -> Result<String> {
        (**self).loco_name()
    }

    fn controller_value(&self, index: u32, kind: ValueKind) -> Result<f32> {
        (**self).controller_value(index, kind)
    }

    fn set_controller_value(&self, index: u32, value: f32) -> Result<()> {
        (**self).set_controller_value(index, value)
    }

    fn set_connected(&self, connected: bool) -> Result<()> {
        (**self).set_connected(connected)
    }
}

/// Split a raw controller list into `(index, name)` pairs
pub fn parse_controller_list(raw: &str) -> Vec<(u32, String)> {
    if raw.is_empty() {
        return Vec::new();
    }

    raw.split(CONTROLLER_LIST_SEPARATOR)
        .enumerate()
        .map(|(index, name)| (index as u32, name.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_controller_list() {
        let controllers = parse_controller_list("Reverser::Regulator::TrainBrakeControl");
        assert_eq!(
            controllers,
            vec![
                (0, "Reverser".to_string()),
                (1, "Regulator".to_string()),
                (2, "TrainBrakeControl".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_empty_controller_list() {
        assert!(parse_controller_list("").is_empty());
    }

    #[test]
    fn test_virtual_indices_are_contiguous() {
        for pair in virtual_index::ALL.windows(2) {
            assert_eq!(pair[1], pair[0] + 1);
        }
    }
}
