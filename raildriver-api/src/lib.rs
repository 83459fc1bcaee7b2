//! Typed access to Train Simulator through the RailDriver plugin
//!
//! The plugin exposes every cab control as a float addressed by index, plus a
//! few virtual indices for position, clock and environment. This crate wraps
//! that interface in named controls and composite readings.
//!
//! ```rust
//! use raildriver_api::{LocoInfo, RailDriver, SimulatedDriver};
//!
//! let backend = SimulatedDriver::new();
//! backend.load_loco(
//!     LocoInfo::new("DTG", "Class 66", "Class 66 EWS"),
//!     [("Reverser", 0.0, -1.0, 1.0)],
//! );
//!
//! let driver = RailDriver::new(backend);
//! for (index, name) in driver.controller_list()? {
//!     println!("{}: {}", index, name);
//! }
//! # Ok::<(), raildriver_api::ApiError>(())
//! ```
//!
//! The raw binding itself is behind the [`RawDriver`] trait. [`DllDriver`]
//! loads the real plugin library; [`SimulatedDriver`] is an in-memory
//! implementation for tests and demos.

pub mod dll;
pub mod driver;
pub mod error;
pub mod raildriver;
pub mod simulated;
pub mod value;

pub use dll::{plugin_path, DllDriver, PluginArch};
pub use driver::{virtual_index, RawDriver};
pub use error::{ApiError, Result};
pub use raildriver::RailDriver;
pub use simulated::SimulatedDriver;
pub use value::{ControllerRef, Coordinates, FieldValue, LocoInfo, ValueKind};
