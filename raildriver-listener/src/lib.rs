//! # RailDriver Listener
//!
//! Watches a running simulation for value changes and calls back into your
//! code, without you having to poll or diff anything yourself.
//!
//! ## Overview
//!
//! A [`Listener`] owns one background thread. Every poll interval it reads
//! the fields you subscribed to plus a fixed set of special fields
//! (position, fuel, gradient, heading, tunnel, loco identity, clock), compares
//! them with the previous iteration, and invokes the callbacks bound to
//! `on_<field>_change` for every value that differs.
//!
//! ```rust,ignore
//! use raildriver_api::RailDriver;
//! use raildriver_listener::Listener;
//!
//! let listener = Listener::new(RailDriver::new(backend));
//!
//! listener.subscribe(&["Regulator", "TrainBrakeControl"])?;
//! listener.on_change("Regulator", |new, old| {
//!     println!("Regulator moved from {} to {}", old, new);
//!     Ok(())
//! });
//! listener.bind("on_trainbrakecontrol_change", |new, _| {
//!     println!("Brake now {}", new);
//!     Ok(())
//! });
//! listener.bind("on_isintunnel_change", |new, _| {
//!     println!("In tunnel: {}", new);
//!     Ok(())
//! });
//!
//! listener.start()?;
//! // ... drive ...
//! listener.stop();
//! ```
//!
//! ## Rules worth knowing
//!
//! - Nothing fires on the first iteration of a run; there is no baseline yet.
//! - A change with no callback bound to its event name stops the worker with
//!   [`ListenerError::NoBinding`]. Bind every event you can trigger.
//! - A subscribed field that disappears (the player switched loco) is
//!   dropped from the snapshot quietly.
//! - Worker failures are never raised into your thread. Check
//!   [`Listener::last_error`] after `stop`, or whenever callbacks go quiet.
//!
//! ## Architecture
//!
//! ```text
//! Listener ──subscribe/bind──► Registries (mutex-guarded)
//!    │                               ▲
//!    └──start──► worker thread ──────┘
//!                    │  read_field / special accessors
//!                    ▼
//!                 Provider (RailDriver<D> or your own)
//! ```

pub mod bindings;
pub mod config;
pub mod error;
pub mod listener;
pub mod logging;
pub mod provider;
pub mod snapshot;
pub mod special;
pub mod subscription;
mod worker;

pub use bindings::{event_name, BindingRegistry, Callback};
pub use config::ListenerConfig;
pub use error::{CallbackError, ListenerError, ProviderError, Result};
pub use listener::{Listener, ListenerState};
pub use provider::Provider;
pub use snapshot::{FieldChange, Snapshot, SnapshotStore};
pub use special::SpecialField;
pub use subscription::SubscriptionRegistry;

pub use raildriver_api::{Coordinates, FieldValue, LocoInfo};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        event_name, FieldValue, Listener, ListenerConfig, ListenerError, ListenerState, Provider,
        ProviderError, Result, SpecialField,
    };
}
