//! Background polling thread
//!
//! One thread per run. It snapshots the subscribed and special fields, diffs
//! them against the previous iteration, dispatches callbacks for every change
//! and sleeps. The first error it hits ends the run and is parked in the
//! run's [`RunState`] for the caller to collect.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use raildriver_api::FieldValue;

use crate::bindings::{event_name, invoke, BindingRegistry};
use crate::error::{panic_message, ListenerError, ProviderError, Result};
use crate::provider::Provider;
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::special::{SpecialField, SPECIAL_FIELD_MARKER};
use crate::subscription::SubscriptionRegistry;

/// Registries shared between the caller and every run
#[derive(Debug, Default)]
pub(crate) struct Registries {
    pub subscriptions: Mutex<SubscriptionRegistry>,
    pub bindings: Mutex<BindingRegistry>,
}

/// Status of a single run, written by its worker and read by the caller
#[derive(Debug, Default)]
pub(crate) struct RunState {
    /// Set by the caller to ask the worker to exit
    pub shutdown_signal: AtomicBool,
    /// Completed iterations of this run
    pub iteration: AtomicU64,
    /// Copy of the snapshot at the end of the last completed iteration
    pub latest_snapshot: Mutex<Option<Snapshot>>,
    /// First fault that ended the run
    pub fault: Mutex<Option<ListenerError>>,
}

/// Spawn the worker thread for a new run
pub(crate) fn spawn_worker(
    thread_name: String,
    poll_interval: Duration,
    provider: Arc<dyn Provider>,
    registries: Arc<Registries>,
    run: Arc<RunState>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(thread_name)
        .spawn(move || polling_loop(poll_interval, provider.as_ref(), &registries, &run))
}

fn polling_loop(
    poll_interval: Duration,
    provider: &dyn Provider,
    registries: &Registries,
    run: &RunState,
) {
    tracing::info!("Listener worker started (interval: {:?})", poll_interval);

    let mut store = SnapshotStore::new();

    while !run.shutdown_signal.load(Ordering::Acquire) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            run_iteration(provider, registries, &mut store)
        }))
        .unwrap_or_else(|payload| {
            Err(ListenerError::WorkerFault(format!(
                "iteration {} panicked: {}",
                store.iteration(),
                panic_message(&*payload)
            )))
        });

        match outcome {
            Ok(()) => {
                *run.latest_snapshot.lock() = Some(store.current().clone());
                run.iteration.store(store.iteration(), Ordering::Release);
            }
            Err(e) => {
                tracing::error!(
                    "Listener worker stopped at iteration {}: {}",
                    store.iteration(),
                    e
                );
                *run.fault.lock() = Some(e);
                break;
            }
        }

        thread::sleep(poll_interval);
    }

    tracing::info!("Listener worker shut down after {} iterations", store.iteration());
}

/// Run one poll iteration against `store`
///
/// Plain fields are evaluated in subscription order, then special fields in
/// declaration order. Entries for fields no longer subscribed are dropped. Callbacks for one field finish before the next field
/// is read.
pub(crate) fn run_iteration(
    provider: &dyn Provider,
    registries: &Registries,
    store: &mut SnapshotStore,
) -> Result<()> {
    let iteration = store.begin_iteration();
    let fields = registries.subscriptions.lock().fields().to_vec();

    // Fields dropped from the subscription leave the snapshot too
    store.retain(|key| {
        key.starts_with(SPECIAL_FIELD_MARKER) || fields.iter().any(|field| field == key)
    });

    tracing::trace!(
        "Iteration {}: polling {} subscribed fields",
        iteration,
        fields.len()
    );

    for field in &fields {
        match provider.read_field(field) {
            Ok(value) => {
                if let Some(change) = store.record(field, value) {
                    dispatch(registries, &event_name(field), &change.new, &change.old)?;
                }
            }
            Err(ProviderError::FieldNotFound(_)) => {
                if store.remove(field).is_some() {
                    tracing::warn!("Field {} is no longer available, dropping it", field);
                }
            }
            Err(e) => {
                return Err(ListenerError::WorkerFault(format!(
                    "reading field {}: {}",
                    field, e
                )));
            }
        }
    }

    for special in SpecialField::ALL {
        let value = special.read(provider).map_err(|e| {
            ListenerError::WorkerFault(format!("reading special field {}: {}", special, e))
        })?;
        if let Some(change) = store.record(special.key(), value) {
            dispatch(registries, &special.event_name(), &change.new, &change.old)?;
        }
    }

    Ok(())
}

fn dispatch(
    registries: &Registries,
    event: &str,
    new: &FieldValue,
    old: &FieldValue,
) -> Result<()> {
    tracing::debug!("Dispatching {}: {} -> {}", event, old, new);

    // Released before invoking so callbacks may bind further handlers
    let callbacks = registries.bindings.lock().callbacks(event)?;
    invoke(event, &callbacks, new, old)
}

#[cfg(test)]
mod tests {
    use super::*;
    use raildriver_api::{LocoInfo, RailDriver, SimulatedDriver};

    fn provider() -> RailDriver<SimulatedDriver> {
        let driver = RailDriver::new(SimulatedDriver::new());
        driver.backend().load_loco(
            LocoInfo::new("DTG", "Pack", "Loco"),
            [("Regulator", 0.0, 0.0, 1.0), ("Reverser", 0.0, -1.0, 1.0)],
        );
        driver
    }

    fn subscribe(registries: &Registries, provider: &RailDriver<SimulatedDriver>, names: &[&str]) {
        let available = provider.controller_list().unwrap();
        registries
            .subscriptions
            .lock()
            .replace(names, &available)
            .unwrap();
    }

    #[test]
    fn test_first_iteration_records_every_field() {
        let provider = provider();
        let registries = Registries::default();
        subscribe(&registries, &provider, &["Regulator"]);

        let mut store = SnapshotStore::new();
        run_iteration(&provider, &registries, &mut store).unwrap();

        let snapshot = store.current();
        assert_eq!(snapshot.get("Regulator"), Some(&FieldValue::Number(0.0)));
        for special in SpecialField::ALL {
            assert!(snapshot.contains(special.key()), "missing {}", special);
        }
        let loco = snapshot.get("!LocoName").and_then(FieldValue::as_loco);
        assert_eq!(loco.and_then(|l| l.engine.as_deref()), Some("Loco"));
    }

    #[test]
    fn test_unbound_change_is_no_binding_error() {
        let provider = provider();
        let registries = Registries::default();
        subscribe(&registries, &provider, &["Reverser"]);

        let mut store = SnapshotStore::new();
        run_iteration(&provider, &registries, &mut store).unwrap();
        provider.backend().set_current("Reverser", 1.0).unwrap();

        assert_eq!(
            run_iteration(&provider, &registries, &mut store),
            Err(ListenerError::NoBinding("on_reverser_change".to_string()))
        );
    }

    #[test]
    fn test_removed_field_is_dropped_silently() {
        let provider = provider();
        let registries = Registries::default();
        subscribe(&registries, &provider, &["Regulator", "Reverser"]);

        let mut store = SnapshotStore::new();
        run_iteration(&provider, &registries, &mut store).unwrap();
        provider.backend().remove_controller("Regulator");
        provider.backend().set_current("Reverser", 0.0).unwrap();

        run_iteration(&provider, &registries, &mut store).unwrap();
        assert!(!store.current().contains("Regulator"));
        assert!(store.current().contains("Reverser"));

        // A second miss must not fail either
        run_iteration(&provider, &registries, &mut store).unwrap();
    }

    #[test]
    fn test_provider_failure_is_worker_fault() {
        let provider = provider();
        let registries = Registries::default();
        let mut store = SnapshotStore::new();

        provider.backend().fail_next_read("plugin went away");
        match run_iteration(&provider, &registries, &mut store) {
            Err(ListenerError::WorkerFault(message)) => {
                assert!(message.contains("!Coordinates"));
                assert!(message.contains("plugin went away"));
            }
            other => panic!("Expected WorkerFault, got {:?}", other),
        }
    }

    #[test]
    fn test_unsubscribed_field_leaves_snapshot() {
        let provider = provider();
        let registries = Registries::default();
        subscribe(&registries, &provider, &["Regulator", "Reverser"]);

        let mut store = SnapshotStore::new();
        run_iteration(&provider, &registries, &mut store).unwrap();
        subscribe(&registries, &provider, &["Reverser"]);
        run_iteration(&provider, &registries, &mut store).unwrap();

        assert!(!store.current().contains("Regulator"));
        assert!(store.current().contains("Reverser"));
        assert!(store.current().contains("!FuelLevel"));
    }
}
