//! Sync-first change listener
//!
//! [`Listener`] is the caller-facing side of the poller. Configuration calls
//! (`subscribe`, `bind`) and lifecycle calls (`start`, `stop`) can be made from
//! any thread, including from inside a callback.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use raildriver_api::FieldValue;

use crate::bindings::event_name;
use crate::config::ListenerConfig;
use crate::error::{CallbackError, ListenerError, Result};
use crate::provider::Provider;
use crate::snapshot::Snapshot;
use crate::worker::{spawn_worker, Registries, RunState};

/// Lifecycle state of a [`Listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerState {
    /// Never started
    Idle,
    /// Worker thread is polling
    Running,
    /// Stopped by the caller or by a fault; `start` begins a fresh run
    Stopped,
}

/// One start/stop cycle
struct Run {
    state: Arc<RunState>,
    handle: Option<JoinHandle<()>>,
}

impl Run {
    fn is_running(&self) -> bool {
        !self.state.shutdown_signal.load(Ordering::Acquire)
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Whether the calling thread is this run's worker, i.e. inside a callback
    fn on_worker_thread(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|h| h.thread().id() == thread::current().id())
    }
}

/// Polls a [`Provider`] in the background and calls back on changes
///
/// # Example
///
/// ```rust,no_run
/// use raildriver_api::{RailDriver, SimulatedDriver};
/// use raildriver_listener::Listener;
///
/// let driver = RailDriver::new(SimulatedDriver::new());
/// let listener = Listener::new(driver);
///
/// listener.subscribe(&["Regulator"])?;
/// listener.bind("on_regulator_change", |new, old| {
///     println!("Regulator {} -> {}", old, new);
///     Ok(())
/// });
///
/// listener.start()?;
/// // ...
/// listener.stop();
///
/// if let Some(fault) = listener.last_error() {
///     eprintln!("Polling died: {}", fault);
/// }
/// # Ok::<(), raildriver_listener::ListenerError>(())
/// ```
pub struct Listener {
    provider: Arc<dyn Provider>,
    config: ListenerConfig,
    registries: Arc<Registries>,
    run: Mutex<Option<Run>>,
}

impl Listener {
    /// Create a listener polling every 500 ms
    pub fn new<P: Provider + 'static>(provider: P) -> Self {
        Self::build(Arc::new(provider), ListenerConfig::default())
    }

    /// Create a listener with a custom configuration
    pub fn with_config<P: Provider + 'static>(provider: P, config: ListenerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(Arc::new(provider), config))
    }

    fn build(provider: Arc<dyn Provider>, config: ListenerConfig) -> Self {
        Self {
            provider,
            config,
            registries: Arc::new(Registries::default()),
            run: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Replace the subscribed plain fields
    ///
    /// Every name is checked against the provider's current field list
    /// first. If any name is unknown, or is a special field key, nothing
    /// changes and [`ListenerError::InvalidField`] names the offender. Takes
    /// effect from the next iteration.
    pub fn subscribe<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        let available = self.provider.list_fields()?;
        self.registries
            .subscriptions
            .lock()
            .replace(names, &available)?;

        tracing::debug!("Subscribed to {} fields", names.len());
        Ok(())
    }

    /// Currently subscribed plain fields, in polling order
    pub fn subscribed_fields(&self) -> Vec<String> {
        self.registries.subscriptions.lock().fields().to_vec()
    }

    /// Register a callback for `event`
    ///
    /// Callbacks receive `(new, old)` and run on the worker thread in
    /// registration order. Returning an error, or panicking, stops polling;
    /// the failure is then available from [`last_error`](Self::last_error).
    pub fn bind<F>(&self, event: impl Into<String>, callback: F)
    where
        F: Fn(&FieldValue, &FieldValue) -> std::result::Result<(), CallbackError>
            + Send
            + Sync
            + 'static,
    {
        let event = event.into();
        tracing::debug!("Binding callback to {}", event);
        self.registries.bindings.lock().bind(event, callback);
    }

    /// Register a callback for changes of a plain field
    ///
    /// Shorthand for `bind(event_name(field), callback)`.
    pub fn on_change<F>(&self, field: &str, callback: F)
    where
        F: Fn(&FieldValue, &FieldValue) -> std::result::Result<(), CallbackError>
            + Send
            + Sync
            + 'static,
    {
        self.bind(event_name(field), callback);
    }

    /// Start polling on a background thread
    ///
    /// Does nothing if already running. Otherwise waits for the previous
    /// worker to exit, then begins a fresh run: the iteration counter
    /// restarts, the previous snapshot is empty and any captured fault from
    /// the last run is cleared.
    ///
    /// A callback cannot restart the listener it runs on; that returns
    /// [`ListenerError::WorkerFault`].
    pub fn start(&self) -> Result<()> {
        loop {
            let previous = {
                let mut slot = self.run.lock();

                if slot.as_ref().is_some_and(Run::is_running) {
                    tracing::debug!("Listener already running");
                    return Ok(());
                }

                if slot.as_ref().is_some_and(Run::on_worker_thread) {
                    return Err(ListenerError::WorkerFault(
                        "cannot restart the listener from its own worker thread".to_string(),
                    ));
                }

                match slot.as_mut().and_then(|run| run.handle.take()) {
                    Some(handle) => handle,
                    None => {
                        *slot = Some(self.spawn_run()?);
                        tracing::info!("Listener started");
                        return Ok(());
                    }
                }
            };

            // Joined outside the lock: the old worker may still be inside a
            // callback that calls back into this listener
            join_worker(previous);
        }
    }

    fn spawn_run(&self) -> Result<Run> {
        let state = Arc::new(RunState::default());
        let handle = spawn_worker(
            self.config.thread_name.clone(),
            self.config.poll_interval,
            Arc::clone(&self.provider),
            Arc::clone(&self.registries),
            Arc::clone(&state),
        )
        .map_err(|e| ListenerError::WorkerFault(format!("failed to spawn worker: {}", e)))?;

        Ok(Run {
            state,
            handle: Some(handle),
        })
    }

    /// Ask the worker to exit and wait for it
    ///
    /// The worker checks between iterations, so this can block for up to one
    /// poll interval. Calling it again, or before `start`, does nothing.
    /// Called from a callback, it signals the worker but does not wait; the
    /// next `start` or `stop` from another thread joins it.
    pub fn stop(&self) {
        let handle = {
            let mut slot = self.run.lock();
            match slot.as_mut() {
                Some(run) => {
                    run.state.shutdown_signal.store(true, Ordering::Release);
                    if run.on_worker_thread() {
                        None
                    } else {
                        run.handle.take()
                    }
                }
                None => None,
            }
        };

        if let Some(handle) = handle {
            join_worker(handle);
            tracing::info!("Listener stopped");
        }
    }

    pub fn state(&self) -> ListenerState {
        match self.run.lock().as_ref() {
            None => ListenerState::Idle,
            Some(run) if run.is_running() => ListenerState::Running,
            Some(_) => ListenerState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == ListenerState::Running
    }

    /// Completed iterations of the current (or last) run
    pub fn iteration(&self) -> u64 {
        self.run
            .lock()
            .as_ref()
            .map_or(0, |run| run.state.iteration.load(Ordering::Acquire))
    }

    /// Copy of the snapshot from the last completed iteration
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.run
            .lock()
            .as_ref()
            .and_then(|run| run.state.latest_snapshot.lock().clone())
    }

    /// The fault that ended the current (or last) run, if any
    pub fn last_error(&self) -> Option<ListenerError> {
        self.run
            .lock()
            .as_ref()
            .and_then(|run| run.state.fault.lock().clone())
    }

    /// Take the captured fault, leaving none behind
    pub fn take_last_error(&self) -> Option<ListenerError> {
        self.run
            .lock()
            .as_ref()
            .and_then(|run| run.state.fault.lock().take())
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("config", &self.config)
            .field("registries", &self.registries)
            .field("state", &self.state())
            .finish()
    }
}

fn join_worker(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        tracing::error!("Listener worker panicked");
    }
}
