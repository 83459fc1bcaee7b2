//! Event name to callback registry
//!
//! Registration is append-only. Looking up an event that never had a
//! callback is an error rather than a no-op: a field that changes with
//! nobody listening for exactly that event name usually means a typo in
//! the name passed to `bind`.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use raildriver_api::FieldValue;

use crate::error::{panic_message, CallbackError, ListenerError, Result};

/// Callback invoked with `(new, old)` when a field changes
pub type Callback =
    Arc<dyn Fn(&FieldValue, &FieldValue) -> std::result::Result<(), CallbackError> + Send + Sync>;

/// Build the event name for a field: `on_<field lowercased>_change`
pub fn event_name(field: &str) -> String {
    format!("on_{}_change", field.to_lowercase())
}

/// Ordered callbacks per event name
#[derive(Default)]
pub struct BindingRegistry {
    bindings: HashMap<String, Vec<Callback>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback to the list for `event`
    pub fn bind<F>(&mut self, event: impl Into<String>, callback: F)
    where
        F: Fn(&FieldValue, &FieldValue) -> std::result::Result<(), CallbackError>
            + Send
            + Sync
            + 'static,
    {
        self.bindings
            .entry(event.into())
            .or_default()
            .push(Arc::new(callback));
    }

    /// Callbacks for `event` in registration order
    ///
    /// Returns a copy of the list so it can be invoked without holding any
    /// lock around the registry.
    pub fn callbacks(&self, event: &str) -> Result<Vec<Callback>> {
        self.bindings
            .get(event)
            .cloned()
            .ok_or_else(|| ListenerError::NoBinding(event.to_string()))
    }

    /// Invoke every callback registered for `event`
    pub fn dispatch(&self, event: &str, new: &FieldValue, old: &FieldValue) -> Result<()> {
        let callbacks = self.callbacks(event)?;
        invoke(event, &callbacks, new, old)
    }

    pub fn is_bound(&self, event: &str) -> bool {
        self.bindings.contains_key(event)
    }

    /// Number of callbacks registered for `event`
    pub fn len(&self, event: &str) -> usize {
        self.bindings.get(event).map_or(0, Vec::len)
    }

    /// Every event name with at least one callback
    pub fn events(&self) -> Vec<String> {
        let mut events: Vec<String> = self.bindings.keys().cloned().collect();
        events.sort();
        events
    }
}

impl std::fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .bindings
            .iter()
            .map(|(event, callbacks)| (event.as_str(), callbacks.len()))
            .collect();
        f.debug_struct("BindingRegistry")
            .field("bindings", &counts)
            .finish()
    }
}

/// Run `callbacks` in order, stopping at the first failure
///
/// A callback that returns an error or panics ends dispatch with
/// [`ListenerError::WorkerFault`].
pub(crate) fn invoke(
    event: &str,
    callbacks: &[Callback],
    new: &FieldValue,
    old: &FieldValue,
) -> Result<()> {
    for (position, callback) in callbacks.iter().enumerate() {
        match panic::catch_unwind(AssertUnwindSafe(|| callback(new, old))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(ListenerError::WorkerFault(format!(
                    "callback #{} for '{}' failed: {}",
                    position, event, e
                )));
            }
            Err(payload) => {
                return Err(ListenerError::WorkerFault(format!(
                    "callback #{} for '{}' panicked: {}",
                    position,
                    event,
                    panic_message(&*payload)
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorder(
        log: &Arc<Mutex<Vec<String>>>,
        tag: &'static str,
    ) -> impl Fn(&FieldValue, &FieldValue) -> std::result::Result<(), CallbackError> + Send + Sync
    {
        let log = Arc::clone(log);
        move |new: &FieldValue, old: &FieldValue| -> std::result::Result<(), CallbackError> {
            log.lock().push(format!("{}:{}->{}", tag, old, new));
            Ok(())
        }
    }

    #[test]
    fn test_event_name_lowercases() {
        assert_eq!(event_name("TrainBrakeControl"), "on_trainbrakecontrol_change");
        assert_eq!(event_name("Regulator"), "on_regulator_change");
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BindingRegistry::new();
        registry.bind("on_regulator_change", recorder(&log, "a"));
        registry.bind("on_regulator_change", recorder(&log, "b"));
        registry.bind("on_reverser_change", recorder(&log, "c"));

        registry
            .dispatch(
                "on_regulator_change",
                &FieldValue::Number(1.0),
                &FieldValue::Number(0.5),
            )
            .unwrap();

        assert_eq!(*log.lock(), vec!["a:0.5->1", "b:0.5->1"]);
        assert_eq!(registry.len("on_regulator_change"), 2);
        assert_eq!(
            registry.events(),
            vec!["on_regulator_change", "on_reverser_change"]
        );
    }

    #[test]
    fn test_dispatch_without_binding_fails() {
        let registry = BindingRegistry::new();
        let result = registry.dispatch(
            "on_horn_change",
            &FieldValue::Number(1.0),
            &FieldValue::Number(0.0),
        );
        assert_eq!(
            result,
            Err(ListenerError::NoBinding("on_horn_change".to_string()))
        );
        assert!(!registry.is_bound("on_horn_change"));
    }

    #[test]
    fn test_failing_callback_stops_dispatch() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BindingRegistry::new();
        registry.bind(
            "on_bell_change",
            |_: &FieldValue, _: &FieldValue| Err("bell jammed".into()),
        );
        registry.bind("on_bell_change", recorder(&log, "after"));

        let result = registry.dispatch(
            "on_bell_change",
            &FieldValue::Bool(true),
            &FieldValue::Bool(false),
        );
        match result {
            Err(ListenerError::WorkerFault(message)) => assert!(message.contains("bell jammed")),
            other => panic!("Expected WorkerFault, got {:?}", other),
        }
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_panicking_callback_is_captured() {
        let mut registry = BindingRegistry::new();
        registry.bind(
            "on_gradient_change",
            |_: &FieldValue, _: &FieldValue| panic!("gradient overflow"),
        );

        let result = registry.dispatch(
            "on_gradient_change",
            &FieldValue::Number(1.0),
            &FieldValue::Number(0.0),
        );
        match result {
            Err(ListenerError::WorkerFault(message)) => {
                assert!(message.contains("panicked"));
                assert!(message.contains("gradient overflow"));
            }
            other => panic!("Expected WorkerFault, got {:?}", other),
        }
    }
}
