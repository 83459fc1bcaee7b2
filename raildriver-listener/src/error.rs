use thiserror::Error;

/// Boxed error returned by a failing callback
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by a [`Provider`](crate::Provider)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// The field does not exist on the current loco
    ///
    /// During polling this is not a failure: the field is dropped from the
    /// snapshot and polling carries on.
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// Anything else the provider could not answer
    #[error("Provider failure: {0}")]
    Failure(String),
}

impl From<raildriver_api::ApiError> for ProviderError {
    fn from(error: raildriver_api::ApiError) -> Self {
        match error {
            raildriver_api::ApiError::ControllerNotFound(name) => ProviderError::FieldNotFound(name),
            other => ProviderError::Failure(other.to_string()),
        }
    }
}

/// Errors that can occur in the listener
///
/// The type is `Clone` so the fault captured by the worker can be handed out
/// to any number of callers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ListenerError {
    /// A name passed to `subscribe` is not a subscribable field
    #[error("Cannot subscribe to field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    /// A field changed but nothing was ever bound to its event
    #[error("Expected bindings for event '{0}' but none found")]
    NoBinding(String),

    /// The worker stopped because of an unexpected failure
    #[error("Worker fault: {0}")]
    WorkerFault(String),

    /// Invalid listener configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider failed outside the polling loop
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ListenerError {
    pub(crate) fn invalid_field(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error ended a polling run
    pub fn is_fatal_to_worker(&self) -> bool {
        matches!(self, Self::NoBinding(_) | Self::WorkerFault(_))
    }
}

/// Result type for listener operations
pub type Result<T> = std::result::Result<T, ListenerError>;

/// Text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use raildriver_api::ApiError;
    use std::panic;

    #[test]
    fn test_listener_error_display() {
        let error = ListenerError::invalid_field("Pantograph", "not present on current loco");
        assert_eq!(
            error.to_string(),
            "Cannot subscribe to field Pantograph: not present on current loco"
        );

        let error = ListenerError::NoBinding("on_regulator_change".to_string());
        assert_eq!(
            error.to_string(),
            "Expected bindings for event 'on_regulator_change' but none found"
        );

        let error = ListenerError::WorkerFault("callback panicked".to_string());
        assert_eq!(error.to_string(), "Worker fault: callback panicked");
    }

    #[test]
    fn test_provider_error_from_api_error() {
        let error: ProviderError = ApiError::ControllerNotFound("Horn".to_string()).into();
        assert_eq!(error, ProviderError::FieldNotFound("Horn".to_string()));

        let error: ProviderError = ApiError::Driver("dll unloaded".to_string()).into();
        assert_eq!(
            error,
            ProviderError::Failure("Driver error: dll unloaded".to_string())
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(ListenerError::NoBinding("on_x_change".into()).is_fatal_to_worker());
        assert!(ListenerError::WorkerFault("boom".into()).is_fatal_to_worker());
        assert!(!ListenerError::invalid_field("x", "unknown").is_fatal_to_worker());
    }

    #[test]
    fn test_panic_message_payloads() {
        let payload = panic::catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(panic_message(&*payload), "static message");

        let payload = panic::catch_unwind(|| panic!("formatted {}", 42)).unwrap_err();
        assert_eq!(panic_message(&*payload), "formatted 42");

        let payload = panic::catch_unwind(|| panic::panic_any(7u8)).unwrap_err();
        assert_eq!(panic_message(&*payload), "unknown panic");
    }
}
