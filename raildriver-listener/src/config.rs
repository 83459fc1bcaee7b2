//! Configuration for the listener
//!
//! The poll interval is fixed for the lifetime of a run; changing it means
//! building a new listener.

use std::time::Duration;

use crate::error::{ListenerError, Result};

/// Configuration for a [`Listener`](crate::Listener)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Time the worker sleeps between iterations
    /// Default: 500 milliseconds
    pub poll_interval: Duration,

    /// Name given to the worker thread
    /// Default: "raildriver-listener"
    pub thread_name: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            thread_name: "raildriver-listener".to_string(),
        }
    }
}

impl ListenerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fast polling for cab displays that need to feel live
    pub fn fast() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            ..Default::default()
        }
    }

    /// Slow polling for loggers and dashboards
    pub fn relaxed() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(ListenerError::Configuration(
                "Poll interval must be greater than 0".to_string(),
            ));
        }

        if self.thread_name.trim().is_empty() {
            return Err(ListenerError::Configuration(
                "Worker thread name must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ListenerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.thread_name, "raildriver-listener");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        assert_eq!(ListenerConfig::fast().poll_interval, Duration::from_millis(100));
        assert_eq!(ListenerConfig::relaxed().poll_interval, Duration::from_secs(2));
        assert!(ListenerConfig::fast().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let zero = ListenerConfig::new().with_poll_interval(Duration::ZERO);
        assert!(matches!(zero.validate(), Err(ListenerError::Configuration(_))));

        let unnamed = ListenerConfig::new().with_thread_name("  ");
        assert!(unnamed.validate().is_err());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ListenerConfig::new()
            .with_poll_interval(Duration::from_millis(250))
            .with_thread_name("cab-display");
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.thread_name, "cab-display");
    }
}
