//! Ordered set of plain fields the worker polls

use crate::error::{ListenerError, Result};
use crate::special::SPECIAL_FIELD_MARKER;

/// Plain field names polled each iteration, in subscription order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionRegistry {
    fields: Vec<String>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `names` against the provider's current field list
    ///
    /// Every name must be available, and none may be a special field key.
    /// Stops at the first offending name.
    pub fn validate<S: AsRef<str>>(names: &[S], available: &[(u32, String)]) -> Result<()> {
        for name in names {
            let name = name.as_ref();
            if name.starts_with(SPECIAL_FIELD_MARKER) {
                return Err(ListenerError::invalid_field(
                    name,
                    "special fields are always polled and cannot be subscribed to",
                ));
            }
            if !available.iter().any(|(_, field)| field == name) {
                return Err(ListenerError::invalid_field(
                    name,
                    "not present on the current loco",
                ));
            }
        }
        Ok(())
    }

    /// Validate and, only if every name passes, replace the whole set
    pub fn replace<S: AsRef<str>>(&mut self, names: &[S], available: &[(u32, String)]) -> Result<()> {
        Self::validate(names, available)?;
        self.fields = names.iter().map(|name| name.as_ref().to_string()).collect();
        Ok(())
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}
