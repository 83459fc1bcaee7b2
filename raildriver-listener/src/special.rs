//! Fields that are polled on every iteration
//!
//! Special fields are composite or virtual readings with their own provider
//! accessor. They cannot be subscribed to, are never dropped from the
//! snapshot, and are keyed with a leading `!` so they cannot collide with a
//! controller name.

use std::fmt;

use raildriver_api::FieldValue;

use crate::error::ProviderError;
use crate::provider::Provider;

/// Marker prefixed to special field keys in snapshots
pub const SPECIAL_FIELD_MARKER: char = '!';

/// One of the always-polled readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpecialField {
    Coordinates,
    FuelLevel,
    Gradient,
    Heading,
    IsInTunnel,
    LocoName,
    Time,
}

impl SpecialField {
    /// Every special field in polling order
    pub const ALL: [SpecialField; 7] = [
        SpecialField::Coordinates,
        SpecialField::FuelLevel,
        SpecialField::Gradient,
        SpecialField::Heading,
        SpecialField::IsInTunnel,
        SpecialField::LocoName,
        SpecialField::Time,
    ];

    /// Snapshot key, including the marker
    pub fn key(self) -> &'static str {
        match self {
            SpecialField::Coordinates => "!Coordinates",
            SpecialField::FuelLevel => "!FuelLevel",
            SpecialField::Gradient => "!Gradient",
            SpecialField::Heading => "!Heading",
            SpecialField::IsInTunnel => "!IsInTunnel",
            SpecialField::LocoName => "!LocoName",
            SpecialField::Time => "!Time",
        }
    }

    /// Key without the marker
    pub fn name(self) -> &'static str {
        &self.key()[SPECIAL_FIELD_MARKER.len_utf8()..]
    }

    /// Look up a special field by snapshot key or bare name
    pub fn from_key(key: &str) -> Option<Self> {
        let bare = key.strip_prefix(SPECIAL_FIELD_MARKER).unwrap_or(key);
        Self::ALL.into_iter().find(|field| field.name() == bare)
    }

    /// Event dispatched when this field changes
    pub fn event_name(self) -> String {
        crate::event_name(self.name())
    }

    /// Read this field through its dedicated provider accessor
    pub fn read<P: Provider + ?Sized>(self, provider: &P) -> Result<FieldValue, ProviderError> {
        Ok(match self {
            SpecialField::Coordinates => provider.coordinates()?.into(),
            SpecialField::FuelLevel => provider.fuel_level()?.into(),
            SpecialField::Gradient => provider.gradient()?.into(),
            SpecialField::Heading => provider.heading()?.into(),
            SpecialField::IsInTunnel => provider.in_tunnel()?.into(),
            SpecialField::LocoName => provider.loco_name()?.into(),
            SpecialField::Time => provider.current_time()?.into(),
        })
    }
}

impl fmt::Display for SpecialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
