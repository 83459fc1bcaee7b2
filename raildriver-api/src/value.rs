//! Typed values read from the simulator
//!
//! Plain controllers always read as a single `f32`. The composite readings
//! (position, clock, loco identity) are assembled from several raw reads and
//! get their own types here. [`FieldValue`] is the dynamically-typed union of
//! all of them, used wherever values of different fields are stored together.

use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Separator between components of the loco name string
pub const LOCO_NAME_SEPARATOR: &str = ".:.";

/// Which of the three values a controller exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Current,
    Min,
    Max,
}

impl ValueKind {
    /// Numeric selector understood by the plugin
    pub fn as_raw(self) -> i32 {
        match self {
            ValueKind::Current => 0,
            ValueKind::Min => 1,
            ValueKind::Max => 2,
        }
    }
}

/// Geographic position of the player train
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f32,
    pub longitude: f32,
}

impl Coordinates {
    pub fn new(latitude: f32, longitude: f32) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Identity of the currently driven loco
///
/// The plugin reports `provider.:.product.:.engine`. Any component the plugin
/// leaves out is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LocoInfo {
    pub provider: Option<String>,
    pub product: Option<String>,
    pub engine: Option<String>,
}

impl LocoInfo {
    pub fn new(
        provider: impl Into<String>,
        product: impl Into<String>,
        engine: impl Into<String>,
    ) -> Self {
        Self {
            provider: Some(provider.into()),
            product: Some(product.into()),
            engine: Some(engine.into()),
        }
    }

    /// Parse the raw loco name string
    ///
    /// Returns `None` for an empty string, which is what the plugin reports
    /// when no loco is loaded. Components beyond the third are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }

        let mut parts = raw.split(LOCO_NAME_SEPARATOR).map(str::to_string);
        Some(Self {
            provider: parts.next(),
            product: parts.next(),
            engine: parts.next(),
        })
    }

    /// Render back into the plugin's wire form
    pub fn to_raw(&self) -> String {
        [&self.provider, &self.product, &self.engine]
            .iter()
            .filter_map(|part| part.as_deref())
            .collect::<Vec<_>>()
            .join(LOCO_NAME_SEPARATOR)
    }
}

impl fmt::Display for LocoInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {}",
            self.provider.as_deref().unwrap_or("?"),
            self.product.as_deref().unwrap_or("?"),
            self.engine.as_deref().unwrap_or("?")
        )
    }
}

/// A controller addressed either by position or by name
///
/// Index lookups go straight to the plugin. Name lookups cost an extra
/// controller list round trip, so hot paths should resolve the index once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ControllerRef {
    Index(u32),
    Name(String),
}

impl From<u32> for ControllerRef {
    fn from(index: u32) -> Self {
        ControllerRef::Index(index)
    }
}

impl From<&str> for ControllerRef {
    fn from(name: &str) -> Self {
        ControllerRef::Name(name.to_string())
    }
}

impl From<String> for ControllerRef {
    fn from(name: String) -> Self {
        ControllerRef::Name(name)
    }
}

impl From<&String> for ControllerRef {
    fn from(name: &String) -> Self {
        ControllerRef::Name(name.clone())
    }
}

/// Any value a field can take
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Number(f32),
    Bool(bool),
    Coordinates(Coordinates),
    Time(NaiveTime),
    Loco(LocoInfo),
    /// Reading exists but currently has nothing to report (no loco loaded)
    Absent,
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f32> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_coordinates(&self) -> Option<Coordinates> {
        match self {
            FieldValue::Coordinates(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            FieldValue::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_loco(&self) -> Option<&LocoInfo> {
        match self {
            FieldValue::Loco(info) => Some(info),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<Coordinates> for FieldValue {
    fn from(value: Coordinates) -> Self {
        FieldValue::Coordinates(value)
    }
}

impl From<NaiveTime> for FieldValue {
    fn from(value: NaiveTime) -> Self {
        FieldValue::Time(value)
    }
}

impl From<Option<LocoInfo>> for FieldValue {
    fn from(value: Option<LocoInfo>) -> Self {
        value.map(FieldValue::Loco).unwrap_or(FieldValue::Absent)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Coordinates(c) => write!(f, "{}", c),
            FieldValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            FieldValue::Loco(info) => write!(f, "{}", info),
            FieldValue::Absent => write!(f, "-"),
        }
    }
}
