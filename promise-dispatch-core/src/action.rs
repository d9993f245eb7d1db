//! Actions, notifications and lifecycle stages
//!
//! An [`Action`] is an open record keyed by field name. Which fields the
//! middleware recognizes is decided by [`Config`](crate::Config); every other
//! field rides along unchanged into each emitted notification.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::value::Value;

/// Name of the literal type field (`{ type: "X" }`).
pub const TYPE_FIELD: &str = "type";
/// Field carrying an operation's fulfilled value in success notifications.
pub const RESULT_FIELD: &str = "result";
/// Field carrying the failure value in error notifications.
pub const ERROR_FIELD: &str = "error";

/// Lifecycle stage of an expanded action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Emitted before the operation runs.
    Start,
    /// Emitted when the operation produced a result.
    Success,
    /// Emitted when the operation failed.
    Error,
}

impl Stage {
    /// All stages, in lifecycle order.
    pub const ALL: [Stage; 3] = [Stage::Start, Stage::Success, Stage::Error];

    /// Position in a `[start, success, error]` triple.
    pub fn index(self) -> usize {
        match self {
            Stage::Start => 0,
            Stage::Success => 1,
            Stage::Error => 2,
        }
    }

    /// Lower-case stage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::Success => "success",
            Stage::Error => "error",
        }
    }

    /// Whether this stage finishes the lifecycle (success or error).
    pub fn is_finish(self) -> bool {
        matches!(self, Stage::Success | Stage::Error)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An open record of named fields.
///
/// Incoming actions, forwarded notifications and callback payloads all share
/// this shape.
///
/// # Example
///
/// ```ignore
/// let action = Action::new()
///     .with("types", vec!["FETCH", "FETCH_OK", "FETCH_ERR"])
///     .with("promise", Operation::new(|_| async { Ok(Value::from(42)) }))
///     .with("payload", "user-7");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Action {
    fields: BTreeMap<String, Value>,
}

impl Action {
    /// Create an empty action.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an action with only a literal `type` field.
    pub fn typed(type_name: impl Into<String>) -> Self {
        Self::new().with(TYPE_FIELD, Value::String(type_name.into()))
    }

    /// Set a field, returning the action (builder style).
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Set a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Borrow a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Whether a field is present with a truthy value.
    pub fn is_set(&self, field: &str) -> bool {
        self.fields.get(field).is_some_and(Value::is_truthy)
    }

    /// Copy of this action without the given fields.
    pub fn without(&self, fields: &[&str]) -> Self {
        Self {
            fields: self
                .fields
                .iter()
                .filter(|(k, _)| !fields.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// The literal `type` field, if it is a string.
    pub fn type_name(&self) -> Option<&str> {
        self.get(TYPE_FIELD).and_then(Value::as_str)
    }

    /// Iterate over fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Field names in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the action has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consume into the underlying field map.
    pub fn into_fields(self) -> BTreeMap<String, Value> {
        self.fields
    }

    /// JSON view of the action (callables become markers).
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, Value>> for Action {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Action {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
    }
}

impl FromIterator<(String, Value)> for Action {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Action {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
