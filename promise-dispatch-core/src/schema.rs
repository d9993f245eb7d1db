//! Schema resolution: from an incoming action to a [`Descriptor`]
//!
//! Resolution is a pure function of the action and the [`Config`]. Every
//! shape is validated up front so the engine never sees a half-valid action.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::action::{Action, Stage, TYPE_FIELD};
use crate::config::{Config, StageNames};
use crate::error::{ConfigurationError, Result};
use crate::value::{Callback, Function, Operation, Value};

/// One optional entry per lifecycle stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Staged<T> {
    /// Start entry.
    pub start: Option<T>,
    /// Success entry.
    pub success: Option<T>,
    /// Error entry.
    pub error: Option<T>,
}

impl<T> Default for Staged<T> {
    fn default() -> Self {
        Self {
            start: None,
            success: None,
            error: None,
        }
    }
}

impl<T> Staged<T> {
    /// Entry for a stage.
    pub fn get(&self, stage: Stage) -> Option<&T> {
        match stage {
            Stage::Start => self.start.as_ref(),
            Stage::Success => self.success.as_ref(),
            Stage::Error => self.error.as_ref(),
        }
    }

    fn set(&mut self, stage: Stage, value: T) {
        let slot = match stage {
            Stage::Start => &mut self.start,
            Stage::Success => &mut self.success,
            Stage::Error => &mut self.error,
        };
        *slot = Some(value);
    }
}

/// The two accepted spellings of a staged field.
enum StagedShape<'a> {
    Triple(&'a [Value]),
    Named(&'a BTreeMap<String, Value>),
}

impl<'a> StagedShape<'a> {
    fn of(value: &'a Value) -> Option<Self> {
        match value {
            Value::List(items) => Some(Self::Triple(items)),
            Value::Map(map) => Some(Self::Named(map)),
            _ => None,
        }
    }

    fn entry(&self, stage: Stage, names: &StageNames) -> Option<&'a Value> {
        match self {
            Self::Triple(items) => items.get(stage.index()),
            Self::Named(map) => map.get(names.name(stage)),
        }
    }
}

/// How the action asked to be run.
#[derive(Debug, Clone)]
pub enum Invocation {
    /// An asynchronous operation, optionally preceded by a side function
    /// whose result is discarded.
    Async {
        /// The operation whose outcome drives success/error.
        operation: Operation,
        /// Function run first, for its side effects only.
        side: Option<Function>,
    },
    /// Only a synchronous function.
    Sync(Function),
}

/// Everything the engine needs to expand one action.
#[derive(Debug, Clone)]
pub struct Descriptor {
    /// What to run.
    pub invocation: Invocation,
    /// Literal top-level `type` of the action.
    pub literal_type: Option<String>,
    /// Resolved lifecycle type names.
    pub types: Staged<String>,
    /// Per-action local callbacks.
    pub callbacks: Staged<Callback>,
    /// Per-stage debounce intervals.
    pub debounce: Staged<Duration>,
    /// Fields forwarded verbatim into every notification and payload.
    pub rest: Action,
}

impl Descriptor {
    /// Type name a stage's notification is emitted under, if any.
    ///
    /// Success falls back to the literal `type`; start and error never do.
    pub fn type_name(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::Success => self
                .types
                .success
                .as_deref()
                .or(self.literal_type.as_deref()),
            Stage::Start | Stage::Error => self.types.get(stage).map(String::as_str),
        }
    }
}

/// Resolve an action against the configuration.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] when a staged field is neither a triple
/// nor a mapping, when one of its entries has the wrong kind, when neither a
/// literal type nor the types field is present, or when the operation or
/// function field holds something that is not callable.
pub fn resolve(config: &Config, mut action: Action) -> Result<Descriptor> {
    let types_value = action.remove(&config.types_field);
    let types = resolve_staged(
        types_value.as_ref(),
        &config.types_field,
        &config.types_names,
        "a type name string",
        |v| v.as_str().map(str::to_string),
    )?;

    let literal_type = match action.remove(TYPE_FIELD) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(v) if v.is_truthy() => {
            return Err(ConfigurationError::InvalidType { found: v.kind() });
        }
        _ => None,
    };

    if literal_type.is_none() && types.is_none() {
        return Err(ConfigurationError::MissingType {
            types_field: config.types_field.clone(),
        });
    }

    let callbacks_value = action.remove(&config.callbacks_field);
    let callbacks = resolve_staged(
        callbacks_value.as_ref(),
        &config.callbacks_field,
        &config.callbacks_names,
        "a callback",
        |v| v.as_callback().cloned(),
    )?;

    let debounce_value = action.remove(&config.debounce_field);
    let debounce = resolve_staged(
        debounce_value.as_ref(),
        &config.debounce_field,
        &config.debounce_names,
        "a non-negative number of milliseconds",
        |v| {
            v.as_f64()
                .filter(|ms| ms.is_finite() && *ms >= 0.0)
                .and_then(|ms| Duration::try_from_secs_f64(ms / 1000.0).ok())
        },
    )?;

    let operation = take_callable(
        &mut action,
        &config.operation_field,
        "an operation returning a future",
        |v| v.as_operation().cloned(),
    )?;
    let function = take_callable(
        &mut action,
        &config.function_field,
        "a function",
        |v| v.as_function().cloned(),
    )?;

    let invocation = match (operation, function) {
        (Some(operation), side) => Invocation::Async { operation, side },
        (None, Some(function)) => Invocation::Sync(function),
        (None, None) => {
            return Err(ConfigurationError::NothingToRun {
                operation_field: config.operation_field.clone(),
                function_field: config.function_field.clone(),
            });
        }
    };

    Ok(Descriptor {
        invocation,
        literal_type,
        types: types.unwrap_or_default(),
        callbacks: callbacks.unwrap_or_default(),
        debounce: debounce.unwrap_or_default(),
        rest: action,
    })
}

/// Resolve one triple-or-mapping field. Falsy fields and entries are absent.
fn resolve_staged<T>(
    value: Option<&Value>,
    field: &str,
    names: &StageNames,
    expected: &'static str,
    convert: impl Fn(&Value) -> Option<T>,
) -> Result<Option<Staged<T>>> {
    let Some(value) = value.filter(|v| v.is_truthy()) else {
        return Ok(None);
    };
    let shape = StagedShape::of(value).ok_or_else(|| ConfigurationError::InvalidShape {
        field: field.to_string(),
        found: value.kind(),
    })?;

    let mut staged = Staged::default();
    for stage in Stage::ALL {
        let Some(entry) = shape.entry(stage, names).filter(|v| v.is_truthy()) else {
            continue;
        };
        let converted = convert(entry).ok_or_else(|| ConfigurationError::InvalidEntry {
            field: field.to_string(),
            stage,
            expected,
            found: entry.kind(),
        })?;
        staged.set(stage, converted);
    }
    Ok(Some(staged))
}

fn take_callable<T>(
    action: &mut Action,
    field: &str,
    expected: &'static str,
    convert: impl Fn(&Value) -> Option<T>,
) -> Result<Option<T>> {
    match action.remove(field) {
        Some(value) if value.is_truthy() => {
            convert(&value)
                .map(Some)
                .ok_or_else(|| ConfigurationError::NotCallable {
                    field: field.to_string(),
                    expected,
                    found: value.kind(),
                })
        }
        _ => Ok(None),
    }
}
