//! Middleware configuration
//!
//! [`Config`] names the action fields the middleware recognizes and holds the
//! globally registered hooks. Field names can be overridden in code or read
//! from a JSON document; anything left out keeps its default.

use serde::Deserialize;

use crate::action::{Stage, TYPE_FIELD};
use crate::error::Result;
use crate::hooks::GlobalHook;

/// Key names used when a staged field is given as a mapping.
///
/// Defaults to `start` / `success` / `error`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StageNames {
    /// Key holding the start entry.
    pub start: String,
    /// Key holding the success entry.
    pub success: String,
    /// Key holding the error entry.
    pub error: String,
}

impl Default for StageNames {
    fn default() -> Self {
        Self::new("start", "success", "error")
    }
}

impl StageNames {
    /// Create key names for all three stages.
    pub fn new(
        start: impl Into<String>,
        success: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            start: start.into(),
            success: success.into(),
            error: error.into(),
        }
    }

    /// Key name for a stage.
    pub fn name(&self, stage: Stage) -> &str {
        match stage {
            Stage::Start => &self.start,
            Stage::Success => &self.success,
            Stage::Error => &self.error,
        }
    }
}

/// Configuration for [`PromiseMiddleware`](crate::PromiseMiddleware).
///
/// # Example
///
/// ```ignore
/// use promise_dispatch::{Config, GlobalHook, action_types};
///
/// // In code
/// let config = Config::default()
///     .with_types_field("types1")
///     .with_hook(GlobalHook::on(action_types::ERROR, report_error));
///
/// // From a document; missing keys keep their defaults
/// let config = Config::from_json(serde_json::json!({
///     "operationField": "run",
///     "typesNames": { "start": "begin" },
/// }))?;
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Field holding the asynchronous operation.
    #[serde(alias = "promiseField")]
    pub operation_field: String,
    /// Field holding the synchronous function.
    pub function_field: String,
    /// Field holding the lifecycle type names.
    pub types_field: String,
    /// Keys used when the types field is a mapping.
    pub types_names: StageNames,
    /// Field holding the per-action local callbacks.
    #[serde(alias = "hooksField")]
    pub callbacks_field: String,
    /// Keys used when the callbacks field is a mapping.
    #[serde(alias = "hooksNames")]
    pub callbacks_names: StageNames,
    /// Field holding the per-stage debounce intervals in milliseconds.
    pub debounce_field: String,
    /// Keys used when the debounce field is a mapping.
    pub debounce_names: StageNames,
    /// Globally registered hooks, invoked in registration order.
    #[serde(skip)]
    pub hooks: Vec<GlobalHook>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            operation_field: "promise".to_string(),
            function_field: "function".to_string(),
            types_field: "types".to_string(),
            types_names: StageNames::default(),
            callbacks_field: "callbacks".to_string(),
            callbacks_names: StageNames::default(),
            debounce_field: "debounce".to_string(),
            debounce_names: StageNames::default(),
            hooks: Vec::new(),
        }
    }
}

impl Config {
    /// Read field-name overrides from a JSON document.
    ///
    /// Hooks cannot be expressed as data; register them with
    /// [`with_hook`](Self::with_hook) afterwards.
    pub fn from_json(document: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(document)?)
    }

    /// Override the operation field name.
    pub fn with_operation_field(mut self, field: impl Into<String>) -> Self {
        self.operation_field = field.into();
        self
    }

    /// Override the function field name.
    pub fn with_function_field(mut self, field: impl Into<String>) -> Self {
        self.function_field = field.into();
        self
    }

    /// Override the types field name.
    pub fn with_types_field(mut self, field: impl Into<String>) -> Self {
        self.types_field = field.into();
        self
    }

    /// Override the keys used for a types mapping.
    pub fn with_types_names(mut self, names: StageNames) -> Self {
        self.types_names = names;
        self
    }

    /// Override the callbacks field name.
    pub fn with_callbacks_field(mut self, field: impl Into<String>) -> Self {
        self.callbacks_field = field.into();
        self
    }

    /// Override the keys used for a callbacks mapping.
    pub fn with_callbacks_names(mut self, names: StageNames) -> Self {
        self.callbacks_names = names;
        self
    }

    /// Override the debounce field name.
    pub fn with_debounce_field(mut self, field: impl Into<String>) -> Self {
        self.debounce_field = field.into();
        self
    }

    /// Override the keys used for a debounce mapping.
    pub fn with_debounce_names(mut self, names: StageNames) -> Self {
        self.debounce_names = names;
        self
    }

    /// Register a global hook after the ones already present.
    pub fn with_hook(mut self, hook: GlobalHook) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Fields consumed by the middleware and kept out of notifications.
    pub fn recognized_fields(&self) -> [&str; 6] {
        [
            &self.operation_field,
            &self.function_field,
            &self.types_field,
            &self.callbacks_field,
            &self.debounce_field,
            TYPE_FIELD,
        ]
    }
}
