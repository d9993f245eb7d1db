//! Dynamic values carried by action fields
//!
//! Actions are open records: besides plain data they carry the callables the
//! middleware runs ([`Operation`], [`Function`]) and the observers it notifies
//! ([`Callback`]). [`Value`] is the closed set of everything a field can hold.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Number;

use crate::action::Action;
use crate::store::OperationContext;

/// Boxed future returned by an [`Operation`].
///
/// `Ok` carries the fulfilled result, `Err` the rejection value.
pub type OperationFuture = Pin<Box<dyn Future<Output = Result<Value, Value>> + Send + 'static>>;

/// An asynchronous operation: called once, returns a deferred result.
#[derive(Clone)]
pub struct Operation(Arc<dyn Fn(OperationContext) -> OperationFuture + Send + Sync>);

impl Operation {
    /// Wrap an async closure.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let fetch = Operation::new(|ctx| async move {
    ///     let user = api::load_user(ctx.get("api_url")).await?;
    ///     Ok(Value::from(user.name))
    /// });
    /// ```
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(OperationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Value>> + Send + 'static,
    {
        Self(Arc::new(move |ctx| Box::pin(f(ctx))))
    }

    /// Invoke the operation, returning its pending result.
    pub fn call(&self, ctx: OperationContext) -> OperationFuture {
        (self.0)(ctx)
    }

    /// Whether both handles point at the same closure.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Operation(..)")
    }
}

/// A synchronous operation. `Err` stands for a thrown value.
#[derive(Clone)]
pub struct Function(Arc<dyn Fn(OperationContext) -> Result<Value, Value> + Send + Sync>);

impl Function {
    /// Wrap a plain closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(OperationContext) -> Result<Value, Value> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the function.
    pub fn call(&self, ctx: OperationContext) -> Result<Value, Value> {
        (self.0)(ctx)
    }

    /// Whether both handles point at the same closure.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Function(..)")
    }
}

/// An observer invoked with a notification or callback payload.
///
/// Used for per-action local callbacks and for global hooks alike.
#[derive(Clone)]
pub struct Callback(Arc<dyn Fn(&Action) + Send + Sync>);

impl Callback {
    /// Wrap an observer closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Action) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the observer.
    pub fn call(&self, payload: &Action) {
        (self.0)(payload);
    }

    /// Whether both handles point at the same closure.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

/// Any value an action field can hold.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Absent or explicitly empty.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// JSON number.
    Number(Number),
    /// String.
    String(String),
    /// Ordered sequence, e.g. a `[start, success, error]` triple.
    List(Vec<Value>),
    /// Named mapping, e.g. `{start, success, error}`.
    Map(BTreeMap<String, Value>),
    /// Asynchronous operation.
    Operation(Operation),
    /// Synchronous operation.
    Function(Function),
    /// Observer callable.
    Callback(Callback),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Operation(_) => "operation",
            Value::Function(_) => "function",
            Value::Callback(_) => "callback",
        }
    }

    /// Truthiness used for "present" checks.
    ///
    /// `null`, `false`, zero and the empty string are falsy; everything
    /// else, including empty lists and maps, is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value as `f64`, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Borrow the operation, if this is one.
    pub fn as_operation(&self) -> Option<&Operation> {
        match self {
            Value::Operation(op) => Some(op),
            _ => None,
        }
    }

    /// Borrow the function, if this is one.
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(func) => Some(func),
            _ => None,
        }
    }

    /// Borrow the callback, if this is one.
    pub fn as_callback(&self) -> Option<&Callback> {
        match self {
            Value::Callback(cb) => Some(cb),
            _ => None,
        }
    }

    /// Convert into JSON. Callables become a `"<kind>"` marker string.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            callable => serde_json::Value::String(format!("<{}>", callable.kind())),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Operation(a), Value::Operation(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Callback(a), Value::Callback(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            callable => serializer.serialize_str(&format!("<{}>", callable.kind())),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

impl From<f64> for Value {
    /// Non-finite floats have no JSON representation and become `Null`.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl From<Action> for Value {
    fn from(action: Action) -> Self {
        Value::Map(action.into_fields())
    }
}

impl From<Operation> for Value {
    fn from(op: Operation) -> Self {
        Value::Operation(op)
    }
}

impl From<Function> for Value {
    fn from(func: Function) -> Self {
        Value::Function(func)
    }
}

impl From<Callback> for Value {
    fn from(cb: Callback) -> Self {
        Value::Callback(cb)
    }
}
