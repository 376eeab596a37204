//! Lazy, memoized computation nodes.
//!
//! A [`LazyNode`] wraps a function and its arguments. Nothing runs until [`LazyNode::invoke`]
//! is called; the first invoke resolves every lazy argument (depth-first, positional before
//! keyword), calls the function once and memoizes either the value or the error. Later invokes
//! return the memoized outcome without side effects.
//!
//! A save callback may be attached before the first invoke. It runs after the function
//! succeeds and is how checkpointed nodes persist their result.

mod args;

pub use args::{ArgError, Args};

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::checkpoint::StoreError;
use crate::error::{BoxError, NodeError};
use crate::logging;

/// Function evaluated by a node. Returns exactly one value per call.
pub type NodeFn = Arc<dyn Fn(&Args) -> Result<Value, BoxError> + Send + Sync>;

/// Callback run with a freshly computed value (e.g. write a checkpoint).
pub type SaveCallback = Box<dyn Fn(&Value) -> Result<(), StoreError> + Send + Sync>;

/// One argument of a node: a concrete value or another node to be resolved first.
#[derive(Clone)]
pub enum Arg {
    Value(Value),
    Lazy(Arc<LazyNode>),
}

impl Arg {
    fn resolve(&self) -> Result<Value, NodeError> {
        match self {
            Arg::Value(v) => Ok(v.clone()),
            Arg::Lazy(node) => node.invoke(),
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Arg::Lazy(node) => f.debug_tuple("Lazy").field(&node.name).finish(),
        }
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Value(v)
    }
}

impl From<Arc<LazyNode>> for Arg {
    fn from(node: Arc<LazyNode>) -> Self {
        Arg::Lazy(node)
    }
}

#[derive(Default)]
struct Memo {
    value: Option<Value>,
    error: Option<NodeError>,
    persistence_error: Option<NodeError>,
}

/// Memoized thunk over a function and its (possibly lazy) arguments.
pub struct LazyNode {
    name: String,
    func: NodeFn,
    args: Vec<Arg>,
    kwargs: Vec<(String, Arg)>,
    memo: Mutex<Memo>,
    save_callback: Mutex<Option<SaveCallback>>,
}

impl LazyNode {
    /// Creates an unresolved node named `name` over `func`.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Args) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self::from_fn(name, Arc::new(func))
    }

    /// Same as [`new`](Self::new) for an already shared function.
    pub fn from_fn(name: impl Into<String>, func: NodeFn) -> Self {
        Self {
            name: name.into(),
            func,
            args: Vec::new(),
            kwargs: Vec::new(),
            memo: Mutex::new(Memo::default()),
            save_callback: Mutex::new(None),
        }
    }

    /// Node with no arguments that returns `value`. Used in place of the real function when a
    /// checkpoint was loaded, so upstream nodes are never forced.
    pub fn constant(name: impl Into<String>, value: Value) -> Self {
        Self::new(name, move |_| Ok(value.clone()))
    }

    /// Appends a positional argument.
    pub fn with_arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends a keyword argument.
    pub fn with_kwarg(mut self, name: impl Into<String>, arg: impl Into<Arg>) -> Self {
        self.kwargs.push((name.into(), arg.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attaches (or replaces) the callback run after the function first succeeds.
    pub fn set_save_callback(&self, callback: SaveCallback) {
        *lock(&self.save_callback) = Some(callback);
    }

    pub fn has_save_callback(&self) -> bool {
        lock(&self.save_callback).is_some()
    }

    /// True once the node holds a value or an error.
    pub fn is_resolved(&self) -> bool {
        let memo = lock(&self.memo);
        memo.value.is_some() || memo.error.is_some()
    }

    /// Memoized value, if the function already succeeded.
    pub fn cached_value(&self) -> Option<Value> {
        lock(&self.memo).value.clone()
    }

    /// Memoized error, if the function already failed.
    pub fn cached_error(&self) -> Option<NodeError> {
        lock(&self.memo).error.clone()
    }

    /// Failure of the save callback, if any. The computed value stays available.
    pub fn persistence_error(&self) -> Option<NodeError> {
        lock(&self.memo).persistence_error.clone()
    }

    /// Returns the memoized value, computing it on first use.
    ///
    /// The function executes at most once per node. When the save callback fails, this call
    /// returns [`NodeError::Persistence`]; the value is still memoized and later calls return it.
    pub fn invoke(&self) -> Result<Value, NodeError> {
        let mut memo = lock(&self.memo);
        if let Some(v) = &memo.value {
            return Ok(v.clone());
        }
        if let Some(e) = &memo.error {
            return Err(e.clone());
        }

        let value = match self.call() {
            Ok(v) => v,
            Err(e) => {
                logging::log_node_failed(&self.name, &e);
                memo.error = Some(e.clone());
                return Err(e);
            }
        };
        memo.value = Some(value.clone());
        logging::log_node_computed(&self.name);

        if let Some(callback) = lock(&self.save_callback).as_ref() {
            if let Err(source) = callback(&value) {
                let err = NodeError::persistence(&self.name, source);
                logging::log_node_failed(&self.name, &err);
                memo.persistence_error = Some(err.clone());
                return Err(err);
            }
        }
        Ok(value)
    }

    fn call(&self) -> Result<Value, NodeError> {
        let positional = self
            .args
            .iter()
            .map(Arg::resolve)
            .collect::<Result<Vec<_>, _>>()?;
        let named = self
            .kwargs
            .iter()
            .map(|(k, a)| a.resolve().map(|v| (k.clone(), v)))
            .collect::<Result<Vec<_>, _>>()?;
        let args = Args::new(positional, named);
        (self.func)(&args).map_err(|e| NodeError::computation(&self.name, e))
    }
}

impl fmt::Debug for LazyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyNode")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("kwargs", &self.kwargs)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Locks ignoring poison: a panicking node function leaves the memo unresolved.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
