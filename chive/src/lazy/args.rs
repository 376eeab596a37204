//! Resolved arguments handed to a node function.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Error when a node function reads an argument it did not receive or cannot decode.
#[derive(Debug, Error)]
pub enum ArgError {
    #[error("missing argument `{0}`")]
    Missing(String),

    #[error("argument `{name}` has an unexpected shape: {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Concrete argument values for one call of a node function.
///
/// Positional values come first, in declaration order, followed by keyword values.
/// Every lazy argument has already been resolved by the time a function sees this.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    positional: Vec<Value>,
    named: Vec<(String, Value)>,
}

impl Args {
    pub fn new(positional: Vec<Value>, named: Vec<(String, Value)>) -> Self {
        Self { positional, named }
    }

    /// Keyword argument by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.named
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Positional argument by index.
    pub fn at(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Keyword argument decoded into `T`.
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> Result<T, ArgError> {
        let value = self
            .get(name)
            .ok_or_else(|| ArgError::Missing(name.to_string()))?;
        serde_json::from_value(value.clone()).map_err(|source| ArgError::Decode {
            name: name.to_string(),
            source,
        })
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn named(&self) -> &[(String, Value)] {
        &self.named
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}
