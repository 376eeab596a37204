//! Node evaluation error types.
//!
//! Returned by `LazyNode::invoke` and carried in run reports. Errors are cheap to clone
//! because a failed node hands the same error back on every later invoke.

use std::sync::Arc;

use thiserror::Error;

use crate::checkpoint::StoreError;

/// Boxed error returned by user node functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error produced while evaluating a node.
///
/// `Computation` means the node's own logic (or one of its upstream nodes) failed.
/// `Persistence` means the logic succeeded but its checkpoint could not be written.
#[derive(Debug, Clone, Error)]
pub enum NodeError {
    /// The node function returned an error. The source is shared, not copied, so every
    /// invoke on the same node yields the identical error.
    #[error("node `{node}` failed: {source}")]
    Computation {
        node: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// The node computed a value but the save callback failed.
    #[error("node `{node}` computed a value but its checkpoint could not be saved: {source}")]
    Persistence {
        node: String,
        #[source]
        source: Arc<StoreError>,
    },
}

impl NodeError {
    /// Wraps a failure returned by the function of `node`.
    pub fn computation(node: impl Into<String>, source: BoxError) -> Self {
        NodeError::Computation {
            node: node.into(),
            source: Arc::from(source),
        }
    }

    /// Wraps a store failure raised after `node` computed successfully.
    pub fn persistence(node: impl Into<String>, source: StoreError) -> Self {
        NodeError::Persistence {
            node: node.into(),
            source: Arc::new(source),
        }
    }

    /// Name of the node the error originated from.
    pub fn node(&self) -> &str {
        match self {
            NodeError::Computation { node, .. } | NodeError::Persistence { node, .. } => node,
        }
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, NodeError::Persistence { .. })
    }

    /// True when both errors share the same underlying source allocation.
    pub fn same_cause(&self, other: &NodeError) -> bool {
        match (self, other) {
            (
                NodeError::Computation { source: a, .. },
                NodeError::Computation { source: b, .. },
            ) => Arc::ptr_eq(a, b),
            (
                NodeError::Persistence { source: a, .. },
                NodeError::Persistence { source: b, .. },
            ) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
