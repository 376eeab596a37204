//! Logging utilities for node evaluation and checkpoint handling.
//!
//! Provides structured logging for node computation, checkpoint load/save decisions and
//! run-instance lifecycle. Uses `tracing` when the feature is enabled, stderr otherwise.

use crate::checkpoint::{CheckpointKey, StoreError};
use crate::error::NodeError;

/// Log a node function that completed successfully.
pub fn log_node_computed(node: &str) {
    #[cfg(feature = "tracing")]
    tracing::debug!(node = node, "Node computed");

    #[cfg(not(feature = "tracing"))]
    eprintln!("[DEBUG] Node computed: {}", node);
}

/// Log a node that failed (computation or persistence).
pub fn log_node_failed(node: &str, error: &NodeError) {
    #[cfg(feature = "tracing")]
    tracing::warn!(node = node, %error, "Node failed");

    #[cfg(not(feature = "tracing"))]
    eprintln!("[WARN] Node failed: {}: {}", node, error);
}

/// Log a plain node taken over from an earlier instance with the same key.
pub fn log_node_reused(node: &str, key: &CheckpointKey) {
    #[cfg(feature = "tracing")]
    tracing::trace!(node = node, key = %key, "Node reused");

    #[cfg(not(feature = "tracing"))]
    let _ = (node, key);
}

/// Log a checkpoint served from the store.
pub fn log_checkpoint_loaded(node: &str, key: &CheckpointKey) {
    #[cfg(feature = "tracing")]
    tracing::info!(node = node, key = %key, "Loaded from checkpoint");

    #[cfg(not(feature = "tracing"))]
    eprintln!("[INFO] Loaded {} from checkpoint {}", node, key);
}

/// Log a checkpoint that could not be loaded and will be recomputed.
pub fn log_checkpoint_miss(node: &str, key: &CheckpointKey, error: &StoreError) {
    #[cfg(feature = "tracing")]
    tracing::debug!(node = node, key = %key, %error, "Checkpoint miss");

    #[cfg(not(feature = "tracing"))]
    eprintln!("[DEBUG] Checkpoint miss: {} at {}: {}", node, key, error);
}

/// Log a node whose checkpoint is bypassed by policy or the global flag.
pub fn log_forced_recompute(node: &str, key: &CheckpointKey) {
    #[cfg(feature = "tracing")]
    tracing::debug!(node = node, key = %key, "Forced recompute");

    #[cfg(not(feature = "tracing"))]
    eprintln!("[DEBUG] Forced recompute: {} at {}", node, key);
}

/// Log a checkpoint written after computation.
pub fn log_checkpoint_saved(node: &str, key: &CheckpointKey) {
    #[cfg(feature = "tracing")]
    tracing::info!(node = node, key = %key, "Saved checkpoint");

    #[cfg(not(feature = "tracing"))]
    eprintln!("[INFO] Saved {} to checkpoint {}", node, key);
}

/// Log the start of a run instance.
pub fn log_instance_start(output: &str, params: &str) {
    #[cfg(feature = "tracing")]
    tracing::info!(output = output, params = params, "Starting run instance");

    #[cfg(not(feature = "tracing"))]
    eprintln!("[INFO] Starting run instance: {}[{}]", output, params);
}

/// Log the end of a run instance.
pub fn log_instance_complete(output: &str, params: &str, outcome: &str) {
    #[cfg(feature = "tracing")]
    tracing::info!(output = output, params = params, outcome = outcome, "Run instance complete");

    #[cfg(not(feature = "tracing"))]
    eprintln!("[INFO] Run instance complete: {}[{}] {}", output, params, outcome);
}

/// Log the inert replicate marker on a checkpoint policy.
pub fn log_replicate_ignored(node: &str) {
    #[cfg(feature = "tracing")]
    tracing::trace!(node = node, "Replicate marker has no effect");

    #[cfg(not(feature = "tracing"))]
    let _ = node;
}
