//! `sweep`: a per-dataset load reused across a scale sweep.
//!
//! `load` depends only on `dataset`, so it is computed once per dataset; `fit` is computed once
//! per (dataset, scale).

use chive::{PipelineBuilder, PolicyDescriptor};
use serde_json::json;

pub(super) fn builder() -> PipelineBuilder {
    let mut b = PipelineBuilder::new();
    b.add_param("dataset", ["small", "large"])
        .add_param("scale", [1, 2, 3])
        .add_save_path_node()
        .add_checkpoint("load", &["dataset"], PolicyDescriptor::new(), |args| {
            let dataset: String = args.parse("dataset")?;
            let n = match dataset.as_str() {
                "small" => 3,
                "large" => 6,
                other => other.len(),
            };
            Ok(json!((1..=n as i64).collect::<Vec<_>>()))
        })
        .add_checkpoint("fit", &["load", "scale"], PolicyDescriptor::new(), |args| {
            let load: Vec<i64> = args.parse("load")?;
            let scale: i64 = args.parse("scale")?;
            Ok(json!(load.iter().sum::<i64>() * scale))
        })
        .add_output("score", &["fit", "save_path"], |args| {
            Ok(json!({
                "score": args.get("fit").cloned().unwrap_or_default(),
                "path": args.get("save_path").cloned().unwrap_or_default(),
            }))
        });
    b
}
