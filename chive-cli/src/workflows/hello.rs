//! `hello`: one plain node feeding a checkpoint per dataset.

use chive::{PipelineBuilder, PolicyDescriptor};
use serde_json::{json, Value};

pub(super) fn builder() -> PipelineBuilder {
    let mut b = PipelineBuilder::new();
    b.add_param("dataset", ["test_dataset", "another_dataset"])
        .add_node("node_1", &[], |_| Ok(json!(1)))
        .add_checkpoint(
            "node_2",
            &["node_1", "dataset"],
            PolicyDescriptor::new().save_as("helloworld"),
            |args| {
                let dataset: String = args.parse("dataset")?;
                tracing::info!(dataset = %dataset, "hello world");
                Ok(Value::String(dataset))
            },
        )
        .add_output("other_function", &["dataset", "node_2"], |args| {
            let dataset = args.get("dataset").cloned().unwrap_or_default();
            let node_2 = args.get("node_2").cloned().unwrap_or_default();
            if node_2 != dataset {
                return Err(format!("node_2 returned {} for dataset {}", node_2, dataset).into());
            }
            Ok(node_2)
        });
    b
}
