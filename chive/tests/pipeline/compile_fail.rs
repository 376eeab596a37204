//! Declaration errors reported by `PipelineBuilder::compile`.

use chive::{Args, BoxError, CompilationError, PipelineBuilder, PolicyDescriptor};
use serde_json::{json, Value};

fn ok(_: &Args) -> Result<Value, BoxError> {
    Ok(json!(null))
}

/// **Scenario**: A step argument that names nothing declared fails compilation.
#[test]
fn unknown_argument() {
    let mut b = PipelineBuilder::new();
    b.add_param("dataset", ["x"])
        .add_node("node_1", &["datset"], ok);
    assert_eq!(
        b.compile().unwrap_err(),
        CompilationError::UnknownArgument {
            step: "node_1".into(),
            arg: "datset".into(),
        }
    );
}

/// **Scenario**: Outputs are terminal and cannot feed other steps.
#[test]
fn output_as_dependency() {
    let mut b = PipelineBuilder::new();
    b.add_output("first", &[], ok)
        .add_output("second", &["first"], ok);
    assert_eq!(
        b.compile().unwrap_err(),
        CompilationError::OutputAsDependency {
            step: "second".into(),
            output: "first".into(),
        }
    );
}

/// **Scenario**: Save-name overrides must be single path components.
#[test]
fn save_name_with_parent_component() {
    let mut b = PipelineBuilder::new();
    b.add_checkpoint("node_2", &[], PolicyDescriptor::new().save_as(".."), ok);
    match b.compile() {
        Err(CompilationError::InvalidRecordName { step, name, .. }) => {
            assert_eq!(step, "node_2");
            assert_eq!(name, "..");
        }
        other => panic!("expected InvalidRecordName, got {:?}", other.map(|_| ())),
    }
}

/// **Scenario**: A step cannot share a parameter's name.
#[test]
fn step_shadowing_param() {
    let mut b = PipelineBuilder::new();
    b.add_param("dataset", ["x"]).add_input("dataset", &[], ok);
    assert_eq!(
        b.compile().unwrap_err(),
        CompilationError::DuplicateName("dataset".into())
    );
}

/// **Scenario**: The context argument is accepted without declaration, but cannot name a step.
#[test]
fn context_is_reserved() {
    let mut b = PipelineBuilder::new();
    b.add_output("report", &["context"], ok);
    assert!(b.compile().is_ok());

    let mut b = PipelineBuilder::new();
    b.add_node("context", &[], ok);
    assert_eq!(
        b.compile().unwrap_err(),
        CompilationError::ReservedName("context".into())
    );
}

/// **Scenario**: A longer cycle is reported through every step on it.
#[test]
fn three_step_cycle() {
    let mut b = PipelineBuilder::new();
    b.add_node("a", &["c"], ok)
        .add_node("b", &["a"], ok)
        .add_node("c", &["b"], ok)
        .add_output("out", &["a"], ok);
    let err = b.compile().unwrap_err();
    assert_eq!(err, CompilationError::Cycle("a -> c -> b -> a".into()));
    assert!(err.to_string().starts_with("dependency cycle"));
}
