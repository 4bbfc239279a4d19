use serde::Serialize;
use serde_yaml::{Mapping, Value};

use super::variables::yaml_to_string;

/// Script keywords in execution order.
pub const SCRIPT_PHASES: [&str; 3] = ["before_script", "script", "after_script"];

/// Lines of one script keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptPhase {
    pub phase: String,
    pub lines: Vec<String>,
}

/// Every script phase of a job, flattened. Missing phases are empty.
pub fn get_full_script(job: &Mapping) -> Vec<ScriptPhase> {
    SCRIPT_PHASES
        .iter()
        .map(|phase| ScriptPhase {
            phase: (*phase).to_string(),
            lines: job.get(*phase).map(flatten).unwrap_or_default(),
        })
        .collect()
}

/// Flattens arbitrarily nested sequences (as produced by `!reference` tags
/// and YAML anchors) into a flat list of lines.
pub fn flatten(value: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    flatten_into(value, &mut lines);
    lines
}

fn flatten_into(value: &Value, lines: &mut Vec<String>) {
    match value {
        Value::Sequence(items) => {
            for item in items {
                flatten_into(item, lines);
            }
        }
        Value::Tagged(tagged) => flatten_into(&tagged.value, lines),
        Value::Null => {}
        other => lines.push(yaml_to_string(other)),
    }
}
