use regex::Regex;

use super::types::Dag;
use crate::error::Result;

/// Compiles a job name pattern for [`filter_dag`].
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(pattern)?)
}

/// Keeps the jobs whose name matches `pattern` at its start.
///
/// Surviving jobs keep their need sets as they are, including needs that were
/// themselves filtered out. Nothing is re-closed.
pub fn filter_dag(dag: Dag, pattern: &Regex) -> Dag {
    dag.into_iter()
        .filter(|(job, _)| matches_from_start(pattern, job))
        .collect()
}

// The leftmost match starts at 0 whenever any match does.
fn matches_from_start(pattern: &Regex, job: &str) -> bool {
    pattern.find(job).is_some_and(|m| m.start() == 0)
}
