use serde_yaml::{Mapping, Value};

use super::document::MergedDocument;
use crate::error::{CidagError, Result};

/// Keyword pointing a job at the jobs it inherits from.
pub const EXTENDS: &str = "extends";

/// Resolves `target` for a job, pulling in what its parents define.
///
/// Parents named by `relationship` (a string or a list of strings) are
/// resolved first, depth-first, and merged left to right so later parents
/// override earlier ones. The job's own values are laid over the result.
///
/// # Errors
///
/// Returns `UnknownJob` if a parent is missing from the document and
/// `CyclicInheritance` if a job is reached again through its own ancestors.
pub fn inherit_field(
    document: &MergedDocument,
    job_name: &str,
    relationship: &str,
    target: &str,
) -> Result<Mapping> {
    let mut path = Vec::new();
    recursive_fill(document, job_name, relationship, target, &mut path)
}

fn recursive_fill(
    document: &MergedDocument,
    job_name: &str,
    relationship: &str,
    target: &str,
    path: &mut Vec<String>,
) -> Result<Mapping> {
    if path.iter().any(|ancestor| ancestor == job_name) {
        let mut chain = path.clone();
        chain.push(job_name.to_string());
        return Err(CidagError::CyclicInheritance { chain });
    }

    let job = document.job(job_name)?;

    path.push(job_name.to_string());
    let mut acc = Mapping::new();
    for parent in relatives(job.get(relationship)) {
        acc.extend(recursive_fill(document, parent, relationship, target, path)?);
    }
    path.pop();

    if let Some(own) = job.get(target).and_then(Value::as_mapping) {
        acc.extend(own.clone());
    }

    Ok(acc)
}

fn relatives(value: Option<&Value>) -> Vec<&str> {
    match value {
        Some(Value::String(parent)) => vec![parent.as_str()],
        Some(Value::Sequence(parents)) => parents.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}
