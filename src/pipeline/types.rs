use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Job name -> names of the jobs it depends on.
///
/// Before closure the sets hold direct `needs` only; after
/// [`traverse_dag_needs`](super::closure::traverse_dag_needs) they hold every
/// job that must complete first. Keys keep the order in which jobs were first
/// seen in the pipeline listing.
pub type Dag = IndexMap<String, BTreeSet<String>>;

/// Job name -> non-dependency fields of that job.
pub type JobsMetadata = IndexMap<String, JobMetadata>;

/// A GraphQL connection. Only `nodes` is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Connection<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_default")]
    pub nodes: Vec<T>,
}

/// GitLab returns `null` for connections it cannot resolve; treat those as empty.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

/// Pipeline listing as returned by the `PipelineDetails` query:
/// `stages.nodes[].groups.nodes[].jobs.nodes[]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub stages: Connection<RawStage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStage {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub groups: Connection<RawGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGroup {
    #[serde(default, deserialize_with = "null_as_default")]
    pub jobs: Connection<RawJob>,
}

/// A job node. Anything besides `name` and `needs` lands in `metadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawJob {
    pub name: String,
    #[serde(default)]
    pub needs: Option<Connection<NeedNode>>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeedNode {
    pub name: String,
}

/// Non-dependency fields of a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobMetadata {
    /// Name of the stage listing this job
    pub stage: String,
    /// Every other field returned for the job (status, id, ...)
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}
