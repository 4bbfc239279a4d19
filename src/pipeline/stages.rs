use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use super::types::{Dag, JobsMetadata};
use crate::error::{CidagError, Result};

/// A stage and the jobs listed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
    pub name: String,
    pub jobs: BTreeSet<String>,
}

/// Stages in pipeline execution order.
///
/// The order is the order of the `Vec` handed to [`StageSequence::new`];
/// stage names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StageSequence {
    stages: Vec<Stage>,
}

impl StageSequence {
    /// # Errors
    ///
    /// Returns `InvalidStageSequence` if a stage name appears more than once.
    pub fn new(stages: Vec<Stage>) -> Result<Self> {
        let mut seen = HashSet::new();
        for stage in &stages {
            if !seen.insert(stage.name.as_str()) {
                return Err(CidagError::InvalidStageSequence(format!(
                    "stage '{}' appears more than once",
                    stage.name
                )));
            }
        }

        Ok(Self { stages })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Execution index of a stage.
    pub fn position(&self, stage: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.name == stage)
    }

    /// Running union of job names: entry `i` holds every job of stages `0..=i`.
    pub fn cumulative_jobs(&self) -> Vec<BTreeSet<String>> {
        self.stages
            .iter()
            .scan(BTreeSet::new(), |acc: &mut BTreeSet<String>, stage| {
                acc.extend(stage.jobs.iter().cloned());
                Some(acc.clone())
            })
            .collect()
    }
}

/// Gives jobs without explicit `needs` an edge to every job of the earlier stages.
///
/// Jobs that already declare needs are left untouched, as are names that only
/// appear as someone else's need (they have no metadata and hence no stage).
/// The returned DAG has the same keys as the input.
pub fn insert_early_stage_jobs(dag: Dag, stages: &StageSequence, jobs: &JobsMetadata) -> Dag {
    let jobs_from_early_stages = stages.cumulative_jobs();

    dag.into_iter()
        .map(|(job_name, mut needs)| {
            if needs.is_empty() {
                let stage_index = jobs
                    .get(&job_name)
                    .and_then(|metadata| stages.position(&metadata.stage));

                if let Some(index) = stage_index.filter(|&i| i > 0) {
                    needs.extend(jobs_from_early_stages[index - 1].iter().cloned());
                }
            }
            (job_name, needs)
        })
        .collect()
}
