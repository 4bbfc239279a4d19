use std::collections::BTreeSet;

use log::debug;

use super::stages::{Stage, StageSequence};
use super::types::{Dag, JobMetadata, JobsMetadata, PipelineResult};
use crate::error::Result;

/// Output of [`extract_stages_and_job_needs`].
#[derive(Debug, Clone)]
pub struct ExtractedPipeline {
    /// Direct `needs` only. Every referenced need has a key.
    pub dag: Dag,
    pub stages: StageSequence,
    pub jobs: JobsMetadata,
}

/// Splits a pipeline listing into an incomplete DAG, the stage sequence and
/// the per-job metadata table.
///
/// A job without a `needs` connection gets an empty set. Names that are only
/// ever referenced as a need still get a (possibly empty) entry, so the
/// closure never looks up a missing key.
///
/// # Errors
///
/// Returns `InvalidStageSequence` if the listing repeats a stage name.
pub fn extract_stages_and_job_needs(pipeline: PipelineResult) -> Result<ExtractedPipeline> {
    let mut dag = Dag::new();
    let mut jobs = JobsMetadata::new();
    let mut stages = Vec::new();

    for stage in pipeline.stages.nodes {
        let mut stage_jobs = BTreeSet::new();

        for group in stage.groups.nodes {
            for job in group.jobs.nodes {
                let needs: BTreeSet<String> = job
                    .needs
                    .map(|conn| conn.nodes.into_iter().map(|need| need.name).collect())
                    .unwrap_or_default();

                for need in &needs {
                    dag.entry(need.clone()).or_default();
                }

                stage_jobs.insert(job.name.clone());
                jobs.insert(
                    job.name.clone(),
                    JobMetadata {
                        stage: stage.name.clone(),
                        fields: job.metadata,
                    },
                );
                dag.insert(job.name, needs);
            }
        }

        stages.push(Stage {
            name: stage.name,
            jobs: stage_jobs,
        });
    }

    debug!(
        "Extracted {} jobs across {} stages ({} DAG entries)",
        jobs.len(),
        stages.len(),
        dag.len()
    );

    Ok(ExtractedPipeline {
        dag,
        stages: StageSequence::new(stages)?,
        jobs,
    })
}
