//! Job dependency graph resolution.
//!
//! A pipeline listing only carries the `needs` each job declares. Jobs without
//! `needs` implicitly wait for every earlier stage, and needs are transitive.
//! Resolution runs three steps, each taking ownership of the previous result:
//!
//! 1. [`extract::extract_stages_and_job_needs`]: direct needs, stage order, metadata
//! 2. [`stages::insert_early_stage_jobs`]: stage-implied needs
//! 3. [`closure::traverse_dag_needs`]: transitive closure

pub mod closure;
pub mod extract;
pub mod filter;
pub mod stages;
pub mod types;

use serde::Serialize;

use crate::error::Result;

pub use filter::{compile_pattern, filter_dag};
pub use stages::StageSequence;
pub use types::{Dag, JobsMetadata, PipelineResult};

/// A fully resolved pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPipeline {
    /// Needs as declared in the listing, before any inference
    pub direct_needs: Dag,
    /// Complete transitive needs of every job
    pub dag: Dag,
    pub stages: StageSequence,
    pub jobs: JobsMetadata,
}

/// Runs extraction, implicit stage dependencies and closure over a listing.
///
/// # Errors
///
/// Fails on a repeated stage name or a dependency cycle.
pub fn create_job_needs_dag(pipeline: PipelineResult) -> Result<ResolvedPipeline> {
    let extracted = extract::extract_stages_and_job_needs(pipeline)?;
    let direct_needs = extracted.dag.clone();

    let dag = stages::insert_early_stage_jobs(extracted.dag, &extracted.stages, &extracted.jobs);
    let dag = closure::traverse_dag_needs(dag)?;

    Ok(ResolvedPipeline {
        direct_needs,
        dag,
        stages: extracted.stages,
        jobs: extracted.jobs,
    })
}
