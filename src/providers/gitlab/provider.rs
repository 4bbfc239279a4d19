use graphql_client::QueryBody;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::cache::QueryCache;
use super::client::queries::{self, MergedYamlData, PipelineDetailsData};
use super::client::GitLabClient;
use crate::error::{CidagError, Result};
use crate::job::MergedDocument;
use crate::pipeline::{self, PipelineResult, ResolvedPipeline};

/// GitLab pipeline metadata provider.
///
/// Fetches a commit's pipeline listing and merged CI configuration from
/// GitLab's GraphQL API, caching raw responses, and hands them to the
/// resolution code.
pub struct GitLabProvider {
    pub client: GitLabClient,
    pub project_path: String,
    cache: QueryCache,
}

impl GitLabProvider {
    /// Creates a new GitLab provider for the specified project.
    ///
    /// # Arguments
    ///
    /// * `client` - GraphQL client for the GitLab instance
    /// * `project_path` - Project path (e.g., "mesa/mesa")
    /// * `cache` - Query cache for this project
    pub fn new(client: GitLabClient, project_path: String, cache: QueryCache) -> Self {
        Self {
            client,
            project_path,
            cache,
        }
    }

    /// Runs a query, answering from the cache when possible.
    ///
    /// Only responses that parse into `T` are cached; a cached entry that no
    /// longer parses is dropped. Returns the typed data together with the
    /// cache key it was stored under.
    async fn query<V, T>(&mut self, body: &QueryBody<V>) -> Result<(T, String)>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let key = QueryCache::key(body.operation_name, &body.variables)?;

        let (raw, cached) = match self.cache.get(&key) {
            Some(raw) => (raw, true),
            None => {
                let raw: serde_json::Value = self.client.execute_graphql_request(body).await?;
                (raw, false)
            }
        };

        match T::deserialize(&raw) {
            Ok(data) => {
                if !cached {
                    self.cache.put(key.clone(), raw)?;
                }
                Ok((data, key))
            }
            Err(e) => {
                warn!("Unexpected {} response shape: {e}", body.operation_name);
                if cached {
                    self.cache.remove(&key)?;
                }
                Err(e.into())
            }
        }
    }

    /// Fetches the stage/job listing of the pipeline for `sha`.
    ///
    /// # Errors
    ///
    /// Returns `ProjectNotFound` or `PipelineNotFound` when GitLab has nothing
    /// for the project or commit, besides transport errors.
    pub async fn fetch_pipeline(&mut self, sha: &str) -> Result<PipelineResult> {
        info!("Fetching pipeline for {} at {sha}", self.project_path);

        let body = queries::pipeline_details(&self.project_path, sha);
        let (data, key): (PipelineDetailsData, _) = self.query(&body).await?;

        let Some(project) = data.project else {
            self.cache.remove(&key)?;
            return Err(CidagError::ProjectNotFound(self.project_path.clone()));
        };

        match project.pipeline {
            Some(pipeline) => Ok(pipeline),
            None => {
                // A pipeline may still be created for this commit; don't keep the miss
                self.cache.remove(&key)?;
                Err(CidagError::PipelineNotFound {
                    project: self.project_path.clone(),
                    sha: sha.to_string(),
                })
            }
        }
    }

    /// Fetches the pipeline for `sha` and resolves its job dependency graph.
    ///
    /// # Errors
    ///
    /// Fails if the pipeline cannot be fetched or its needs form a cycle.
    pub async fn create_job_needs_dag(&mut self, sha: &str) -> Result<ResolvedPipeline> {
        let listing = self.fetch_pipeline(sha).await?;
        let resolved = pipeline::create_job_needs_dag(listing)?;

        info!(
            "Resolved {} jobs across {} stages",
            resolved.dag.len(),
            resolved.stages.len()
        );

        Ok(resolved)
    }

    /// Fetches the merged CI configuration for `sha`, given the local CI file.
    ///
    /// # Errors
    ///
    /// Returns `EmptyMergedYaml` when GitLab returns no content, after
    /// invalidating the cache so a retry refetches.
    pub async fn fetch_merged_yaml(&mut self, sha: &str, content: &str) -> Result<MergedDocument> {
        info!("Fetching merged YAML for {} at {sha}", self.project_path);

        let body = queries::merged_yaml(&self.project_path, sha, content.trim());
        let (data, _): (MergedYamlData, _) = self.query(&body).await?;

        let ci_config = data.ci_config;
        if let Some(merged) = ci_config
            .as_ref()
            .and_then(|config| config.merged_yaml.as_deref())
            .filter(|merged| !merged.trim().is_empty())
        {
            return MergedDocument::parse(merged);
        }

        if let Some(config) = &ci_config {
            let errors = config.errors.as_deref().unwrap_or_default();
            warn!(
                "CI config status {}: {}",
                config.status.as_deref().unwrap_or("unknown"),
                errors.join("; ")
            );
        }

        self.cache.invalidate()?;
        Err(CidagError::EmptyMergedYaml {
            sha: sha.to_string(),
        })
    }
}
