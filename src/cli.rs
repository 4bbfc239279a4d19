use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;

use crate::auth::{self, Token};
use crate::config::{Config, GitLabConfig};
use crate::job::variables::variables_from_mapping;
use crate::job::{Identity, JobResolver, MergedDocument, VariableSpace};
use crate::output::{self, FetchProgress};
use crate::pipeline;
use crate::providers::{GitLabClient, GitLabProvider, QueryCache, RetryPolicy};

#[derive(Parser)]
#[command(name = "cidag")]
#[command(
    author,
    version,
    about = "Resolve GitLab CI job dependency graphs and job definitions",
    long_about = None,
    after_help = "Example:\n  cidag --rev $(git rev-parse HEAD) --print-dag"
)]
pub struct Cli {
    /// Commit to resolve the pipeline for
    #[arg(long, visible_alias = "rev")]
    sha: String,

    /// GitLab project path (e.g., 'mesa/mesa')
    #[arg(short = 'P', long)]
    project_path: Option<String>,

    /// GitLab instance base URL
    #[arg(short, long)]
    url: Option<String>,

    #[arg(short, long, env = "GITLAB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Read the token from this file instead of $XDG_CONFIG_HOME/gitlab-token
    #[arg(long)]
    gitlab_token_file: Option<PathBuf>,

    /// Regex pattern for the job names to show
    #[arg(short, long)]
    regex: Option<String>,

    /// Print the job needs DAG (the default when nothing else is requested)
    #[arg(long)]
    print_dag: bool,

    /// Print the merged YAML for the commit
    #[arg(long)]
    print_merged_yaml: bool,

    /// Print the resolved variables, script and image of a job
    #[arg(long, value_name = "JOB")]
    print_job_manifest: Option<String>,

    /// Print a table of jobs with their dependency counts
    #[arg(short, long)]
    summary: bool,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,

    #[arg(short, long, default_value_t = false)]
    pretty: bool,

    /// Do not read or write the query cache
    #[arg(long)]
    no_cache: bool,

    /// Remove the project's query cache before running
    #[arg(long)]
    clear_cache: bool,

    /// Configuration file (defaults to ./cidag.{toml,json,yaml,yml})
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Local checkout holding the CI files
    #[arg(long)]
    project_root: Option<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(project_path) = &self.project_path {
            config.gitlab.project_path.clone_from(project_path);
        }
        if let Some(url) = &self.url {
            config.gitlab.base_url.clone_from(url);
        }
        if let Some(root) = &self.project_root {
            config.project.root.clone_from(root);
        }
        if self.no_cache {
            config.cache.enabled = false;
        }

        Ok(config)
    }

    fn resolve_token(&self, config: &GitLabConfig) -> Result<Option<Token>> {
        if let Some(token) = self.token.as_deref().or(config.token.as_deref()) {
            return Ok(Some(Token::from(token)));
        }

        if let Some(path) = self.gitlab_token_file.as_ref().or(config.token_file.as_ref()) {
            let token = Token::from_file(path)
                .with_context(|| format!("Failed to read token file: {}", path.display()))?;
            return Ok(Some(token));
        }

        match auth::default_token_file() {
            Some(path) if path.exists() => Ok(Some(Token::from_file(&path)?)),
            _ => {
                warn!("No GitLab token found, continuing without authentication");
                Ok(None)
            }
        }
    }

    fn build_provider(&self, config: &Config) -> Result<GitLabProvider> {
        let project_path = &config.gitlab.project_path;

        if self.clear_cache {
            QueryCache::clear_project_cache(project_path)?;
        }

        let token = self.resolve_token(&config.gitlab)?;
        let client = GitLabClient::new(&config.gitlab.base_url, token)?.with_retry_policy(
            RetryPolicy {
                max_retries: config.gitlab.max_retries,
                ..RetryPolicy::default()
            },
        );
        let cache = QueryCache::new(project_path, config.cache.enabled, config.cache.ttl_hours)?;

        Ok(GitLabProvider::new(client, project_path.clone(), cache))
    }

    fn print_json(&self, value: &impl Serialize) -> Result<()> {
        let json_output = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        println!("{json_output}");
        Ok(())
    }

    async fn execute_dag(&self, provider: &mut GitLabProvider) -> Result<()> {
        let progress = FetchProgress::start("Fetching pipeline");
        let resolved = match provider.create_job_needs_dag(&self.sha).await {
            Ok(resolved) => {
                progress.finish("Resolved job needs");
                resolved
            }
            Err(e) => {
                progress.abandon();
                return Err(e.into());
            }
        };

        let dag = match &self.regex {
            Some(regex) => {
                let pattern = pipeline::compile_pattern(regex)?;
                pipeline::filter_dag(resolved.dag.clone(), &pattern)
            }
            None => resolved.dag.clone(),
        };
        info!("Showing {} of {} jobs", dag.len(), resolved.dag.len());

        if self.json {
            self.print_json(&dag)?;
        } else if self.summary {
            output::print_summary(&resolved, &dag);
        } else {
            output::print_dag(&dag);
        }

        Ok(())
    }

    async fn fetch_document(
        &self,
        provider: &mut GitLabProvider,
        config: &Config,
    ) -> Result<MergedDocument> {
        let ci_file = config.project.ci_file_path();
        let content = std::fs::read_to_string(&ci_file)
            .with_context(|| format!("Failed to read CI file: {}", ci_file.display()))?;

        let progress = FetchProgress::start("Fetching merged YAML");
        match provider.fetch_merged_yaml(&self.sha, &content).await {
            Ok(document) => {
                progress.finish("Fetched merged YAML");
                Ok(document)
            }
            Err(e) => {
                progress.abandon();
                Err(e.into())
            }
        }
    }

    fn load_default_variables(config: &Config) -> Result<VariableSpace> {
        let path = config.project.image_tags_path();
        if !path.exists() {
            warn!("No image tags file at {}, using no defaults", path.display());
            return Ok(VariableSpace::new());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read image tags: {}", path.display()))?;
        let tags = MergedDocument::parse(&content)
            .with_context(|| format!("Failed to parse image tags: {}", path.display()))?;

        Ok(variables_from_mapping(&tags.global_variables()))
    }

    fn execute_manifest(
        &self,
        document: &MergedDocument,
        job: &str,
        config: &Config,
    ) -> Result<()> {
        let identity = Identity {
            project_path: config.gitlab.project_path.clone(),
            sha: self.sha.clone(),
            registry: config.project.registry.clone(),
        };

        let manifest = JobResolver::new(document, identity)
            .with_defaults(Self::load_default_variables(config)?)
            .with_image_variable(config.project.image_variable.clone())
            .get_job_final_definition(job)?;

        if self.json {
            self.print_json(&manifest)
        } else {
            output::print_manifest(&manifest);
            Ok(())
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = self.load_config()?;
        info!(
            "Resolving {} at {} on {}",
            config.gitlab.project_path, self.sha, config.gitlab.base_url
        );

        let mut provider = self.build_provider(&config)?;

        let wants_document = self.print_merged_yaml || self.print_job_manifest.is_some();
        if self.print_dag || self.summary || !wants_document {
            self.execute_dag(&mut provider).await?;
        }

        if wants_document {
            let document = self.fetch_document(&mut provider, &config).await?;

            if self.print_merged_yaml {
                if self.json {
                    self.print_json(&document)?;
                } else {
                    print!("{}", document.to_yaml()?);
                }
            }

            if let Some(job) = &self.print_job_manifest {
                self.execute_manifest(&document, job, &config)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn rev_is_an_alias_for_sha() {
        let cli = Cli::try_parse_from(["cidag", "--rev", "abc123", "--print-dag"]).unwrap();

        assert_eq!(cli.sha, "abc123");
        assert!(cli.print_dag);
    }

    #[test]
    fn sha_is_required() {
        assert!(Cli::try_parse_from(["cidag", "--print-dag"]).is_err());
    }

    #[test]
    fn flags_override_config_values() {
        let mut config_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(
            config_file,
            "[gitlab]\nproject-path = \"from/file\"\n[cache]\nenabled = true\n"
        )
        .unwrap();
        let config_path = config_file.path().to_str().unwrap();

        let cli = Cli::try_parse_from([
            "cidag",
            "--sha",
            "abc",
            "-P",
            "group/project",
            "--url",
            "https://gitlab.example.com",
            "--no-cache",
            "--project-root",
            "/src",
            "--config",
            config_path,
        ])
        .unwrap();
        let config = cli.load_config().unwrap();

        assert_eq!(config.gitlab.project_path, "group/project");
        assert_eq!(config.gitlab.base_url, "https://gitlab.example.com");
        assert_eq!(
            config.project.ci_file_path(),
            PathBuf::from("/src/.gitlab-ci.yml")
        );
        assert!(!config.cache.enabled);
    }

    #[test]
    fn config_file_values_apply_without_flags() {
        let mut config_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(config_file, "[gitlab]\nproject-path = \"from/file\"\n").unwrap();
        let config_path = config_file.path().to_str().unwrap();

        let cli = Cli::try_parse_from(["cidag", "--sha", "abc", "--config", config_path]).unwrap();
        let config = cli.load_config().unwrap();

        assert_eq!(config.gitlab.project_path, "from/file");
        assert!(config.cache.enabled);
    }

    #[test]
    fn explicit_token_wins_over_files() {
        let cli = Cli::try_parse_from(["cidag", "--sha", "abc", "--token", "glpat-flag"]).unwrap();
        let config = GitLabConfig {
            token_file: Some(PathBuf::from("/nonexistent/token")),
            ..GitLabConfig::default()
        };

        let token = cli.resolve_token(&config).unwrap();

        assert_eq!(token.unwrap().as_str(), "glpat-flag");
    }

    #[test]
    fn missing_explicit_token_file_is_an_error() {
        let mut cli = Cli::try_parse_from([
            "cidag",
            "--sha",
            "abc",
            "--gitlab-token-file",
            "/nonexistent/token",
        ])
        .unwrap();
        // Ignore GITLAB_TOKEN from the environment
        cli.token = None;
        let config = GitLabConfig::default();

        let result = cli.resolve_token(&config);

        assert!(result.is_err());
        assert!(format!("{:#}", result.unwrap_err()).contains("/nonexistent/token"));
    }

    #[test]
    fn token_file_from_config_is_used() {
        let mut token_file = NamedTempFile::new().unwrap();
        writeln!(token_file, "glpat-from-file").unwrap();
        let mut cli = Cli::try_parse_from(["cidag", "--sha", "abc"]).unwrap();
        cli.token = None;
        let config = GitLabConfig {
            token_file: Some(token_file.path().to_path_buf()),
            ..GitLabConfig::default()
        };

        let token = cli.resolve_token(&config).unwrap();

        assert_eq!(token.unwrap().as_str(), "glpat-from-file");
    }
}
