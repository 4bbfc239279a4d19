use thiserror::Error;

#[derive(Error, Debug)]
pub enum CidagError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("GitLab API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("GitLab API still failing with status {status} after {retries} retries")]
    ApiErrorAfterRetries { status: u16, retries: u32 },

    #[error("GraphQL query {query_type} failed: {errors}")]
    GraphQLError { query_type: String, errors: String },

    #[error("GraphQL response contained no data")]
    NoResponseData,

    #[error("Project '{0}' not found")]
    ProjectNotFound(String),

    #[error("Could not find any pipelines for project '{project}' at {sha}")]
    PipelineNotFound { project: String, sha: String },

    #[error(
        "Could not fetch any content for merged YAML at {sha}, \
         please verify if the git SHA exists in remote. Maybe you forgot to `git push`?"
    )]
    EmptyMergedYaml { sha: String },

    #[error("Job '{0}' not found in merged YAML")]
    UnknownJob(String),

    #[error("Invalid stage sequence: {0}")]
    InvalidStageSequence(String),

    #[error("Cyclic dependency detected: job '{job}' transitively needs itself")]
    CyclicDependency { job: String },

    #[error("Cyclic variable reference: {}", chain.join(" -> "))]
    CyclicVariable { chain: Vec<String> },

    #[error("Cyclic inheritance: {}", chain.join(" -> "))]
    CyclicInheritance { chain: Vec<String> },

    #[error("Invalid job name pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CidagError>;
