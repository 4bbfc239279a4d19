use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file structure for cidag.
///
/// Lets users pin their GitLab instance, project layout and cache settings
/// instead of passing them on every run. Command-line flags take precedence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub gitlab: GitLabConfig,

    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitLabConfig {
    /// GitLab instance base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// GitLab project path (e.g., 'mesa/mesa')
    #[serde(default = "default_project_path")]
    pub project_path: String,

    /// GitLab personal access token
    pub token: Option<String>,

    /// File holding the token, read when no token is given directly
    pub token_file: Option<PathBuf>,

    /// Retries for rate-limited or failing API requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
    /// Local checkout of the project
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// CI entry file, relative to the root
    #[serde(default = "default_ci_file")]
    pub ci_file: PathBuf,

    /// YAML file whose `variables` provide defaults, relative to the root
    #[serde(default = "default_image_tags_file")]
    pub image_tags_file: PathBuf,

    /// Container registry host used for `CI_REGISTRY_IMAGE`
    #[serde(default = "default_registry")]
    pub registry: String,

    /// Variable naming the job image when a job has no `image`
    #[serde(default = "default_image_variable")]
    pub image_variable: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Hours a cached query stays valid
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u32,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            project_path: default_project_path(),
            token: None,
            token_file: None,
            max_retries: default_max_retries(),
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            ci_file: default_ci_file(),
            image_tags_file: default_image_tags_file(),
            registry: default_registry(),
            image_variable: default_image_variable(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_hours: default_ttl_hours(),
        }
    }
}

fn default_base_url() -> String {
    "https://gitlab.freedesktop.org".to_string()
}

fn default_project_path() -> String {
    "mesa/mesa".to_string()
}

fn default_max_retries() -> u32 {
    30
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_ci_file() -> PathBuf {
    PathBuf::from(".gitlab-ci.yml")
}

fn default_image_tags_file() -> PathBuf {
    PathBuf::from(".gitlab-ci/image-tags.yml")
}

fn default_registry() -> String {
    "registry.freedesktop.org".to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_image_variable() -> Option<String> {
    Some("MESA_IMAGE".to_string())
}

fn default_cache_enabled() -> bool {
    true
}

fn default_ttl_hours() -> u32 {
    24
}

impl ProjectConfig {
    pub fn ci_file_path(&self) -> PathBuf {
        self.root.join(&self.ci_file)
    }

    pub fn image_tags_path(&self) -> PathBuf {
        self.root.join(&self.image_tags_file)
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./cidag.toml
    /// 3. ./cidag.json
    /// 4. ./cidag.yaml
    /// 5. ./cidag.yml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = ["cidag.toml", "cidag.json", "cidag.yaml", "cidag.yml"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .or_else(|_| serde_json::from_str(&contents))
                    .or_else(|_| serde_yaml::from_str(&contents))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }
}
