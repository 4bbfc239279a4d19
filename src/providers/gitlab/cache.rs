use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CidagError, Result};

/// A cached GraphQL response.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedQuery {
    fetched_at: DateTime<Utc>,
    response: Value,
}

/// Query cache for GitLab GraphQL responses.
///
/// Responses are keyed by operation name and variables and kept for a fixed
/// time to live. Uses per-project cache files in platform-specific cache
/// directories:
/// - Linux: `~/.cache/cidag/gitlab/{project-slug}.json`
/// - macOS: `~/Library/Caches/cidag/gitlab/{project-slug}.json`
pub struct QueryCache {
    cache_file: PathBuf,
    entries: HashMap<String, CachedQuery>,
    ttl: Duration,
    enabled: bool,
}

impl QueryCache {
    /// Opens the cache for a project in the platform cache directory.
    ///
    /// # Errors
    ///
    /// Returns error if cache directory cannot be determined or created.
    pub fn new(project_path: &str, enabled: bool, ttl_hours: u32) -> Result<Self> {
        if !enabled {
            debug!("Query cache disabled");
            return Ok(Self::disabled());
        }

        let cache_dir = Self::cache_dir()?;
        let cache = Self::with_dir(&cache_dir, project_path, ttl_hours)?;
        info!("Query cache enabled at: {}", cache.cache_file.display());

        Ok(cache)
    }

    /// Opens the cache for a project under `dir`, loading what is on disk.
    ///
    /// # Errors
    ///
    /// Returns error if `dir` cannot be created.
    pub fn with_dir(dir: &Path, project_path: &str, ttl_hours: u32) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let cache_file = dir.join(Self::cache_filename(project_path));

        let ttl = Duration::hours(i64::from(ttl_hours));
        let mut entries: HashMap<String, CachedQuery> = if cache_file.exists() {
            fs::read_to_string(&cache_file)
                .ok()
                .and_then(|content| serde_json::from_str(&content).ok())
                .inspect(|_| debug!("Loaded cache from: {}", cache_file.display()))
                .unwrap_or_else(|| {
                    warn!("Failed to load cache, starting with empty cache");
                    HashMap::new()
                })
        } else {
            HashMap::new()
        };

        // Keys carry the commit SHA; expired entries are dropped on load
        let now = Utc::now();
        let loaded = entries.len();
        entries.retain(|_, entry| now - entry.fetched_at <= ttl);
        if entries.len() < loaded {
            debug!("Pruned {} expired cache entries", loaded - entries.len());
        }

        Ok(Self {
            cache_file,
            entries,
            ttl,
            enabled: true,
        })
    }

    pub fn disabled() -> Self {
        Self {
            cache_file: PathBuf::new(),
            entries: HashMap::new(),
            ttl: Duration::zero(),
            enabled: false,
        }
    }

    /// Cache key for an operation and its variables.
    pub fn key(operation: &str, variables: &impl Serialize) -> Result<String> {
        Ok(format!("{operation}:{}", serde_json::to_string(variables)?))
    }

    /// Returns the cached response if present and younger than the TTL.
    pub fn get(&self, key: &str) -> Option<Value> {
        if !self.enabled {
            return None;
        }

        let entry = self.entries.get(key)?;
        if Utc::now() - entry.fetched_at > self.ttl {
            debug!("Cache entry expired for {}", operation_of(key));
            return None;
        }

        debug!("Cache hit for {}", operation_of(key));
        Some(entry.response.clone())
    }

    /// Stores a response and writes the cache to disk.
    pub fn put(&mut self, key: String, response: Value) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        self.entries.insert(
            key,
            CachedQuery {
                fetched_at: Utc::now(),
                response,
            },
        );
        self.save()
    }

    /// Drops a single entry.
    pub fn remove(&mut self, key: &str) -> Result<()> {
        if !self.enabled || self.entries.remove(key).is_none() {
            return Ok(());
        }
        self.save()
    }

    /// Drops every entry and deletes the cache file, so the next run refetches.
    pub fn invalidate(&mut self) -> Result<()> {
        self.entries.clear();
        if self.enabled && self.cache_file.exists() {
            fs::remove_file(&self.cache_file)?;
            info!("Cache invalidated: {}", self.cache_file.display());
        }
        Ok(())
    }

    /// Removes a project's cache file from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if cache file cannot be removed.
    pub fn clear_project_cache(project_path: &str) -> Result<()> {
        let cache_file = Self::cache_dir()?.join(Self::cache_filename(project_path));

        if cache_file.exists() {
            fs::remove_file(&cache_file)?;
            info!("Cache cleared: {}", cache_file.display());
        } else {
            info!("No cache file found for project: {project_path}");
        }

        Ok(())
    }

    fn save(&self) -> Result<()> {
        let content = serde_json::to_string(&self.entries)?;
        fs::write(&self.cache_file, content)?;

        debug!(
            "Saved {} queries to cache: {}",
            self.entries.len(),
            self.cache_file.display()
        );

        Ok(())
    }

    fn cache_dir() -> Result<PathBuf> {
        Ok(dirs::cache_dir()
            .ok_or_else(|| CidagError::Cache("No cache directory found".into()))?
            .join("cidag")
            .join("gitlab"))
    }

    // "group/project" -> "group-project.json"
    fn cache_filename(project_path: &str) -> String {
        project_path.replace('/', "-") + ".json"
    }
}

fn operation_of(key: &str) -> &str {
    key.split(':').next().unwrap_or(key)
}
