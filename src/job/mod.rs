//! Effective job definitions.
//!
//! Builds what a job actually runs with for a given commit: its variables,
//! layered and resolved, its script phases, and its container image.

pub mod document;
pub mod inherit;
pub mod script;
pub mod variables;

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;
use serde_yaml::Value;

use crate::error::Result;

pub use document::MergedDocument;
pub use script::ScriptPhase;
pub use variables::VariableSpace;

/// The commit and project a job is resolved for.
#[derive(Debug, Clone)]
pub struct Identity {
    pub project_path: String,
    pub sha: String,
    /// Container registry host, e.g. `registry.freedesktop.org`
    pub registry: String,
}

impl Identity {
    /// Predefined CI variables describing this identity.
    ///
    /// `CI_REGISTRY_IMAGE` is a template over `CI_PROJECT_PATH` and is filled
    /// in by the interpolation fixpoint.
    pub fn variables(&self) -> Vec<(String, String)> {
        let project_name = self
            .project_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.project_path);

        vec![
            ("CI_PROJECT_PATH".to_string(), self.project_path.clone()),
            ("CI_PROJECT_NAME".to_string(), project_name.to_string()),
            (
                "CI_REGISTRY_IMAGE".to_string(),
                format!("{}/${{CI_PROJECT_PATH}}", self.registry),
            ),
            ("CI_COMMIT_SHA".to_string(), self.sha.clone()),
        ]
    }
}

/// Resolved definition of a single job.
#[derive(Debug, Clone, Serialize)]
pub struct JobManifest {
    pub name: String,
    /// Sorted by name
    pub variables: BTreeMap<String, String>,
    pub script: Vec<ScriptPhase>,
    pub image: Option<String>,
}

/// Resolves jobs of one merged document.
pub struct JobResolver<'a> {
    document: &'a MergedDocument,
    identity: Identity,
    defaults: VariableSpace,
    image_variable: Option<String>,
}

impl<'a> JobResolver<'a> {
    pub fn new(document: &'a MergedDocument, identity: Identity) -> Self {
        Self {
            document,
            identity,
            defaults: VariableSpace::new(),
            image_variable: None,
        }
    }

    /// Lowest-precedence variables, e.g. the image tags file.
    #[must_use]
    pub fn with_defaults(mut self, defaults: VariableSpace) -> Self {
        self.defaults = defaults;
        self
    }

    /// Variable holding the job image when the job has no `image` keyword.
    #[must_use]
    pub fn with_image_variable(mut self, name: Option<String>) -> Self {
        self.image_variable = name;
        self
    }

    /// Layers and resolves the variables of a job.
    ///
    /// Layers, lowest precedence first: defaults, document `variables`, the
    /// job's `variables` (including those it inherits through `extends`), then
    /// the identity variables.
    ///
    /// # Errors
    ///
    /// Fails if the job is unknown, its `extends` chain is broken or cyclic,
    /// or its variables reference each other in a cycle.
    pub fn get_variables(&self, job_name: &str) -> Result<VariableSpace> {
        let mut space = self.defaults.clone();
        space.extend(variables::variables_from_mapping(
            &self.document.global_variables(),
        ));

        let job_variables =
            inherit::inherit_field(self.document, job_name, inherit::EXTENDS, "variables")?;
        space.extend(variables::variables_from_mapping(&job_variables));
        space.extend(self.identity.variables());

        debug!("Resolving {} variables for job {job_name}", space.len());
        variables::resolve_variables(space)
    }

    /// Builds the full manifest of a job.
    ///
    /// # Errors
    ///
    /// Same as [`JobResolver::get_variables`].
    pub fn get_job_final_definition(&self, job_name: &str) -> Result<JobManifest> {
        let job = self.document.job(job_name)?;
        let variables = self.get_variables(job_name)?;

        let image = match job.get("image") {
            Some(Value::String(image)) => Some(image.clone()),
            Some(Value::Mapping(image)) => {
                image.get("name").and_then(Value::as_str).map(String::from)
            }
            _ => None,
        }
        .map(|image| variables::substitute(&image, &variables))
        .or_else(|| {
            self.image_variable
                .as_ref()
                .and_then(|name| variables.get(name).cloned())
        });

        Ok(JobManifest {
            name: job_name.to_string(),
            script: script::get_full_script(job),
            variables: variables.into_iter().collect(),
            image,
        })
    }
}
