use graphql_client::QueryBody;
use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineResult;

const PIPELINE_DETAILS_QUERY: &str = include_str!("queries/pipeline_details.graphql");
const MERGED_YAML_QUERY: &str = include_str!("queries/merged_yaml.graphql");

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDetailsVariables {
    pub project_path: String,
    pub sha: String,
}

/// Stages, groups and jobs (with their needs) of the pipeline for a commit.
pub fn pipeline_details(project_path: &str, sha: &str) -> QueryBody<PipelineDetailsVariables> {
    QueryBody {
        variables: PipelineDetailsVariables {
            project_path: project_path.to_string(),
            sha: sha.to_string(),
        },
        query: PIPELINE_DETAILS_QUERY,
        operation_name: "PipelineDetails",
    }
}

#[derive(Debug, Deserialize)]
pub struct PipelineDetailsData {
    pub project: Option<PipelineDetailsProject>,
}

#[derive(Debug, Deserialize)]
pub struct PipelineDetailsProject {
    pub pipeline: Option<PipelineResult>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedYamlVariables {
    pub project_path: String,
    pub sha: String,
    pub content: String,
}

/// CI configuration of a commit, with includes and `extends` expanded by GitLab.
pub fn merged_yaml(project_path: &str, sha: &str, content: &str) -> QueryBody<MergedYamlVariables> {
    QueryBody {
        variables: MergedYamlVariables {
            project_path: project_path.to_string(),
            sha: sha.to_string(),
            content: content.to_string(),
        },
        query: MERGED_YAML_QUERY,
        operation_name: "MergedYaml",
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedYamlData {
    pub ci_config: Option<CiConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CiConfig {
    pub merged_yaml: Option<String>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_uses_graphql_field_names() {
        let body = serde_json::to_value(pipeline_details("mesa/mesa", "abc")).unwrap();

        assert_eq!(body["operationName"], json!("PipelineDetails"));
        assert_eq!(body["variables"], json!({ "projectPath": "mesa/mesa", "sha": "abc" }));
        assert!(body["query"]
            .as_str()
            .unwrap()
            .contains("query PipelineDetails"));
    }

    #[test]
    fn merged_yaml_body_carries_local_content() {
        let body = serde_json::to_value(merged_yaml("mesa/mesa", "abc", "include: []")).unwrap();

        assert_eq!(body["variables"]["content"], json!("include: []"));
        assert_eq!(body["operationName"], json!("MergedYaml"));
    }

    #[test]
    fn parses_ci_config_response() {
        let data: MergedYamlData = serde_json::from_value(json!({
            "ciConfig": { "errors": [], "mergedYaml": "job: {}", "status": "VALID" }
        }))
        .unwrap();

        let config = data.ci_config.unwrap();
        assert_eq!(config.merged_yaml.as_deref(), Some("job: {}"));
        assert_eq!(config.status.as_deref(), Some("VALID"));
    }
}
