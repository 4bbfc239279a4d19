use graphql_client::Response as GraphQLResponse;
use log::{debug, warn};
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::auth::Token;
use crate::error::{CidagError, Result};

const MAX_RETRIES: u32 = 30;
const RETRY_DELAY_SECONDS: u64 = 10;

/// How often and how patiently failed requests are retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            delay: Duration::from_secs(RETRY_DELAY_SECONDS),
        }
    }
}

pub struct GitLabClient {
    pub client: Client,
    pub graphql_url: Url,
    pub token: Option<Token>,
    retry: RetryPolicy,
}

impl GitLabClient {
    pub fn new(base_url: &str, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cidag/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CidagError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base = Url::parse(base_url)
            .map_err(|e| CidagError::Config(format!("Invalid base URL: {e}")))?;

        let graphql_url = base
            .join("api/graphql")
            .map_err(|e| CidagError::Config(format!("Invalid GraphQL URL: {e}")))?;

        Ok(Self {
            client,
            graphql_url,
            token,
            retry: RetryPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    /// Execute a GraphQL request with automatic retry on network errors and rate limits
    /// Returns the data from the GraphQL response after checking for errors
    pub async fn execute_graphql_request<T>(
        &self,
        request_body: &impl serde::Serialize,
    ) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut retry_count = 0;
        loop {
            let request = self.auth_request(
                self.client
                    .post(self.graphql_url.clone())
                    .json(request_body),
            );

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    if retry_count >= self.retry.max_retries {
                        return Err(e.into());
                    }
                    warn!(
                        "Network error ({}), retrying in {}s ({}/{})...",
                        e,
                        self.retry.delay.as_secs(),
                        retry_count + 1,
                        self.retry.max_retries
                    );
                    tokio::time::sleep(self.retry.delay).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            // Check for rate limiting or other HTTP errors before parsing JSON
            let status = response.status();

            if status == 429 || status.is_server_error() {
                if retry_count >= self.retry.max_retries {
                    return Err(CidagError::ApiErrorAfterRetries {
                        status: status.as_u16(),
                        retries: self.retry.max_retries,
                    });
                }

                warn!(
                    "GitLab API error (status {status}). Waiting {} seconds before retry {}/{}...",
                    self.retry.delay.as_secs(),
                    retry_count + 1,
                    self.retry.max_retries
                );

                tokio::time::sleep(self.retry.delay).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read error response".to_string());
                return Err(CidagError::ApiError {
                    status: status.as_u16(),
                    message: error_text,
                });
            }

            // Parse GraphQL response and check for errors
            let response_body: GraphQLResponse<T> = response.json().await?;

            if let Some(errors) = response_body.errors {
                return Err(CidagError::GraphQLError {
                    query_type: std::any::type_name::<T>().to_string(),
                    errors: errors
                        .iter()
                        .map(|e| e.message.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }

            debug!("GraphQL request succeeded after {retry_count} retries");

            return response_body.data.ok_or(CidagError::NoResponseData);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn fast_retries(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            delay: Duration::ZERO,
        }
    }

    #[test]
    fn builds_graphql_url_from_base() {
        let client = GitLabClient::new("https://gitlab.example.com", None).unwrap();

        assert_eq!(
            client.graphql_url.as_str(),
            "https://gitlab.example.com/api/graphql"
        );
    }

    #[test]
    fn rejects_invalid_base_url() {
        let result = GitLabClient::new("not a url", None);

        assert!(matches!(result, Err(CidagError::Config(_))));
    }

    #[tokio::test]
    async fn returns_data_and_sends_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/graphql")
            .match_header("authorization", "Bearer glpat-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": {"answer": 42}}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), Some(Token::from("glpat-test"))).unwrap();
        let data: Value = client
            .execute_graphql_request(&json!({ "query": "{ answer }" }))
            .await
            .unwrap();

        assert_eq!(data, json!({ "answer": 42 }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn surfaces_graphql_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/graphql")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": null, "errors": [{"message": "Field 'nope' doesn't exist"}]}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        let result: Result<Value> = client.execute_graphql_request(&json!({})).await;

        match result {
            Err(CidagError::GraphQLError { errors, .. }) => assert!(errors.contains("nope")),
            other => panic!("expected GraphQL error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn retries_server_errors_then_gives_up() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/graphql")
            .with_status(502)
            .expect(3)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None)
            .unwrap()
            .with_retry_policy(fast_retries(2));
        let result: Result<Value> = client.execute_graphql_request(&json!({})).await;

        assert!(matches!(
            result,
            Err(CidagError::ApiErrorAfterRetries {
                status: 502,
                retries: 2
            })
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/graphql")
            .with_status(401)
            .with_body("401 Unauthorized")
            .expect(1)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        let result: Result<Value> = client.execute_graphql_request(&json!({})).await;

        match result {
            Err(CidagError::ApiError { status, message }) => {
                assert_eq!(status, 401);
                assert!(message.contains("Unauthorized"));
            }
            other => panic!("expected API error, got {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_data_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/graphql")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": null}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        let result: Result<Value> = client.execute_graphql_request(&json!({})).await;

        assert!(matches!(result, Err(CidagError::NoResponseData)));
    }
}
