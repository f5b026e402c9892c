use std::time::Duration;

use async_trait::async_trait;
use bootcamp_core::config::GithubConfig;
use bootcamp_slack::home::{Issue, IssueSource, IssueSourceError};
use reqwest::Client;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("bootcamp/", env!("CARGO_PKG_VERSION"));

/// Reads open issues from the GitHub REST API. Unauthenticated, so public repositories only.
pub struct GithubClient {
    client: Client,
    issues_url: String,
    label: String,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self, IssueSourceError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| IssueSourceError::Request(error.to_string()))?;

        Ok(Self {
            client,
            issues_url: format!(
                "{}/repos/{}/issues",
                config.api_base_url.trim_end_matches('/'),
                config.repository
            ),
            label: config.repository_name().to_owned(),
        })
    }

    pub fn issues_url(&self) -> &str {
        &self.issues_url
    }
}

#[async_trait]
impl IssueSource for GithubClient {
    fn repository_label(&self) -> &str {
        &self.label
    }

    async fn open_issues(&self) -> Result<Vec<Issue>, IssueSourceError> {
        debug!(
            event_name = "egress.github.request",
            url = %self.issues_url(),
            "listing open issues"
        );
        let response = self
            .client
            .get(&self.issues_url)
            .header("accept", "application/vnd.github+json")
            .query(&[("state", "open")])
            .send()
            .await
            .map_err(|error| IssueSourceError::Request(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IssueSourceError::Request(format!("http_{}", status.as_u16())));
        }

        response
            .json::<Vec<Issue>>()
            .await
            .map_err(|error| IssueSourceError::Decode(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        http::{HeaderMap, StatusCode},
        routing::get,
        Json, Router,
    };
    use bootcamp_core::config::AppConfig;
    use bootcamp_slack::home::{IssueSource, IssueSourceError};
    use serde_json::{json, Value};

    use super::GithubClient;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{address}")
    }

    fn client(api_base_url: String) -> GithubClient {
        let mut github = AppConfig::default().github;
        github.api_base_url = api_base_url;
        GithubClient::new(&github).expect("client")
    }

    #[test]
    fn issues_url_targets_configured_repository() {
        let client = client("https://api.github.com/".to_owned());

        assert_eq!(
            client.issues_url(),
            "https://api.github.com/repos/Cameron327/slack-bootcamp/issues"
        );
        assert_eq!(client.repository_label(), "slack-bootcamp");
    }

    #[tokio::test]
    async fn open_issues_decodes_github_response() {
        let router = Router::new().route(
            "/repos/Cameron327/slack-bootcamp/issues",
            get(|headers: HeaderMap| async move {
                let user_agent =
                    headers.get("user-agent").and_then(|value| value.to_str().ok()).unwrap_or("");
                let title =
                    if user_agent.starts_with("bootcamp/") { "Add poll results" } else { "no agent" };
                Json(json!([{
                    "number": 7,
                    "title": title,
                    "html_url": "https://github.com/Cameron327/slack-bootcamp/issues/7",
                    "state": "open",
                    "user": { "login": "octocat", "html_url": "https://github.com/octocat" }
                }]))
            }),
        );
        let client = client(serve(router).await);

        let issues = client.open_issues().await.expect("issues");

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].title, "Add poll results");
        assert_eq!(issues[0].user.login, "octocat");
    }

    #[tokio::test]
    async fn error_status_is_a_request_error() {
        let router = Router::new().route(
            "/repos/Cameron327/slack-bootcamp/issues",
            get(|| async { (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))) }),
        );
        let client = client(serve(router).await);

        assert_eq!(
            client.open_issues().await,
            Err(IssueSourceError::Request("http_404".to_owned()))
        );
    }

    #[tokio::test]
    async fn unexpected_shape_is_a_decode_error() {
        let router = Router::new().route(
            "/repos/Cameron327/slack-bootcamp/issues",
            get(|| async { Json(json!({ "items": Value::Null })) }),
        );
        let client = client(serve(router).await);

        assert!(matches!(client.open_issues().await, Err(IssueSourceError::Decode(_))));
    }
}
