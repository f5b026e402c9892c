//! `POST /github-starring`: relays GitHub star events into a Slack channel.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use bootcamp_core::{signing::verify_hmac_sha256_hex, ApplicationError};
use bootcamp_slack::api::{PostMessage, SlackApi};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::{new_correlation_id, HttpError},
    slack_events::header,
};

pub const GITHUB_STARRING_PATH: &str = "/github-starring";
pub const EVENT_HEADER: &str = "x-github-event";
pub const DELIVERY_HEADER: &str = "x-github-delivery";
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

#[derive(Clone)]
pub struct GithubWebhookState {
    slack: Arc<dyn SlackApi>,
    notify_channel: String,
    webhook_secret: Option<SecretString>,
}

impl GithubWebhookState {
    pub fn new(
        slack: Arc<dyn SlackApi>,
        notify_channel: impl Into<String>,
        webhook_secret: Option<SecretString>,
    ) -> Self {
        Self { slack, notify_channel: notify_channel.into(), webhook_secret }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct StarEvent {
    pub action: String,
    pub repository: StarredRepository,
    pub sender: StarSender,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct StarredRepository {
    pub name: String,
    pub stargazers_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct StarSender {
    pub login: String,
}

pub fn star_message(event: &StarEvent) -> String {
    let verb = if event.action == "deleted" { "unstarred" } else { "starred" };
    format!(
        "{} just {verb} the {} repository, bringing the star count to {}.",
        event.sender.login, event.repository.name, event.repository.stargazers_count
    )
}

pub fn router(state: GithubWebhookState) -> Router {
    Router::new().route(GITHUB_STARRING_PATH, post(github_starring)).with_state(state)
}

async fn github_starring(
    State(state): State<GithubWebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, HttpError> {
    let correlation_id =
        header(&headers, DELIVERY_HEADER).map(str::to_owned).unwrap_or_else(new_correlation_id);
    info!(
        event_name = "ingress.github.received",
        correlation_id = %correlation_id,
        github_event = header(&headers, EVENT_HEADER).unwrap_or("unknown"),
        "github star webhook received"
    );

    if let Some(secret) = &state.webhook_secret {
        verify_signature(secret, header(&headers, SIGNATURE_HEADER), &body).map_err(|reason| {
            warn!(
                event_name = "ingress.github.signature_rejected",
                correlation_id = %correlation_id,
                reason,
                "rejected github webhook"
            );
            ApplicationError::Signature(reason.to_owned()).into_interface(&correlation_id)
        })?;
    }

    // GitHub sends a ping when the hook is first registered.
    if header(&headers, EVENT_HEADER) == Some("ping") {
        return Ok(StatusCode::OK);
    }

    let event: StarEvent = serde_json::from_slice(&body).map_err(|error| {
        warn!(
            event_name = "ingress.github.payload_rejected",
            correlation_id = %correlation_id,
            error = %error,
            "github payload is not a star event"
        );
        ApplicationError::InvalidPayload(error.to_string()).into_interface(&correlation_id)
    })?;

    let message = PostMessage::text(&state.notify_channel, star_message(&event));
    let posted = state.slack.post_message(&message).await.map_err(|error| {
        warn!(
            event_name = "feature.github_star.post_failed",
            correlation_id = %correlation_id,
            channel = %state.notify_channel,
            error = %error,
            "failed to relay github star event"
        );
        ApplicationError::Integration(error.to_string()).into_interface(&correlation_id)
    })?;

    info!(
        event_name = "feature.github_star.posted",
        correlation_id = %correlation_id,
        channel_id = %posted.channel,
        message_ts = %posted.ts,
        repository = %event.repository.name,
        action = %event.action,
        "github star event relayed"
    );
    Ok(StatusCode::OK)
}

fn verify_signature(
    secret: &SecretString,
    provided: Option<&str>,
    body: &[u8],
) -> Result<(), &'static str> {
    let provided = provided.ok_or("missing x-hub-signature-256 header")?;
    let hex = provided.trim().strip_prefix("sha256=").ok_or("unsupported signature scheme")?;

    if verify_hmac_sha256_hex(secret.expose_secret().as_bytes(), body, hex) {
        Ok(())
    } else {
        Err("signature does not match request body")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use bootcamp_core::signing::hmac_sha256_hex;
    use bootcamp_slack::api::{PostMessage, RecordingSlackApi, SlackCall};
    use secrecy::SecretString;
    use tower::ServiceExt;

    use super::{
        router, star_message, GithubWebhookState, StarEvent, StarSender, StarredRepository,
        GITHUB_STARRING_PATH,
    };

    const STARRED: &str = r#"{
        "action": "created",
        "starred_at": "2024-03-01T10:00:00Z",
        "repository": { "name": "slack-bootcamp", "full_name": "Cameron327/slack-bootcamp", "stargazers_count": 4 },
        "sender": { "login": "octocat", "id": 1 }
    }"#;

    fn app(api: Arc<RecordingSlackApi>, secret: Option<&str>) -> Router {
        router(GithubWebhookState::new(
            api,
            "general",
            secret.map(|value| SecretString::from(value.to_owned())),
        ))
    }

    fn star_request(event: &str, body: &str) -> Request<Body> {
        Request::post(GITHUB_STARRING_PATH)
            .header("content-type", "application/json")
            .header("x-github-event", event)
            .header("x-github-delivery", "delivery-1")
            .body(Body::from(body.to_owned()))
            .expect("request")
    }

    fn event(action: &str) -> StarEvent {
        StarEvent {
            action: action.to_owned(),
            repository: StarredRepository { name: "slack-bootcamp".to_owned(), stargazers_count: 3 },
            sender: StarSender { login: "octocat".to_owned() },
        }
    }

    #[test]
    fn message_uses_unstarred_only_for_deleted() {
        assert_eq!(
            star_message(&event("created")),
            "octocat just starred the slack-bootcamp repository, bringing the star count to 3."
        );
        assert_eq!(
            star_message(&event("deleted")),
            "octocat just unstarred the slack-bootcamp repository, bringing the star count to 3."
        );
    }

    #[tokio::test]
    async fn star_event_posts_to_notify_channel() {
        let api = Arc::new(RecordingSlackApi::new());

        let response =
            app(api.clone(), None).oneshot(star_request("star", STARRED)).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            api.calls().await,
            vec![SlackCall::PostMessage(PostMessage::text(
                "general",
                "octocat just starred the slack-bootcamp repository, bringing the star count to 4.",
            ))]
        );
    }

    #[tokio::test]
    async fn ping_is_acknowledged_without_posting() {
        let api = Arc::new(RecordingSlackApi::new());

        let response = app(api.clone(), None)
            .oneshot(star_request("ping", r#"{"zen":"Keep it logically awesome.","hook_id":1}"#))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_is_bad_request() {
        let api = Arc::new(RecordingSlackApi::new());

        let response = app(api.clone(), None)
            .oneshot(star_request("star", r#"{"action":"created"}"#))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn slack_failure_is_bad_gateway() {
        let api = Arc::new(RecordingSlackApi::new().failing_posts("channel_not_found"));

        let response =
            app(api, None).oneshot(star_request("star", STARRED)).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn configured_secret_requires_valid_signature() {
        let api = Arc::new(RecordingSlackApi::new());
        let app = app(api.clone(), Some("hook-secret"));

        let unsigned = app.clone().oneshot(star_request("star", STARRED)).await.expect("response");
        assert_eq!(unsigned.status(), StatusCode::UNAUTHORIZED);

        let mut signed = star_request("star", STARRED);
        let signature = format!("sha256={}", hmac_sha256_hex(b"hook-secret", STARRED.as_bytes()));
        signed.headers_mut().insert("x-hub-signature-256", signature.parse().expect("header"));
        let accepted = app.oneshot(signed).await.expect("response");

        assert_eq!(accepted.status(), StatusCode::OK);
        assert_eq!(api.calls().await.len(), 1);
    }
}
