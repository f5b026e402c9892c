use std::sync::Arc;

use axum::Router;
use bootcamp_core::{
    config::AppConfig,
    PlaceholderTranslator,
};
use bootcamp_slack::{
    api::{SlackApi, SlackApiError, WebApiClient},
    events::{default_dispatcher, HandlerServices},
    home::{IssueSource, IssueSourceError},
    signature::SlackRequestVerifier,
};
use secrecy::ExposeSecret;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    github_issues::GithubClient,
    github_webhook::{self, GithubWebhookState},
    health::{self, HealthState},
    slack_events::{self, SlackEventsState},
};

pub struct Application {
    pub config: AppConfig,
    pub router: Router,
    pub handler_count: usize,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("slack client setup failed: {0}")]
    SlackClient(#[from] SlackApiError),
    #[error("github client setup failed: {0}")]
    GithubClient(#[from] IssueSourceError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let slack_api: Arc<dyn SlackApi> = Arc::new(WebApiClient::new(
        config.slack.api_base_url.clone(),
        config.slack.bot_token.clone(),
    )?);
    let issues: Arc<dyn IssueSource> = Arc::new(GithubClient::new(&config.github)?);

    Ok(assemble(config, slack_api, issues))
}

/// Wires handlers and routes around already-built clients.
pub fn assemble(
    config: AppConfig,
    slack_api: Arc<dyn SlackApi>,
    issues: Arc<dyn IssueSource>,
) -> Application {
    let dispatcher = default_dispatcher(HandlerServices {
        api: slack_api.clone(),
        translator: Arc::new(PlaceholderTranslator),
        issues,
    });
    let handler_count = dispatcher.handler_count();
    info!(
        event_name = "system.bootstrap.handlers_registered",
        correlation_id = "bootstrap",
        handler_count,
        "slack handlers registered"
    );

    let verifier = SlackRequestVerifier::new(config.slack.signing_secret.expose_secret());
    let router = Router::new()
        .merge(slack_events::router(SlackEventsState::new(Arc::new(dispatcher), verifier)))
        .merge(github_webhook::router(GithubWebhookState::new(
            slack_api,
            config.github.notify_channel.clone(),
            config.github.webhook_secret.clone(),
        )))
        .merge(health::router(HealthState::new(handler_count)))
        .layer(TraceLayer::new_for_http());

    Application { config, router, handler_count }
}
