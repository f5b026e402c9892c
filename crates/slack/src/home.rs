//! App Home tab listing the open issues of the tracked GitHub repository.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::{
    api::SlackApi,
    blocks::{escape_mrkdwn, MessageBuilder, View},
    events::{
        EventContext, EventHandler, EventHandlerError, HandlerResult, SlackEnvelope, SlackEvent,
        SlackEventType,
    },
};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Issue {
    pub title: String,
    pub html_url: String,
    pub user: IssueAuthor,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct IssueAuthor {
    pub login: String,
    pub html_url: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IssueSourceError {
    #[error("issue request failed: {0}")]
    Request(String),
    #[error("issue response could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Label shown in the home tab header, usually the repository name.
    fn repository_label(&self) -> &str;
    async fn open_issues(&self) -> Result<Vec<Issue>, IssueSourceError>;
}

pub fn issues_home_view(repository_label: &str, issues: &[Issue]) -> View {
    let mut builder = MessageBuilder::new(format!("Open issues in {repository_label}")).header(
        "home.issues.header.v1",
        format!("Open Issues in the Github repo \"{repository_label}\""),
    );

    for (index, issue) in issues.iter().enumerate() {
        builder = builder.section(format!("home.issues.{}.v1", index + 1), |section| {
            section.mrkdwn(format!(
                "<{}|{}> opened by <{}|{}>",
                issue.html_url,
                escape_mrkdwn(&issue.title),
                issue.user.html_url,
                issue.user.login
            ));
        });
    }

    if issues.is_empty() {
        builder = builder.context("home.issues.empty.v1", |context| {
            context.plain("No open issues right now.");
        });
    }

    builder.build().into_home_view()
}

pub struct AppHomeHandler {
    api: Arc<dyn SlackApi>,
    issues: Arc<dyn IssueSource>,
}

impl AppHomeHandler {
    pub fn new(api: Arc<dyn SlackApi>, issues: Arc<dyn IssueSource>) -> Self {
        Self { api, issues }
    }
}

#[async_trait]
impl EventHandler for AppHomeHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::AppHomeOpened
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::AppHomeOpened(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        // The messages tab fires the same event; only the home tab is ours.
        if event.tab != "home" {
            return Ok(HandlerResult::Ignored);
        }

        let issues = self.issues.open_issues().await?;
        let view = issues_home_view(self.issues.repository_label(), &issues);
        self.api.publish_view(&event.user_id, &view).await?;

        info!(
            event_name = "feature.home.published",
            correlation_id = %ctx.correlation_id,
            user_id = %event.user_id,
            issue_count = issues.len(),
            "app home published"
        );
        Ok(HandlerResult::Processed)
    }
}
