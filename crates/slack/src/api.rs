use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::blocks::{Block, MessageTemplate, View};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SlackApiError {
    #[error("slack request `{method}` failed: {message}")]
    Transport { method: String, message: String },
    #[error("slack method `{method}` returned error `{error}`")]
    Api { method: String, error: String },
    #[error("slack response for `{method}` could not be decoded: {message}")]
    Decode { method: String, message: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PostMessage {
    pub channel: String,
    /// Notification fallback; also the rendered body when `blocks` is empty.
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

impl PostMessage {
    pub fn text(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self { channel: channel.into(), text: text.into(), blocks: Vec::new(), thread_ts: None }
    }

    pub fn from_template(channel: impl Into<String>, template: MessageTemplate) -> Self {
        Self {
            channel: channel.into(),
            text: template.fallback_text,
            blocks: template.blocks,
            thread_ts: None,
        }
    }

    pub fn in_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryQuery {
    pub channel: String,
    pub oldest: String,
    pub latest: String,
    pub inclusive: bool,
    pub limit: u32,
}

impl HistoryQuery {
    /// Narrows `conversations.history` to the single message posted at `ts`.
    pub fn single_message(channel: impl Into<String>, ts: impl Into<String>) -> Self {
        let ts = ts.into();
        Self { channel: channel.into(), oldest: ts.clone(), latest: ts, inclusive: true, limit: 1 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct HistoryMessage {
    #[serde(default)]
    pub text: String,
    pub ts: String,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    messages: Vec<HistoryMessage>,
}

#[derive(Deserialize)]
struct Acknowledged {}

/// Identity behind the bot token, as reported by `auth.test`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AuthIdentity {
    #[serde(default)]
    pub team: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub bot_id: Option<String>,
}

#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn open_view(&self, trigger_id: &str, view: &View) -> Result<(), SlackApiError>;
    async fn publish_view(&self, user_id: &str, view: &View) -> Result<(), SlackApiError>;
    async fn post_message(&self, message: &PostMessage) -> Result<PostedMessage, SlackApiError>;
    async fn add_reaction(
        &self,
        channel: &str,
        timestamp: &str,
        name: &str,
    ) -> Result<(), SlackApiError>;
    async fn conversation_history(
        &self,
        query: &HistoryQuery,
    ) -> Result<Vec<HistoryMessage>, SlackApiError>;
}

/// Slack Web API over HTTPS with a bot token.
pub struct WebApiClient {
    client: Client,
    base_url: String,
    bot_token: SecretString,
}

impl WebApiClient {
    pub fn new(base_url: impl Into<String>, bot_token: SecretString) -> Result<Self, SlackApiError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build().map_err(|error| {
            SlackApiError::Transport { method: "client.build".to_owned(), message: error.to_string() }
        })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            bot_token,
        })
    }

    pub async fn auth_test(&self) -> Result<AuthIdentity, SlackApiError> {
        self.call_json("auth.test", &json!({})).await
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    async fn call_json<T, B>(&self, method: &str, body: &B) -> Result<T, SlackApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        debug!(event_name = "egress.slack.request", method, "calling slack web api");
        let request = self
            .client
            .post(self.endpoint(method))
            .bearer_auth(self.bot_token.expose_secret())
            .json(body);
        self.send(method, request).await
    }

    async fn call_form<T>(&self, method: &str, form: &[(&str, String)]) -> Result<T, SlackApiError>
    where
        T: DeserializeOwned,
    {
        debug!(event_name = "egress.slack.request", method, "calling slack web api");
        let request = self
            .client
            .post(self.endpoint(method))
            .bearer_auth(self.bot_token.expose_secret())
            .form(form);
        self.send(method, request).await
    }

    async fn send<T>(&self, method: &str, request: reqwest::RequestBuilder) -> Result<T, SlackApiError>
    where
        T: DeserializeOwned,
    {
        let response = request.send().await.map_err(|error| SlackApiError::Transport {
            method: method.to_owned(),
            message: error.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SlackApiError::Api {
                method: method.to_owned(),
                error: format!("http_{}", status.as_u16()),
            });
        }

        let body: Value = response.json().await.map_err(|error| SlackApiError::Decode {
            method: method.to_owned(),
            message: error.to_string(),
        })?;
        decode_response(method, body)
    }
}

/// Unwraps Slack's `{"ok": bool, "error": "..."}` envelope.
pub fn decode_response<T: DeserializeOwned>(method: &str, body: Value) -> Result<T, SlackApiError> {
    let ok = body.get("ok").and_then(Value::as_bool).unwrap_or(false);
    if !ok {
        let error = body.get("error").and_then(Value::as_str).unwrap_or("unknown_error");
        return Err(SlackApiError::Api { method: method.to_owned(), error: error.to_owned() });
    }

    serde_json::from_value(body).map_err(|error| SlackApiError::Decode {
        method: method.to_owned(),
        message: error.to_string(),
    })
}

#[async_trait]
impl SlackApi for WebApiClient {
    async fn open_view(&self, trigger_id: &str, view: &View) -> Result<(), SlackApiError> {
        let _: Acknowledged =
            self.call_json("views.open", &json!({ "trigger_id": trigger_id, "view": view })).await?;
        Ok(())
    }

    async fn publish_view(&self, user_id: &str, view: &View) -> Result<(), SlackApiError> {
        let _: Acknowledged =
            self.call_json("views.publish", &json!({ "user_id": user_id, "view": view })).await?;
        Ok(())
    }

    async fn post_message(&self, message: &PostMessage) -> Result<PostedMessage, SlackApiError> {
        self.call_json("chat.postMessage", message).await
    }

    async fn add_reaction(
        &self,
        channel: &str,
        timestamp: &str,
        name: &str,
    ) -> Result<(), SlackApiError> {
        let _: Acknowledged = self
            .call_json(
                "reactions.add",
                &json!({ "channel": channel, "timestamp": timestamp, "name": name }),
            )
            .await?;
        Ok(())
    }

    async fn conversation_history(
        &self,
        query: &HistoryQuery,
    ) -> Result<Vec<HistoryMessage>, SlackApiError> {
        // conversations.history does not accept JSON bodies.
        let form = [
            ("channel", query.channel.clone()),
            ("oldest", query.oldest.clone()),
            ("latest", query.latest.clone()),
            ("inclusive", query.inclusive.to_string()),
            ("limit", query.limit.to_string()),
        ];
        let response: HistoryResponse = self.call_form("conversations.history", &form).await?;
        Ok(response.messages)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use recording::{RecordingSlackApi, SlackCall};

#[cfg(any(test, feature = "test-support"))]
mod recording {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::{HistoryMessage, HistoryQuery, PostMessage, PostedMessage, SlackApi, SlackApiError};
    use crate::blocks::View;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum SlackCall {
        OpenView { trigger_id: String, view: View },
        PublishView { user_id: String, view: View },
        PostMessage(PostMessage),
        AddReaction { channel: String, timestamp: String, name: String },
        History(HistoryQuery),
    }

    /// In-memory `SlackApi` that records every call in order.
    #[derive(Default)]
    pub struct RecordingSlackApi {
        calls: Mutex<Vec<SlackCall>>,
        history: Vec<HistoryMessage>,
        post_error: Option<String>,
    }

    impl RecordingSlackApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_history(history: Vec<HistoryMessage>) -> Self {
            Self { history, ..Self::default() }
        }

        pub fn failing_posts(mut self, error: impl Into<String>) -> Self {
            self.post_error = Some(error.into());
            self
        }

        pub async fn calls(&self) -> Vec<SlackCall> {
            self.calls.lock().await.clone()
        }

        /// Polls until at least `count` calls were recorded or `timeout` elapses.
        pub async fn wait_for_calls(&self, count: usize, timeout: Duration) -> Vec<SlackCall> {
            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                let calls = self.calls().await;
                if calls.len() >= count || tokio::time::Instant::now() >= deadline {
                    return calls;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }

        async fn record(&self, call: SlackCall) -> usize {
            let mut calls = self.calls.lock().await;
            calls.push(call);
            calls.len()
        }
    }

    #[async_trait]
    impl SlackApi for RecordingSlackApi {
        async fn open_view(&self, trigger_id: &str, view: &View) -> Result<(), SlackApiError> {
            self.record(SlackCall::OpenView { trigger_id: trigger_id.to_owned(), view: view.clone() })
                .await;
            Ok(())
        }

        async fn publish_view(&self, user_id: &str, view: &View) -> Result<(), SlackApiError> {
            self.record(SlackCall::PublishView { user_id: user_id.to_owned(), view: view.clone() })
                .await;
            Ok(())
        }

        async fn post_message(
            &self,
            message: &PostMessage,
        ) -> Result<PostedMessage, SlackApiError> {
            let sequence = self.record(SlackCall::PostMessage(message.clone())).await;
            if let Some(error) = &self.post_error {
                return Err(SlackApiError::Api {
                    method: "chat.postMessage".to_owned(),
                    error: error.clone(),
                });
            }
            Ok(PostedMessage {
                channel: message.channel.clone(),
                ts: format!("1700000000.{sequence:06}"),
            })
        }

        async fn add_reaction(
            &self,
            channel: &str,
            timestamp: &str,
            name: &str,
        ) -> Result<(), SlackApiError> {
            self.record(SlackCall::AddReaction {
                channel: channel.to_owned(),
                timestamp: timestamp.to_owned(),
                name: name.to_owned(),
            })
            .await;
            Ok(())
        }

        async fn conversation_history(
            &self,
            query: &HistoryQuery,
        ) -> Result<Vec<HistoryMessage>, SlackApiError> {
            self.record(SlackCall::History(query.clone())).await;
            Ok(self.history.iter().filter(|message| message.ts == query.latest).cloned().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        decode_response, AuthIdentity, HistoryQuery, PostMessage, PostedMessage, SlackApiError,
    };

    #[test]
    fn decode_surfaces_slack_error_code() {
        let result: Result<PostedMessage, _> =
            decode_response("chat.postMessage", json!({ "ok": false, "error": "channel_not_found" }));

        assert_eq!(
            result,
            Err(SlackApiError::Api {
                method: "chat.postMessage".to_owned(),
                error: "channel_not_found".to_owned(),
            })
        );
    }

    #[test]
    fn decode_reads_successful_payload() {
        let posted: PostedMessage = decode_response(
            "chat.postMessage",
            json!({ "ok": true, "channel": "C1", "ts": "1.2", "message": {} }),
        )
        .expect("decode");

        assert_eq!(posted, PostedMessage { channel: "C1".to_owned(), ts: "1.2".to_owned() });
    }

    #[test]
    fn auth_test_identity_tolerates_missing_bot_id() {
        let identity: AuthIdentity = decode_response(
            "auth.test",
            json!({ "ok": true, "team": "Bootcamp", "user": "pollbot", "team_id": "T1" }),
        )
        .expect("decode");

        assert_eq!(identity.team, "Bootcamp");
        assert_eq!(identity.bot_id, None);
    }

    #[test]
    fn decode_treats_missing_ok_as_failure() {
        let result: Result<PostedMessage, _> = decode_response("chat.postMessage", json!({}));
        assert!(matches!(result, Err(SlackApiError::Api { ref error, .. }) if error == "unknown_error"));
    }

    #[test]
    fn threaded_text_message_serializes_without_blocks() {
        let message = PostMessage::text("C1", "hello").in_thread("1.2");
        let value = serde_json::to_value(&message).expect("serialize");

        assert_eq!(value, json!({ "channel": "C1", "text": "hello", "thread_ts": "1.2" }));
    }

    #[test]
    fn single_message_history_query_is_inclusive_window() {
        let query = HistoryQuery::single_message("C1", "1730000000.0001");
        assert_eq!(query.oldest, query.latest);
        assert!(query.inclusive);
        assert_eq!(query.limit, 1);
    }
}
