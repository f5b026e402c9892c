use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use bootcamp_core::{TranslateError, Translator};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::{
    api::{SlackApi, SlackApiError},
    home::{AppHomeHandler, IssueSource, IssueSourceError},
    poll::{PollShortcutHandler, PollSubmissionHandler},
    translation::TranslationReactionHandler,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    Shortcut(ShortcutEvent),
    ViewSubmission(ViewSubmissionEvent),
    ReactionAdded(ReactionAddedEvent),
    AppHomeOpened(AppHomeOpenedEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::Shortcut(_) => SlackEventType::Shortcut,
            Self::ViewSubmission(_) => SlackEventType::ViewSubmission,
            Self::ReactionAdded(_) => SlackEventType::ReactionAdded,
            Self::AppHomeOpened(_) => SlackEventType::AppHomeOpened,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    Shortcut,
    ViewSubmission,
    ReactionAdded,
    AppHomeOpened,
    Unsupported,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShortcutKind {
    Global,
    Message,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShortcutEvent {
    pub kind: ShortcutKind,
    pub callback_id: String,
    pub trigger_id: String,
    pub user_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewSubmissionEvent {
    pub view_id: String,
    pub callback_id: String,
    pub user_id: String,
    pub state: ViewState,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ViewState {
    #[serde(default)]
    pub values: BTreeMap<String, BTreeMap<String, ViewStateValue>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ViewStateValue {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub selected_conversation: Option<String>,
}

impl ViewState {
    pub fn get(&self, block_id: &str, action_id: &str) -> Option<&ViewStateValue> {
        self.values.get(block_id)?.get(action_id)
    }

    /// Text typed into a `plain_text_input`; blank input counts as missing.
    pub fn text(&self, block_id: &str, action_id: &str) -> Option<&str> {
        self.get(block_id, action_id)?.value.as_deref().filter(|value| !value.trim().is_empty())
    }

    pub fn selected_conversation(&self, block_id: &str, action_id: &str) -> Option<&str> {
        self.get(block_id, action_id)?.selected_conversation.as_deref()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReactionAddedEvent {
    pub channel_id: String,
    pub message_ts: String,
    pub user_id: String,
    pub reaction: String,
    pub item_user_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppHomeOpenedEvent {
    pub user_id: String,
    pub tab: String,
}

/// What an inbound Slack HTTP request resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundRequest {
    UrlVerification { challenge: String },
    Envelope(SlackEnvelope),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("malformed slack payload: {0}")]
    Json(String),
    #[error("interaction form is missing the `payload` field")]
    MissingInteractionPayload,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum EventsApiBody {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        event_id: String,
        event: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    ReactionAdded {
        user: String,
        reaction: String,
        item: WireReactionItem,
        #[serde(default)]
        item_user: Option<String>,
    },
    AppHomeOpened {
        user: String,
        #[serde(default)]
        tab: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct WireReactionItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

#[derive(Deserialize)]
struct WireUser {
    id: String,
}

#[derive(Deserialize)]
struct WireView {
    id: String,
    callback_id: String,
    #[serde(default)]
    state: ViewState,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireInteraction {
    Shortcut {
        callback_id: String,
        trigger_id: String,
        user: WireUser,
    },
    MessageAction {
        callback_id: String,
        trigger_id: String,
        user: WireUser,
    },
    ViewSubmission {
        user: WireUser,
        view: WireView,
    },
    #[serde(other)]
    Other,
}

/// Routes a request body by content type: interactivity arrives form-encoded,
/// Events API callbacks arrive as JSON.
pub fn parse_request(content_type: Option<&str>, body: &[u8]) -> Result<InboundRequest, PayloadError> {
    let form_encoded = content_type
        .map(|value| value.trim().starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);

    if form_encoded {
        parse_interaction_form(body).map(InboundRequest::Envelope)
    } else {
        parse_events_api(body)
    }
}

pub fn parse_events_api(body: &[u8]) -> Result<InboundRequest, PayloadError> {
    let parsed: EventsApiBody =
        serde_json::from_slice(body).map_err(|error| PayloadError::Json(error.to_string()))?;

    match parsed {
        EventsApiBody::UrlVerification { challenge } => {
            Ok(InboundRequest::UrlVerification { challenge })
        }
        EventsApiBody::EventCallback { event_id, event } => Ok(InboundRequest::Envelope(
            SlackEnvelope { envelope_id: event_id, event: inner_event(event)? },
        )),
        EventsApiBody::Other => Ok(InboundRequest::Envelope(SlackEnvelope {
            envelope_id: "unknown-envelope".to_owned(),
            event: SlackEvent::Unsupported { event_type: body_type(body) },
        })),
    }
}

fn inner_event(event: Value) -> Result<SlackEvent, PayloadError> {
    let event_type = event.get("type").and_then(Value::as_str).unwrap_or("unknown").to_owned();
    let wire: WireEvent =
        serde_json::from_value(event).map_err(|error| PayloadError::Json(error.to_string()))?;

    Ok(match wire {
        WireEvent::ReactionAdded { user, reaction, item, item_user } => {
            match (item.kind.as_str(), item.channel, item.ts) {
                ("message", Some(channel_id), Some(message_ts)) => {
                    SlackEvent::ReactionAdded(ReactionAddedEvent {
                        channel_id,
                        message_ts,
                        user_id: user,
                        reaction,
                        item_user_id: item_user,
                    })
                }
                (kind, _, _) => {
                    SlackEvent::Unsupported { event_type: format!("reaction_added:{kind}") }
                }
            }
        }
        WireEvent::AppHomeOpened { user, tab } => SlackEvent::AppHomeOpened(AppHomeOpenedEvent {
            user_id: user,
            tab: tab.unwrap_or_else(|| "home".to_owned()),
        }),
        WireEvent::Other => SlackEvent::Unsupported { event_type },
    })
}

pub fn parse_interaction_form(body: &[u8]) -> Result<SlackEnvelope, PayloadError> {
    let payload = url::form_urlencoded::parse(body)
        .find(|(key, _)| key == "payload")
        .map(|(_, value)| value.into_owned())
        .ok_or(PayloadError::MissingInteractionPayload)?;

    parse_interaction_payload(&payload)
}

pub fn parse_interaction_payload(payload: &str) -> Result<SlackEnvelope, PayloadError> {
    let wire: WireInteraction =
        serde_json::from_str(payload).map_err(|error| PayloadError::Json(error.to_string()))?;

    Ok(match wire {
        WireInteraction::Shortcut { callback_id, trigger_id, user } => SlackEnvelope {
            envelope_id: trigger_id.clone(),
            event: SlackEvent::Shortcut(ShortcutEvent {
                kind: ShortcutKind::Global,
                callback_id,
                trigger_id,
                user_id: user.id,
            }),
        },
        WireInteraction::MessageAction { callback_id, trigger_id, user } => SlackEnvelope {
            envelope_id: trigger_id.clone(),
            event: SlackEvent::Shortcut(ShortcutEvent {
                kind: ShortcutKind::Message,
                callback_id,
                trigger_id,
                user_id: user.id,
            }),
        },
        WireInteraction::ViewSubmission { user, view } => SlackEnvelope {
            envelope_id: view.id.clone(),
            event: SlackEvent::ViewSubmission(ViewSubmissionEvent {
                view_id: view.id,
                callback_id: view.callback_id,
                user_id: user.id,
                state: view.state,
            }),
        },
        WireInteraction::Other => SlackEnvelope {
            envelope_id: "unknown-envelope".to_owned(),
            event: SlackEvent::Unsupported { event_type: body_type(payload.as_bytes()) },
        },
    })
}

fn body_type(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| value.get("type").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| "unknown".to_owned())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    SlackApi(#[from] SlackApiError),
    #[error(transparent)]
    Translate(#[from] TranslateError),
    #[error(transparent)]
    Issues(#[from] IssueSourceError),
    #[error("view submission is missing `{0}`")]
    InvalidSubmission(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Collaborators shared by the feature handlers.
#[derive(Clone)]
pub struct HandlerServices {
    pub api: Arc<dyn SlackApi>,
    pub translator: Arc<dyn Translator>,
    pub issues: Arc<dyn IssueSource>,
}

pub fn default_dispatcher(services: HandlerServices) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(PollShortcutHandler::new(services.api.clone()));
    dispatcher.register(PollSubmissionHandler::new(services.api.clone()));
    dispatcher.register(TranslationReactionHandler::new(
        services.api.clone(),
        services.translator.clone(),
    ));
    dispatcher.register(AppHomeHandler::new(services.api, services.issues));
    dispatcher
}
