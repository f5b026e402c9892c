//! Poll creation: a global shortcut opens a modal, its submission posts the
//! poll and seeds one numbered reaction per option.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::{
    api::{PostMessage, SlackApi},
    blocks::{
        escape_mrkdwn, ConversationFilter, ConversationKind, InputElement, MessageBuilder,
        MessageTemplate, ModalBuilder, TextObject, View,
    },
    events::{
        EventContext, EventHandler, EventHandlerError, HandlerResult, SlackEnvelope, SlackEvent,
        SlackEventType, ViewSubmissionEvent,
    },
};

pub const POLL_SHORTCUT_CALLBACK_ID: &str = "poll_shortcut_modal";
pub const POLL_MODAL_CALLBACK_ID: &str = "poll_shortcut";

pub const TARGET_CONVERSATION_BLOCK: &str = "target_conversation";
pub const TARGET_CONVERSATION_ACTION: &str = "selected_conversation";
pub const QUESTION_BLOCK: &str = "poll_question";

/// `(block_id, action_id, reaction)` per option, in display order.
pub const POLL_OPTIONS: [(&str, &str, &str); 3] = [
    ("option_1", "option_1", "one"),
    ("option_2", "option_2", "two"),
    ("option_3", "option_3", "three"),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollSubmission {
    pub author_id: String,
    pub channel_id: String,
    pub question: String,
    pub options: Vec<String>,
}

impl PollSubmission {
    pub fn from_view(event: &ViewSubmissionEvent) -> Result<Self, EventHandlerError> {
        let state = &event.state;
        let channel_id = state
            .selected_conversation(TARGET_CONVERSATION_BLOCK, TARGET_CONVERSATION_ACTION)
            .ok_or_else(|| {
                EventHandlerError::InvalidSubmission(TARGET_CONVERSATION_BLOCK.to_owned())
            })?;
        let question = state
            .text(QUESTION_BLOCK, QUESTION_BLOCK)
            .ok_or_else(|| EventHandlerError::InvalidSubmission(QUESTION_BLOCK.to_owned()))?;

        let options = POLL_OPTIONS
            .iter()
            .map(|(block_id, action_id, _)| {
                state
                    .text(block_id, action_id)
                    .map(str::to_owned)
                    .ok_or_else(|| EventHandlerError::InvalidSubmission((*block_id).to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            author_id: event.user_id.clone(),
            channel_id: channel_id.to_owned(),
            question: question.to_owned(),
            options,
        })
    }
}

pub fn poll_modal() -> View {
    let mut modal = ModalBuilder::new(POLL_MODAL_CALLBACK_ID, "Create new poll")
        .input(
            TARGET_CONVERSATION_BLOCK,
            "Select the conversation you want to send your poll to:",
            InputElement::ConversationsSelect {
                action_id: TARGET_CONVERSATION_ACTION.to_owned(),
                placeholder: Some(TextObject::plain_emoji("select a conversation")),
                filter: Some(ConversationFilter {
                    include: vec![ConversationKind::Public, ConversationKind::Mpim],
                    exclude_bot_users: true,
                }),
            },
        )
        .input(QUESTION_BLOCK, "Poll question", InputElement::plain_text(QUESTION_BLOCK));

    for (index, (block_id, action_id, _)) in POLL_OPTIONS.iter().enumerate() {
        modal = modal.input(
            *block_id,
            format!("Option {}", index + 1),
            InputElement::plain_text(*action_id),
        );
    }

    modal.submit("start poll").build()
}

pub fn poll_message(poll: &PollSubmission) -> MessageTemplate {
    let mut builder = MessageBuilder::new(format!("New poll: {}", poll.question)).section(
        "poll.question.v1",
        |section| {
            section.mrkdwn(format!(
                "<@{}> wants to know: *{}*",
                poll.author_id,
                escape_mrkdwn(&poll.question)
            ));
        },
    );

    let numbered = poll.options.iter().zip(POLL_OPTIONS.iter()).enumerate();
    for (index, (option, (_, _, reaction))) in numbered {
        builder = builder.section(format!("poll.option.{}.v1", index + 1), |section| {
            section.plain_emoji(format!(":{reaction}: {option}"));
        });
    }

    builder.build()
}

pub struct PollShortcutHandler {
    api: Arc<dyn SlackApi>,
}

impl PollShortcutHandler {
    pub fn new(api: Arc<dyn SlackApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl EventHandler for PollShortcutHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::Shortcut
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::Shortcut(shortcut) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if shortcut.callback_id != POLL_SHORTCUT_CALLBACK_ID {
            return Ok(HandlerResult::Ignored);
        }

        self.api.open_view(&shortcut.trigger_id, &poll_modal()).await?;
        info!(
            event_name = "feature.poll.modal_opened",
            correlation_id = %ctx.correlation_id,
            user_id = %shortcut.user_id,
            "poll modal opened"
        );
        Ok(HandlerResult::Processed)
    }
}

pub struct PollSubmissionHandler {
    api: Arc<dyn SlackApi>,
}

impl PollSubmissionHandler {
    pub fn new(api: Arc<dyn SlackApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl EventHandler for PollSubmissionHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::ViewSubmission
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::ViewSubmission(submission) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if submission.callback_id != POLL_MODAL_CALLBACK_ID {
            return Ok(HandlerResult::Ignored);
        }

        let poll = PollSubmission::from_view(submission)?;
        let posted = self
            .api
            .post_message(&PostMessage::from_template(&poll.channel_id, poll_message(&poll)))
            .await?;

        for (_, _, reaction) in POLL_OPTIONS.iter().take(poll.options.len()) {
            self.api.add_reaction(&posted.channel, &posted.ts, reaction).await?;
        }

        info!(
            event_name = "feature.poll.posted",
            correlation_id = %ctx.correlation_id,
            channel_id = %posted.channel,
            message_ts = %posted.ts,
            "poll posted"
        );
        Ok(HandlerResult::Processed)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::{
        poll_message, poll_modal, PollShortcutHandler, PollSubmission, PollSubmissionHandler,
    };
    use crate::{
        api::{RecordingSlackApi, SlackCall},
        blocks::Block,
        events::{
            EventContext, EventHandler, EventHandlerError, HandlerResult, ShortcutEvent,
            ShortcutKind, SlackEnvelope, SlackEvent, ViewState, ViewStateValue,
            ViewSubmissionEvent,
        },
    };

    fn text_value(value: &str) -> ViewStateValue {
        ViewStateValue {
            kind: "plain_text_input".to_owned(),
            value: Some(value.to_owned()),
            selected_conversation: None,
        }
    }

    fn submission(option_3: Option<&str>) -> ViewSubmissionEvent {
        let mut values = BTreeMap::new();
        values.insert(
            "target_conversation".to_owned(),
            BTreeMap::from([(
                "selected_conversation".to_owned(),
                ViewStateValue {
                    kind: "conversations_select".to_owned(),
                    value: None,
                    selected_conversation: Some("C42".to_owned()),
                },
            )]),
        );
        let inputs = [
            ("poll_question", Some("Where to lunch?")),
            ("option_1", Some("Tacos")),
            ("option_2", Some("Ramen")),
            ("option_3", option_3),
        ];
        for (block, value) in inputs {
            if let Some(value) = value {
                values.insert(
                    block.to_owned(),
                    BTreeMap::from([(block.to_owned(), text_value(value))]),
                );
            }
        }

        ViewSubmissionEvent {
            view_id: "V1".to_owned(),
            callback_id: "poll_shortcut".to_owned(),
            user_id: "U7".to_owned(),
            state: ViewState { values },
        }
    }

    #[test]
    fn modal_has_conversation_question_and_three_options() {
        let view = poll_modal();
        let value = serde_json::to_value(&view).expect("serialize");

        assert_eq!(value["callback_id"], "poll_shortcut");
        assert_eq!(value["title"]["text"], "Create new poll");
        assert_eq!(value["submit"]["text"], "start poll");

        let block_ids: Vec<&str> = view
            .blocks()
            .iter()
            .filter_map(|block| match block {
                Block::Input { block_id, .. } => Some(block_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            block_ids,
            vec!["target_conversation", "poll_question", "option_1", "option_2", "option_3"]
        );
        assert_eq!(value["blocks"][0]["element"]["action_id"], "selected_conversation");
        assert_eq!(value["blocks"][0]["element"]["filter"]["exclude_bot_users"], true);
    }

    #[test]
    fn message_mentions_author_and_numbers_options() {
        let poll = PollSubmission::from_view(&submission(Some("Pizza"))).expect("valid poll");
        let message = poll_message(&poll);
        let texts: Vec<&str> = message
            .blocks
            .iter()
            .filter_map(|block| match block {
                Block::Section { text, .. } => Some(text.text()),
                _ => None,
            })
            .collect();

        assert_eq!(
            texts,
            vec![
                "<@U7> wants to know: *Where to lunch?*",
                ":one: Tacos",
                ":two: Ramen",
                ":three: Pizza",
            ]
        );
    }

    #[test]
    fn missing_option_is_reported_by_block_id() {
        let result = PollSubmission::from_view(&submission(None));
        assert_eq!(result, Err(EventHandlerError::InvalidSubmission("option_3".to_owned())));
    }

    #[tokio::test]
    async fn shortcut_opens_modal_with_trigger_id() {
        let api = Arc::new(RecordingSlackApi::new());
        let handler = PollShortcutHandler::new(api.clone());
        let envelope = SlackEnvelope {
            envelope_id: "T-9".to_owned(),
            event: SlackEvent::Shortcut(ShortcutEvent {
                kind: ShortcutKind::Global,
                callback_id: "poll_shortcut_modal".to_owned(),
                trigger_id: "T-9".to_owned(),
                user_id: "U1".to_owned(),
            }),
        };

        let result = handler.handle(&envelope, &EventContext::default()).await.expect("handle");

        assert_eq!(result, HandlerResult::Processed);
        assert_eq!(
            api.calls().await,
            vec![SlackCall::OpenView { trigger_id: "T-9".to_owned(), view: poll_modal() }]
        );
    }

    #[tokio::test]
    async fn other_shortcuts_are_ignored() {
        let api = Arc::new(RecordingSlackApi::new());
        let handler = PollShortcutHandler::new(api.clone());
        let envelope = SlackEnvelope {
            envelope_id: "T-10".to_owned(),
            event: SlackEvent::Shortcut(ShortcutEvent {
                kind: ShortcutKind::Message,
                callback_id: "something_else".to_owned(),
                trigger_id: "T-10".to_owned(),
                user_id: "U1".to_owned(),
            }),
        };

        let result = handler.handle(&envelope, &EventContext::default()).await.expect("handle");

        assert_eq!(result, HandlerResult::Ignored);
        assert!(api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn submission_posts_poll_then_adds_numbered_reactions() {
        let api = Arc::new(RecordingSlackApi::new());
        let handler = PollSubmissionHandler::new(api.clone());
        let envelope = SlackEnvelope {
            envelope_id: "V1".to_owned(),
            event: SlackEvent::ViewSubmission(submission(Some("Pizza"))),
        };

        let result = handler.handle(&envelope, &EventContext::default()).await.expect("handle");
        assert_eq!(result, HandlerResult::Processed);

        let calls = api.calls().await;
        assert_eq!(calls.len(), 4);
        let SlackCall::PostMessage(message) = &calls[0] else {
            panic!("first call should post the poll");
        };
        assert_eq!(message.channel, "C42");
        assert_eq!(message.blocks.len(), 4);

        let reactions: Vec<(&str, &str)> = calls[1..]
            .iter()
            .filter_map(|call| match call {
                SlackCall::AddReaction { timestamp, name, channel } if channel == "C42" => {
                    Some((timestamp.as_str(), name.as_str()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            reactions,
            vec![
                ("1700000000.000001", "one"),
                ("1700000000.000001", "two"),
                ("1700000000.000001", "three"),
            ]
        );
    }

    #[tokio::test]
    async fn failed_post_skips_reactions() {
        let api = Arc::new(RecordingSlackApi::new().failing_posts("not_in_channel"));
        let handler = PollSubmissionHandler::new(api.clone());
        let envelope = SlackEnvelope {
            envelope_id: "V1".to_owned(),
            event: SlackEvent::ViewSubmission(submission(Some("Pizza"))),
        };

        let result = handler.handle(&envelope, &EventContext::default()).await;

        assert!(matches!(result, Err(EventHandlerError::SlackApi(_))));
        assert_eq!(api.calls().await.len(), 1);
    }
}
