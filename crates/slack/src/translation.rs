use std::sync::Arc;

use async_trait::async_trait;
use bootcamp_core::{language_for_reaction, Language, Translator};
use tracing::{debug, info, warn};

use crate::{
    api::{HistoryQuery, PostMessage, SlackApi},
    events::{
        EventContext, EventHandler, EventHandlerError, HandlerResult, ReactionAddedEvent,
        SlackEnvelope, SlackEvent, SlackEventType,
    },
};

/// Threaded reply body, e.g. `_Translation for :flag-mx:_` followed by the text.
pub fn translation_reply(reaction: &str, translated: &str) -> String {
    format!("_Translation for :{reaction}:_\n{translated}")
}

pub struct TranslationReactionHandler {
    api: Arc<dyn SlackApi>,
    translator: Arc<dyn Translator>,
}

impl TranslationReactionHandler {
    pub fn new(api: Arc<dyn SlackApi>, translator: Arc<dyn Translator>) -> Self {
        Self { api, translator }
    }

    async fn translate_message(
        &self,
        event: &ReactionAddedEvent,
        language: &Language,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let history = self
            .api
            .conversation_history(&HistoryQuery::single_message(&event.channel_id, &event.message_ts))
            .await?;
        let Some(message) = history.first() else {
            debug!(
                event_name = "feature.translation.message_missing",
                correlation_id = %ctx.correlation_id,
                channel_id = %event.channel_id,
                message_ts = %event.message_ts,
                "reacted message not found in history"
            );
            return Ok(HandlerResult::Processed);
        };

        let translated = self.translator.translate(&message.text, language).await?;
        let reply = PostMessage::text(&event.channel_id, translation_reply(&event.reaction, &translated))
            .in_thread(&event.message_ts);

        match self.api.post_message(&reply).await {
            Ok(posted) => info!(
                event_name = "feature.translation.posted",
                correlation_id = %ctx.correlation_id,
                channel_id = %posted.channel,
                message_ts = %posted.ts,
                language = language.code,
                "translation posted in thread"
            ),
            Err(error) => warn!(
                event_name = "feature.translation.post_failed",
                correlation_id = %ctx.correlation_id,
                channel_id = %event.channel_id,
                error = %error,
                "failed to post translation"
            ),
        }

        Ok(HandlerResult::Processed)
    }
}

#[async_trait]
impl EventHandler for TranslationReactionHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::ReactionAdded
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::ReactionAdded(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let Some(language) = language_for_reaction(&event.reaction) else {
            return Ok(HandlerResult::Ignored);
        };

        self.translate_message(event, &language, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bootcamp_core::PlaceholderTranslator;

    use super::{translation_reply, TranslationReactionHandler};
    use crate::{
        api::{HistoryMessage, HistoryQuery, PostMessage, RecordingSlackApi, SlackCall},
        events::{
            EventContext, EventHandler, HandlerResult, ReactionAddedEvent, SlackEnvelope,
            SlackEvent,
        },
    };

    const MESSAGE_TS: &str = "1730000000.000200";

    fn reaction(reaction: &str) -> SlackEnvelope {
        SlackEnvelope {
            envelope_id: "Ev1".to_owned(),
            event: SlackEvent::ReactionAdded(ReactionAddedEvent {
                channel_id: "C1".to_owned(),
                message_ts: MESSAGE_TS.to_owned(),
                user_id: "U1".to_owned(),
                reaction: reaction.to_owned(),
                item_user_id: Some("U2".to_owned()),
            }),
        }
    }

    fn history() -> Vec<HistoryMessage> {
        vec![HistoryMessage {
            text: "good morning".to_owned(),
            ts: MESSAGE_TS.to_owned(),
            user: Some("U2".to_owned()),
        }]
    }

    #[tokio::test]
    async fn flag_reaction_posts_threaded_translation() {
        let api = Arc::new(RecordingSlackApi::with_history(history()));
        let handler = TranslationReactionHandler::new(api.clone(), Arc::new(PlaceholderTranslator));

        let result =
            handler.handle(&reaction("flag-mx"), &EventContext::default()).await.expect("handle");

        assert_eq!(result, HandlerResult::Processed);
        assert_eq!(
            api.calls().await,
            vec![
                SlackCall::History(HistoryQuery::single_message("C1", MESSAGE_TS)),
                SlackCall::PostMessage(
                    PostMessage::text(
                        "C1",
                        "_Translation for :flag-mx:_\n:sparkles: Imagine this is in Spanish",
                    )
                    .in_thread(MESSAGE_TS)
                ),
            ]
        );
    }

    #[tokio::test]
    async fn non_flag_reaction_is_ignored_without_calls() {
        let api = Arc::new(RecordingSlackApi::with_history(history()));
        let handler = TranslationReactionHandler::new(api.clone(), Arc::new(PlaceholderTranslator));

        let result =
            handler.handle(&reaction("thumbsup"), &EventContext::default()).await.expect("handle");

        assert_eq!(result, HandlerResult::Ignored);
        assert!(api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn missing_message_stops_before_posting() {
        let api = Arc::new(RecordingSlackApi::new());
        let handler = TranslationReactionHandler::new(api.clone(), Arc::new(PlaceholderTranslator));

        let result = handler.handle(&reaction("fr"), &EventContext::default()).await.expect("handle");

        assert_eq!(result, HandlerResult::Processed);
        let calls = api.calls().await;
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], SlackCall::History(_)));
    }

    #[tokio::test]
    async fn failed_post_is_logged_not_returned() {
        let api = Arc::new(RecordingSlackApi::with_history(history()).failing_posts("is_archived"));
        let handler = TranslationReactionHandler::new(api.clone(), Arc::new(PlaceholderTranslator));

        let result = handler.handle(&reaction("jp"), &EventContext::default()).await;

        assert_eq!(result, Ok(HandlerResult::Processed));
        assert_eq!(api.calls().await.len(), 2);
    }

    #[test]
    fn reply_italicizes_the_reaction_line() {
        assert_eq!(translation_reply("fr", "bonjour"), "_Translation for :fr:_\nbonjour");
    }
}
