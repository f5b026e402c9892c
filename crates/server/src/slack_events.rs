use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bootcamp_core::ApplicationError;
use bootcamp_slack::{
    events::{parse_request, EventContext, EventDispatcher, InboundRequest, SlackEnvelope},
    signature::{SlackRequestVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER},
};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::error::{new_correlation_id, HttpError};

pub const SLACK_EVENTS_PATH: &str = "/slack/events";

#[derive(Clone)]
pub struct SlackEventsState {
    dispatcher: Arc<EventDispatcher>,
    verifier: SlackRequestVerifier,
}

impl SlackEventsState {
    pub fn new(dispatcher: Arc<EventDispatcher>, verifier: SlackRequestVerifier) -> Self {
        Self { dispatcher, verifier }
    }
}

pub fn router(state: SlackEventsState) -> Router {
    Router::new().route(SLACK_EVENTS_PATH, post(receive)).with_state(state)
}

pub(crate) fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

async fn receive(
    State(state): State<SlackEventsState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HttpError> {
    let correlation_id = new_correlation_id();

    state
        .verifier
        .verify(
            header(&headers, TIMESTAMP_HEADER),
            header(&headers, SIGNATURE_HEADER),
            &body,
            Utc::now().timestamp(),
        )
        .map_err(|error| {
            warn!(
                event_name = "ingress.slack.signature_rejected",
                correlation_id = %correlation_id,
                error = %error,
                "rejected slack request"
            );
            ApplicationError::Signature(error.to_string()).into_interface(&correlation_id)
        })?;

    let request = parse_request(header(&headers, CONTENT_TYPE.as_str()), &body).map_err(|error| {
        warn!(
            event_name = "ingress.slack.payload_rejected",
            correlation_id = %correlation_id,
            error = %error,
            "slack payload could not be parsed"
        );
        ApplicationError::InvalidPayload(error.to_string()).into_interface(&correlation_id)
    })?;

    match request {
        InboundRequest::UrlVerification { challenge } => {
            info!(
                event_name = "ingress.slack.url_verification",
                correlation_id = %correlation_id,
                "answered slack url verification"
            );
            Ok(Json(json!({ "challenge": challenge })).into_response())
        }
        InboundRequest::Envelope(envelope) => {
            spawn_dispatch(state.dispatcher.clone(), envelope, correlation_id);
            Ok(StatusCode::OK.into_response())
        }
    }
}

/// Slack expects an ack within three seconds, so handlers run after the response.
fn spawn_dispatch(dispatcher: Arc<EventDispatcher>, envelope: SlackEnvelope, correlation_id: String) {
    tokio::spawn(async move {
        let ctx = EventContext { correlation_id };
        match dispatcher.dispatch(&envelope, &ctx).await {
            Ok(result) => debug!(
                event_name = "ingress.slack.dispatched",
                correlation_id = %ctx.correlation_id,
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                result = ?result,
                "slack envelope handled"
            ),
            Err(error) => error!(
                event_name = "ingress.slack.handler_failed",
                correlation_id = %ctx.correlation_id,
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                error = %error,
                "slack handler failed"
            ),
        }
    });
}
