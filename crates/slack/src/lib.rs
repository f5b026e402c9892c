//! Slack integration - Events API and interactivity over HTTP
//!
//! This crate provides the Slack side of the bootcamp app:
//! - **Block Kit** (`blocks`) - message, modal and home-tab builders
//! - **Web API** (`api`) - `chat.postMessage`, `reactions.add`, `views.*`, `conversations.history`
//! - **Events** (`events`) - envelope parsing and the handler dispatcher
//! - **Signature** (`signature`) - `X-Slack-Signature` verification
//! - **Features** (`poll`, `translation`, `home`) - one handler per trigger
//!
//! # Architecture
//!
//! ```text
//! HTTP request → SlackRequestVerifier → SlackEnvelope → EventDispatcher → Handler → SlackApi
//! ```

pub mod api;
pub mod blocks;
pub mod events;
pub mod home;
pub mod poll;
pub mod signature;
pub mod translation;
