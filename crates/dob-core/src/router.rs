//! Event router: classifies inbound events and resolves registry entries.
//!
//! Classification order:
//! 1. slash command (`/name[@bot] [args]`): bootstrap names, then registry identifiers
//! 2. raw text (or an attachment caption) against trigger tokens
//! 3. anything else is `Unrecognized`
//!
//! Matching is exact and case-sensitive so near-miss text can never start an
//! encrypt/decrypt run by accident.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    domain::{AttachmentRef, ChatId, UserId},
    operation::OperationInput,
    registry::{CommandSpec, Registry},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Attachment {
        file: AttachmentRef,
        caption: Option<String>,
    },
}

/// One decoded message from the transport.
#[derive(Clone, Debug)]
pub struct InboundEvent {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub first_name: Option<String>,
    pub payload: Payload,
    pub received_at: DateTime<Utc>,
}

impl InboundEvent {
    pub fn text(user_id: UserId, chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            user_id,
            chat_id,
            first_name: None,
            payload: Payload::Text(text.into()),
            received_at: Utc::now(),
        }
    }

    pub fn attachment(
        user_id: UserId,
        chat_id: ChatId,
        file: AttachmentRef,
        caption: Option<String>,
    ) -> Self {
        Self {
            user_id,
            chat_id,
            first_name: None,
            payload: Payload::Attachment { file, caption },
            received_at: Utc::now(),
        }
    }

    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    fn text_part(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(t) => Some(t.as_str()),
            Payload::Attachment { caption, .. } => caption.as_deref(),
        }
    }
}

/// Transport-level commands that bypass the executor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bootstrap {
    Start,
    Help,
    Cancel,
}

impl Bootstrap {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Bootstrap::Start),
            "help" => Some(Bootstrap::Help),
            "cancel" => Some(Bootstrap::Cancel),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum Route<'a> {
    Bootstrap(Bootstrap),
    Operation {
        spec: &'a CommandSpec,
        input: OperationInput,
    },
    Unrecognized,
}

#[derive(Clone)]
pub struct Router {
    registry: Arc<Registry>,
}

impl Router {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn route(&self, event: &InboundEvent) -> Route<'_> {
        let Some(text) = event.text_part() else {
            return Route::Unrecognized;
        };

        if let Some((name, args)) = parse_command(text) {
            if let Some(b) = Bootstrap::from_name(name) {
                return Route::Bootstrap(b);
            }
            return match self.registry.resolve_identifier(name) {
                Some(spec) => Route::Operation {
                    spec,
                    input: input_for(event, args),
                },
                None => Route::Unrecognized,
            };
        }

        match self.registry.resolve(text) {
            Some(spec) => Route::Operation {
                spec,
                input: input_for(event, ""),
            },
            None => Route::Unrecognized,
        }
    }
}

fn input_for(event: &InboundEvent, args: &str) -> OperationInput {
    match &event.payload {
        Payload::Attachment { file, .. } => OperationInput::Attachment(file.clone()),
        Payload::Text(_) if args.is_empty() => OperationInput::None,
        Payload::Text(_) => OperationInput::Argument(args.to_string()),
    }
}

/// Split `/cmd@botname arg1 ...` into (`cmd`, `arg1 ...`).
fn parse_command(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix('/')?;
    let (first, args) = match rest.split_once(char::is_whitespace) {
        Some((first, args)) => (first, args.trim()),
        None => (rest, ""),
    };
    let name = first.split('@').next().unwrap_or("");
    if name.is_empty() {
        return None;
    }
    Some((name, args))
}
