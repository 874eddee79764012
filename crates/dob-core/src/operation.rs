//! Contract between the executor and operation handlers.
//!
//! Handlers are async and may run for a long time. Cancellation is
//! cooperative: the executor fires the context's token and the handler is
//! expected to notice it at its own checkpoints (`ctx.checkpoint()?` before
//! and after each I/O step) and unwind. Anything the handler owns is released
//! by `Drop`, however the run ends.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{AttachmentRef, ChatId, UserId},
    errors::Error,
    registry::{CommandId, InputKind},
};

/// Input that came with the command invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationInput {
    /// Bare trigger or slash command.
    None,
    /// Text after a slash command (`/scrape_media_download https://...`).
    Argument(String),
    /// A file sent with the trigger (or slash command) as its caption.
    Attachment(AttachmentRef),
}

impl OperationInput {
    pub fn is_none(&self) -> bool {
        matches!(self, OperationInput::None)
    }
}

#[derive(Clone, Debug)]
pub struct OperationContext {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub command: CommandId,
    pub input_kind: InputKind,
    pub input: OperationInput,
    cancel: CancellationToken,
}

impl OperationContext {
    pub fn new(
        user_id: UserId,
        chat_id: ChatId,
        command: CommandId,
        input_kind: InputKind,
        input: OperationInput,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            user_id,
            chat_id,
            command,
            input_kind,
            input,
            cancel,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns `Err(Cancelled)` once cancellation has been requested.
    pub fn checkpoint(&self) -> Result<(), OperationError> {
        if self.cancel.is_cancelled() {
            return Err(OperationError::Cancelled);
        }
        Ok(())
    }

    /// Resolves when cancellation is requested. Use in `select!` around I/O.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Check the invocation input against what the command expects.
    pub fn validate_input(&self) -> Result<(), OperationError> {
        validate_input(self.input_kind, &self.input)
    }
}

/// Successful handler output.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub attachment: Option<AttachmentRef>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: AttachmentRef) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// Bad input. The message is shown to the user verbatim.
    #[error("{0}")]
    Invalid(String),

    /// The handler observed cancellation and unwound.
    #[error("operation cancelled")]
    Cancelled,

    /// Provider or system fault. Logged; the user only sees a generic apology.
    #[error(transparent)]
    Fault(#[from] Error),
}

#[async_trait]
pub trait Operation: Send + Sync {
    async fn run(&self, ctx: OperationContext) -> Result<Reply, OperationError>;
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("valid regex"))
}

pub fn validate_input(kind: InputKind, input: &OperationInput) -> Result<(), OperationError> {
    match (kind, input) {
        (_, OperationInput::None) => Ok(()),
        (InputKind::File, OperationInput::Attachment(_)) => Ok(()),
        (InputKind::File, OperationInput::Argument(_)) => Err(OperationError::Invalid(
            "📎 Send the file as an attachment with the command as its caption.".to_string(),
        )),
        (InputKind::Url, OperationInput::Argument(arg)) if url_re().is_match(arg.trim()) => Ok(()),
        (InputKind::Url, OperationInput::Argument(_)) => Err(OperationError::Invalid(
            "🔗 That doesn't look like a link. Send an http(s) URL.".to_string(),
        )),
        (InputKind::Text, OperationInput::Argument(_)) => Ok(()),
        (InputKind::None, OperationInput::Argument(_)) => Err(OperationError::Invalid(
            "This command takes no input.".to_string(),
        )),
        (_, OperationInput::Attachment(_)) => Err(OperationError::Invalid(
            "This command doesn't take files.".to_string(),
        )),
    }
}
