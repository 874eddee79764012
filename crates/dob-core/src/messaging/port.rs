use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    presenter::OutboundMessage,
    Result,
};

/// Outbound side of the transport.
///
/// Telegram is the only implementation; the core hands it fully rendered
/// messages and never touches transport types.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Deliver one message, honouring its markup hint (format, menu keyboard)
    /// and attachment.
    async fn send(&self, chat_id: ChatId, msg: &OutboundMessage) -> Result<MessageRef>;
}
