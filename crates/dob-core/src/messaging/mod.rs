//! Cross-messenger abstractions (Telegram today).

pub mod port;

use std::sync::Arc;

use crate::{gateway::Gateway, router::InboundEvent};

use self::port::MessagingPort;

/// Handle one inbound event and deliver exactly one reply.
///
/// Send failures are logged, never propagated: the transport loop must keep
/// running whatever happens to a single update.
pub async fn respond(gateway: &Arc<Gateway>, messenger: &dyn MessagingPort, event: InboundEvent) {
    let chat_id = event.chat_id;
    let user_id = event.user_id;
    let reply = gateway.handle_isolated(event).await;
    if let Err(e) = messenger.send(chat_id, &reply).await {
        tracing::error!(%user_id, chat_id = chat_id.0, error = %e, "failed to deliver reply");
    }
}
