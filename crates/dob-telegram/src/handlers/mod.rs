//! Telegram update handlers.
//!
//! Each message is decoded into a core `InboundEvent` and handed to the
//! gateway on its own task. teloxide processes updates of one chat in order,
//! so awaiting a long operation here would hold back that user's next message
//! instead of letting the executor answer it with a busy notice.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use dob_core::{
    domain::{AttachmentRef, ChatId, UserId},
    messaging,
    router::{InboundEvent, Payload},
};

use crate::router::AppState;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(event) = inbound_event(&msg) else {
        return Ok(());
    };

    tokio::spawn(async move {
        messaging::respond(&state.gateway, state.messenger.as_ref(), event).await;
    });
    Ok(())
}

fn inbound_event(msg: &Message) -> Option<InboundEvent> {
    let user = msg.from()?;
    let user_id = UserId(user.id.0 as i64);
    let chat_id = ChatId(msg.chat.id.0);

    let event = match payload(msg.text(), attachment(msg), msg.caption())? {
        Payload::Text(text) => InboundEvent::text(user_id, chat_id, text),
        Payload::Attachment { file, caption } => {
            InboundEvent::attachment(user_id, chat_id, file, caption)
        }
    };

    let mut event = event.with_first_name(user.first_name.clone());
    event.received_at = msg.date;
    Some(event)
}

/// Text or a file; stickers, locations and service messages get no reply.
fn payload(
    text: Option<&str>,
    file: Option<AttachmentRef>,
    caption: Option<&str>,
) -> Option<Payload> {
    if let Some(text) = text {
        return Some(Payload::Text(text.to_string()));
    }
    file.map(|file| Payload::Attachment {
        file,
        caption: caption.map(str::to_string),
    })
}

fn attachment(msg: &Message) -> Option<AttachmentRef> {
    if let Some(doc) = msg.document() {
        return Some(AttachmentRef {
            file_id: doc.file.id.clone(),
            file_name: doc.file_name.clone(),
            mime_type: doc.mime_type.as_ref().map(|m| m.to_string()),
        });
    }
    if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        return Some(AttachmentRef::new(photo.file.id.clone()));
    }
    if let Some(video) = msg.video() {
        return Some(AttachmentRef {
            file_id: video.file.id.clone(),
            file_name: video.file_name.clone(),
            mime_type: video.mime_type.as_ref().map(|m| m.to_string()),
        });
    }
    if let Some(audio) = msg.audio() {
        return Some(AttachmentRef {
            file_id: audio.file.id.clone(),
            file_name: audio.file_name.clone(),
            mime_type: audio.mime_type.as_ref().map(|m| m.to_string()),
        });
    }
    None
}
