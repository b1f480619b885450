//! Telegram update handlers.
//!
//! Converts teloxide messages into the core `IncomingMessage` and hands them to
//! the dispatcher. All command semantics live in `cmdbot-core`.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use cmdbot_core::{
    dispatcher::{Dispatcher, Outcome},
    domain::{ChatId, MessageId, SenderId},
    messaging::types::{IncomingMessage, MessageKind},
};

pub async fn handle_message(msg: Message, dispatcher: Arc<Dispatcher>) -> ResponseResult<()> {
    let Some(incoming) = to_incoming(&msg) else {
        return Ok(());
    };

    let outcome = dispatcher.handle(incoming).await;
    if outcome != Outcome::Ignored {
        tracing::debug!(chat = msg.chat.id.0, ?outcome, "message handled");
    }
    Ok(())
}

/// `None` for messages without a user sender (anonymous admins, service posts).
pub fn to_incoming(msg: &Message) -> Option<IncomingMessage> {
    let user = msg.from()?;

    Some(IncomingMessage {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
        sender: SenderId::new(user.id.0.to_string()),
        sender_name: Some(user.full_name()),
        kind: message_kind(msg),
        body: msg.text().unwrap_or_default().to_string(),
        is_broadcast: msg.chat.is_channel(),
    })
}

fn message_kind(msg: &Message) -> MessageKind {
    if msg.text().is_some() {
        return MessageKind::Text;
    }
    let has_media = msg.photo().is_some()
        || msg.video().is_some()
        || msg.animation().is_some()
        || msg.sticker().is_some()
        || msg.document().is_some()
        || msg.audio().is_some()
        || msg.voice().is_some();
    if has_media {
        MessageKind::Media
    } else {
        MessageKind::Other
    }
}
