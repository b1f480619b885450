use std::borrow::Cow;

use crate::domain::{ChatId, MessageId, MessageRef, SenderId};

/// What an inbound message carries, as far as the dispatcher cares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Media,
    Other,
}

/// Transport-agnostic inbound message event.
///
/// Transport-specific fields stay in the adapter.
#[derive(Clone, Debug)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub sender: SenderId,
    /// Contact name as reported by the transport, if any.
    pub sender_name: Option<String>,
    pub kind: MessageKind,
    pub body: String,
    /// Broadcast/status/channel posts are never treated as commands.
    pub is_broadcast: bool,
}

impl IncomingMessage {
    pub fn msg_ref(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat_id,
            message_id: self.message_id,
        }
    }

    pub fn display_name(&self) -> String {
        self.sender_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown")
            .to_string()
    }
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_edit: bool,
    /// In characters; `0` means no limit.
    pub max_message_len: usize,
}

impl MessagingCapabilities {
    /// Cut `text` to `max_message_len` characters, ending with `…` when cut.
    pub fn fit<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let max = self.max_message_len;
        if max == 0 || text.chars().count() <= max {
            return Cow::Borrowed(text);
        }
        let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        Cow::Owned(out)
    }
}
