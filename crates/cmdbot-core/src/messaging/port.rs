use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef, SenderId},
    messaging::types::MessagingCapabilities,
    Result,
};

/// Outbound side of the chat transport.
///
/// The dispatcher and every command handler talk to the transport only
/// through this trait, so the core never depends on a concrete chat client.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    /// Send `text` into the chat of `to`, quoting it where the transport supports it.
    async fn reply_text(&self, to: MessageRef, text: &str) -> Result<MessageRef>;

    async fn edit_text(&self, msg: MessageRef, text: &str) -> Result<()>;

    /// Send `text` to the private chat of a known sender.
    async fn send_direct(&self, to: &SenderId, text: &str) -> Result<MessageRef>;
}
