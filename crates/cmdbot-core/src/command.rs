use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    config::BotConfig, i18n::Texts, messaging::port::MessagingPort,
    messaging::types::IncomingMessage, registry::CommandRegistry, store::BotStore,
};

/// Registry partition a command lives in. Admin-tier commands are only
/// executed for senders that pass the admin check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tier {
    User,
    Admin,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::User => "user",
            Tier::Admin => "admin",
        }
    }
}

/// Static metadata of a command, shown in the menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub aliases: &'static [&'static str],
}

/// Everything a handler may touch while executing.
///
/// Logging goes through the global `tracing` subscriber.
#[derive(Clone)]
pub struct CommandContext {
    pub messenger: Arc<dyn MessagingPort>,
    pub config: Arc<BotConfig>,
    pub texts: Texts,
    pub store: Arc<dyn BotStore>,
    pub registry: Arc<CommandRegistry>,
    pub started_at: Instant,
    /// Cancelled to stop the transport loop and exit the process.
    pub shutdown: CancellationToken,
}

/// A chat command. Built once at startup and immutable afterwards.
///
/// The handler owns the reply: the dispatcher never answers on behalf of a
/// command that executed successfully.
#[async_trait]
pub trait Command: Send + Sync {
    fn spec(&self) -> CommandSpec;

    async fn execute(
        &self,
        msg: &IncomingMessage,
        args: &[String],
        ctx: &CommandContext,
    ) -> anyhow::Result<()>;
}
