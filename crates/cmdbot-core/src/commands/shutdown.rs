use std::time::Duration;

use async_trait::async_trait;

use crate::{
    command::{Command, CommandContext, CommandSpec},
    messaging::types::IncomingMessage,
};

/// Time given to the confirmation reply before the transport loop is stopped.
const DEFAULT_GRACE: Duration = Duration::from_secs(2);

pub struct Shutdown {
    grace: Duration,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::with_grace(DEFAULT_GRACE)
    }
}

impl Shutdown {
    pub fn with_grace(grace: Duration) -> Self {
        Self { grace }
    }
}

#[async_trait]
impl Command for Shutdown {
    fn spec(&self) -> CommandSpec {
        CommandSpec {
            name: "shutdown",
            description: "Gracefully shutdown the bot",
            usage: "shutdown",
            aliases: &["stop", "exit"],
        }
    }

    async fn execute(
        &self,
        msg: &IncomingMessage,
        _args: &[String],
        ctx: &CommandContext,
    ) -> anyhow::Result<()> {
        ctx.messenger
            .reply_text(msg.msg_ref(), &ctx.texts.get("shutdown_initiated"))
            .await?;

        tracing::warn!(admin = %msg.sender, "bot shutdown initiated by admin");

        let token = ctx.shutdown.clone();
        let grace = self.grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            tracing::info!("shutting down bot");
            token.cancel();
        });
        Ok(())
    }
}
