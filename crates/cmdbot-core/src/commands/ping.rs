use std::time::Instant;

use async_trait::async_trait;

use crate::{
    command::{Command, CommandContext, CommandSpec},
    messaging::types::IncomingMessage,
};

const PINGING: &str = "🏓 Pinging...";

/// Round-trip check: send a placeholder, then report how long sending took.
pub struct Ping;

#[async_trait]
impl Command for Ping {
    fn spec(&self) -> CommandSpec {
        CommandSpec {
            name: "ping",
            description: "Check bot response time",
            usage: "ping",
            aliases: &["p"],
        }
    }

    async fn execute(
        &self,
        msg: &IncomingMessage,
        _args: &[String],
        ctx: &CommandContext,
    ) -> anyhow::Result<()> {
        let started = Instant::now();
        let sent = ctx.messenger.reply_text(msg.msg_ref(), PINGING).await?;
        let ms = started.elapsed().as_millis();

        let text = ctx.texts.format("ping_response", &[("ms", ms.to_string())]);
        if ctx.messenger.capabilities().supports_edit {
            ctx.messenger.edit_text(sent, &text).await?;
        } else {
            ctx.messenger.reply_text(msg.msg_ref(), &text).await?;
        }
        Ok(())
    }
}
