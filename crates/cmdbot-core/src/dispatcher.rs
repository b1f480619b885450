//! Message-to-command pipeline.
//!
//! Per message, strictly in order, stopping at the first gate that rejects:
//! filter -> parse -> flood gate -> bookkeeping -> resolve/authorize -> execute.
//! Nothing that happens after the filter escapes `Dispatcher::handle`.

use std::sync::Arc;

use anyhow::Context as _;
use chrono::Utc;

use crate::{
    command::{CommandContext, Tier},
    messaging::types::{IncomingMessage, MessageKind},
    registry::Resolved,
    security::{is_admin, RateLimiter},
    store::CommandLogEntry,
};

/// How a message left the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Not a command: broadcast/status post, non-text, or missing prefix.
    Ignored,
    FloodLimited,
    NotFound { command: String },
    AdminOnly { command: String },
    Executed { command: String, tier: Tier },
    /// A collaborator or the handler failed; an error reply was attempted.
    Failed { command: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lower-cased; empty when the message is just the prefix.
    pub name: String,
    pub args: Vec<String>,
}

/// Split a prefixed command line. The prefix match is case-sensitive, the
/// command name is not.
pub fn parse_command(body: &str, prefix: &str) -> Option<ParsedCommand> {
    if prefix.is_empty() {
        return None;
    }
    let rest = body.strip_prefix(prefix)?;
    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or("").to_lowercase();
    let args = words.map(str::to_string).collect();
    Some(ParsedCommand { name, args })
}

pub struct Dispatcher {
    ctx: CommandContext,
    limiter: Arc<RateLimiter>,
}

impl Dispatcher {
    pub fn new(ctx: CommandContext, limiter: Arc<RateLimiter>) -> Self {
        Self { ctx, limiter }
    }

    pub async fn handle(&self, msg: IncomingMessage) -> Outcome {
        if msg.is_broadcast || msg.kind != MessageKind::Text {
            return Outcome::Ignored;
        }
        let Some(parsed) = parse_command(&msg.body, &self.ctx.config.prefix) else {
            return Outcome::Ignored;
        };

        match self.run(&msg, &parsed).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    sender = %msg.sender,
                    command = %parsed.name,
                    "error handling message: {e:#}"
                );
                let text = self.ctx.texts.get("error_occurred");
                if let Err(reply_err) = self.ctx.messenger.reply_text(msg.msg_ref(), &text).await
                {
                    tracing::error!(
                        sender = %msg.sender,
                        "failed to send error message: {reply_err}"
                    );
                }
                Outcome::Failed {
                    command: parsed.name,
                }
            }
        }
    }

    async fn run(
        &self,
        msg: &IncomingMessage,
        parsed: &ParsedCommand,
    ) -> anyhow::Result<Outcome> {
        let cfg = &self.ctx.config;

        if !self.limiter.admit(&msg.sender, cfg.max_commands_per_minute) {
            tracing::info!(sender = %msg.sender, "flood control rejected command");
            self.reply(msg, "flood_control").await?;
            return Ok(Outcome::FloodLimited);
        }

        self.record(msg, parsed).await;

        let Some(Resolved { tier, command }) = self.ctx.registry.resolve(&parsed.name) else {
            self.reply(msg, "command_not_found").await?;
            return Ok(Outcome::NotFound {
                command: parsed.name.clone(),
            });
        };

        if tier == Tier::Admin && !is_admin(&msg.sender, cfg) {
            tracing::warn!(
                sender = %msg.sender,
                command = %parsed.name,
                "admin command refused"
            );
            self.reply(msg, "admin_only").await?;
            return Ok(Outcome::AdminOnly {
                command: parsed.name.clone(),
            });
        }

        tracing::info!(
            sender = %msg.sender,
            command = %parsed.name,
            tier = tier.as_str(),
            args = parsed.args.len(),
            "executing command"
        );
        command
            .execute(msg, &parsed.args, &self.ctx)
            .await
            .with_context(|| format!("command {} failed", command.spec().name))?;

        Ok(Outcome::Executed {
            command: command.spec().name.to_string(),
            tier,
        })
    }

    /// Append to the command log and upsert the sender. Failures are logged
    /// and never stop the pipeline.
    async fn record(&self, msg: &IncomingMessage, parsed: &ParsedCommand) {
        let name = msg.display_name();
        let entry =
            CommandLogEntry::new(&msg.sender, &name, &parsed.name, &parsed.args, Utc::now());

        if let Err(e) = self.ctx.store.append_log(entry).await {
            tracing::error!(sender = %msg.sender, "failed to log command: {e}");
        }
        if let Err(e) = self.ctx.store.upsert_user(&msg.sender, &name).await {
            tracing::error!(sender = %msg.sender, "failed to save user data: {e}");
        }
    }

    async fn reply(&self, msg: &IncomingMessage, key: &str) -> crate::Result<()> {
        let text = self.ctx.texts.get(key);
        self.ctx.messenger.reply_text(msg.msg_ref(), &text).await?;
        Ok(())
    }
}
