use std::time::Duration;

use async_trait::async_trait;
use sysinfo::System;

use crate::{
    command::{Command, CommandContext, CommandSpec},
    messaging::types::IncomingMessage,
};

pub struct Stats;

/// `Xd Xh Xm Xs`, always with all four fields.
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{days}d {hours}h {mins}m {secs}s")
}

/// Resident memory of this process in MiB, rounded. `None` where the OS won't report it.
pub fn process_memory_mb() -> Option<u64> {
    const MIB: u64 = 1024 * 1024;
    let pid = sysinfo::get_current_pid().ok()?;
    let mut sys = System::new();
    if !sys.refresh_process(pid) {
        return None;
    }
    let bytes = sys.process(pid)?.memory();
    Some((bytes + MIB / 2) / MIB)
}

fn format_memory(mb: Option<u64>) -> String {
    match mb {
        Some(mb) => format!("{mb}MB"),
        None => "n/a".to_string(),
    }
}

#[async_trait]
impl Command for Stats {
    fn spec(&self) -> CommandSpec {
        CommandSpec {
            name: "stats",
            description: "Show bot statistics",
            usage: "stats",
            aliases: &["statistics", "info"],
        }
    }

    async fn execute(
        &self,
        msg: &IncomingMessage,
        _args: &[String],
        ctx: &CommandContext,
    ) -> anyhow::Result<()> {
        let users = ctx.store.users().await?.len();
        let commands = ctx.store.command_log().await?.len();
        let uptime = format_uptime(ctx.started_at.elapsed());
        let cfg = &ctx.config;
        let texts = &ctx.texts;

        let lines = [
            texts.get("stats_title"),
            String::new(),
            texts.format("stats_users", &[("count", users.to_string())]),
            texts.format("stats_commands", &[("count", commands.to_string())]),
            texts.format("stats_uptime", &[("time", uptime)]),
            format!("💾 Memory Usage: {}", format_memory(process_memory_mb())),
            format!("🤖 Bot Version: {}", cfg.bot_version),
            format!("📱 Bot Number: {}", cfg.bot_number),
            format!("🌐 Language: {}", cfg.language.to_uppercase()),
            format!("⚡ Prefix: {}", cfg.prefix),
        ];

        ctx.messenger
            .reply_text(msg.msg_ref(), &lines.join("\n"))
            .await?;
        Ok(())
    }
}
