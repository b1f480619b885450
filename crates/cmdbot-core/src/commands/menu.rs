use async_trait::async_trait;

use crate::{
    command::{Command, CommandContext, CommandSpec, Tier},
    messaging::types::IncomingMessage,
};

pub struct Menu;

/// Build the menu from the registry: user commands, then admin commands.
pub fn render_menu(ctx: &CommandContext) -> String {
    let texts = &ctx.texts;
    let cfg = &ctx.config;
    let prefix = cfg.prefix.as_str();

    let mut out = format!("{}\n\n", texts.get("menu_title"));

    for (tier, heading) in [
        (Tier::User, "menu_user_commands"),
        (Tier::Admin, "menu_admin_commands"),
    ] {
        if tier == Tier::Admin {
            out.push('\n');
        }
        out.push_str(&texts.get(heading));
        out.push('\n');
        for spec in ctx.registry.specs(tier) {
            out.push_str(&format!("• {prefix}{} - {}\n", spec.usage, spec.description));
        }
    }

    out.push('\n');
    out.push_str(&texts.format("menu_footer", &[("prefix", prefix.to_string())]));
    out.push_str(&format!("\n\n🤖 *{}* v{}", cfg.bot_name, cfg.bot_version));
    out
}

#[async_trait]
impl Command for Menu {
    fn spec(&self) -> CommandSpec {
        CommandSpec {
            name: "menu",
            description: "Display all available commands",
            usage: "menu",
            aliases: &["help", "commands"],
        }
    }

    async fn execute(
        &self,
        msg: &IncomingMessage,
        _args: &[String],
        ctx: &CommandContext,
    ) -> anyhow::Result<()> {
        let menu = render_menu(ctx);
        let menu = ctx.messenger.capabilities().fit(&menu);
        ctx.messenger.reply_text(msg.msg_ref(), &menu).await?;
        Ok(())
    }
}
