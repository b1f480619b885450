use std::time::Duration;

use async_trait::async_trait;

use crate::{
    command::{Command, CommandContext, CommandSpec},
    domain::SenderId,
    messaging::types::IncomingMessage,
};

/// Pause between recipients so the transport's own flood limits are not hit.
const DEFAULT_PACING: Duration = Duration::from_millis(100);

/// Send a message to every recorded user except the sender.
pub struct Broadcast {
    pacing: Duration,
}

impl Default for Broadcast {
    fn default() -> Self {
        Self::with_pacing(DEFAULT_PACING)
    }
}

impl Broadcast {
    pub fn with_pacing(pacing: Duration) -> Self {
        Self { pacing }
    }
}

#[async_trait]
impl Command for Broadcast {
    fn spec(&self) -> CommandSpec {
        CommandSpec {
            name: "broadcast",
            description: "Send a message to all bot users",
            usage: "broadcast <message>",
            aliases: &["bc", "announce"],
        }
    }

    async fn execute(
        &self,
        msg: &IncomingMessage,
        args: &[String],
        ctx: &CommandContext,
    ) -> anyhow::Result<()> {
        let texts = &ctx.texts;
        let reply_to = msg.msg_ref();

        if args.is_empty() {
            ctx.messenger
                .reply_text(reply_to, &texts.get("broadcast_no_message"))
                .await?;
            return Ok(());
        }

        let recipients: Vec<SenderId> = ctx
            .store
            .users()
            .await?
            .into_keys()
            .map(SenderId)
            .filter(|id| id != &msg.sender)
            .collect();

        if recipients.is_empty() {
            ctx.messenger
                .reply_text(reply_to, &texts.get("broadcast_no_users"))
                .await?;
            return Ok(());
        }

        ctx.messenger
            .reply_text(
                reply_to,
                &texts.format(
                    "broadcast_progress",
                    &[("count", recipients.len().to_string())],
                ),
            )
            .await?;

        let framed = texts.format("broadcast_frame", &[("message", args.join(" "))]);
        let framed = ctx.messenger.capabilities().fit(&framed).into_owned();
        let mut sent = 0usize;
        let mut failed = 0usize;

        for to in &recipients {
            match ctx.messenger.send_direct(to, &framed).await {
                Ok(_) => sent += 1,
                Err(e) => {
                    tracing::warn!(recipient = %to, "failed to send broadcast: {e}");
                    failed += 1;
                }
            }
            if !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }

        tracing::info!(admin = %msg.sender, sent, failed, "broadcast finished");

        ctx.messenger
            .reply_text(
                reply_to,
                &texts.format("broadcast_sent", &[("count", sent.to_string())]),
            )
            .await?;
        if failed > 0 {
            ctx.messenger
                .reply_text(
                    reply_to,
                    &texts.format("broadcast_failed", &[("count", failed.to_string())]),
                )
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::commands::testing::*;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[tokio::test]
    async fn sends_to_everyone_but_the_sender() {
        let messenger = Arc::new(FakeMessenger::default());
        let store = Arc::new(MemoryStore::with_users(&["admin", "u1", "u2"]));
        let ctx = context(messenger.clone(), store, Default::default());

        let msg = text_from("admin", "!broadcast hello all");
        Broadcast::with_pacing(Duration::ZERO)
            .execute(&msg, &args(&["hello", "all"]), &ctx)
            .await
            .unwrap();

        let directs = messenger.directs();
        assert_eq!(
            directs,
            vec![
                (SenderId::new("u1"), "BC: hello all".to_string()),
                (SenderId::new("u2"), "BC: hello all".to_string()),
            ]
        );
        assert_eq!(messenger.texts(), vec!["sending to 2", "sent=2"]);
    }

    #[tokio::test]
    async fn counts_failed_recipients() {
        let messenger = Arc::new(FakeMessenger::unreachable(&["u2"]));
        let store = Arc::new(MemoryStore::with_users(&["u1", "u2", "u3"]));
        let ctx = context(messenger.clone(), store, Default::default());

        Broadcast::with_pacing(Duration::ZERO)
            .execute(&text_from("admin", "!bc hi"), &args(&["hi"]), &ctx)
            .await
            .unwrap();

        assert_eq!(messenger.directs().len(), 2);
        assert_eq!(
            messenger.texts(),
            vec!["sending to 3", "sent=2", "failed=1"]
        );
    }

    #[tokio::test]
    async fn empty_message_and_empty_audience_are_reported() {
        let messenger = Arc::new(FakeMessenger::default());
        let store = Arc::new(MemoryStore::with_users(&["admin"]));
        let ctx = context(messenger.clone(), store, Default::default());
        let b = Broadcast::with_pacing(Duration::ZERO);

        b.execute(&text_from("admin", "!broadcast"), &[], &ctx)
            .await
            .unwrap();
        b.execute(&text_from("admin", "!broadcast x"), &args(&["x"]), &ctx)
            .await
            .unwrap();

        assert_eq!(messenger.texts(), vec!["NO MESSAGE", "NO USERS"]);
        assert!(messenger.directs().is_empty());
    }

    #[tokio::test]
    async fn oversized_message_is_cut_to_transport_limit() {
        let messenger = Arc::new(FakeMessenger::with_max_len(20));
        let store = Arc::new(MemoryStore::with_users(&["u1"]));
        let ctx = context(messenger.clone(), store, Default::default());

        let long = "x".repeat(100);
        Broadcast::with_pacing(Duration::ZERO)
            .execute(&text_from("admin", "!bc"), &[long], &ctx)
            .await
            .unwrap();

        let directs = messenger.directs();
        assert_eq!(directs.len(), 1);
        assert_eq!(directs[0].1.chars().count(), 20);
        assert!(directs[0].1.starts_with("BC: xxx"));
        assert!(directs[0].1.ends_with('…'));
        assert_eq!(messenger.texts().last().unwrap(), "sent=1");
    }
}
