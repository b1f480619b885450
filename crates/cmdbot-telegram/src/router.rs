use std::sync::Arc;

use teloxide::{dispatching::Dispatcher as UpdateDispatcher, dptree, prelude::*};
use tokio_util::sync::CancellationToken;

use cmdbot_core::{dispatcher::Dispatcher, messaging::port::MessagingPort};

use crate::{handlers, TelegramMessenger};

/// Build the outbound messenger for `token`.
pub fn messenger(token: &str) -> (Bot, Arc<dyn MessagingPort>) {
    let bot = Bot::new(token);
    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    (bot, messenger)
}

/// Long-poll Telegram and feed every message to `dispatcher` until `shutdown` is cancelled.
pub async fn run_polling(
    bot: Bot,
    dispatcher: Arc<Dispatcher>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "telegram bot connected"),
        Err(e) => tracing::warn!("could not fetch bot identity: {e}"),
    }

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    let mut updates = UpdateDispatcher::builder(bot, handler)
        .dependencies(dptree::deps![dispatcher])
        .default_handler(|_| async {})
        .build();

    let stop = updates.shutdown_token();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        tracing::info!("stopping telegram polling");
        match stop.shutdown() {
            Ok(done) => done.await,
            Err(e) => tracing::warn!("telegram dispatcher was not running: {e}"),
        }
    });

    updates.dispatch().await;
    tracing::info!("telegram polling stopped");
    Ok(())
}
