use std::{sync::Arc, time::Instant};

use tokio_util::sync::CancellationToken;

use cmdbot_core::{
    command::{CommandContext, Tier},
    commands::builtin_registry,
    config::BotConfig,
    dispatcher::Dispatcher,
    i18n::{TextCatalog, Texts},
    security::RateLimiter,
    store::{BotStore, JsonFileStore},
};

#[tokio::main]
async fn main() -> Result<(), cmdbot_core::Error> {
    cmdbot_core::logging::init("cmdbot")?;

    let cfg = Arc::new(BotConfig::load()?);
    let token = cfg.telegram_bot_token.clone().ok_or_else(|| {
        cmdbot_core::Error::Config("TELEGRAM_BOT_TOKEN is not set".to_string())
    })?;

    let catalog = Arc::new(TextCatalog::load_dir(&cfg.lang_dir)?);
    if !catalog.has_language(&cfg.language) {
        tracing::warn!(
            language = %cfg.language,
            "no language pack for configured language, replies fall back to english"
        );
    }

    let store = JsonFileStore::new(cfg.users_file(), cfg.logs_file());
    store.ensure_files().await?;
    let store: Arc<dyn BotStore> = Arc::new(store);

    let registry = Arc::new(builtin_registry()?);

    tracing::info!(
        bot = %cfg.bot_name,
        version = %cfg.bot_version,
        owner = %cfg.owner,
        prefix = %cfg.prefix,
        language = %cfg.language,
        languages = catalog.languages().len(),
        user_commands = registry.len(Tier::User),
        admin_commands = registry.len(Tier::Admin),
        "starting"
    );

    let (bot, messenger) = cmdbot_telegram::router::messenger(&token);
    let shutdown = CancellationToken::new();

    let ctx = CommandContext {
        messenger,
        texts: Texts::new(catalog, cfg.language.clone()),
        config: cfg,
        store,
        registry,
        started_at: Instant::now(),
        shutdown: shutdown.clone(),
    };
    let dispatcher = Arc::new(Dispatcher::new(ctx, Arc::new(RateLimiter::default())));

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received");
                shutdown.cancel();
            }
        });
    }

    cmdbot_telegram::router::run_polling(bot, dispatcher, shutdown)
        .await
        .map_err(|e| cmdbot_core::Error::External(format!("telegram bot failed: {e}")))?;

    tracing::info!("bye");
    Ok(())
}
