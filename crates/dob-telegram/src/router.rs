use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, types::BotCommand};

use dob_core::{
    config::Config, gateway::Gateway, messaging::port::MessagingPort, registry::CommandId,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub messenger: Arc<dyn MessagingPort>,
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let gateway = Arc::new(Gateway::from_config(&cfg)?);
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "🚀 Dark Ops Bot is starting..."),
        Err(e) => return Err(anyhow::anyhow!("failed to reach Telegram: {e}")),
    }

    // Command list shown by Telegram clients; best-effort.
    if let Err(e) = bot.set_my_commands(bot_commands()).await {
        tracing::warn!(error = %e, "failed to publish bot commands");
    }

    let messenger: Arc<dyn MessagingPort> =
        Arc::new(TelegramMessenger::new(bot.clone(), gateway.menu()));
    tracing::info!(
        buttons = gateway.menu().rows.iter().map(Vec::len).sum::<usize>(),
        "💎 Custom keyboard with 8 specialized commands loaded"
    );

    let state = Arc::new(AppState { gateway, messenger });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("🛑 Bot stopped");
    Ok(())
}

fn bot_commands() -> Vec<BotCommand> {
    let mut commands = vec![
        BotCommand::new("start", "Display main menu with custom keyboard"),
        BotCommand::new("help", "Show the command reference"),
        BotCommand::new("cancel", "Stop the operation that is running"),
    ];
    commands.extend(CommandId::ALL.into_iter().map(|id| {
        let what = id
            .description()
            .split_once(" - ")
            .map(|(title, _)| title)
            .unwrap_or(id.description());
        BotCommand::new(id.as_str(), what)
    }));
    commands
}
