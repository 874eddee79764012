use std::{path::Path, sync::Arc};

use dob_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), dob_core::Error> {
    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Still log the reason somewhere before exiting.
            dob_core::logging::init("dob", Path::new("bot.log"))?;
            tracing::error!("❌ {e}");
            tracing::error!(
                "💡 Please set your bot token: export TELEGRAM_BOT_TOKEN='your_actual_token'"
            );
            return Err(e);
        }
    };
    dob_core::logging::init("dob", &cfg.log_file)?;

    dob_telegram::router::run_polling(Arc::new(cfg))
        .await
        .map_err(|e| {
            tracing::error!("❌ Bot crashed: {e}");
            dob_core::Error::External(format!("telegram bot failed: {e}"))
        })?;

    Ok(())
}
