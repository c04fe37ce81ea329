use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use warden_core::{
    config::Config,
    messaging::port::MessagingPort,
    moderation::ModerationController,
    state::{PersistentStore, StateHandle},
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub controller: ModerationController,
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        tracing::info!("warden started: @{}", me.username());
    }

    let store = PersistentStore::new(cfg.state_file.clone());
    let state_handle = StateHandle::load(store)?;
    tracing::info!("state file: {}", cfg.state_file.display());
    tracing::info!("owner: {}", cfg.owner_id.0);

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let controller = ModerationController::new(&cfg, state_handle, messenger);

    let state = Arc::new(AppState { controller });

    let handler = dptree::entry()
        .branch(Update::filter_my_chat_member().endpoint(handlers::handle_my_chat_member))
        .branch(Update::filter_edited_message().endpoint(handlers::handle_edited_message))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
