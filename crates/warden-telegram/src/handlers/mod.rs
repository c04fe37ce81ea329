//! Telegram update handlers.
//!
//! Each handler maps a raw teloxide update into a core `InboundEvent` and
//! hands it to the moderation controller; all policy lives in the core.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{ChatMemberUpdated, Message, User},
};

use warden_core::{
    domain::{ChatId, MessageId, UserId},
    formatting::escape_html,
    messaging::types::{
        BotAddedToGroup, ContentKind, EditedMessage, InboundEvent, NewChatMembers, NewMessage,
    },
};

use crate::router::AppState;

mod commands;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(event) = message_event(&msg) else {
        return Ok(());
    };
    dispatch(&state, event).await;
    Ok(())
}

pub async fn handle_edited_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };

    let event = InboundEvent::EditedMessage(EditedMessage {
        chat_id: ChatId(msg.chat.id.0),
        user_id: UserId(user.id.0 as i64),
        message_id: MessageId(msg.id.0),
        user_mention: mention_html(user),
    });
    dispatch(&state, event).await;
    Ok(())
}

pub async fn handle_my_chat_member(
    upd: ChatMemberUpdated,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    // Only react to the bot joining; demotions and removals carry no work.
    if !upd.new_chat_member.is_present() || upd.old_chat_member.is_present() {
        return Ok(());
    }

    let event = InboundEvent::BotAddedToGroup(BotAddedToGroup {
        chat_id: ChatId(upd.chat.id.0),
        added_by: UserId(upd.from.id.0 as i64),
        added_by_display: display_name(&upd.from),
    });
    dispatch(&state, event).await;
    Ok(())
}

fn message_event(msg: &Message) -> Option<InboundEvent> {
    if msg.new_chat_members().map_or(false, |m| !m.is_empty()) {
        return Some(InboundEvent::NewChatMembers(NewChatMembers {
            chat_id: ChatId(msg.chat.id.0),
        }));
    }

    let user = msg.from()?;
    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            return Some(InboundEvent::Command(commands::command_event(
                msg, user, text,
            )));
        }
    }

    Some(InboundEvent::NewMessage(NewMessage {
        chat_id: ChatId(msg.chat.id.0),
        user_id: UserId(user.id.0 as i64),
        message_id: MessageId(msg.id.0),
        kind: content_kind(msg),
    }))
}

fn content_kind(msg: &Message) -> ContentKind {
    if msg.text().is_some() {
        ContentKind::Text
    } else if msg.photo().is_some() {
        ContentKind::Photo
    } else if msg.video().is_some() {
        ContentKind::Video
    } else if msg.document().is_some() {
        ContentKind::Document
    } else if msg.sticker().is_some() {
        ContentKind::Sticker
    } else {
        ContentKind::Other
    }
}

fn mention_html(user: &User) -> String {
    format!(
        "<a href=\"tg://user?id={}\">{}</a>",
        user.id.0,
        escape_html(&user.full_name())
    )
}

fn display_name(user: &User) -> String {
    match &user.username {
        Some(username) => format!("@{username}"),
        None => user.full_name(),
    }
}

async fn dispatch(state: &AppState, event: InboundEvent) {
    if let Err(e) = state.controller.handle_event(event).await {
        tracing::warn!("event handling failed: {e}");
    }
}
