//! Command parsing and command-event construction.

use teloxide::types::{Message, User};

use warden_core::{
    domain::{ChatId, MessageId, UserId},
    messaging::types::{BroadcastPayload, Command, FileId, RepliedMessage},
};

/// Telegram may send `/cmd@botname arg1 ...`.
pub(crate) fn parse_command(text: &str) -> (String, String) {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub(crate) fn command_event(msg: &Message, user: &User, text: &str) -> Command {
    let (name, args) = parse_command(text);
    Command {
        chat_id: ChatId(msg.chat.id.0),
        user_id: UserId(user.id.0 as i64),
        message_id: MessageId(msg.id.0),
        name,
        args,
        reply: msg.reply_to_message().map(replied_message),
    }
}

fn replied_message(reply: &Message) -> RepliedMessage {
    RepliedMessage {
        message_id: MessageId(reply.id.0),
        user_id: reply.from().map(|u| UserId(u.id.0 as i64)),
        payload: payload_of(reply),
    }
}

/// Exactly one payload branch per source message; the largest photo size
/// wins, mirroring Telegram's size ordering.
fn payload_of(msg: &Message) -> Option<BroadcastPayload> {
    if let Some(sizes) = msg.photo() {
        let best = sizes.last()?;
        return Some(BroadcastPayload::Photo(FileId(best.file.id.clone())));
    }
    if let Some(video) = msg.video() {
        return Some(BroadcastPayload::Video(FileId(video.file.id.clone())));
    }
    if let Some(sticker) = msg.sticker() {
        return Some(BroadcastPayload::Sticker(FileId(sticker.file.id.clone())));
    }
    if let Some(document) = msg.document() {
        return Some(BroadcastPayload::Document(FileId(document.file.id.clone())));
    }
    if let Some(text) = msg.text() {
        return Some(BroadcastPayload::Text(text.to_string()));
    }
    None
}
