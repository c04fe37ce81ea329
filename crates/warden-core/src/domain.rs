use serde::{Deserialize, Serialize};

/// Telegram user id (numeric).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
///
/// Group chats use negative ids and direct (user) chats use positive ids,
/// so the two id spaces never collide.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric, scoped to a chat).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MessageId(pub i32);

/// A stable reference to one message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Where an authorization exemption applies.
///
/// A user may hold any number of scopes; exemption in a chat is the union
/// of all scopes that match it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorizationScope {
    /// Exempts the user in every chat.
    Global,
    /// Exempts the user only in the given chat.
    Group(ChatId),
}
