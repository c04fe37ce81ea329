use crate::domain::{ChatId, MessageId, UserId};

/// Transport file handle for media payloads (opaque to the core).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileId(pub String);

/// Cross-transport inbound event model.
///
/// Telegram-specific fields live in the Telegram adapter; usernames and
/// display names are resolved there before an event reaches the core.
#[derive(Clone, Debug)]
pub enum InboundEvent {
    NewMessage(NewMessage),
    EditedMessage(EditedMessage),
    BotAddedToGroup(BotAddedToGroup),
    NewChatMembers(NewChatMembers),
    Command(Command),
}

#[derive(Clone, Debug)]
pub struct NewMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub message_id: MessageId,
    pub kind: ContentKind,
}

#[derive(Clone, Debug)]
pub struct EditedMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub message_id: MessageId,
    /// HTML mention of the author, built by the adapter.
    pub user_mention: String,
}

#[derive(Clone, Debug)]
pub struct BotAddedToGroup {
    pub chat_id: ChatId,
    pub added_by: UserId,
    pub added_by_display: String,
}

#[derive(Clone, Debug)]
pub struct NewChatMembers {
    pub chat_id: ChatId,
}

#[derive(Clone, Debug)]
pub struct Command {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub message_id: MessageId,
    pub name: String,
    pub args: String,
    pub reply: Option<RepliedMessage>,
}

/// The message a command replied to (`/auth` target, `/broadcast` source).
#[derive(Clone, Debug)]
pub struct RepliedMessage {
    pub message_id: MessageId,
    pub user_id: Option<UserId>,
    pub payload: Option<BroadcastPayload>,
}

/// Content classes the moderation rules distinguish.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Photo,
    Video,
    Document,
    Sticker,
    Other,
}

/// One broadcastable payload; exactly one branch per source message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BroadcastPayload {
    Text(String),
    Photo(FileId),
    Video(FileId),
    Document(FileId),
    Sticker(FileId),
}
