use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef, UserId},
    messaging::types::FileId,
    Result,
};

/// Cross-transport port.
///
/// Telegram is the first implementation; the shape leaves room for other
/// messengers behind the same interface.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;

    async fn send_photo(&self, chat_id: ChatId, file: &FileId) -> Result<MessageRef>;
    async fn send_video(&self, chat_id: ChatId, file: &FileId) -> Result<MessageRef>;
    async fn send_document(&self, chat_id: ChatId, file: &FileId) -> Result<MessageRef>;
    async fn send_sticker(&self, chat_id: ChatId, file: &FileId) -> Result<MessageRef>;

    async fn delete_message(&self, msg: MessageRef) -> Result<()>;

    /// Delegated membership query backing the owner/admin checks.
    async fn is_chat_administrator(&self, chat_id: ChatId, user_id: UserId) -> Result<bool>;

    /// Human-readable chat title, if the transport can resolve one.
    async fn chat_title(&self, chat_id: ChatId) -> Result<Option<String>>;
}
