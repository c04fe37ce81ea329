//! Shared test doubles for the port traits.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    errors::Error,
    messaging::{port::MessagingPort, types::FileId},
    state::{PersistentStore, StateHandle},
    Result,
};

/// In-memory transport that records every call.
#[derive(Default)]
pub(crate) struct FakeTransport {
    next_id: Mutex<i32>,
    sent: Mutex<Vec<(ChatId, String)>>,
    deleted: Mutex<Vec<MessageRef>>,
    admins: Mutex<HashSet<(i64, i64)>>,
    titles: Mutex<HashMap<i64, String>>,
    failing_chats: Mutex<HashSet<i64>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_admin(&self, chat: ChatId, user: UserId) {
        self.admins.lock().unwrap().insert((chat.0, user.0));
    }

    pub fn set_title(&self, chat: ChatId, title: &str) {
        self.titles.lock().unwrap().insert(chat.0, title.to_string());
    }

    /// Every send to `chat` fails from now on.
    pub fn fail_sends_to(&self, chat: ChatId) {
        self.failing_chats.lock().unwrap().insert(chat.0);
    }

    pub fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<MessageRef> {
        self.deleted.lock().unwrap().clone()
    }

    fn alloc(&self, chat_id: ChatId) -> MessageRef {
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        MessageRef {
            chat_id,
            message_id: MessageId(*guard),
        }
    }

    fn record(&self, chat_id: ChatId, what: String) -> Result<MessageRef> {
        if self.failing_chats.lock().unwrap().contains(&chat_id.0) {
            return Err(Error::Transport(format!(
                "simulated send failure to {}",
                chat_id.0
            )));
        }
        self.sent.lock().unwrap().push((chat_id, what));
        Ok(self.alloc(chat_id))
    }
}

#[async_trait]
impl MessagingPort for FakeTransport {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        self.record(chat_id, html.to_string())
    }

    async fn send_photo(&self, chat_id: ChatId, file: &FileId) -> Result<MessageRef> {
        self.record(chat_id, format!("photo:{}", file.0))
    }

    async fn send_video(&self, chat_id: ChatId, file: &FileId) -> Result<MessageRef> {
        self.record(chat_id, format!("video:{}", file.0))
    }

    async fn send_document(&self, chat_id: ChatId, file: &FileId) -> Result<MessageRef> {
        self.record(chat_id, format!("document:{}", file.0))
    }

    async fn send_sticker(&self, chat_id: ChatId, file: &FileId) -> Result<MessageRef> {
        self.record(chat_id, format!("sticker:{}", file.0))
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.deleted.lock().unwrap().push(msg);
        Ok(())
    }

    async fn is_chat_administrator(&self, chat_id: ChatId, user_id: UserId) -> Result<bool> {
        Ok(self.admins.lock().unwrap().contains(&(chat_id.0, user_id.0)))
    }

    async fn chat_title(&self, chat_id: ChatId) -> Result<Option<String>> {
        Ok(self.titles.lock().unwrap().get(&chat_id.0).cloned())
    }
}

/// Fresh state handle backed by a per-test file under the temp dir.
pub(crate) fn temp_state(name: &str) -> StateHandle {
    let path = std::env::temp_dir().join(format!(
        "warden-test-{}-{}.json",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    StateHandle::load(PersistentStore::new(path)).unwrap()
}
