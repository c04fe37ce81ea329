//! Durable bot state: the persisted aggregate and its single-writer handle.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    domain::{ChatId, UserId},
    errors::Error,
    Result,
};

/// Per-chat auto-delete settings.
///
/// Absence of a record implies the implicit default; defaults are only
/// materialized into the snapshot by an explicit `/settimer` or `/autodlt`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupConfig {
    pub delete_delay_seconds: u64,
    pub auto_delete_enabled: bool,
}

/// The persisted aggregate: the sole unit of durability.
///
/// Every registry mutation is reflected here and snapshotted before it is
/// considered committed. In-flight deletion timers are deliberately not
/// part of this state and do not survive a restart.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BotState {
    /// Users who have started a direct session with the bot.
    pub started_users: BTreeSet<UserId>,
    /// Chats the bot has observed itself in.
    pub known_chats: BTreeSet<ChatId>,
    /// Users exempt from moderation everywhere.
    pub global_authorized: BTreeSet<UserId>,
    /// Users exempt from moderation per chat.
    pub group_authorized: BTreeMap<ChatId, BTreeSet<UserId>>,
    /// Explicitly configured per-chat auto-delete settings.
    pub group_configs: BTreeMap<ChatId, GroupConfig>,
    /// RFC3339 stamp of the last successful save. Informational only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
}

impl BotState {
    /// Everyone a broadcast goes to: users who started the bot (their
    /// direct chats) plus every known group chat. User ids and group chat
    /// ids live in disjoint ranges, so the union holds no duplicates.
    pub fn broadcast_recipients(&self) -> Vec<ChatId> {
        let mut out: Vec<ChatId> = self.started_users.iter().map(|u| ChatId(u.0)).collect();
        out.extend(self.known_chats.iter().copied());
        out
    }
}

/// Durable load/save of the bot snapshot. No business logic lives here.
#[derive(Clone, Debug)]
pub struct PersistentStore {
    path: PathBuf,
}

impl PersistentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A missing or empty file is a fresh start; anything unreadable beyond
    /// that is a hard error so a torn snapshot is never silently dropped.
    pub fn load(&self) -> Result<BotState> {
        if !self.path.exists() {
            return Ok(BotState::default());
        }
        let txt = std::fs::read_to_string(&self.path)?;
        if txt.trim().is_empty() {
            return Ok(BotState::default());
        }
        serde_json::from_str(&txt).map_err(|e| {
            Error::Persistence(format!(
                "corrupt state file {}: {e}",
                self.path.display()
            ))
        })
    }

    pub fn save(&self, state: &BotState) -> Result<()> {
        let mut snapshot = state.clone();
        snapshot.saved_at = Some(chrono::Utc::now().to_rfc3339());
        let txt = serde_json::to_string(&snapshot)?;
        std::fs::write(&self.path, txt)
            .map_err(|e| Error::Persistence(format!("write {}: {e}", self.path.display())))?;
        Ok(())
    }
}

/// Single-writer access to the persisted [`BotState`].
///
/// All mutations go through [`StateHandle::mutate`], which snapshots to
/// disk before releasing the lock. Deletion timers read config once at
/// schedule time and never touch this during their sleep phase.
#[derive(Clone)]
pub struct StateHandle {
    inner: Arc<StateInner>,
}

struct StateInner {
    store: PersistentStore,
    state: Mutex<BotState>,
}

impl StateHandle {
    pub fn load(store: PersistentStore) -> Result<Self> {
        let state = store.load()?;
        Ok(Self {
            inner: Arc::new(StateInner {
                store,
                state: Mutex::new(state),
            }),
        })
    }

    pub async fn read<T>(&self, f: impl FnOnce(&BotState) -> T) -> T {
        let st = self.inner.state.lock().await;
        f(&st)
    }

    /// Apply a mutation and write the snapshot through before returning.
    ///
    /// A failed write is logged and the in-memory mutation stands; the bot
    /// stays responsive and that mutation may be lost on a crash.
    pub async fn mutate<T>(&self, f: impl FnOnce(&mut BotState) -> T) -> T {
        let mut st = self.inner.state.lock().await;
        let out = f(&mut st);
        if let Err(e) = self.inner.store.save(&st) {
            tracing::error!("state snapshot write failed: {e}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("warden-state-{}-{}.json", name, std::process::id()))
    }

    fn populated_state() -> BotState {
        let mut state = BotState::default();
        state.started_users.insert(UserId(10));
        state.started_users.insert(UserId(20));
        state.known_chats.insert(ChatId(-100));
        state.global_authorized.insert(UserId(30));
        state
            .group_authorized
            .entry(ChatId(-100))
            .or_default()
            .insert(UserId(40));
        state.group_configs.insert(
            ChatId(-100),
            GroupConfig {
                delete_delay_seconds: 600,
                auto_delete_enabled: false,
            },
        );
        state
    }

    #[test]
    fn serde_round_trip_preserves_every_field() {
        let state = populated_state();
        let json = serde_json::to_string(&state).unwrap();
        let back: BotState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
    }

    #[test]
    fn snapshot_uses_documented_field_names() {
        let json = serde_json::to_string(&populated_state()).unwrap();
        for key in [
            "startedUsers",
            "knownChats",
            "globalAuthorized",
            "groupAuthorized",
            "groupConfigs",
            "deleteDelaySeconds",
            "autoDeleteEnabled",
        ] {
            assert!(json.contains(key), "missing key {key} in {json}");
        }
    }

    #[test]
    fn missing_file_loads_empty_state() {
        let store = PersistentStore::new(temp_path("missing"));
        assert_eq!(store.load().unwrap(), BotState::default());
    }

    #[test]
    fn empty_file_loads_empty_state() {
        let path = temp_path("empty");
        std::fs::write(&path, "").unwrap();
        let store = PersistentStore::new(&path);
        assert_eq!(store.load().unwrap(), BotState::default());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn corrupt_file_is_a_hard_error() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "{ not json").unwrap();
        let store = PersistentStore::new(&path);
        let err = store.load().unwrap_err();
        assert!(matches!(err, Error::Persistence(_)), "got {err:?}");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn save_then_load_round_trips() {
        let path = temp_path("roundtrip");
        let _ = std::fs::remove_file(&path);
        let store = PersistentStore::new(&path);

        let mut state = populated_state();
        store.save(&state).unwrap();
        let loaded = store.load().unwrap();

        assert!(loaded.saved_at.is_some());
        state.saved_at = loaded.saved_at.clone();
        assert_eq!(state, loaded);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn mutate_writes_through_to_disk() {
        let path = temp_path("mutate");
        let _ = std::fs::remove_file(&path);
        let handle = StateHandle::load(PersistentStore::new(&path)).unwrap();

        handle
            .mutate(|s| {
                s.started_users.insert(UserId(7));
            })
            .await;

        let on_disk = PersistentStore::new(&path).load().unwrap();
        assert!(on_disk.started_users.contains(&UserId(7)));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn broadcast_recipients_union_users_and_chats() {
        let state = populated_state();
        let recipients = state.broadcast_recipients();
        assert_eq!(
            recipients,
            vec![ChatId(10), ChatId(20), ChatId(-100)]
        );
    }
}
