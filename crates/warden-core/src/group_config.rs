//! Per-chat auto-delete enablement and delay.

use std::{sync::Arc, time::Duration};

use crate::{
    domain::{ChatId, UserId},
    errors::Error,
    messaging::port::MessagingPort,
    state::{GroupConfig, StateHandle},
    Result,
};

#[derive(Clone)]
pub struct GroupConfigRegistry {
    state: StateHandle,
    transport: Arc<dyn MessagingPort>,
    owner: UserId,
    default_delay: Duration,
}

impl GroupConfigRegistry {
    pub fn new(
        state: StateHandle,
        transport: Arc<dyn MessagingPort>,
        owner: UserId,
        default_delay: Duration,
    ) -> Self {
        Self {
            state,
            transport,
            owner,
            default_delay,
        }
    }

    /// Stored record or the implicit default. Never fails, and never
    /// materializes the default into the snapshot.
    pub async fn get(&self, chat: ChatId) -> GroupConfig {
        let default = self.default_config();
        self.state
            .read(move |s| s.group_configs.get(&chat).copied().unwrap_or(default))
            .await
    }

    /// Set the auto-delete delay for a chat. Owner/admin only.
    ///
    /// Setting an explicit timer also enables auto-delete for the chat.
    pub async fn set_delay(&self, requestor: UserId, chat: ChatId, minutes: i64) -> Result<()> {
        self.ensure_admin_or_owner(requestor, chat).await?;
        if minutes <= 0 {
            return Err(Error::InvalidArgument(
                "The timer must be a positive number of minutes.".to_string(),
            ));
        }

        self.state
            .mutate(move |s| {
                s.group_configs.insert(
                    chat,
                    GroupConfig {
                        delete_delay_seconds: minutes as u64 * 60,
                        auto_delete_enabled: true,
                    },
                );
            })
            .await;
        Ok(())
    }

    /// Toggle auto-delete, preserving any previously set delay.
    ///
    /// No permission check at this layer; the command boundary enforces it.
    pub async fn set_enabled(&self, chat: ChatId, enabled: bool) {
        let default = self.default_config();
        self.state
            .mutate(move |s| {
                let entry = s.group_configs.entry(chat).or_insert(default);
                entry.auto_delete_enabled = enabled;
            })
            .await;
    }

    fn default_config(&self) -> GroupConfig {
        GroupConfig {
            delete_delay_seconds: self.default_delay.as_secs(),
            auto_delete_enabled: true,
        }
    }

    async fn ensure_admin_or_owner(&self, user: UserId, chat: ChatId) -> Result<()> {
        if user == self.owner || self.transport.is_chat_administrator(chat, user).await? {
            return Ok(());
        }
        Err(Error::PermissionDenied(
            "Only the group owner or admins can change the timer.".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{temp_state, FakeTransport};

    const OWNER: UserId = UserId(1);
    const ALICE: UserId = UserId(100);
    const CHAT: ChatId = ChatId(-500);

    fn registry(name: &str, transport: Arc<FakeTransport>) -> GroupConfigRegistry {
        GroupConfigRegistry::new(
            temp_state(name),
            transport,
            OWNER,
            Duration::from_secs(30 * 60),
        )
    }

    #[tokio::test]
    async fn get_returns_implicit_default_without_persisting_it() {
        let reg = registry("cfg-default", Arc::new(FakeTransport::new()));

        let config = reg.get(CHAT).await;
        assert_eq!(config.delete_delay_seconds, 1800);
        assert!(config.auto_delete_enabled);

        let stored = reg.state.read(|s| s.group_configs.len()).await;
        assert_eq!(stored, 0);
    }

    #[tokio::test]
    async fn set_delay_stores_seconds_and_force_enables() {
        let reg = registry("cfg-delay", Arc::new(FakeTransport::new()));
        reg.set_enabled(CHAT, false).await;

        reg.set_delay(OWNER, CHAT, 5).await.unwrap();

        let config = reg.get(CHAT).await;
        assert_eq!(config.delete_delay_seconds, 300);
        assert!(config.auto_delete_enabled);
    }

    #[tokio::test]
    async fn set_delay_rejects_non_positive_minutes() {
        let reg = registry("cfg-invalid", Arc::new(FakeTransport::new()));
        for minutes in [0, -3] {
            let err = reg.set_delay(OWNER, CHAT, minutes).await.unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "minutes={minutes}");
        }
    }

    #[tokio::test]
    async fn set_delay_requires_owner_or_admin() {
        let reg = registry("cfg-denied", Arc::new(FakeTransport::new()));
        let err = reg.set_delay(ALICE, CHAT, 5).await.unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));

        let transport = Arc::new(FakeTransport::new());
        transport.add_admin(CHAT, ALICE);
        let reg = registry("cfg-admin", transport);
        reg.set_delay(ALICE, CHAT, 5).await.unwrap();
    }

    #[tokio::test]
    async fn set_enabled_preserves_existing_delay() {
        let reg = registry("cfg-toggle", Arc::new(FakeTransport::new()));
        reg.set_delay(OWNER, CHAT, 10).await.unwrap();

        reg.set_enabled(CHAT, false).await;

        let config = reg.get(CHAT).await;
        assert_eq!(config.delete_delay_seconds, 600);
        assert!(!config.auto_delete_enabled);
    }

    #[tokio::test]
    async fn set_enabled_materializes_default_delay_when_absent() {
        let reg = registry("cfg-materialize", Arc::new(FakeTransport::new()));

        reg.set_enabled(CHAT, false).await;

        let config = reg.get(CHAT).await;
        assert_eq!(config.delete_delay_seconds, 1800);
        assert!(!config.auto_delete_enabled);
    }
}
