//! Deferred message deletion.
//!
//! One independent timer per qualifying message: sleep the chat's configured
//! delay, then issue a single best-effort delete through the transport.
//! Timers never block the event-processing path or each other.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    group_config::GroupConfigRegistry,
    messaging::port::MessagingPort,
};

#[derive(Clone)]
pub struct DeletionScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    configs: GroupConfigRegistry,
    transport: Arc<dyn MessagingPort>,
    pending: Mutex<HashMap<(ChatId, MessageId), CancellationToken>>,
}

impl DeletionScheduler {
    pub fn new(configs: GroupConfigRegistry, transport: Arc<dyn MessagingPort>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                configs,
                transport,
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Schedule one deferred deletion for `(chat_id, message_id)`.
    ///
    /// The chat's config is read exactly once, here. Later delay or
    /// enablement changes do not touch timers that are already running.
    pub async fn schedule_for(&self, chat_id: ChatId, message_id: MessageId) {
        let config = self.inner.configs.get(chat_id).await;
        if !config.auto_delete_enabled {
            return;
        }

        let delay = Duration::from_secs(config.delete_delay_seconds);
        let cancel = CancellationToken::new();
        {
            let mut pending = self.inner.pending.lock().await;
            pending.insert((chat_id, message_id), cancel.clone());
        }

        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler
                .run_deletion(chat_id, message_id, delay, cancel)
                .await;
        });
    }

    /// Cancel a pending deletion, if one exists.
    ///
    /// Nothing in the event path calls this today; timers run to completion
    /// by default. It is the hook for future exempt-after-send flows.
    pub async fn cancel(&self, chat_id: ChatId, message_id: MessageId) -> bool {
        let pending = self.inner.pending.lock().await;
        match pending.get(&(chat_id, message_id)) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of timers currently pending.
    pub async fn pending_count(&self) -> usize {
        self.inner.pending.lock().await.len()
    }

    async fn run_deletion(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        delay: Duration,
        cancel: CancellationToken,
    ) {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = sleep(delay) => {
                let msg = MessageRef { chat_id, message_id };
                // Expected steady-state failures: message already gone,
                // missing delete rights, unreachable chat.
                if let Err(e) = self.inner.transport.delete_message(msg).await {
                    tracing::warn!(
                        "failed to delete message {} in chat {}: {e}",
                        message_id.0,
                        chat_id.0
                    );
                }
            }
        }

        let mut pending = self.inner.pending.lock().await;
        pending.remove(&(chat_id, message_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use crate::testing::{temp_state, FakeTransport};

    const OWNER: UserId = UserId(1);
    const CHAT: ChatId = ChatId(-500);

    fn scheduler(
        name: &str,
        transport: Arc<FakeTransport>,
    ) -> (DeletionScheduler, GroupConfigRegistry) {
        let configs = GroupConfigRegistry::new(
            temp_state(name),
            transport.clone(),
            OWNER,
            Duration::from_secs(30 * 60),
        );
        (
            DeletionScheduler::new(configs.clone(), transport),
            configs,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_the_configured_delay() {
        let transport = Arc::new(FakeTransport::new());
        let (scheduler, configs) = scheduler("sched-fires", transport.clone());
        configs.set_delay(OWNER, CHAT, 1).await.unwrap();

        scheduler.schedule_for(CHAT, MessageId(42)).await;
        assert_eq!(scheduler.pending_count().await, 1);

        sleep(Duration::from_secs(61)).await;

        let deleted = transport.deleted();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].chat_id, CHAT);
        assert_eq!(deleted[0].message_id, MessageId(42));
        assert_eq!(scheduler.pending_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_auto_delete_creates_no_task() {
        let transport = Arc::new(FakeTransport::new());
        let (scheduler, configs) = scheduler("sched-disabled", transport.clone());
        configs.set_enabled(CHAT, false).await;

        scheduler.schedule_for(CHAT, MessageId(42)).await;

        assert_eq!(scheduler.pending_count().await, 0);
        sleep(Duration::from_secs(3600)).await;
        assert!(transport.deleted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn config_changes_do_not_reach_scheduled_timers() {
        let transport = Arc::new(FakeTransport::new());
        let (scheduler, configs) = scheduler("sched-snapshot", transport.clone());
        configs.set_delay(OWNER, CHAT, 2).await.unwrap();

        scheduler.schedule_for(CHAT, MessageId(42)).await;

        // Shorten the delay and disable auto-delete after scheduling.
        configs.set_delay(OWNER, CHAT, 1).await.unwrap();
        configs.set_enabled(CHAT, false).await;

        // Past the new 60s delay but before the original 120s one.
        sleep(Duration::from_secs(70)).await;
        assert!(transport.deleted().is_empty());
        assert_eq!(scheduler.pending_count().await, 1);

        // The task still fires at its original mark.
        sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.deleted().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timers_for_different_messages_are_independent() {
        let transport = Arc::new(FakeTransport::new());
        let (scheduler, configs) = scheduler("sched-independent", transport.clone());
        configs.set_delay(OWNER, CHAT, 1).await.unwrap();

        scheduler.schedule_for(CHAT, MessageId(1)).await;
        scheduler.schedule_for(CHAT, MessageId(2)).await;
        scheduler.schedule_for(ChatId(-600), MessageId(1)).await;
        assert_eq!(scheduler.pending_count().await, 3);

        sleep(Duration::from_secs(30 * 60 + 1)).await;
        assert_eq!(transport.deleted().len(), 3);
        assert_eq!(scheduler.pending_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_the_deletion() {
        let transport = Arc::new(FakeTransport::new());
        let (scheduler, configs) = scheduler("sched-cancel", transport.clone());
        configs.set_delay(OWNER, CHAT, 1).await.unwrap();

        scheduler.schedule_for(CHAT, MessageId(42)).await;
        assert!(scheduler.cancel(CHAT, MessageId(42)).await);

        sleep(Duration::from_secs(120)).await;
        assert!(transport.deleted().is_empty());
        assert_eq!(scheduler.pending_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_of_unknown_message_is_a_no_op() {
        let transport = Arc::new(FakeTransport::new());
        let (scheduler, _configs) = scheduler("sched-cancel-miss", transport);
        assert!(!scheduler.cancel(CHAT, MessageId(7)).await);
    }
}
