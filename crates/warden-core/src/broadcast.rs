//! Fan-out of one payload to every known user and group.

use std::sync::Arc;

use crate::{
    domain::ChatId,
    formatting::escape_html,
    messaging::{port::MessagingPort, types::BroadcastPayload},
    Result,
};

/// Counters for a completed fan-out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: u32,
    pub failed: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BroadcastOutcome {
    Completed(BroadcastReport),
    /// The source message had no broadcastable content; nothing was sent.
    Unsupported,
}

#[derive(Clone)]
pub struct BroadcastEngine {
    transport: Arc<dyn MessagingPort>,
}

impl BroadcastEngine {
    pub fn new(transport: Arc<dyn MessagingPort>) -> Self {
        Self { transport }
    }

    /// Send `payload` to each recipient, isolating per-recipient failures.
    ///
    /// A failed send is counted and logged; the remaining recipients are
    /// still attempted.
    pub async fn broadcast(
        &self,
        payload: Option<BroadcastPayload>,
        recipients: &[ChatId],
    ) -> BroadcastOutcome {
        let Some(payload) = payload else {
            return BroadcastOutcome::Unsupported;
        };

        let mut report = BroadcastReport::default();
        for &chat in recipients {
            match self.send_one(chat, &payload).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!("broadcast to chat {} failed: {e}", chat.0);
                }
            }
        }
        BroadcastOutcome::Completed(report)
    }

    async fn send_one(&self, chat: ChatId, payload: &BroadcastPayload) -> Result<()> {
        let transport = self.transport.as_ref();
        match payload {
            BroadcastPayload::Text(text) => {
                transport.send_html(chat, &escape_html(text)).await?;
            }
            BroadcastPayload::Photo(file) => {
                transport.send_photo(chat, file).await?;
            }
            BroadcastPayload::Video(file) => {
                transport.send_video(chat, file).await?;
            }
            BroadcastPayload::Document(file) => {
                transport.send_document(chat, file).await?;
            }
            BroadcastPayload::Sticker(file) => {
                transport.send_sticker(chat, file).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::types::FileId;
    use crate::testing::FakeTransport;

    #[tokio::test]
    async fn one_failure_does_not_abort_the_fan_out() {
        let transport = Arc::new(FakeTransport::new());
        let engine = BroadcastEngine::new(transport.clone());

        let recipients: Vec<ChatId> = (1..=5).map(ChatId).collect();
        transport.fail_sends_to(ChatId(3));

        let outcome = engine
            .broadcast(
                Some(BroadcastPayload::Text("hello".to_string())),
                &recipients,
            )
            .await;

        assert_eq!(
            outcome,
            BroadcastOutcome::Completed(BroadcastReport { sent: 4, failed: 1 })
        );

        // All remaining recipients were attempted, in order.
        let sent: Vec<i64> = transport.sent().iter().map(|(c, _)| c.0).collect();
        assert_eq!(sent, vec![1, 2, 4, 5]);
    }

    #[tokio::test]
    async fn unsupported_payload_sends_nothing() {
        let transport = Arc::new(FakeTransport::new());
        let engine = BroadcastEngine::new(transport.clone());

        let outcome = engine.broadcast(None, &[ChatId(1), ChatId(2)]).await;

        assert_eq!(outcome, BroadcastOutcome::Unsupported);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn media_payloads_use_their_dedicated_send() {
        let transport = Arc::new(FakeTransport::new());
        let engine = BroadcastEngine::new(transport.clone());

        engine
            .broadcast(
                Some(BroadcastPayload::Photo(FileId("f1".to_string()))),
                &[ChatId(1)],
            )
            .await;
        engine
            .broadcast(
                Some(BroadcastPayload::Sticker(FileId("f2".to_string()))),
                &[ChatId(1)],
            )
            .await;

        let sent: Vec<String> = transport.sent().into_iter().map(|(_, what)| what).collect();
        assert_eq!(sent, vec!["photo:f1".to_string(), "sticker:f2".to_string()]);
    }

    #[tokio::test]
    async fn text_payload_is_escaped_for_html_transport() {
        let transport = Arc::new(FakeTransport::new());
        let engine = BroadcastEngine::new(transport.clone());

        engine
            .broadcast(
                Some(BroadcastPayload::Text("<script>".to_string())),
                &[ChatId(1)],
            )
            .await;

        assert_eq!(transport.sent()[0].1, "&lt;script&gt;");
    }
}
