//! Exemption decisions: owner, chat admins, and authorized users.

use std::sync::Arc;

use crate::{
    domain::{AuthorizationScope, ChatId, UserId},
    errors::Error,
    messaging::port::MessagingPort,
    state::StateHandle,
    Result,
};

/// Outcome of revoking an exemption that may not exist.
///
/// Revoking an absent entry is informational, not an error; callers decide
/// how to word the reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevokeOutcome {
    Revoked,
    NotAuthorized,
}

/// Owner / admin / exemption decisions, keyed exclusively by [`UserId`].
///
/// Username resolution is a transport-layer concern and happens before a
/// request reaches this registry.
#[derive(Clone)]
pub struct AuthorizationRegistry {
    state: StateHandle,
    owner: UserId,
    transport: Arc<dyn MessagingPort>,
}

impl AuthorizationRegistry {
    pub fn new(state: StateHandle, owner: UserId, transport: Arc<dyn MessagingPort>) -> Self {
        Self {
            state,
            owner,
            transport,
        }
    }

    /// True iff `user` is exempt from moderation in `chat`.
    ///
    /// Global exemption wins and is checked first; group exemption never
    /// leaks across chats.
    pub async fn is_exempt(&self, user: UserId, chat: ChatId) -> bool {
        self.state
            .read(|s| {
                s.global_authorized.contains(&user)
                    || s.group_authorized
                        .get(&chat)
                        .map_or(false, |g| g.contains(&user))
            })
            .await
    }

    pub async fn grant(
        &self,
        requestor: UserId,
        target: UserId,
        scope: AuthorizationScope,
    ) -> Result<()> {
        self.ensure_allowed(requestor, scope).await?;
        self.state
            .mutate(|s| match scope {
                AuthorizationScope::Global => {
                    s.global_authorized.insert(target);
                }
                AuthorizationScope::Group(chat) => {
                    s.group_authorized.entry(chat).or_default().insert(target);
                }
            })
            .await;
        Ok(())
    }

    pub async fn revoke(
        &self,
        requestor: UserId,
        target: UserId,
        scope: AuthorizationScope,
    ) -> Result<RevokeOutcome> {
        self.ensure_allowed(requestor, scope).await?;
        let removed = self
            .state
            .mutate(|s| match scope {
                AuthorizationScope::Global => s.global_authorized.remove(&target),
                AuthorizationScope::Group(chat) => match s.group_authorized.get_mut(&chat) {
                    Some(group) => {
                        let removed = group.remove(&target);
                        if group.is_empty() {
                            s.group_authorized.remove(&chat);
                        }
                        removed
                    }
                    None => false,
                },
            })
            .await;

        Ok(if removed {
            RevokeOutcome::Revoked
        } else {
            RevokeOutcome::NotAuthorized
        })
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        user == self.owner
    }

    /// Owner, or a listed administrator of `chat` (delegated to the
    /// transport's membership query).
    pub async fn is_admin_or_owner(&self, user: UserId, chat: ChatId) -> Result<bool> {
        if user == self.owner {
            return Ok(true);
        }
        self.transport.is_chat_administrator(chat, user).await
    }

    async fn ensure_allowed(&self, requestor: UserId, scope: AuthorizationScope) -> Result<()> {
        match scope {
            AuthorizationScope::Global => {
                if self.is_owner(requestor) {
                    Ok(())
                } else {
                    Err(Error::PermissionDenied(
                        "Only the bot owner can manage global exemptions.".to_string(),
                    ))
                }
            }
            AuthorizationScope::Group(chat) => {
                if self.is_admin_or_owner(requestor, chat).await? {
                    Ok(())
                } else {
                    Err(Error::PermissionDenied(
                        "Only the group owner or admins can manage exemptions.".to_string(),
                    ))
                }
            }
        }
    }
}
