//! Event orchestration: exemption checks, deferred deletions, edit
//! enforcement, and the owner/admin command surface.

use std::sync::Arc;

use crate::{
    auth::{AuthorizationRegistry, RevokeOutcome},
    broadcast::{BroadcastEngine, BroadcastOutcome},
    config::Config,
    domain::{AuthorizationScope, MessageRef, UserId},
    errors::Error,
    formatting::escape_html,
    group_config::GroupConfigRegistry,
    messaging::{
        port::MessagingPort,
        types::{
            BotAddedToGroup, Command, ContentKind, EditedMessage, InboundEvent, NewChatMembers,
            NewMessage,
        },
    },
    scheduler::DeletionScheduler,
    state::StateHandle,
    Result,
};

const HELP_TEXT: &str = "I can help manage your group by:\n\
- Deleting edited messages and announcing them.\n\
- Automatically deleting media and text messages after the configured delay.\n\
- Ignoring authorized users chosen by the owner or admins.\n\n\
<b>Commands</b> (owner or admins only):\n\
/auth &lt;id|reply&gt; - Exempt a user from moderation\n\
/unauth &lt;id|reply&gt; - Remove an exemption\n\
/settimer &lt;minutes&gt; - Set the auto-delete delay\n\
/autodlt &lt;on|off&gt; - Toggle auto-delete";

#[derive(Clone)]
pub struct ModerationController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    owner: UserId,
    state: StateHandle,
    auth: AuthorizationRegistry,
    configs: GroupConfigRegistry,
    scheduler: DeletionScheduler,
    broadcast: BroadcastEngine,
    transport: Arc<dyn MessagingPort>,
}

impl ModerationController {
    pub fn new(cfg: &Config, state: StateHandle, transport: Arc<dyn MessagingPort>) -> Self {
        let auth = AuthorizationRegistry::new(state.clone(), cfg.owner_id, transport.clone());
        let configs = GroupConfigRegistry::new(
            state.clone(),
            transport.clone(),
            cfg.owner_id,
            cfg.default_delete_delay,
        );
        let scheduler = DeletionScheduler::new(configs.clone(), transport.clone());
        let broadcast = BroadcastEngine::new(transport.clone());

        Self {
            inner: Arc::new(ControllerInner {
                owner: cfg.owner_id,
                state,
                auth,
                configs,
                scheduler,
                broadcast,
                transport,
            }),
        }
    }

    pub async fn handle_event(&self, event: InboundEvent) -> Result<()> {
        match event {
            InboundEvent::NewMessage(msg) => self.on_new_message(msg).await,
            InboundEvent::EditedMessage(msg) => self.on_edited_message(msg).await,
            InboundEvent::BotAddedToGroup(ev) => self.on_added_to_group(ev).await,
            InboundEvent::NewChatMembers(ev) => self.on_new_chat_members(ev).await,
            InboundEvent::Command(cmd) => self.on_command(cmd).await,
        }
    }

    async fn on_new_message(&self, msg: NewMessage) -> Result<()> {
        if self.inner.auth.is_exempt(msg.user_id, msg.chat_id).await {
            return Ok(());
        }
        self.inner
            .scheduler
            .schedule_for(msg.chat_id, msg.message_id)
            .await;
        Ok(())
    }

    /// Edits bypass the timer: announce, then delete immediately.
    async fn on_edited_message(&self, msg: EditedMessage) -> Result<()> {
        if self.inner.auth.is_exempt(msg.user_id, msg.chat_id).await {
            return Ok(());
        }

        let announcement = format!("{} edited a message. I deleted it!", msg.user_mention);
        if let Err(e) = self.inner.transport.send_html(msg.chat_id, &announcement).await {
            tracing::warn!("edit announcement failed in chat {}: {e}", msg.chat_id.0);
        }

        let target = MessageRef {
            chat_id: msg.chat_id,
            message_id: msg.message_id,
        };
        if let Err(e) = self.inner.transport.delete_message(target).await {
            tracing::warn!(
                "failed to delete edited message {} in chat {}: {e}",
                msg.message_id.0,
                msg.chat_id.0
            );
        }
        Ok(())
    }

    async fn on_added_to_group(&self, ev: BotAddedToGroup) -> Result<()> {
        self.inner
            .state
            .mutate(|s| {
                s.known_chats.insert(ev.chat_id);
            })
            .await;

        let greeting = format!(
            "Hello! I was added by {}.\n\n{HELP_TEXT}",
            escape_html(&ev.added_by_display)
        );
        if let Err(e) = self.inner.transport.send_html(ev.chat_id, &greeting).await {
            tracing::warn!("greeting failed in chat {}: {e}", ev.chat_id.0);
        }
        Ok(())
    }

    async fn on_new_chat_members(&self, ev: NewChatMembers) -> Result<()> {
        self.inner
            .state
            .mutate(|s| {
                s.known_chats.insert(ev.chat_id);
            })
            .await;
        Ok(())
    }

    async fn on_command(&self, cmd: Command) -> Result<()> {
        let reply = match self.dispatch_command(&cmd).await {
            Ok(text) => text,
            // Authorization and validation are resolved here, at the command
            // boundary; they never reach the scheduler or broadcast engine.
            Err(Error::PermissionDenied(text)) | Err(Error::InvalidArgument(text)) => text,
            Err(e) => return Err(e),
        };

        if reply.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.inner.transport.send_html(cmd.chat_id, &reply).await {
            tracing::warn!("command reply failed in chat {}: {e}", cmd.chat_id.0);
        }
        Ok(())
    }

    /// Resolve one command to its reply text.
    async fn dispatch_command(&self, cmd: &Command) -> Result<String> {
        match cmd.name.as_str() {
            "start" | "help" => self.cmd_start(cmd).await,
            "auth" => self.cmd_auth(cmd).await,
            "unauth" => self.cmd_unauth(cmd).await,
            "listgroup" => self.cmd_listgroup(cmd).await,
            "countuser" => self.cmd_countuser(cmd).await,
            "broadcast" => self.cmd_broadcast(cmd).await,
            "settimer" => self.cmd_settimer(cmd).await,
            "autodlt" => self.cmd_autodlt(cmd).await,
            // Unknown slash text is an ordinary message and is moderated
            // like one.
            _ => {
                self.on_new_message(NewMessage {
                    chat_id: cmd.chat_id,
                    user_id: cmd.user_id,
                    message_id: cmd.message_id,
                    kind: ContentKind::Text,
                })
                .await?;
                Ok(String::new())
            }
        }
    }

    async fn cmd_start(&self, cmd: &Command) -> Result<String> {
        self.inner
            .state
            .mutate(|s| {
                s.started_users.insert(cmd.user_id);
                s.known_chats.insert(cmd.chat_id);
            })
            .await;
        Ok(format!("Hello! {HELP_TEXT}"))
    }

    /// The owner grants global exemptions; chat admins grant exemptions
    /// scoped to the chat the command was issued in.
    fn scope_for(&self, cmd: &Command) -> AuthorizationScope {
        if cmd.user_id == self.inner.owner {
            AuthorizationScope::Global
        } else {
            AuthorizationScope::Group(cmd.chat_id)
        }
    }

    async fn cmd_auth(&self, cmd: &Command) -> Result<String> {
        let target = resolve_target(cmd, "Usage: /auth &lt;user id&gt; (or reply to a message)")?;
        let scope = self.scope_for(cmd);
        self.inner.auth.grant(cmd.user_id, target, scope).await?;

        Ok(match scope {
            AuthorizationScope::Global => format!(
                "User {} is now exempt from moderation everywhere.",
                target.0
            ),
            AuthorizationScope::Group(_) => format!(
                "User {} is now exempt from moderation in this group.",
                target.0
            ),
        })
    }

    async fn cmd_unauth(&self, cmd: &Command) -> Result<String> {
        let target = resolve_target(cmd, "Usage: /unauth &lt;user id&gt; (or reply to a message)")?;
        let scope = self.scope_for(cmd);

        Ok(match self.inner.auth.revoke(cmd.user_id, target, scope).await? {
            RevokeOutcome::Revoked => format!("User {} is no longer exempt.", target.0),
            RevokeOutcome::NotAuthorized => {
                format!("User {} was not in the exemption list.", target.0)
            }
        })
    }

    async fn cmd_listgroup(&self, cmd: &Command) -> Result<String> {
        self.ensure_owner(cmd.user_id)?;

        let chats = self
            .inner
            .state
            .read(|s| s.known_chats.iter().copied().collect::<Vec<_>>())
            .await;
        if chats.is_empty() {
            return Ok("The bot has not been added to any chats yet.".to_string());
        }

        let mut lines = vec!["<b>Known chats:</b>".to_string()];
        for chat in chats {
            let line = match self.inner.transport.chat_title(chat).await {
                Ok(Some(title)) => format!("{} (ID: {})", escape_html(&title), chat.0),
                Ok(None) => format!("ID: {}", chat.0),
                Err(e) => format!(
                    "Unknown chat (ID: {}) - {}",
                    chat.0,
                    escape_html(&e.to_string())
                ),
            };
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }

    async fn cmd_countuser(&self, cmd: &Command) -> Result<String> {
        self.ensure_owner(cmd.user_id)?;
        let count = self.inner.state.read(|s| s.started_users.len()).await;
        Ok(format!("Total users who started the bot: {count}"))
    }

    async fn cmd_broadcast(&self, cmd: &Command) -> Result<String> {
        self.ensure_owner(cmd.user_id)?;
        let Some(reply) = &cmd.reply else {
            return Err(Error::InvalidArgument(
                "Reply to a message to broadcast it.".to_string(),
            ));
        };

        let recipients = self.inner.state.read(|s| s.broadcast_recipients()).await;
        match self
            .inner
            .broadcast
            .broadcast(reply.payload.clone(), &recipients)
            .await
        {
            BroadcastOutcome::Unsupported => {
                Ok("That message type cannot be broadcast.".to_string())
            }
            BroadcastOutcome::Completed(report) => Ok(format!(
                "Broadcast completed.\nSent: {}\nFailed: {}",
                report.sent, report.failed
            )),
        }
    }

    async fn cmd_settimer(&self, cmd: &Command) -> Result<String> {
        let minutes = cmd
            .args
            .split_whitespace()
            .next()
            .unwrap_or("")
            .parse::<i64>()
            .map_err(|_| Error::InvalidArgument("Usage: /settimer &lt;minutes&gt;".to_string()))?;

        self.inner
            .configs
            .set_delay(cmd.user_id, cmd.chat_id, minutes)
            .await?;
        Ok(format!(
            "Auto-delete timer set to {minutes} minute(s) for this chat."
        ))
    }

    async fn cmd_autodlt(&self, cmd: &Command) -> Result<String> {
        // Permission is enforced here; the registry toggle itself is
        // unconditional.
        if !self
            .inner
            .auth
            .is_admin_or_owner(cmd.user_id, cmd.chat_id)
            .await?
        {
            return Err(Error::PermissionDenied(
                "Only the group owner or admins can toggle auto-delete.".to_string(),
            ));
        }

        let enabled = match cmd.args.trim().to_lowercase().as_str() {
            "on" => true,
            "off" => false,
            _ => {
                return Err(Error::InvalidArgument(
                    "Usage: /autodlt &lt;on|off&gt;".to_string(),
                ))
            }
        };

        self.inner.configs.set_enabled(cmd.chat_id, enabled).await;
        Ok(if enabled {
            "Auto-delete is now enabled for this chat.".to_string()
        } else {
            "Auto-delete is now disabled. Already-scheduled deletions will still run.".to_string()
        })
    }

    fn ensure_owner(&self, user: UserId) -> Result<()> {
        if user == self.inner.owner {
            Ok(())
        } else {
            Err(Error::PermissionDenied(
                "Only the bot owner can use this command.".to_string(),
            ))
        }
    }
}

fn resolve_target(cmd: &Command, usage: &str) -> Result<UserId> {
    if let Some(reply) = &cmd.reply {
        if let Some(user) = reply.user_id {
            return Ok(user);
        }
    }

    let arg = cmd.args.split_whitespace().next().unwrap_or("");
    if arg.is_empty() {
        return Err(Error::InvalidArgument(usage.to_string()));
    }
    arg.parse::<i64>().map(UserId).map_err(|_| {
        Error::InvalidArgument(format!("Not a numeric user id: {}", escape_html(arg)))
    })
}
