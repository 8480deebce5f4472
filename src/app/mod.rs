use crate::assets::AssetCache;
use crate::catalog::CatalogGateway;
use crate::config::Config;
use crate::dialogue::{DialogueAction, DialogueController, MSG_GENERIC_FAILURE, Turn};
use crate::session::SessionStore;
use crate::token::TokenManager;
use crate::transport::telegram::TelegramTransport;
use crate::transport::{ChatTransport, InboundEvent, InboundKind, OutboundMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// How long to wait before restarting the polling subsystem after a crash.
const RESTART_BACKOFF: Duration = Duration::from_secs(60);

const INBOUND_BUFFER: usize = 64;

/// The wired-up bot: transport, dialogue controller, sessions, operator chat.
pub struct App {
    transport: Arc<dyn ChatTransport>,
    controller: Arc<DialogueController>,
    sessions: Arc<SessionStore>,
    admin_chat_id: String,
}

impl App {
    /// Build every component and perform the initial authentication.
    pub async fn bootstrap(config: &Config) -> anyhow::Result<Self> {
        let transport: Arc<dyn ChatTransport> =
            Arc::new(TelegramTransport::new(&config.telegram.bot_token));

        let gateway = Arc::new(CatalogGateway::new(&config.commerce.api_base));
        let tokens = TokenManager::bootstrap(
            Arc::clone(&gateway),
            &config.commerce.client_id,
            &config.commerce.client_secret,
        )
        .await?;
        let _refresh_task = tokens.spawn_refresh();

        let assets = Arc::new(AssetCache::new(
            &config.assets.images_dir,
            Arc::clone(&gateway),
        )?);

        Ok(Self {
            transport,
            controller: Arc::new(DialogueController::new(gateway, assets, tokens)),
            sessions: Arc::new(SessionStore::new()),
            admin_chat_id: config.telegram.admin_chat_id.clone(),
        })
    }

    /// Supervision loop: run the polling subsystem, and on any unhandled
    /// failure notify the operator, back off, and start over. Never returns
    /// under ordinary errors.
    pub async fn run_supervised(&self) -> anyhow::Result<()> {
        self.notify_operator("Бот запущен").await;
        loop {
            tracing::info!("starting polling subsystem");
            if let Err(e) = self.run().await {
                tracing::error!("bot loop failed: {e:#}");
                self.notify_operator(&format!("⚠ Ошибка бота:\n\n{e:#}")).await;
            } else {
                tracing::warn!("bot loop exited unexpectedly");
            }
            tokio::time::sleep(RESTART_BACKOFF).await;
        }
    }

    /// One polling lifetime: listen for events, dispatch each as its own
    /// task. Returns when the listener dies.
    pub async fn run(&self) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel::<InboundEvent>(INBOUND_BUFFER);

        let transport = Arc::clone(&self.transport);
        let listener = tokio::spawn(async move { transport.listen(tx).await });

        while let Some(event) = rx.recv().await {
            let transport = Arc::clone(&self.transport);
            let controller = Arc::clone(&self.controller);
            let sessions = Arc::clone(&self.sessions);
            tokio::spawn(async move {
                handle_event(&*transport, &controller, &sessions, event).await;
            });
        }

        // The channel only closes when the listener is gone.
        match listener.await {
            Ok(result) => result,
            Err(e) => Err(anyhow::anyhow!("listener task panicked: {e}")),
        }
    }

    async fn notify_operator(&self, text: &str) {
        if self.admin_chat_id.is_empty() {
            return;
        }
        if let Err(e) = self
            .transport
            .send_text(&self.admin_chat_id, text, None)
            .await
        {
            tracing::warn!("operator notification failed: {e:#}");
        }
    }
}

/// Process one inbound action through the dialogue controller.
///
/// The per-user session mutex is held across the whole turn: one turn at a
/// time per user, users never blocking each other. The new state is committed
/// only after every outbound message went out.
async fn handle_event(
    transport: &dyn ChatTransport,
    controller: &DialogueController,
    sessions: &SessionStore,
    event: InboundEvent,
) {
    let cell = sessions.get(&event.user_id);
    let mut session = cell.lock().await;

    let Some(action) = DialogueAction::derive(session.state, &event.kind) else {
        tracing::debug!(user_id = %event.user_id, "unmatched input, turn dropped");
        return;
    };

    match controller
        .transition(&session, &event.user_id, &event.first_name, action)
        .await
    {
        Ok(Turn::Ignored) => {}
        Ok(Turn::Reply {
            messages,
            next,
            replace_origin,
        }) => {
            if replace_origin
                && let InboundKind::ButtonPress { message_id, .. } = &event.kind
                && let Err(e) = transport.delete_message(&event.chat_id, *message_id).await
            {
                tracing::warn!("failed to delete replaced message: {e:#}");
            }

            for message in messages {
                let sent = match &message {
                    OutboundMessage::Text { text, keyboard } => {
                        transport
                            .send_text(&event.chat_id, text, keyboard.as_ref())
                            .await
                    }
                    OutboundMessage::Photo {
                        path,
                        caption,
                        keyboard,
                    } => {
                        transport
                            .send_photo(&event.chat_id, path, caption, keyboard)
                            .await
                    }
                };
                if let Err(e) = sent {
                    tracing::error!(user_id = %event.user_id, "send failed: {e:#}");
                    // State stays as it was — the user can retry the action.
                    return;
                }
            }

            *session = next;
        }
        Err(e) => {
            tracing::error!(user_id = %event.user_id, "turn failed: {e:#}");
            if let Err(send_err) = transport
                .send_text(&event.chat_id, MSG_GENERIC_FAILURE, None)
                .await
            {
                tracing::warn!("failed to report turn error to user: {send_err:#}");
            }
        }
    }
}
