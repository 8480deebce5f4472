pub mod telegram;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

// ─── Outbound ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// Inline keyboard: ordered rows of label+payload buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        self.rows.push(buttons);
        self
    }
}

/// What the dialogue wants shown to the user. The transport decides how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Text {
        text: String,
        keyboard: Option<Keyboard>,
    },
    Photo {
        path: PathBuf,
        caption: String,
        keyboard: Keyboard,
    },
}

// ─── Inbound ────────────────────────────────────────────────────────────────

/// A structured user action received from the chat platform.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// Stable user identity; doubles as the cart id.
    pub user_id: String,
    pub chat_id: String,
    pub first_name: String,
    pub kind: InboundKind,
}

#[derive(Debug, Clone)]
pub enum InboundKind {
    /// Button press carrying an opaque payload. `message_id` is the message
    /// that hosted the keyboard, so re-renders can replace it.
    ButtonPress { payload: String, message_id: i64 },
    /// Free text typed by the user.
    Text { text: String },
}

// ─── Transport trait ────────────────────────────────────────────────────────

/// Chat platform seam — implement for any messenger that can show text,
/// photos and selectable buttons.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Human-readable transport name
    fn name(&self) -> &str;

    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> anyhow::Result<()>;

    async fn send_photo(
        &self,
        chat_id: &str,
        photo: &Path,
        caption: &str,
        keyboard: &Keyboard,
    ) -> anyhow::Result<()>;

    async fn delete_message(&self, chat_id: &str, message_id: i64) -> anyhow::Result<()> {
        let _ = (chat_id, message_id);
        Ok(())
    }

    /// Start receiving user actions (long-running).
    async fn listen(&self, tx: mpsc::Sender<InboundEvent>) -> anyhow::Result<()>;
}
