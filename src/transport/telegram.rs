use super::{ChatTransport, InboundEvent, InboundKind, Keyboard};
use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

/// Telegram Bot API transport — long-polls `getUpdates`, sends text and
/// photo messages with inline keyboards.
pub struct TelegramTransport {
    bot_token: String,
    client: reqwest::Client,
}

impl TelegramTransport {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }

    async fn call(&self, method: &str, body: &serde_json::Value) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
            anyhow::bail!("Telegram {method} failed ({status}): {err}");
        }

        Ok(())
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> anyhow::Result<()> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = keyboard_markup(keyboard);
        }
        self.call("sendMessage", &body).await
    }

    async fn send_photo(
        &self,
        chat_id: &str,
        photo: &Path,
        caption: &str,
        keyboard: &Keyboard,
    ) -> anyhow::Result<()> {
        let bytes = tokio::fs::read(photo).await?;
        let filename = photo
            .file_name()
            .map_or_else(|| "photo".to_string(), |n| n.to_string_lossy().to_string());

        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("reply_markup", keyboard_markup(keyboard).to_string())
            .part(
                "photo",
                reqwest::multipart::Part::bytes(bytes).file_name(filename),
            );

        let resp = self
            .client
            .post(self.api_url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
            anyhow::bail!("Telegram sendPhoto failed ({status}): {err}");
        }

        Ok(())
    }

    async fn delete_message(&self, chat_id: &str, message_id: i64) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
        });
        self.call("deleteMessage", &body).await
    }

    async fn listen(&self, tx: mpsc::Sender<InboundEvent>) -> anyhow::Result<()> {
        let mut offset: i64 = 0;

        tracing::info!("Telegram transport listening for updates...");

        loop {
            let body = serde_json::json!({
                "offset": offset,
                "timeout": 30,
                "allowed_updates": ["message", "callback_query"]
            });

            let resp = match self
                .client
                .post(self.api_url("getUpdates"))
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("Telegram poll error: {e}");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }
            };

            let data: serde_json::Value = match resp.json().await {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!("Telegram parse error: {e}");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }
            };

            if let Some(results) = data.get("result").and_then(serde_json::Value::as_array) {
                for update in results {
                    if let Some(uid) = update.get("update_id").and_then(serde_json::Value::as_i64) {
                        offset = uid + 1;
                    }

                    // Button presses must be acknowledged or the client
                    // keeps its spinner going.
                    if let Some(callback_id) = update
                        .get("callback_query")
                        .and_then(|q| q.get("id"))
                        .and_then(serde_json::Value::as_str)
                    {
                        let ack = serde_json::json!({ "callback_query_id": callback_id });
                        if let Err(e) = self.call("answerCallbackQuery", &ack).await {
                            tracing::warn!("Telegram callback ack failed: {e}");
                        }
                    }

                    let Some(event) = parse_update(update) else {
                        continue;
                    };

                    if tx.send(event).await.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }
}

fn keyboard_markup(keyboard: &Keyboard) -> serde_json::Value {
    let rows: Vec<Vec<serde_json::Value>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| serde_json::json!({ "text": b.label, "callback_data": b.payload }))
                .collect()
        })
        .collect();
    serde_json::json!({ "inline_keyboard": rows })
}

/// Map one `getUpdates` entry to an [`InboundEvent`]. Updates that carry
/// neither text nor a button payload yield `None`.
fn parse_update(update: &serde_json::Value) -> Option<InboundEvent> {
    if let Some(query) = update.get("callback_query") {
        let payload = query.get("data").and_then(serde_json::Value::as_str)?;
        let from = query.get("from")?;
        let user_id = from.get("id").and_then(serde_json::Value::as_i64)?;
        let first_name = from
            .get("first_name")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("");
        let message = query.get("message")?;
        let chat_id = message
            .get("chat")
            .and_then(|c| c.get("id"))
            .and_then(serde_json::Value::as_i64)?;
        let message_id = message
            .get("message_id")
            .and_then(serde_json::Value::as_i64)?;

        return Some(InboundEvent {
            user_id: user_id.to_string(),
            chat_id: chat_id.to_string(),
            first_name: first_name.to_string(),
            kind: InboundKind::ButtonPress {
                payload: payload.to_string(),
                message_id,
            },
        });
    }

    let message = update.get("message")?;
    let text = message.get("text").and_then(serde_json::Value::as_str)?;
    let from = message.get("from")?;
    let user_id = from.get("id").and_then(serde_json::Value::as_i64)?;
    let first_name = from
        .get("first_name")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("");
    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(serde_json::Value::as_i64)?;

    Some(InboundEvent {
        user_id: user_id.to_string(),
        chat_id: chat_id.to_string(),
        first_name: first_name.to_string(),
        kind: InboundKind::Text {
            text: text.to_string(),
        },
    })
}
