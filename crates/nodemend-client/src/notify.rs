//! Alert delivery.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Boxed future returned by [`Notifier::notify`].
pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>>;

/// Delivers one alert message.
pub trait Notifier: Send + Sync {
    fn notify<'a>(&'a self, message: &'a str) -> NotifyFuture<'a>;
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("alert rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Sends alerts through the Telegram Bot API `sendMessage` method.
pub struct TelegramNotifier {
    client: reqwest::Client,
    base_url: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: &str, chat_id: &str, timeout: Duration) -> Result<Self, NotifyError> {
        Self::with_base_url(TELEGRAM_API, token, chat_id, timeout)
    }

    /// Point at a different API host (for testing).
    pub fn with_base_url(
        base_url: &str,
        token: &str,
        chat_id: &str,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }
}

impl Notifier for TelegramNotifier {
    fn notify<'a>(&'a self, message: &'a str) -> NotifyFuture<'a> {
        Box::pin(async move {
            let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
            let payload = SendMessage {
                chat_id: &self.chat_id,
                text: message,
            };

            // Error strings from reqwest include the URL, which carries the token.
            let response = match self.client.post(&url).json(&payload).send().await {
                Ok(response) => response,
                Err(e) => return Err(NotifyError::Transport(e.without_url().to_string())),
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(NotifyError::Rejected {
                    status: status.as_u16(),
                    body,
                });
            }
            info!("alert sent");
            Ok(())
        })
    }
}

/// Writes alerts to the log when no delivery channel is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify<'a>(&'a self, message: &'a str) -> NotifyFuture<'a> {
        Box::pin(async move {
            debug!("no alert channel configured, logging alert");
            info!("alert:\n{message}");
            Ok(())
        })
    }
}
