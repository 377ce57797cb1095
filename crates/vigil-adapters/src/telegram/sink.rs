use std::time::Duration;

use tracing::debug;
use ureq::{Agent, AgentBuilder};

use vigil_core::{DeliveryConfig, DeliveryCredentials, DeliveryError, NotificationSink};

/// Sends report messages through the Telegram Bot API `sendMessage` method.
pub struct TelegramSink {
    agent: Agent,
    api_base_url: String,
}

impl TelegramSink {
    pub fn new(
        api_base_url: impl Into<String>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Self {
        let agent = AgentBuilder::new()
            .timeout_connect(connect_timeout)
            .timeout_read(read_timeout)
            .build();

        Self {
            agent,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self::new(
            config.api_base_url.clone(),
            Duration::from_secs(config.connect_timeout_seconds),
            Duration::from_secs(config.read_timeout_seconds),
        )
    }

    fn send_message_url(&self, token: &str) -> String {
        format!("{}/bot{}/sendMessage", self.api_base_url, token)
    }

    fn handle_error(&self, error: ureq::Error) -> DeliveryError {
        match error {
            ureq::Error::Status(code, _) => DeliveryError::Rejected { code },
            ureq::Error::Transport(transport) => DeliveryError::Network {
                message: transport.to_string(),
            },
        }
    }
}

impl NotificationSink for TelegramSink {
    fn deliver(
        &self,
        credentials: &DeliveryCredentials,
        message: &str,
    ) -> Result<(), DeliveryError> {
        if !credentials.is_complete() {
            return Err(DeliveryError::NotConfigured);
        }

        let response = self
            .agent
            .post(&self.send_message_url(&credentials.token))
            .send_form(&[("chat_id", credentials.chat_id.as_str()), ("text", message)])
            .map_err(|error| self.handle_error(error))?;

        match response.status() {
            200 => {
                debug!(chars = message.chars().count(), "telegram message sent");
                Ok(())
            }
            code => Err(DeliveryError::Rejected { code }),
        }
    }
}
