use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("sink rejected message with status {code}")]
    Rejected { code: u16 },

    #[error("delivery credentials are not configured")]
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryCredentials {
    pub token: String,
    pub chat_id: String,
}

impl DeliveryCredentials {
    pub fn is_complete(&self) -> bool {
        !self.token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }
}

pub trait CredentialSource: Send + Sync {
    /// `None` when credentials are absent or empty.
    fn resolve(&self) -> Option<DeliveryCredentials>;
}

/// Remote endpoint receiving rendered report messages.
pub trait NotificationSink: Send + Sync {
    fn deliver(
        &self,
        credentials: &DeliveryCredentials,
        message: &str,
    ) -> Result<(), DeliveryError>;
}
