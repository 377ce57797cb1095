use vigil_core::{CredentialSource, DeliveryCredentials};

/// Fixed credentials, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(Option<DeliveryCredentials>);

impl StaticCredentials {
    pub fn configured() -> Self {
        Self(Some(DeliveryCredentials {
            token: "123456:test-token".to_string(),
            chat_id: "42".to_string(),
        }))
    }

    pub fn missing() -> Self {
        Self(None)
    }
}

impl CredentialSource for StaticCredentials {
    fn resolve(&self) -> Option<DeliveryCredentials> {
        self.0.clone().filter(DeliveryCredentials::is_complete)
    }
}
