use std::sync::Mutex;

use vigil_core::{DeliveryCredentials, DeliveryError, NotificationSink};

/// Accepts every message and keeps it for inspection.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

impl NotificationSink for RecordingSink {
    fn deliver(
        &self,
        _credentials: &DeliveryCredentials,
        message: &str,
    ) -> Result<(), DeliveryError> {
        let mut messages = self.messages.lock().map_err(|_| DeliveryError::Network {
            message: "recording sink poisoned".to_string(),
        })?;
        messages.push(message.to_string());
        Ok(())
    }
}
