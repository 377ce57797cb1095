use std::sync::atomic::{AtomicUsize, Ordering};

use vigil_core::{DeliveryCredentials, DeliveryError, NotificationSink};

pub struct FailingSink {
    error: DeliveryError,
    attempts: AtomicUsize,
}

impl FailingSink {
    pub fn network_error() -> Self {
        Self::with_error(DeliveryError::Network {
            message: "connection refused".to_string(),
        })
    }

    pub fn rejected(code: u16) -> Self {
        Self::with_error(DeliveryError::Rejected { code })
    }

    pub fn with_error(error: DeliveryError) -> Self {
        Self {
            error,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl NotificationSink for FailingSink {
    fn deliver(
        &self,
        _credentials: &DeliveryCredentials,
        _message: &str,
    ) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}
