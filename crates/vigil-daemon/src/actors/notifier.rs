use notify_rust::{Notification, Urgency};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub enum NotifierMessage {
    Alarm { title: String, body: String },
}

/// Raises operational alarms (storage failures) as desktop notifications.
#[derive(Clone)]
pub struct NotifierHandle {
    sender: mpsc::Sender<NotifierMessage>,
}

impl NotifierHandle {
    pub fn send_alarm(&self, title: impl Into<String>, body: impl Into<String>) {
        let sender = self.sender.clone();
        let message = NotifierMessage::Alarm {
            title: title.into(),
            body: body.into(),
        };
        tokio::spawn(async move {
            if let Err(error) = sender.send(message).await {
                error!(%error, "failed to send alarm message to notifier");
            }
        });
    }

    /// A handle whose alarms land in the returned receiver instead of the desktop.
    #[cfg(test)]
    pub fn capturing() -> (Self, mpsc::Receiver<NotifierMessage>) {
        let (sender, receiver) = mpsc::channel(32);
        (Self { sender }, receiver)
    }
}

pub struct NotifierActor {
    receiver: mpsc::Receiver<NotifierMessage>,
    enabled: bool,
}

impl NotifierActor {
    pub fn new(enabled: bool) -> (Self, NotifierHandle) {
        let (sender, receiver) = mpsc::channel(32);

        let actor = Self { receiver, enabled };
        let handle = NotifierHandle { sender };

        (actor, handle)
    }

    pub async fn run(mut self) {
        info!(enabled = self.enabled, "notifier actor started");

        while let Some(message) = self.receiver.recv().await {
            match message {
                NotifierMessage::Alarm { title, body } => self.show_alarm(&title, &body),
            }
        }

        debug!("notifier actor stopped");
    }

    fn show_alarm(&self, title: &str, body: &str) {
        if !self.enabled {
            debug!(title, "alarm notifications disabled");
            return;
        }

        let mut notification = Notification::new();
        notification
            .summary(title)
            .body(body)
            .urgency(Urgency::Critical)
            .appname("Vigil");

        match notification.show() {
            Ok(_) => debug!(title, "alarm notification sent"),
            Err(error) => warn!(%error, title, "failed to show alarm notification"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn handle_can_send_alarms() {
        let (actor, handle) = NotifierActor::new(false);
        let actor_task = tokio::spawn(actor.run());

        handle.send_alarm("Vigil - Storage failure", "report could not be saved");
        tokio::time::sleep(Duration::from_millis(50)).await;

        drop(handle);
        tokio::time::timeout(Duration::from_secs(1), actor_task)
            .await
            .unwrap()
            .unwrap();
    }
}
