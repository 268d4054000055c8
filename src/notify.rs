//! Outbound best-effort messages.
//!
//! Stores and flows never talk to the chat transport directly: anything that
//! has to reach a user outside the current reply goes through [`Notifier`],
//! and only after the change it describes has been committed. A failed
//! delivery is logged and counted, never turned into an [`AppError`].
//!
//! [`AppError`]: crate::core::AppError

use async_trait::async_trait;
use thiserror::Error;

/// Why a notification did not arrive.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The recipient blocked the bot or never started a chat with it
    #[error("recipient {0} is unreachable")]
    Unreachable(i64),

    /// The transport failed (network, rate limit, API error)
    #[error("transport error: {0}")]
    Transport(String),
}

/// Capability to deliver a plain text message to a chat.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: i64, text: &str) -> Result<(), DeliveryError>;
}

/// Sends and swallows the failure. Returns whether the message went out.
pub async fn send_best_effort(notifier: &dyn Notifier, recipient: i64, text: &str) -> bool {
    match notifier.send(recipient, text).await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Notification to {} not delivered: {}", recipient, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingNotifier, RecordingNotifier};

    #[tokio::test]
    async fn test_best_effort_reports_outcome() {
        let recorder = RecordingNotifier::default();
        assert!(send_best_effort(&recorder, 5, "hi").await);
        assert_eq!(recorder.sent(), vec![(5, "hi".to_string())]);

        let failing = FailingNotifier::for_recipients([5]);
        assert!(!send_best_effort(&failing, 5, "hi").await);
        assert!(send_best_effort(&failing, 6, "hi").await);
    }
}
