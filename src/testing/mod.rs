//! Notifier doubles for exercising flows and the dispatch front without Telegram

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::notify::{DeliveryError, Notifier};

/// Remembers every message in send order. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(i64, String)>>>,
}

impl RecordingNotifier {
    /// Snapshot of `(recipient, text)` pairs delivered so far.
    pub fn sent(&self) -> Vec<(i64, String)> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Messages delivered to one recipient.
    pub fn sent_to(&self, recipient: i64) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| *to == recipient)
            .map(|(_, text)| text)
            .collect()
    }

    fn push(&self, recipient: i64, text: &str) {
        let mut sent = match self.sent.lock() {
            Ok(sent) => sent,
            Err(poisoned) => poisoned.into_inner(),
        };
        sent.push((recipient, text.to_string()));
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: i64, text: &str) -> Result<(), DeliveryError> {
        self.push(recipient, text);
        Ok(())
    }
}

/// Fails for a fixed set of recipients (blocked the bot) and records the rest.
#[derive(Debug, Clone, Default)]
pub struct FailingNotifier {
    unreachable: HashSet<i64>,
    fail_all: bool,
    delivered: RecordingNotifier,
}

impl FailingNotifier {
    pub fn for_recipients(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            unreachable: ids.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Every send fails.
    pub fn always() -> Self {
        Self {
            fail_all: true,
            ..Default::default()
        }
    }

    pub fn delivered(&self) -> &RecordingNotifier {
        &self.delivered
    }
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, recipient: i64, text: &str) -> Result<(), DeliveryError> {
        if self.fail_all || self.unreachable.contains(&recipient) {
            return Err(DeliveryError::Unreachable(recipient));
        }
        self.delivered.push(recipient, text);
        Ok(())
    }
}
