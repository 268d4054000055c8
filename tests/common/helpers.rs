//! Test helpers for building senders and waiting on background work

#![allow(dead_code)]

use std::time::Duration;

use storebot::testing::RecordingNotifier;
use storebot::Sender;

use super::fixtures::{CUSTOMER, OPERATOR};

pub fn operator() -> Sender {
    Sender {
        id: OPERATOR,
        username: Some("boss".to_string()),
        first_name: Some("Boss".to_string()),
    }
}

pub fn customer() -> Sender {
    Sender {
        id: CUSTOMER,
        username: Some("ann".to_string()),
        first_name: Some("Ann".to_string()),
    }
}

/// Polls the recorder until `recipient` got a message containing `needle`.
pub async fn wait_for_message(notifier: &RecordingNotifier, recipient: i64, needle: &str) -> Option<String> {
    for _ in 0..200 {
        if let Some(text) = notifier
            .sent_to(recipient)
            .into_iter()
            .find(|text| text.contains(needle))
        {
            return Some(text);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    None
}
