//! Background fan-out of an operator message to every known user

use std::sync::Arc;
use tokio::sync::oneshot;

use crate::core::throttle::SendThrottle;
use crate::notify::Notifier;
use crate::storage::{get_connection, users, DbPool};

/// Prefix put in front of every broadcast message
pub const BROADCAST_PREFIX: &str = "📣 Message from the operator:\n\n";

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastTally {
    pub sent: usize,
    pub failed: usize,
}

impl BroadcastTally {
    pub fn report(&self) -> String {
        format!("✅ Broadcast finished. Delivered: {}, failed: {}", self.sent, self.failed)
    }
}

/// Sends `text` to each recipient in order, pacing sends through `throttle`.
///
/// A failed send is counted and the loop moves on.
pub async fn run_broadcast(
    recipients: &[i64],
    text: &str,
    notifier: &dyn Notifier,
    throttle: &SendThrottle,
) -> BroadcastTally {
    let message = format!("{}{}", BROADCAST_PREFIX, text);
    let mut tally = BroadcastTally::default();

    for &recipient in recipients {
        throttle.acquire().await;
        match notifier.send(recipient, &message).await {
            Ok(()) => tally.sent += 1,
            Err(e) => {
                log::debug!("Broadcast to {} failed: {}", recipient, e);
                tally.failed += 1;
            }
        }
    }

    tally
}

/// Starts a broadcast on its own task and returns immediately.
///
/// Recipients are read when the task starts. The tally is reported to the
/// operator and also handed back through the returned channel.
pub fn spawn_broadcast(
    pool: DbPool,
    notifier: Arc<dyn Notifier>,
    throttle: SendThrottle,
    operator_id: Option<i64>,
    text: String,
) -> oneshot::Receiver<BroadcastTally> {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let recipients = match get_connection(&pool).and_then(|conn| users::list_user_ids(&conn)) {
            Ok(ids) => ids,
            Err(e) => {
                log::error!("Failed to load broadcast recipients: {}", e);
                Vec::new()
            }
        };

        log::info!("📣 Broadcast started for {} recipients", recipients.len());
        let tally = run_broadcast(&recipients, &text, notifier.as_ref(), &throttle).await;
        log::info!("📣 Broadcast finished: {} sent, {} failed", tally.sent, tally.failed);

        if let Some(operator) = operator_id {
            if let Err(e) = notifier.send(operator, &tally.report()).await {
                log::warn!("Failed to report broadcast tally to operator: {}", e);
            }
        }
        // The caller may not be waiting for the result
        let _ = tx.send(tally);
    });

    rx
}
