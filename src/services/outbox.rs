//! Fire-and-forget delivery of activity rows and notifications.
//!
//! Handlers enqueue and return immediately. A single worker task performs the
//! inserts, so callers must not assume the rows exist by the time their HTTP
//! response is sent. Failures are logged and dropped; they never reach the
//! request that triggered them.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::DbPool;
use crate::models::notification::Recipients;
use crate::models::{NewActivity, NotificationDraft};

use super::activity::{retention_cutoff, PruneThrottle};

#[derive(Debug)]
pub enum OutboxMessage {
    Activities(Vec<NewActivity>),
    Notification(NotificationDraft),
    /// Acknowledged once every earlier message has been handled.
    Flush(oneshot::Sender<()>),
}

/// Handle used by request handlers. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Outbox {
    sender: mpsc::UnboundedSender<OutboxMessage>,
}

impl Outbox {
    /// Spawn the worker on the current runtime.
    pub fn start(pool: DbPool) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = OutboxWorker {
            pool,
            throttle: Arc::new(PruneThrottle::new()),
        };
        tokio::spawn(worker.run(receiver));
        Self { sender }
    }

    /// An outbox without a worker; messages go to the returned receiver.
    pub fn detached() -> (Self, mpsc::UnboundedReceiver<OutboxMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn record_activity(&self, entries: Vec<NewActivity>) {
        if entries.is_empty() {
            return;
        }
        self.send(OutboxMessage::Activities(entries));
    }

    pub fn record(&self, entry: NewActivity) {
        self.send(OutboxMessage::Activities(vec![entry]));
    }

    pub fn notify(&self, draft: NotificationDraft) {
        self.send(OutboxMessage::Notification(draft));
    }

    /// Wait until everything queued so far has been written.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        self.send(OutboxMessage::Flush(tx));
        let _ = rx.await;
    }

    fn send(&self, message: OutboxMessage) {
        if self.sender.send(message).is_err() {
            warn!(target: "outbox", "Outbox worker is gone, dropping message");
        }
    }
}

struct OutboxWorker {
    pool: DbPool,
    throttle: Arc<PruneThrottle>,
}

impl OutboxWorker {
    async fn run(self, mut receiver: mpsc::UnboundedReceiver<OutboxMessage>) {
        info!(target: "outbox", "Outbox worker started");
        while let Some(message) = receiver.recv().await {
            match message {
                OutboxMessage::Activities(entries) => {
                    self.write_activities(&entries).await;
                    self.maybe_prune().await;
                }
                OutboxMessage::Notification(draft) => self.deliver(&draft).await,
                OutboxMessage::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }
        info!(target: "outbox", "Outbox worker stopped");
    }

    async fn write_activities(&self, entries: &[NewActivity]) {
        match self.pool.insert_activities(entries).await {
            Ok(count) => debug!(target: "outbox", count, "Activity rows written"),
            Err(e) => warn!(target: "outbox", error = %e, "Failed to write activity rows"),
        }
    }

    async fn maybe_prune(&self) {
        let now = Utc::now();
        if !self.throttle.try_begin(now) {
            return;
        }
        match self.pool.prune_activities(retention_cutoff(now)).await {
            Ok(0) => {}
            Ok(deleted) => info!(target: "outbox", deleted, "Pruned old activity rows"),
            Err(e) => warn!(target: "outbox", error = %e, "Activity prune failed"),
        }
    }

    async fn deliver(&self, draft: &NotificationDraft) {
        let recipients: Vec<Uuid> = match &draft.recipients {
            Recipients::Users(ids) => ids.clone(),
            Recipients::Administrators => match self.pool.admin_ids().await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(target: "outbox", error = %e, "Failed to resolve administrators");
                    return;
                }
            },
        };
        if recipients.is_empty() {
            return;
        }

        if let Err(e) = self.pool.insert_notifications(draft, &recipients).await {
            warn!(
                target: "outbox",
                kind = draft.kind.as_str(),
                error = %e,
                "Failed to write notifications"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityAction, EntityKind, EntityRef};

    #[tokio::test]
    async fn test_record_activity_skips_empty_batches() {
        let (outbox, mut rx) = Outbox::detached();
        outbox.record_activity(Vec::new());

        let entry = NewActivity::new(
            ActivityAction::Create,
            EntityRef::new(EntityKind::Tag, Uuid::nil()),
            Uuid::nil(),
            "bug",
            "creada",
        );
        outbox.record(entry);

        match rx.recv().await {
            Some(OutboxMessage::Activities(rows)) => assert_eq!(rows.len(), 1),
            other => panic!("unexpected message: {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_after_worker_gone_does_not_panic() {
        let (outbox, rx) = Outbox::detached();
        drop(rx);
        outbox.record(NewActivity::new(
            ActivityAction::Delete,
            EntityRef::new(EntityKind::Task, Uuid::nil()),
            Uuid::nil(),
            "x",
            "eliminada",
        ));
        outbox.flush().await;
    }
}
