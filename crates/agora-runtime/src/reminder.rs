//! Reminder Scheduler
//!
//! A scheduled reminder is recorded in a [`ReminderStore`] before its
//! acknowledgment is returned, then armed as a detached tokio task that
//! sleeps for the delay and signals the owner actor. The record is removed
//! once the signal is delivered or the retry budget is spent. After a
//! process restart, [`ReminderScheduler::resume_pending`] re-arms every
//! stored reminder for whatever remains of its delay.

use agora_core::error::StoreResult;
use agora_core::message::ReminderRequest;
use agora_core::persist;
use agora_mesh::Messenger;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Fixed acknowledgment contributed to the turn's tool result
pub const REMINDER_ACKNOWLEDGMENT: &str = "Reminder set.";

/// A reminder waiting to fire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReminder {
    pub id: Uuid,
    pub request: ReminderRequest,
    pub created_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}

impl PendingReminder {
    pub fn new(request: ReminderRequest) -> Self {
        let created_at = Utc::now();
        let due_at = chrono::Duration::from_std(Duration::from_secs(request.delay_seconds))
            .ok()
            .and_then(|delay| created_at.checked_add_signed(delay))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            id: Uuid::new_v4(),
            request,
            created_at,
            due_at,
        }
    }

    /// Time left until the reminder is due, zero if overdue
    pub fn remaining(&self) -> Duration {
        (self.due_at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }
}

#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn save(&self, reminder: &PendingReminder) -> StoreResult<()>;

    async fn remove(&self, id: Uuid) -> StoreResult<()>;

    async fn list(&self) -> StoreResult<Vec<PendingReminder>>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryReminderStore {
    reminders: Arc<DashMap<Uuid, PendingReminder>>,
}

impl InMemoryReminderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReminderStore for InMemoryReminderStore {
    async fn save(&self, reminder: &PendingReminder) -> StoreResult<()> {
        self.reminders.insert(reminder.id, reminder.clone());
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> StoreResult<()> {
        self.reminders.remove(&id);
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<PendingReminder>> {
        let mut reminders: Vec<_> = self.reminders.iter().map(|r| r.value().clone()).collect();
        reminders.sort_by_key(|r| r.due_at);
        Ok(reminders)
    }
}

/// One JSON file per reminder under `<dir>/<id>.json`
#[derive(Debug, Clone)]
pub struct FileReminderStore {
    directory: PathBuf,
}

impl FileReminderStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn path(&self, id: Uuid) -> PathBuf {
        self.directory.join(format!("{id}.json"))
    }
}

#[async_trait]
impl ReminderStore for FileReminderStore {
    async fn save(&self, reminder: &PendingReminder) -> StoreResult<()> {
        persist::write_json_atomic(&self.path(reminder.id), reminder).await
    }

    async fn remove(&self, id: Uuid) -> StoreResult<()> {
        persist::remove_file(&self.path(id)).await
    }

    async fn list(&self) -> StoreResult<Vec<PendingReminder>> {
        let mut reminders = Vec::new();
        for path in persist::list_json_files(&self.directory).await? {
            match persist::read_json::<PendingReminder>(&path).await {
                Ok(Some(reminder)) => reminders.push(reminder),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable reminder"),
            }
        }
        reminders.sort_by_key(|r| r.due_at);
        Ok(reminders)
    }
}

/// Detached handle to an armed reminder.
///
/// Dropping the handle does not cancel the reminder.
#[derive(Debug)]
pub struct ReminderHandle {
    pub id: Uuid,
    pub due_at: DateTime<Utc>,
    task: JoinHandle<()>,
}

impl ReminderHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[derive(Clone)]
pub struct ReminderScheduler {
    messenger: Messenger,
    store: Arc<dyn ReminderStore>,
    armed: Arc<DashMap<Uuid, AbortHandle>>,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl ReminderScheduler {
    pub fn new(
        messenger: Messenger,
        store: Arc<dyn ReminderStore>,
        max_attempts: u32,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            messenger,
            store,
            armed: Arc::new(DashMap::new()),
            max_attempts: max_attempts.max(1),
            retry_backoff,
        }
    }

    /// Record the reminder durably, then arm it.
    ///
    /// Returns as soon as the record is stored; the delay elapses in a
    /// detached task.
    pub async fn schedule(&self, request: ReminderRequest) -> StoreResult<ReminderHandle> {
        let delay = Duration::from_secs(request.delay_seconds);
        let pending = PendingReminder::new(request);
        self.store.save(&pending).await?;
        info!(
            reminder = %pending.id,
            owner = %pending.request.owner,
            delay_secs = pending.request.delay_seconds,
            "Reminder scheduled"
        );
        Ok(self.arm(pending, delay))
    }

    /// Re-arm every stored reminder, e.g. after a host restart
    pub async fn resume_pending(&self) -> StoreResult<Vec<ReminderHandle>> {
        let pending = self.store.list().await?;
        if !pending.is_empty() {
            info!(count = pending.len(), "Resuming pending reminders");
        }
        Ok(pending
            .into_iter()
            .map(|reminder| {
                let remaining = reminder.remaining();
                self.arm(reminder, remaining)
            })
            .collect())
    }

    fn arm(&self, pending: PendingReminder, delay: Duration) -> ReminderHandle {
        let id = pending.id;
        let due_at = pending.due_at;
        let scheduler = self.clone();
        // the task must not clear its entry before that entry exists
        let (registered_tx, registered_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _ = registered_rx.await;
            tokio::time::sleep(delay).await;
            scheduler.fire(pending).await;
            scheduler.armed.remove(&id);
        });
        self.armed.insert(id, task.abort_handle());
        let _ = registered_tx.send(());
        ReminderHandle { id, due_at, task }
    }

    /// Number of reminders currently armed in this process
    pub fn armed(&self) -> usize {
        self.armed.len()
    }

    /// Disarm every reminder without touching the store.
    ///
    /// Stored records survive and are picked up by the next
    /// [`resume_pending`](Self::resume_pending).
    pub fn disarm_all(&self) -> usize {
        let ids: Vec<Uuid> = self.armed.iter().map(|entry| *entry.key()).collect();
        for id in &ids {
            if let Some((_, task)) = self.armed.remove(id) {
                task.abort();
            }
        }
        if !ids.is_empty() {
            debug!(count = ids.len(), "Reminders disarmed");
        }
        ids.len()
    }

    async fn fire(&self, pending: PendingReminder) {
        let owner = &pending.request.owner;
        let signal = pending.request.to_signal();
        for attempt in 1..=self.max_attempts {
            match self.messenger.signal(owner, signal.clone()).await {
                Ok(()) => {
                    info!(reminder = %pending.id, owner = %owner, attempt, "Reminder delivered");
                    break;
                }
                Err(e) if attempt < self.max_attempts => {
                    warn!(reminder = %pending.id, owner = %owner, attempt, error = %e, "Reminder delivery failed, retrying");
                    tokio::time::sleep(self.retry_backoff).await;
                }
                Err(e) => {
                    error!(reminder = %pending.id, owner = %owner, attempt, error = %e, "Reminder dropped after final attempt");
                }
            }
        }

        if let Err(e) = self.store.remove(pending.id).await {
            error!(reminder = %pending.id, error = %e, "Failed to remove fired reminder");
        } else {
            debug!(reminder = %pending.id, "Reminder record removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::host::ActorStatus;
    use agora_core::message::InboundMessage;
    use agora_mesh::{ActorDirectory, DirectoryConfig};
    use agora_testing::MockHost;
    use agora_testing::fixtures::identity;

    fn request(delay_seconds: u64) -> ReminderRequest {
        ReminderRequest {
            delay_seconds,
            body: "follow up with HDFCBank".into(),
            owner: identity("Consumer", "Anil", "r1"),
        }
    }

    fn scheduler(host: &MockHost, store: Arc<dyn ReminderStore>, attempts: u32) -> ReminderScheduler {
        let directory = ActorDirectory::new(
            Arc::new(host.clone()),
            DirectoryConfig {
                poll_interval: Duration::from_secs(1),
                max_polls: 2,
            },
        );
        ReminderScheduler::new(Messenger::new(directory), store, attempts, Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_returns_immediately_and_fires_after_delay() {
        let owner = identity("Consumer", "Anil", "r1").handle();
        let host = MockHost::new().with_statuses(&owner, vec![ActorStatus::Running]);
        let store = Arc::new(InMemoryReminderStore::new());
        let scheduler = scheduler(&host, store.clone(), 3);

        let start = tokio::time::Instant::now();
        let handle = scheduler.schedule(request(3600)).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(store.list().await.unwrap().len(), 1);

        tokio::time::sleep(Duration::from_secs(3599)).await;
        assert!(host.signals().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(
            host.signals_to(&owner),
            vec![InboundMessage::Reminder {
                message: "message scheduled 3600 seconds ago: follow up with HDFCBank".into()
            }]
        );
        assert!(handle.is_finished());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn undeliverable_reminder_is_dropped_after_bounded_attempts() {
        let owner = identity("Consumer", "Anil", "r1").handle();
        let host = MockHost::new()
            .with_statuses(&owner, vec![ActorStatus::Running])
            .with_failing_signals();
        let store = Arc::new(InMemoryReminderStore::new());
        let handle = scheduler(&host, store.clone(), 2).schedule(request(5)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(handle.is_finished());
        // one initial lookup per attempt, each seeing Running
        assert_eq!(host.lookup_count(&owner), 2);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stored_reminders_are_rearmed_on_resume() {
        let owner = identity("Consumer", "Anil", "r1").handle();
        let host = MockHost::new().with_statuses(&owner, vec![ActorStatus::Running]);
        let store = Arc::new(InMemoryReminderStore::new());
        store.save(&PendingReminder::new(request(0))).await.unwrap();

        let handles = scheduler(&host, store.clone(), 1).resume_pending().await.unwrap();
        assert_eq!(handles.len(), 1);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(host.signals_to(&owner).len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overdue_reminders_leave_no_armed_entries_behind() {
        let owner = identity("Consumer", "Anil", "r1").handle();
        let host = MockHost::new().with_statuses(&owner, vec![ActorStatus::Running]);
        let store = Arc::new(InMemoryReminderStore::new());
        for _ in 0..32 {
            store.save(&PendingReminder::new(request(0))).await.unwrap();
        }
        let scheduler = scheduler(&host, store.clone(), 1);

        let handles = scheduler.resume_pending().await.unwrap();
        assert_eq!(handles.len(), 32);
        for handle in handles {
            handle.task.await.unwrap();
        }

        assert_eq!(scheduler.armed(), 0);
        assert_eq!(host.signals_to(&owner).len(), 32);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn disarmed_reminders_stay_stored() {
        let owner = identity("Consumer", "Anil", "r1").handle();
        let host = MockHost::new().with_statuses(&owner, vec![ActorStatus::Running]);
        let store = Arc::new(InMemoryReminderStore::new());
        let scheduler = scheduler(&host, store.clone(), 1);
        scheduler.schedule(request(60)).await.unwrap();
        assert_eq!(scheduler.armed(), 1);

        assert_eq!(scheduler.disarm_all(), 1);
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert!(host.signals().is_empty());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn file_store_lists_saved_reminders() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileReminderStore::new(dir.path());
        let reminder = PendingReminder::new(request(60));

        store.save(&reminder).await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec![reminder.clone()]);

        store.remove(reminder.id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }
}
