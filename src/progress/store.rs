//! Progress persistence
//!
//! Writes land in an in-memory cache first, are mirrored to the local
//! key-value store for offline use, and are pushed to the remote record store
//! without the caller waiting. Remote failures are logged and dropped; they
//! never touch the local copy.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc;

use super::model::{LessonProgress, clamp_percent, now_millis, sanitize_seconds};
use crate::config::Thresholds;
use crate::storage::{
    Filter, KeyValueStore, OrderBy, Record, RecordStore, StoreError, load_json, save_json,
};

/// Remote table holding progress rows
pub const PROGRESS_TABLE: &str = "lesson_progress";

/// Conflict target for progress upserts
pub const PROGRESS_CONFLICT: [&str; 2] = ["user_key", "lesson_id"];

type UserProgress = BTreeMap<String, LessonProgress>;

/// Owner of every [`LessonProgress`] record
pub struct ProgressStore {
    thresholds: Thresholds,
    local: Arc<dyn KeyValueStore>,
    remote: Option<Arc<dyn RecordStore>>,
    cache: Mutex<HashMap<String, UserProgress>>,
    /// Feeds the background worker that pushes records in write order
    outbox: Mutex<Option<mpsc::UnboundedSender<LessonProgress>>>,
}

impl ProgressStore {
    /// Create a store backed by local state only
    pub fn new(thresholds: Thresholds, local: Arc<dyn KeyValueStore>) -> Self {
        Self {
            thresholds,
            local,
            remote: None,
            cache: Mutex::new(HashMap::new()),
            outbox: Mutex::new(None),
        }
    }

    /// Mirror writes to a remote record store
    pub fn with_remote(mut self, remote: Arc<dyn RecordStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    fn cache_key(user_key: &str) -> String {
        format!("progress:{}", user_key)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, UserProgress>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the user's saved progress into the cache on first use
    fn user_entries<'a>(
        &self,
        cache: &'a mut HashMap<String, UserProgress>,
        user_key: &str,
    ) -> &'a mut UserProgress {
        cache.entry(user_key.to_string()).or_insert_with(|| {
            load_json(self.local.as_ref(), &Self::cache_key(user_key)).unwrap_or_default()
        })
    }

    fn persist_local(&self, user_key: &str, entries: &UserProgress) {
        if let Err(e) = save_json(self.local.as_ref(), &Self::cache_key(user_key), entries) {
            tracing::warn!("Failed to save local progress for {}: {}", user_key, e);
        }
    }

    fn insert(&self, record: LessonProgress) {
        let mut cache = self.lock();
        let entries = self.user_entries(&mut cache, &record.user_key);
        entries.insert(record.lesson_id.clone(), record.clone());
        self.persist_local(&record.user_key, entries);
    }

    /// Upsert the watch state of a lesson; the last write for a key wins
    pub fn write(
        &self,
        user_key: &str,
        lesson_id: &str,
        percent: f64,
        position: f64,
        watch_time: f64,
    ) -> LessonProgress {
        let progress_percent = clamp_percent(percent);
        let record = LessonProgress {
            user_key: user_key.to_string(),
            lesson_id: lesson_id.to_string(),
            progress_percent,
            last_position: sanitize_seconds(position),
            watch_time: sanitize_seconds(watch_time),
            completed: self.thresholds.is_complete(progress_percent),
            updated_at: now_millis(),
        };

        tracing::debug!(
            "Progress {}/{}: {:.1}% at {:.1}s (completed: {})",
            user_key,
            lesson_id,
            record.progress_percent,
            record.last_position,
            record.completed
        );

        self.insert(record.clone());
        record
    }

    /// Record a lesson as fully watched
    pub fn mark_completed(
        &self,
        user_key: &str,
        lesson_id: &str,
        position: f64,
        watch_time: f64,
    ) -> LessonProgress {
        self.write(user_key, lesson_id, 100.0, position, watch_time)
    }

    /// Saved progress for a lesson; `None` means the lesson was never started
    pub fn read(&self, user_key: &str, lesson_id: &str) -> Option<LessonProgress> {
        let mut cache = self.lock();
        self.user_entries(&mut cache, user_key).get(lesson_id).cloned()
    }

    /// Percent watched, or 0 for lessons never started
    pub fn completion_rate(&self, user_key: &str, lesson_id: &str) -> f64 {
        self.read(user_key, lesson_id).map_or(0.0, |p| p.progress_percent)
    }

    /// Whether a lesson has been completed
    pub fn is_completed(&self, user_key: &str, lesson_id: &str) -> bool {
        self.read(user_key, lesson_id).is_some_and(|p| p.completed)
    }

    /// Every saved record for a user, ordered by lesson id
    pub fn lessons_for_user(&self, user_key: &str) -> Vec<LessonProgress> {
        let mut cache = self.lock();
        self.user_entries(&mut cache, user_key).values().cloned().collect()
    }

    /// Read progress at lesson start, preferring the newest of local and remote.
    ///
    /// Remote failures fall back to the local copy.
    pub async fn fetch(&self, user_key: &str, lesson_id: &str) -> Option<LessonProgress> {
        let local = self.read(user_key, lesson_id);

        let Some(remote) = self.remote.as_ref() else {
            return local;
        };

        let remote_record = match Self::fetch_remote(remote.as_ref(), user_key, lesson_id).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Could not load remote progress for lesson {}: {}", lesson_id, e);
                return local;
            }
        };

        match (local, remote_record) {
            (Some(local), Some(remote)) if remote.is_newer_than(&local) => {
                self.insert(remote.clone());
                Some(remote)
            }
            (None, Some(remote)) => {
                self.insert(remote.clone());
                Some(remote)
            }
            (local, _) => local,
        }
    }

    async fn fetch_remote(
        remote: &dyn RecordStore,
        user_key: &str,
        lesson_id: &str,
    ) -> Result<Option<LessonProgress>, StoreError> {
        let filters = [Filter::eq("user_key", user_key), Filter::eq("lesson_id", lesson_id)];
        let rows = remote.select(PROGRESS_TABLE, &filters, Some(&OrderBy::desc("updated_at"))).await?;

        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(Value::Object(row))?)),
            None => Ok(None),
        }
    }

    /// Push a record to the remote store, logging and dropping failures
    pub async fn push_remote(&self, record: &LessonProgress) {
        if let Some(remote) = self.remote.as_ref() {
            Self::upsert_remote(remote.as_ref(), record).await;
        }
    }

    async fn upsert_remote(remote: &dyn RecordStore, record: &LessonProgress) {
        let row: Record = match serde_json::to_value(record) {
            Ok(Value::Object(row)) => row,
            Ok(_) => return,
            Err(e) => {
                tracing::warn!("Could not encode progress for lesson {}: {}", record.lesson_id, e);
                return;
            }
        };

        if let Err(e) = remote.upsert(PROGRESS_TABLE, row, &PROGRESS_CONFLICT).await {
            tracing::warn!("Dropping remote progress write for lesson {}: {}", record.lesson_id, e);
        }
    }

    /// Queue a record for the remote store without waiting.
    ///
    /// Records go through a single background worker, so the remote sees them
    /// in the order they were written. Outside a tokio runtime the record
    /// stays local only.
    pub fn spawn_push(&self, record: LessonProgress) {
        let Some(remote) = self.remote.as_ref() else {
            return;
        };

        let mut outbox = self.outbox.lock().unwrap_or_else(PoisonError::into_inner);
        let record = match outbox.as_ref() {
            Some(sender) => match sender.send(record) {
                Ok(()) => return,
                // The worker's runtime is gone; start a new one below
                Err(mpsc::error::SendError(record)) => record,
            },
            None => record,
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No runtime available, keeping lesson {} local", record.lesson_id);
            return;
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        handle.spawn(Self::push_worker(Arc::clone(remote), receiver));
        if sender.send(record).is_ok() {
            *outbox = Some(sender);
        }
    }

    async fn push_worker(
        remote: Arc<dyn RecordStore>,
        mut receiver: mpsc::UnboundedReceiver<LessonProgress>,
    ) {
        while let Some(record) = receiver.recv().await {
            Self::upsert_remote(remote.as_ref(), &record).await;
        }
        tracing::debug!("Remote progress worker stopped");
    }
}
