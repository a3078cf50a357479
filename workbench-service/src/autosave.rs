//! Debounced autosave.
//!
//! Each draft has at most one pending commit. Every `schedule` call replaces
//! the pending content and restarts the delay, so a burst of edits commits
//! once, with the latest content, one delay after the last edit. Content equal
//! to the last committed value is never committed again. A timed commit that
//! fails is retried once after another delay.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use common::errors::AppResult;

/// Destination of autosave commits.
#[async_trait]
pub trait AutosaveSink: Send + Sync {
    async fn commit(&self, draft_id: &str, content: &str) -> AppResult<()>;
}

#[derive(Debug, Default)]
struct Slot {
    latest: String,
    committed: Option<String>,
    /// Bumped on every schedule, flush and supersede; stale timers compare
    /// against it and exit.
    generation: u64,
    pending: bool,
}

impl Slot {
    /// Takes the pending content if it differs from the committed value.
    fn take(&mut self) -> Option<String> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        if self.committed.as_deref() == Some(self.latest.as_str()) {
            return None;
        }
        Some(self.latest.clone())
    }
}

struct Inner {
    delay: Duration,
    sink: Arc<dyn AutosaveSink>,
    slots: Mutex<HashMap<String, Slot>>,
}

#[derive(Clone)]
pub struct AutosaveScheduler {
    inner: Arc<Inner>,
}

impl AutosaveScheduler {
    pub fn new(sink: Arc<dyn AutosaveSink>, delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                delay,
                sink,
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Replaces the pending content of `draft_id` and restarts its timer.
    pub async fn schedule(&self, draft_id: &str, content: String) {
        self.apply(draft_id, None, move |_| content).await;
    }

    /// Applies `edit` to the draft's working content and restarts its timer.
    ///
    /// The working content is the pending edit, or `stored` when nothing is
    /// pending. Concurrent edits of one draft are applied one after another.
    /// Returns the new pending content.
    pub async fn schedule_edit<F>(&self, draft_id: &str, stored: &str, edit: F) -> String
    where
        F: FnOnce(&str) -> String,
    {
        self.apply(draft_id, Some(stored), edit).await
    }

    async fn apply<F>(&self, draft_id: &str, stored: Option<&str>, edit: F) -> String
    where
        F: FnOnce(&str) -> String,
    {
        let (content, generation) = {
            let mut slots = self.inner.slots.lock().await;
            let slot = slots.entry(draft_id.to_string()).or_default();
            if let Some(stored) = stored.filter(|_| !slot.pending) {
                slot.latest = stored.to_string();
                slot.committed = Some(stored.to_string());
            }
            slot.latest = edit(&slot.latest);
            slot.pending = true;
            slot.generation += 1;
            (slot.latest.clone(), slot.generation)
        };

        self.inner.arm(draft_id.to_string(), generation, false);
        content
    }

    /// Commits pending content of `draft_id` now. Returns whether a commit
    /// happened.
    pub async fn flush(&self, draft_id: &str) -> AppResult<bool> {
        let taken = {
            let mut slots = self.inner.slots.lock().await;
            match slots.get_mut(draft_id) {
                Some(slot) => {
                    slot.generation += 1;
                    slot.take().map(|content| (content, slot.generation))
                }
                None => None,
            }
        };

        match taken {
            Some((content, generation)) => {
                self.inner.commit(draft_id, content, generation).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Flushes every draft with pending content. Failures are logged and the
    /// first one is returned after all drafts were attempted.
    pub async fn flush_all(&self) -> AppResult<usize> {
        let ids: Vec<String> = {
            let slots = self.inner.slots.lock().await;
            slots
                .iter()
                .filter(|(_, slot)| slot.pending)
                .map(|(id, _)| id.clone())
                .collect()
        };

        let mut committed = 0;
        let mut first_error = None;
        for id in ids {
            match self.flush(&id).await {
                Ok(true) => committed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(draft_id = %id, error = %e, "Autosave flush failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(committed),
        }
    }

    /// Content scheduled for `draft_id` but not yet committed.
    pub async fn pending_content(&self, draft_id: &str) -> Option<String> {
        let slots = self.inner.slots.lock().await;
        slots
            .get(draft_id)
            .filter(|slot| slot.pending)
            .map(|slot| slot.latest.clone())
    }

    /// Drops pending content of `draft_id` in favour of `committed`, which
    /// was written directly.
    pub async fn supersede(&self, draft_id: &str, committed: &str) {
        let mut slots = self.inner.slots.lock().await;
        let slot = slots.entry(draft_id.to_string()).or_default();
        slot.generation += 1;
        slot.pending = false;
        slot.latest = committed.to_string();
        slot.committed = Some(committed.to_string());
    }

    /// Cancels pending content of a deleted draft.
    pub async fn forget(&self, draft_id: &str) {
        self.inner.slots.lock().await.remove(draft_id);
    }
}

impl Inner {
    /// Commits the draft after one delay unless `generation` was superseded.
    /// A failed first attempt arms one retry.
    fn arm(self: &Arc<Self>, draft_id: String, generation: u64, retry: bool) {
        let inner = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(inner.delay).await;
            let Err(e) = inner.fire(&draft_id, generation).await else {
                return;
            };
            if retry {
                tracing::warn!(draft_id = %draft_id, error = %e, "Autosave retry failed, edit kept pending");
            } else {
                tracing::warn!(draft_id = %draft_id, error = %e, "Autosave failed, retrying");
                inner.arm(draft_id, generation, true);
            }
        });
    }

    async fn fire(&self, draft_id: &str, generation: u64) -> AppResult<()> {
        let content = {
            let mut slots = self.slots.lock().await;
            match slots.get_mut(draft_id) {
                Some(slot) if slot.generation == generation => slot.take(),
                _ => None,
            }
        };

        match content {
            Some(content) => self.commit(draft_id, content, generation).await,
            None => Ok(()),
        }
    }

    async fn commit(&self, draft_id: &str, content: String, generation: u64) -> AppResult<()> {
        let result = self.sink.commit(draft_id, &content).await;

        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get_mut(draft_id) {
            match &result {
                Ok(()) => slot.committed = Some(content),
                // Nothing newer arrived; keep the content pending for the next flush.
                Err(_) if slot.generation == generation => slot.pending = true,
                Err(_) => {}
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use common::errors::AppError;
    use tokio::time::Instant;

    #[derive(Default)]
    struct RecordingSink {
        commits: std::sync::Mutex<Vec<(String, String, Instant)>>,
        failing: AtomicBool,
        attempts: AtomicUsize,
    }

    impl RecordingSink {
        fn commits(&self) -> Vec<(String, String)> {
            self.commits
                .lock()
                .unwrap()
                .iter()
                .map(|(id, content, _)| (id.clone(), content.clone()))
                .collect()
        }
    }

    #[async_trait]
    impl AutosaveSink for RecordingSink {
        async fn commit(&self, draft_id: &str, content: &str) -> AppResult<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(AppError::DatabaseQuery("disk full".into()));
            }
            self.commits
                .lock()
                .unwrap()
                .push((draft_id.to_string(), content.to_string(), Instant::now()));
            Ok(())
        }
    }

    fn scheduler() -> (AutosaveScheduler, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (AutosaveScheduler::new(sink.clone(), Duration::from_millis(1000)), sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_commits_once_after_last_edit() {
        let (autosave, sink) = scheduler();
        let start = Instant::now();

        autosave.schedule("d1", "a".into()).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        autosave.schedule("d1", "ab".into()).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        autosave.schedule("d1", "abc".into()).await;

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(sink.commits().is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        let commits = sink.commits.lock().unwrap().clone();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].1, "abc");
        assert!(commits[0].2 - start >= Duration::from_millis(1600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drafts_are_debounced_independently() {
        let (autosave, sink) = scheduler();
        autosave.schedule("d1", "one".into()).await;
        autosave.schedule("d2", "two".into()).await;

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let mut commits = sink.commits();
        commits.sort();
        assert_eq!(
            commits,
            vec![("d1".into(), "one".into()), ("d2".into(), "two".into())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_content_is_not_committed() {
        let (autosave, sink) = scheduler();
        autosave.schedule_edit("d1", "stored", |current| current.to_string()).await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(sink.commits().is_empty());

        autosave.schedule("d1", "edited".into()).await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        autosave.schedule("d1", "edited".into()).await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(sink.commits(), vec![("d1".into(), "edited".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_commits_now_and_cancels_timer() {
        let (autosave, sink) = scheduler();
        autosave.schedule("d1", "x".into()).await;
        assert_eq!(autosave.pending_content("d1").await.as_deref(), Some("x"));

        assert!(autosave.flush("d1").await.unwrap());
        assert!(autosave.pending_content("d1").await.is_none());
        assert!(!autosave.flush("d1").await.unwrap());

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(sink.commits().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_all_commits_every_pending_draft() {
        let (autosave, sink) = scheduler();
        autosave.schedule("d1", "one".into()).await;
        autosave.schedule("d2", "two".into()).await;
        assert_eq!(autosave.flush_all().await.unwrap(), 2);
        assert_eq!(sink.commits().len(), 2);
        assert_eq!(autosave.flush_all().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_commit_stays_pending() {
        let (autosave, sink) = scheduler();
        sink.failing.store(true, Ordering::SeqCst);
        autosave.schedule("d1", "x".into()).await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(autosave.pending_content("d1").await.as_deref(), Some("x"));

        sink.failing.store(false, Ordering::SeqCst);
        assert!(autosave.flush("d1").await.unwrap());
        assert_eq!(sink.commits(), vec![("d1".into(), "x".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_timed_commit_is_retried_once() {
        let (autosave, sink) = scheduler();
        sink.failing.store(true, Ordering::SeqCst);
        autosave.schedule("d1", "x".into()).await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);

        sink.failing.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(sink.commits(), vec![("d1".into(), "x".into())]);
        assert!(autosave.pending_content("d1").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_failure_keeps_edit_pending_without_looping() {
        let (autosave, sink) = scheduler();
        sink.failing.store(true, Ordering::SeqCst);
        autosave.schedule("d1", "x".into()).await;

        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(autosave.pending_content("d1").await.as_deref(), Some("x"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_edits_of_one_draft_all_apply() {
        let sink = Arc::new(RecordingSink::default());
        let autosave = AutosaveScheduler::new(sink.clone(), Duration::from_secs(60));

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let autosave = autosave.clone();
                tokio::spawn(async move {
                    autosave
                        .schedule_edit("d1", "", |current| format!("{}[{}]", current, i))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let pending = autosave.pending_content("d1").await.unwrap();
        for i in 0..16 {
            assert!(pending.contains(&format!("[{}]", i)), "edit {} lost: {}", i, pending);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_forget_and_supersede_cancel_pending_content() {
        let (autosave, sink) = scheduler();
        autosave.schedule("d1", "deleted".into()).await;
        autosave.forget("d1").await;

        autosave.schedule("d2", "typed".into()).await;
        autosave.supersede("d2", "replaced").await;
        assert!(autosave.pending_content("d2").await.is_none());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(sink.commits().is_empty());

        autosave.schedule("d2", "replaced".into()).await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(sink.commits().is_empty());
    }
}
