//! The caller-facing note database: store, workers, and full sync wired
//! together.

use crate::domain::{Note, NoteKey, Tag};
use crate::infra::{NoteFiles, TextMirror};
use crate::search::{FilterOptions, FilterResult, filter_notes};
use crate::store::{Event, NoteStore, SaveWorker, StoreResult};
use crate::sync::{
    FullSync, FullSyncReport, Remote, RemoteClient, SyncError, SyncStats, SyncWorker,
};
use crossbeam::channel::Receiver;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default idle time before an edited note is synced.
pub const DEFAULT_SYNC_IDLE_SECS: f64 = 5.0;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Where and how notes are stored.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub db_path: PathBuf,
    pub text_mirror: Option<TextMirror>,
    /// Seconds a note must sit unedited before housekeeping syncs it.
    pub sync_idle_secs: f64,
}

impl StoreOptions {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            text_mirror: None,
            sync_idle_secs: DEFAULT_SYNC_IDLE_SECS,
        }
    }

    fn files(&self) -> NoteFiles {
        let files = NoteFiles::new(&self.db_path);
        match &self.text_mirror {
            Some(mirror) => files.with_text_mirror(&mirror.dir, &mirror.extension),
            None => files,
        }
    }
}

/// What one [`NoteDb::housekeeping`] call did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Housekeeping {
    pub saved: usize,
    pub synced: usize,
    pub sync_failures: usize,
    pub queued_saves: usize,
    pub queued_syncs: usize,
}

/// Snapshot of store and worker state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub notes: usize,
    pub deleted: usize,
    pub needs_save: usize,
    pub needs_sync: usize,
    pub save_pending: usize,
    pub sync_pending: usize,
    pub full_syncing: bool,
}

/// The note database.
///
/// Mutations apply to memory at once. Disk and remote catch up through
/// [`NoteDb::housekeeping`], which the caller invokes on a fixed interval,
/// and [`NoteDb::flush`] before exit.
pub struct NoteDb {
    store: NoteStore,
    events: Receiver<Event>,
    // Dropped before the save worker so their last queued removals land.
    syncer: Option<SyncWorker>,
    full_sync: Option<FullSync>,
    saver: SaveWorker,
    filter: FilterOptions,
    sync_idle_secs: f64,
}

impl NoteDb {
    /// Loads the store and starts its workers. Without a remote client
    /// only local persistence runs.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Read` if the notes on disk cannot be loaded.
    pub fn open(
        options: &StoreOptions,
        filter: FilterOptions,
        client: Option<Arc<dyn RemoteClient>>,
    ) -> StoreResult<Self> {
        let (store, events) = NoteStore::load(&options.files())?;
        let saver = SaveWorker::spawn(store.clone(), options.files());

        let (syncer, full_sync) = match client {
            Some(client) => {
                let remote = Remote::new(client);
                let sync_lock = Arc::new(Mutex::new(()));
                let syncer = SyncWorker::spawn(
                    store.clone(),
                    remote.clone(),
                    Arc::clone(&sync_lock),
                    saver.queue(),
                );
                let full = FullSync::new(store.clone(), remote, sync_lock, saver.queue());
                (Some(syncer), Some(full))
            }
            None => (None, None),
        };

        log::debug!("opened note store at {}", options.db_path.display());
        Ok(Self {
            store,
            events,
            syncer,
            full_sync,
            saver,
            filter,
            sync_idle_secs: options.sync_idle_secs,
        })
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    /// The notification channel.
    pub fn events(&self) -> &Receiver<Event> {
        &self.events
    }

    /// Takes every notification delivered so far.
    pub fn drain_events(&self) -> Vec<Event> {
        self.events.try_iter().collect()
    }

    // ===========================================
    // Note operations
    // ===========================================

    pub fn create_note(&self, title: &str) -> NoteKey {
        self.store.create_note(title)
    }

    pub fn get_note(&self, key: &NoteKey) -> StoreResult<Note> {
        self.store.get_note(key)
    }

    pub fn get_content(&self, key: &NoteKey) -> StoreResult<String> {
        self.store.get_content(key)
    }

    pub fn set_content(&self, key: &NoteKey, content: &str) -> StoreResult<bool> {
        self.store.set_content(key, content)
    }

    pub fn add_tags(&self, key: &NoteKey, tags: &[Tag]) -> StoreResult<bool> {
        self.store.add_tags(key, tags)
    }

    pub fn delete_tag(&self, key: &NoteKey, tag: &Tag) -> StoreResult<()> {
        self.store.delete_tag(key, tag)
    }

    pub fn set_pinned(&self, key: &NoteKey, pinned: bool) -> StoreResult<bool> {
        self.store.set_pinned(key, pinned)
    }

    pub fn delete_note(&self, key: &NoteKey) -> StoreResult<bool> {
        self.store.delete_note(key)
    }

    /// Filters with the options the database was opened with.
    pub fn filter(&self, query: &str) -> FilterResult {
        self.filter_with(query, &self.filter)
    }

    pub fn filter_with(&self, query: &str, options: &FilterOptions) -> FilterResult {
        self.store.with_notes(|notes| filter_notes(notes, query, options))
    }

    // ===========================================
    // Background work
    // ===========================================

    pub fn enqueue_dirty_notes(&self) -> usize {
        self.saver.enqueue_dirty_notes(&self.store)
    }

    /// Queues notes idle for at least `idle_secs` for sync. Does nothing
    /// without a remote.
    pub fn enqueue_needing_sync(&self, idle_secs: f64) -> usize {
        self.syncer
            .as_ref()
            .map_or(0, |s| s.enqueue_needing_sync(&self.store, idle_secs))
    }

    /// Applies finished background work and queues new work. Meant to be
    /// called periodically from the foreground; it never blocks on I/O.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Write` once a disk write has failed. The caller
    /// should stop.
    pub fn housekeeping(&self) -> StoreResult<Housekeeping> {
        let saved = self.saver.drain(&self.store)?;
        let SyncStats { synced, failed } = self.drain_syncs();

        Ok(Housekeeping {
            saved,
            synced,
            sync_failures: failed,
            queued_saves: self.enqueue_dirty_notes(),
            queued_syncs: self.enqueue_needing_sync(self.sync_idle_secs),
        })
    }

    fn drain_syncs(&self) -> SyncStats {
        self.syncer
            .as_ref()
            .map(|s| s.drain(&self.store))
            .unwrap_or_default()
    }

    /// Starts a full sync on a background thread.
    pub fn run_full_sync(
        &self,
    ) -> Result<JoinHandle<Result<FullSyncReport, SyncError>>, SyncError> {
        self.full_sync()?.spawn()
    }

    /// Runs a full sync on the calling thread.
    pub fn full_sync_blocking(&self) -> Result<FullSyncReport, SyncError> {
        self.full_sync()?.run()
    }

    fn full_sync(&self) -> Result<&FullSync, SyncError> {
        self.full_sync.as_ref().ok_or(SyncError::NoRemote)
    }

    pub fn is_full_syncing(&self) -> bool {
        self.full_sync.as_ref().is_some_and(FullSync::is_running)
    }

    pub fn status(&self) -> Status {
        let mut status = self.store.with_notes(|notes| Status {
            notes: notes.len(),
            deleted: notes.values().filter(|n| n.deleted).count(),
            needs_save: notes.values().filter(|n| n.needs_save()).count(),
            needs_sync: notes.values().filter(|n| n.needs_sync_to_remote()).count(),
            ..Status::default()
        });
        status.save_pending = self.saver.pending();
        status.sync_pending = self.syncer.as_ref().map_or(0, SyncWorker::pending);
        status.full_syncing = self.is_full_syncing();
        status
    }

    /// Pushes everything eligible to the remote regardless of idle time,
    /// then writes every dirty note, waiting up to `timeout`.
    ///
    /// Returns false if the workers were still busy at the deadline.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Write` if a disk write failed, including one
    /// already reported by an earlier `housekeeping` call.
    pub fn flush(&self, timeout: Duration) -> StoreResult<bool> {
        self.saver.check()?;
        let deadline = Instant::now() + timeout;

        if !wait_until(deadline, || !self.is_full_syncing()) {
            return Ok(false);
        }
        if let Some(syncer) = &self.syncer {
            syncer.enqueue_needing_sync(&self.store, 0.0);
            if !wait_until(deadline, || syncer.pending() == 0) {
                return Ok(false);
            }
            let stats = syncer.drain(&self.store);
            if stats.failed > 0 {
                log::warn!("{} notes could not be synced before exit", stats.failed);
            }
        }

        loop {
            self.saver.drain(&self.store)?;
            let queued = self.saver.enqueue_dirty_notes(&self.store);
            if queued == 0 && self.saver.pending() == 0 {
                return Ok(true);
            }
            if !wait_until(deadline, || {
                self.saver.pending() == 0 || self.saver.has_failed()
            }) {
                return Ok(false);
            }
        }
    }
}

fn wait_until(deadline: Instant, mut done: impl FnMut() -> bool) -> bool {
    loop {
        if done() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> NoteDb {
        NoteDb::open(&StoreOptions::new(dir.path()), FilterOptions::default(), None).unwrap()
    }

    #[test]
    fn notes_survive_reopen_after_flush() {
        let dir = TempDir::new().unwrap();
        let key = {
            let db = open(&dir);
            let key = db.create_note("Shopping list");
            db.add_tags(&key, &[Tag::new("home").unwrap()]).unwrap();
            assert!(db.flush(Duration::from_secs(5)).unwrap());
            key
        };

        let db = open(&dir);
        let note = db.get_note(&key).unwrap();
        assert_eq!(note.content, "Shopping list");
        assert!(!note.needs_save());
        assert_eq!(note.tags.len(), 1);
    }

    #[test]
    fn status_counts_dirty_notes() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let a = db.create_note("a");
        db.create_note("b");
        db.delete_note(&a).unwrap();

        let status = db.status();
        assert_eq!(status.notes, 2);
        assert_eq!(status.deleted, 1);
        assert_eq!(status.needs_save, 2);
        assert_eq!(status.needs_sync, 2);
        assert!(!status.full_syncing);

        db.flush(Duration::from_secs(5)).unwrap();
        assert_eq!(db.status().needs_save, 0);
    }

    #[test]
    fn full_sync_without_remote_is_an_error() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        assert!(matches!(db.full_sync_blocking(), Err(SyncError::NoRemote)));
        assert_eq!(db.enqueue_needing_sync(0.0), 0);
    }

    #[test]
    fn corrupt_record_fails_open() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        let result = NoteDb::open(&StoreOptions::new(dir.path()), FilterOptions::default(), None);
        assert!(matches!(result, Err(StoreError::Read(_))));
    }

    #[test]
    fn housekeeping_saves_in_the_background() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let key = db.create_note("a");

        let first = db.housekeeping().unwrap();
        assert_eq!(first.queued_saves, 1);
        assert!(wait_until(Instant::now() + Duration::from_secs(5), || {
            db.status().save_pending == 0
        }));
        assert_eq!(db.housekeeping().unwrap().saved, 1);
        assert!(db.get_note(&key).unwrap().savedate > 0.0);
    }

    // =========================================================================
    // Write failures
    // =========================================================================

    #[test]
    fn flush_reports_write_failure_seen_by_housekeeping() {
        let dir = TempDir::new().unwrap();
        let notes_dir = dir.path().join("notes");
        let db = NoteDb::open(&StoreOptions::new(&notes_dir), FilterOptions::default(), None)
            .unwrap();
        std::fs::remove_dir_all(&notes_dir).unwrap();
        db.create_note("lost");

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match db.housekeeping() {
                Err(StoreError::Write(_)) => break,
                Err(other) => panic!("unexpected error: {}", other),
                Ok(_) => {
                    assert!(Instant::now() < deadline, "write failure never reported");
                    thread::sleep(POLL_INTERVAL);
                }
            }
        }

        let started = Instant::now();
        let result = db.flush(Duration::from_secs(5));
        assert!(matches!(result, Err(StoreError::Write(_))));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(matches!(db.housekeeping(), Err(StoreError::Write(_))));
    }
}
