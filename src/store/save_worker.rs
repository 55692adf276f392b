//! Background disk persistence.
//!
//! The foreground copies dirty notes into tasks; one worker thread writes
//! them in order and reports back. Only the confirmed `savedate` is copied
//! onto the live note, so the store lock is never held during disk I/O.

use crate::domain::{Note, NoteKey, Timestamp, now};
use crate::infra::{FsError, NoteFiles, WriteError};
use crate::store::{Event, NoteStore, StoreError, StoreResult};
use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// A unit of disk work.
#[derive(Debug, Clone)]
pub enum SaveTask {
    /// Write this copy of the note.
    Persist { key: NoteKey, note: Note },
    /// Delete the note's files. The note, if given, locates its text mirror.
    Remove { key: NoteKey, note: Option<Note> },
}

/// A completed unit of disk work.
#[derive(Debug)]
pub enum SaveReport {
    Saved {
        key: NoteKey,
        savedate: Timestamp,
        /// Dates of the copy that was written.
        modifydate: Timestamp,
        syncdate: Timestamp,
    },
    /// The note no longer needed saving, or left the store.
    Skipped { key: NoteKey },
    Removed { key: NoteKey },
    /// Writing failed; the worker has stopped.
    Failed {
        key: NoteKey,
        error: Arc<WriteError>,
    },
}

/// The first write failure, shared by the worker and every queue handle.
#[derive(Default)]
struct Failure {
    set: AtomicBool,
    error: Mutex<Option<Arc<WriteError>>>,
}

impl Failure {
    fn record(&self, error: Arc<WriteError>) {
        let mut slot = self.error.lock().unwrap_or_else(|e| e.into_inner());
        slot.get_or_insert(error);
        self.set.store(true, Ordering::SeqCst);
    }

    fn is_set(&self) -> bool {
        self.set.load(Ordering::SeqCst)
    }

    fn error(&self) -> Option<Arc<WriteError>> {
        self.error.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Cloneable handle for queueing disk work.
#[derive(Clone)]
pub struct SaveQueue {
    tasks: Sender<SaveTask>,
    pending: Arc<AtomicUsize>,
    failure: Arc<Failure>,
}

impl SaveQueue {
    /// Queues a write of `note` under `key`.
    pub fn persist(&self, key: NoteKey, note: Note) {
        self.push(SaveTask::Persist { key, note });
    }

    /// Queues removal of a note's files.
    pub fn remove(&self, key: NoteKey, note: Option<Note>) {
        self.push(SaveTask::Remove { key, note });
    }

    fn push(&self, task: SaveTask) {
        // The worker has exited; the failure is reported by every drain.
        if self.failure.is_set() {
            return;
        }
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tasks.send(task).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Tasks queued or in progress.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

/// The disk persistence worker.
///
/// States: idle while its queue is empty, writing while it has a task, and
/// failed after a write error, at which point the thread exits and
/// [`SaveWorker::drain`] reports `StoreError::Write`.
pub struct SaveWorker {
    queue: SaveQueue,
    results: Receiver<SaveReport>,
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SaveWorker {
    /// Starts the worker thread.
    pub fn spawn(store: NoteStore, files: NoteFiles) -> Self {
        let (task_tx, task_rx) = channel::unbounded();
        let (result_tx, result_rx) = channel::unbounded();
        let (shutdown_tx, shutdown_rx) = channel::bounded(0);
        let pending = Arc::new(AtomicUsize::new(0));
        let failure = Arc::new(Failure::default());
        let dir = files.dir().to_path_buf();

        let spawned = {
            let pending = Arc::clone(&pending);
            let failure = Arc::clone(&failure);
            let channels = Channels {
                tasks: task_rx,
                shutdown: shutdown_rx,
                results: result_tx,
            };
            thread::Builder::new()
                .name("note-save".into())
                .spawn(move || run(store, files, channels, pending, failure))
        };
        let handle = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("could not start save worker thread: {}", e);
                failure.record(Arc::new(FsError::Io {
                    path: dir,
                    source: e,
                }));
                None
            }
        };

        Self {
            queue: SaveQueue {
                tasks: task_tx,
                pending,
                failure,
            },
            results: result_rx,
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    /// A handle other components use to queue disk work.
    pub fn queue(&self) -> SaveQueue {
        self.queue.clone()
    }

    /// Tasks queued or in progress.
    pub fn pending(&self) -> usize {
        self.queue.pending()
    }

    /// True once a write has failed.
    pub fn has_failed(&self) -> bool {
        self.queue.failure.is_set()
    }

    /// Returns the recorded write failure, if any.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Write` on every call after a write has failed.
    pub fn check(&self) -> StoreResult<()> {
        match self.queue.failure.error() {
            Some(error) => Err(StoreError::Write(error)),
            None => Ok(()),
        }
    }

    /// Queues a copy of every note that is dirty for disk.
    ///
    /// Tasks are queued while the map is locked, so they are ordered
    /// against re-keying and removal done by the sync workers.
    /// Nothing is queued once a write has failed.
    pub fn enqueue_dirty_notes(&self, store: &NoteStore) -> usize {
        if self.has_failed() {
            return 0;
        }
        let notes = store.lock();
        let mut count = 0;
        for (key, note) in notes.iter().filter(|(_, n)| n.needs_save()) {
            self.queue.persist(key.clone(), note.clone());
            count += 1;
        }
        if count > 0 {
            log::debug!("queued {} notes for saving", count);
        }
        count
    }

    /// Applies completed writes to the store and emits `NoteSaved` events.
    ///
    /// Returns the number of notes saved.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Write` on this and every later call once the
    /// worker has hit a write failure. Writes confirmed before the failure
    /// are still applied.
    pub fn drain(&self, store: &NoteStore) -> StoreResult<usize> {
        let mut saved = 0;
        while let Ok(report) = self.results.try_recv() {
            match report {
                SaveReport::Saved {
                    key,
                    savedate,
                    modifydate,
                    syncdate,
                } => {
                    let confirmed = {
                        let mut notes = store.lock();
                        match notes.get_mut(&key) {
                            // A note changed after its copy was taken stays
                            // dirty and is written again next pass.
                            Some(live)
                                if live.modifydate <= modifydate
                                    && live.syncdate <= syncdate =>
                            {
                                live.savedate = live.savedate.max(savedate);
                                true
                            }
                            _ => false,
                        }
                    };
                    if confirmed {
                        saved += 1;
                        store.emit(Event::NoteSaved { key });
                    }
                }
                SaveReport::Skipped { .. } | SaveReport::Removed { .. } => {}
                SaveReport::Failed { key, error } => {
                    log::error!("saving note {} failed: {}", key, error);
                }
            }
        }
        self.check()?;
        Ok(saved)
    }
}

impl Drop for SaveWorker {
    fn drop(&mut self) {
        // Queue handles may outlive the worker, so shutdown is signalled
        // separately. Tasks already queued are still written.
        drop(self.shutdown.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct Channels {
    tasks: Receiver<SaveTask>,
    shutdown: Receiver<()>,
    results: Sender<SaveReport>,
}

fn run(
    store: NoteStore,
    files: NoteFiles,
    channels: Channels,
    pending: Arc<AtomicUsize>,
    failure: Arc<Failure>,
) {
    // Returns false once the worker must stop.
    let handle = |task: SaveTask| -> bool {
        let report = perform(&store, &files, task);
        let fatal = if let SaveReport::Failed { error, .. } = &report {
            failure.record(Arc::clone(error));
            true
        } else {
            false
        };
        let _ = channels.results.send(report);
        pending.fetch_sub(1, Ordering::SeqCst);
        if fatal {
            log::error!("save worker stopping after write failure");
        }
        !fatal
    };

    loop {
        select! {
            recv(channels.tasks) -> task => match task {
                Ok(task) => {
                    if !handle(task) {
                        return;
                    }
                }
                Err(_) => return,
            },
            recv(channels.shutdown) -> _ => {
                while let Ok(task) = channels.tasks.try_recv() {
                    if !handle(task) {
                        return;
                    }
                }
                return;
            }
        }
    }
}

fn perform(store: &NoteStore, files: &NoteFiles, task: SaveTask) -> SaveReport {
    match task {
        SaveTask::Persist { key, mut note } => {
            let still_dirty = store.lock().get(&key).is_some_and(Note::needs_save);
            if !still_dirty {
                return SaveReport::Skipped { key };
            }
            note.savedate = now();
            match files.write(&key, &note) {
                Ok(()) => {
                    log::debug!("saved note {}", key);
                    SaveReport::Saved {
                        key,
                        savedate: note.savedate,
                        modifydate: note.modifydate,
                        syncdate: note.syncdate,
                    }
                }
                Err(error) => SaveReport::Failed {
                    key,
                    error: Arc::new(error),
                },
            }
        }
        SaveTask::Remove { key, note } => match files.remove(&key, note.as_ref()) {
            Ok(()) => {
                log::debug!("removed files of note {}", key);
                SaveReport::Removed { key }
            }
            Err(error) => SaveReport::Failed {
                key,
                error: Arc::new(error),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn wait_idle(worker: &SaveWorker) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while worker.pending() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(worker.pending(), 0, "save worker did not go idle");
    }

    fn setup() -> (TempDir, NoteStore, Receiver<Event>, NoteFiles, SaveWorker) {
        let dir = TempDir::new().unwrap();
        let files = NoteFiles::new(dir.path());
        let (store, events) = NoteStore::new();
        let worker = SaveWorker::spawn(store.clone(), files.clone());
        (dir, store, events, files, worker)
    }

    #[test]
    fn persist_sets_savedate_and_keeps_content() {
        let (_dir, store, events, files, worker) = setup();
        let key = store.create_note("Shopping list");
        let _ = events.try_recv();

        assert_eq!(worker.enqueue_dirty_notes(&store), 1);
        wait_idle(&worker);
        assert_eq!(worker.drain(&store).unwrap(), 1);

        let note = store.get_note(&key).unwrap();
        assert!(note.savedate > 0.0);
        assert!(!note.needs_save());
        assert_eq!(note.content, "Shopping list");
        assert_eq!(events.try_recv().unwrap(), Event::NoteSaved { key: key.clone() });

        let on_disk = files.load_all().unwrap();
        assert_eq!(on_disk[0].1.content, "Shopping list");
        assert_eq!(on_disk[0].1.savedate, note.savedate);
    }

    #[test]
    fn clean_notes_are_not_queued() {
        let (_dir, store, _events, _files, worker) = setup();
        store.create_note("a");
        worker.enqueue_dirty_notes(&store);
        wait_idle(&worker);
        worker.drain(&store).unwrap();

        assert_eq!(worker.enqueue_dirty_notes(&store), 0);
    }

    #[test]
    fn edit_after_copy_keeps_note_dirty() {
        let (_dir, store, _events, _files, worker) = setup();
        let key = store.create_note("a");
        worker.enqueue_dirty_notes(&store);
        wait_idle(&worker);

        // Edit lands after the write but before the result is applied.
        store.lock().get_mut(&key).unwrap().modifydate = now() + 1_000.0;
        assert_eq!(worker.drain(&store).unwrap(), 0);
        assert!(store.get_note(&key).unwrap().needs_save());
    }

    #[test]
    fn remove_deletes_record() {
        let (dir, store, _events, files, worker) = setup();
        let key = store.create_note("a");
        worker.enqueue_dirty_notes(&store);
        wait_idle(&worker);

        worker.queue().remove(key.clone(), None);
        wait_idle(&worker);
        worker.drain(&store).unwrap();

        assert!(!files.record_path(&key).exists());
        assert!(dir.path().read_dir().unwrap().next().is_none());
    }

    #[test]
    fn write_failure_stops_worker() {
        let dir = TempDir::new().unwrap();
        let files = NoteFiles::new(dir.path().join("missing"));
        let (store, _events) = NoteStore::new();
        let worker = SaveWorker::spawn(store.clone(), files);
        store.create_note("a");

        worker.enqueue_dirty_notes(&store);
        wait_idle(&worker);

        assert!(matches!(worker.drain(&store), Err(StoreError::Write(_))));
        assert!(worker.has_failed());

        // Nothing more is queued and the failure keeps being reported.
        assert_eq!(worker.enqueue_dirty_notes(&store), 0);
        assert_eq!(worker.pending(), 0);
        assert!(matches!(worker.drain(&store), Err(StoreError::Write(_))));
        assert!(matches!(worker.check(), Err(StoreError::Write(_))));
    }
}
