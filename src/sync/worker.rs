//! Incremental sync: one background thread pushing individual notes.

use crate::domain::{NoteKey, now};
use crate::store::{Event, NoteStore, SaveQueue};
use crate::sync::update::{UpdateError, apply_push, update_note_to_remote};
use crate::sync::Remote;
use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Outcome of syncing one queued key.
#[derive(Debug)]
pub enum SyncReport {
    Synced {
        key: NoteKey,
        rekeyed_from: Option<NoteKey>,
        updated: bool,
    },
    /// The note was gone or no longer needed syncing.
    Skipped { key: NoteKey },
    Failed { key: NoteKey, error: UpdateError },
}

/// Totals from one [`SyncWorker::drain`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    pub synced: usize,
    pub failed: usize,
}

/// The incremental sync worker.
///
/// Each task holds the shared sync lock while it runs, so a full sync
/// never interleaves with it.
pub struct SyncWorker {
    tasks: Sender<NoteKey>,
    results: Receiver<SyncReport>,
    pending: Arc<AtomicUsize>,
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SyncWorker {
    pub fn spawn(
        store: NoteStore,
        remote: Remote,
        sync_lock: Arc<Mutex<()>>,
        saves: SaveQueue,
    ) -> Self {
        let (task_tx, task_rx) = channel::unbounded::<NoteKey>();
        let (result_tx, result_rx) = channel::unbounded();
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(0);
        let pending = Arc::new(AtomicUsize::new(0));

        let handle = {
            let pending = Arc::clone(&pending);
            thread::Builder::new()
                .name("note-sync".into())
                .spawn(move || {
                    let process = |key: NoteKey| {
                        let report = {
                            let _syncing = sync_lock.lock().unwrap_or_else(|e| e.into_inner());
                            sync_one(&store, &remote, &saves, key)
                        };
                        let _ = result_tx.send(report);
                        pending.fetch_sub(1, Ordering::SeqCst);
                    };
                    loop {
                        select! {
                            recv(task_rx) -> key => match key {
                                Ok(key) => process(key),
                                Err(_) => return,
                            },
                            // Shutdown abandons queued keys; they still
                            // qualify for sync at the next start.
                            recv(shutdown_rx) -> _ => return,
                        }
                    }
                })
                .ok()
        };
        if handle.is_none() {
            log::error!("could not start sync worker thread");
        }

        Self {
            tasks: task_tx,
            results: result_rx,
            pending,
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    /// Keys queued or in flight.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Queues every note that needs syncing and has been left alone for
    /// at least `idle_secs`. Pass zero to queue everything eligible.
    pub fn enqueue_needing_sync(&self, store: &NoteStore, idle_secs: f64) -> usize {
        let at = now();
        let notes = store.lock();
        let mut count = 0;
        for (key, _) in notes
            .iter()
            .filter(|(_, n)| n.needs_sync_to_remote() && at - n.modifydate >= idle_secs)
        {
            self.pending.fetch_add(1, Ordering::SeqCst);
            if self.tasks.send(key.clone()).is_err() {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                break;
            }
            count += 1;
        }
        if count > 0 {
            log::debug!("queued {} notes for sync", count);
        }
        count
    }

    /// Emits events for finished tasks and returns the totals.
    pub fn drain(&self, store: &NoteStore) -> SyncStats {
        let mut stats = SyncStats::default();
        while let Ok(report) = self.results.try_recv() {
            match report {
                SyncReport::Synced {
                    key,
                    rekeyed_from,
                    updated,
                } => {
                    stats.synced += 1;
                    if let Some(old) = rekeyed_from {
                        store.emit(Event::NoteRekeyed {
                            old,
                            new: key.clone(),
                        });
                    }
                    store.emit(Event::NoteSynced { key, updated });
                }
                SyncReport::Skipped { .. } => {}
                SyncReport::Failed { key, error } => {
                    stats.failed += 1;
                    log::warn!("sync of note {} failed: {}", key, error);
                }
            }
        }
        stats
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        drop(self.shutdown.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Pushes the note under `key` if it still needs it and writes the result
/// back. The caller holds the sync lock.
pub(crate) fn sync_one(store: &NoteStore, remote: &Remote, saves: &SaveQueue, key: NoteKey) -> SyncReport {
    let snapshot = match store.lock().get(&key) {
        Some(note) if note.needs_sync_to_remote() => note.clone(),
        _ => return SyncReport::Skipped { key },
    };

    let pushed = match update_note_to_remote(remote, &snapshot) {
        Ok(pushed) => pushed,
        Err(error) => return SyncReport::Failed { key, error },
    };

    let mut notes = store.lock();
    let Some(applied) = apply_push(&mut notes, &key, &snapshot, &pushed, now()) else {
        return SyncReport::Skipped { key };
    };
    if let Some(old) = &applied.rekeyed_from {
        // The record under the new key is written before the old one is
        // removed, so the note is on disk under some key at every point.
        if let Some(live) = notes.get(&applied.key) {
            saves.persist(applied.key.clone(), live.clone());
        }
        saves.remove(old.clone(), Some(snapshot));
    }
    log::debug!("synced note {}", applied.key);
    SyncReport::Synced {
        key: applied.key,
        rekeyed_from: applied.rekeyed_from,
        updated: applied.updated,
    }
}
