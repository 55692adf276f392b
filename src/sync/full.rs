//! Full bidirectional reconciliation between the store and the remote index.

use crate::domain::{Note, NoteKey, RemoteNote, Timestamp, now};
use crate::store::{Event, NoteStore, SaveQueue};
use crate::sync::update::{UpdateError, apply_push, update_note_to_remote};
use crate::sync::{Remote, RemoteError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// Why a full sync pass was aborted.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("a full sync is already running")]
    AlreadyRunning,

    #[error("authentication failed: {0}")]
    Auth(#[source] RemoteError),

    #[error("pushing note {key} failed: {source}")]
    Push {
        key: NoteKey,
        #[source]
        source: UpdateError,
    },

    #[error("fetching the remote index failed: {0}")]
    Index(#[source] RemoteError),

    #[error("no remote service configured")]
    NoRemote,

    #[error("could not start full sync thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Totals from a completed pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FullSyncReport {
    /// Local changes pushed in phase 1.
    pub pushed: usize,
    /// Local notes dropped because the remote no longer lists them.
    pub deleted: usize,
    /// Remote notes fetched and merged or inserted.
    pub pulled: usize,
    /// Per-note pull failures.
    pub errors: usize,
}

/// Runs full sync passes. Cloning yields a handle to the same running flag.
#[derive(Clone)]
pub struct FullSync {
    store: NoteStore,
    remote: Remote,
    sync_lock: Arc<Mutex<()>>,
    saves: SaveQueue,
    running: Arc<AtomicBool>,
}

/// Holds the running flag for the length of a pass.
struct RunningGuard(Arc<AtomicBool>);

impl RunningGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, SyncError> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| SyncError::AlreadyRunning)?;
        Ok(Self(Arc::clone(flag)))
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl FullSync {
    pub fn new(
        store: NoteStore,
        remote: Remote,
        sync_lock: Arc<Mutex<()>>,
        saves: SaveQueue,
    ) -> Self {
        Self {
            store,
            remote,
            sync_lock,
            saves,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True while a pass is in progress.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs a pass on the current thread.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::AlreadyRunning` if another pass holds the flag,
    /// or the error that aborted this pass.
    pub fn run(&self) -> Result<FullSyncReport, SyncError> {
        let guard = RunningGuard::acquire(&self.running)?;
        self.run_guarded(guard)
    }

    /// Runs a pass on its own thread. The running flag is set before this
    /// returns.
    pub fn spawn(&self) -> Result<JoinHandle<Result<FullSyncReport, SyncError>>, SyncError> {
        let guard = RunningGuard::acquire(&self.running)?;
        let this = self.clone();
        thread::Builder::new()
            .name("note-full-sync".into())
            .spawn(move || this.run_guarded(guard))
            .map_err(SyncError::Spawn)
    }

    fn run_guarded(&self, _guard: RunningGuard) -> Result<FullSyncReport, SyncError> {
        let _syncing = self.sync_lock.lock().unwrap_or_else(|e| e.into_inner());
        log::info!("full sync started");

        match self.phases() {
            Ok(report) => {
                log::info!(
                    "full sync done: {} pushed, {} deleted, {} pulled, {} errors",
                    report.pushed,
                    report.deleted,
                    report.pulled,
                    report.errors
                );
                self.store.emit(Event::SyncCompleted {
                    errors: report.errors,
                });
                Ok(report)
            }
            Err(error) => {
                log::error!("full sync aborted: {}", error);
                self.store.emit(Event::SyncFailed {
                    error: error.to_string(),
                });
                Err(error)
            }
        }
    }

    fn phases(&self) -> Result<FullSyncReport, SyncError> {
        let mut report = FullSyncReport::default();

        self.remote.authenticate().map_err(SyncError::Auth)?;

        report.pushed = self.push_local_changes()?;
        self.progress(format!("pushed {} local changes", report.pushed));

        let index = self.fetch_index()?;
        self.progress(format!("fetched remote index ({} notes)", index.len()));

        let removed = self.delete_local_only(&index);
        report.deleted = removed.len();
        self.progress(format!("removed {} notes no longer on the server", report.deleted));

        let (pulled, errors) = self.pull_remote_changes(&index);
        report.pulled = pulled;
        report.errors = errors;
        self.progress(format!("pulled {} remote changes", pulled));

        for (key, note) in removed {
            self.saves.remove(key, Some(note));
        }
        self.progress("cleaned up local files".to_string());

        Ok(report)
    }

    fn progress(&self, message: String) {
        log::debug!("full sync: {}", message);
        self.store.emit(Event::SyncProgress { message });
    }

    /// Phase 1. Any failure aborts the pass.
    fn push_local_changes(&self) -> Result<usize, SyncError> {
        let keys: Vec<NoteKey> = self.store.with_notes(|notes| {
            notes
                .iter()
                .filter(|(_, n)| n.needs_sync_to_remote())
                .map(|(k, _)| k.clone())
                .collect()
        });

        let mut pushed = 0;
        for key in keys {
            let Some(snapshot) = self.store.lock().get(&key).cloned() else {
                continue;
            };
            let result = update_note_to_remote(&self.remote, &snapshot)
                .map_err(|source| SyncError::Push {
                    key: key.clone(),
                    source,
                })?;

            let mut notes = self.store.lock();
            let Some(applied) = apply_push(&mut notes, &key, &snapshot, &result, now()) else {
                continue;
            };
            // New record first, then the old one goes.
            if let Some(live) = notes.get(&applied.key) {
                self.saves.persist(applied.key.clone(), live.clone());
            }
            if let Some(old) = &applied.rekeyed_from {
                self.saves.remove(old.clone(), Some(snapshot));
            }
            drop(notes);

            if let Some(old) = applied.rekeyed_from {
                self.store.emit(Event::NoteRekeyed {
                    old,
                    new: applied.key.clone(),
                });
            }
            self.store.emit(Event::NoteSynced {
                key: applied.key,
                updated: applied.updated,
            });
            pushed += 1;
        }
        Ok(pushed)
    }

    /// Phase 2. Entries the remote marks deleted are left out.
    fn fetch_index(&self) -> Result<Vec<RemoteNote>, SyncError> {
        let mut index = self.remote.list_notes(false).map_err(SyncError::Index)?;
        index.retain(|entry| !entry.deleted);
        Ok(index)
    }

    /// Phase 3. Returns the removed notes so their files can go in phase 5.
    fn delete_local_only(&self, index: &[RemoteNote]) -> Vec<(NoteKey, Note)> {
        let listed: HashSet<&NoteKey> = index.iter().map(|e| &e.key).collect();
        let mut notes = self.store.lock();

        // A note never synced was created after the index was taken.
        let doomed: Vec<NoteKey> = notes
            .iter()
            .filter(|(k, n)| !listed.contains(k) && n.syncdate != 0.0)
            .map(|(k, _)| k.clone())
            .collect();

        doomed
            .into_iter()
            .filter_map(|key| {
                let note = notes.remove(&key)?;
                log::info!("note {} is gone from the server; removing it", key);
                Some((key, note))
            })
            .collect()
    }

    /// Phase 4. Returns (pulled, errors); failures are per note.
    fn pull_remote_changes(&self, index: &[RemoteNote]) -> (usize, usize) {
        let mut pulled = 0;
        let mut errors = 0;

        for entry in index {
            // The local modifydate the decision was made against.
            let seen: Option<Timestamp> = match self.store.lock().get(&entry.key) {
                Some(local) if local.modifydate >= entry.modifydate => continue,
                Some(local) => Some(local.modifydate),
                None => None,
            };

            let fetched = if entry.content.is_some() {
                entry.clone()
            } else {
                match self.remote.get_note(&entry.key) {
                    Ok(note) => note,
                    Err(e) => {
                        log::warn!("fetching note {} failed: {}", entry.key, e);
                        errors += 1;
                        continue;
                    }
                }
            };

            let mut notes = self.store.lock();
            let at = now();
            let merged = match seen {
                Some(seen) => {
                    let Some(live) = notes.get_mut(&entry.key) else {
                        continue;
                    };
                    if live.modifydate > seen {
                        log::debug!("note {} was edited during sync; keeping it", entry.key);
                        continue;
                    }
                    live.merge_remote(&fetched);
                    live.syncdate = at;
                    live.clone()
                }
                None => {
                    if notes.contains_key(&entry.key) {
                        continue;
                    }
                    let mut note = Note::from_remote(&fetched);
                    note.syncdate = at;
                    notes.insert(entry.key.clone(), note.clone());
                    note
                }
            };
            self.saves.persist(entry.key.clone(), merged);
            drop(notes);

            self.store.emit(Event::NoteSynced {
                key: entry.key.clone(),
                updated: true,
            });
            pulled += 1;
        }

        (pulled, errors)
    }
}
