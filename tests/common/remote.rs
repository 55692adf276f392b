//! In-memory remote note service with failure injection.

use crossbeam::channel::{self, Receiver, Sender};
use notesync::domain::{Note, NoteKey, RemoteNote};
use notesync::sync::{RemoteClient, RemoteError, RemoteResult};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// A remote service held in memory.
///
/// Keys are assigned as `r1`, `r2`, ... on first upsert. Every stored
/// entry keeps its content; listings strip it unless `full` is asked for.
#[derive(Default)]
pub struct MemoryRemote {
    state: Mutex<State>,
    upsert_gate: Mutex<Option<GateEnds>>,
    get_gate: Mutex<Option<GateEnds>>,
}

#[derive(Default)]
struct State {
    notes: BTreeMap<NoteKey, RemoteNote>,
    next_id: u64,
    fail_auth: bool,
    fail_list: bool,
    fail_upserts: usize,
    lose_acks: usize,
    fail_gets: HashSet<NoteKey>,
    upserts: usize,
    gets: usize,
}

struct GateEnds {
    entered: Sender<()>,
    release: Receiver<()>,
}

/// Held by a test while one kind of remote call is paused.
pub struct CallGate {
    entered: Receiver<()>,
    release: Sender<()>,
}

impl CallGate {
    fn open(slot: &Mutex<Option<GateEnds>>) -> Self {
        let (entered_tx, entered_rx) = channel::unbounded();
        let (release_tx, release_rx) = channel::unbounded();
        *slot.lock().unwrap() = Some(GateEnds {
            entered: entered_tx,
            release: release_rx,
        });
        Self {
            entered: entered_rx,
            release: release_tx,
        }
    }

    /// Blocks until a call is waiting at the gate.
    pub fn wait_entered(&self) {
        self.entered
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("no call reached the gate");
    }

    /// Lets one waiting call continue.
    pub fn release(&self) {
        self.release.send(()).expect("gate closed");
    }
}

fn pass_gate(slot: &Mutex<Option<GateEnds>>) {
    let gate = slot.lock().unwrap();
    if let Some(ends) = gate.as_ref() {
        let _ = ends.entered.send(());
        let _ = ends.release.recv();
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    // ===========================================
    // Server-side manipulation
    // ===========================================

    /// Stores a note as if another device had created it.
    pub fn insert(&self, key: &str, content: &str, modifydate: f64) -> NoteKey {
        let key: NoteKey = key.parse().unwrap();
        let mut note = RemoteNote::from_note(key.clone(), &Note::new(content, modifydate));
        note.version = Some(1);
        self.state().notes.insert(key.clone(), note);
        key
    }

    /// Changes a stored note as if another device had edited it.
    pub fn edit(&self, key: &NoteKey, content: &str, modifydate: f64) {
        let mut state = self.state();
        let note = state.notes.get_mut(key).expect("no such remote note");
        note.content = Some(content.to_string());
        note.modifydate = modifydate;
        note.version = Some(note.version.unwrap_or(0) + 1);
    }

    /// Drops a stored note entirely.
    pub fn purge(&self, key: &NoteKey) {
        self.state().notes.remove(key);
    }

    pub fn get(&self, key: &NoteKey) -> Option<RemoteNote> {
        self.state().notes.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.state().notes.len()
    }

    pub fn upsert_count(&self) -> usize {
        self.state().upserts
    }

    pub fn get_count(&self) -> usize {
        self.state().gets
    }

    // ===========================================
    // Failure injection
    // ===========================================

    pub fn fail_auth(&self, fail: bool) {
        self.state().fail_auth = fail;
    }

    pub fn fail_list(&self, fail: bool) {
        self.state().fail_list = fail;
    }

    /// The next `n` upserts fail without storing anything.
    pub fn fail_upserts(&self, n: usize) {
        self.state().fail_upserts = n;
    }

    /// The next `n` upserts store the note but report an error.
    pub fn lose_acks(&self, n: usize) {
        self.state().lose_acks = n;
    }

    pub fn fail_get(&self, key: &NoteKey) {
        self.state().fail_gets.insert(key.clone());
    }

    /// Pauses every upsert until the returned gate releases it.
    pub fn pause_upserts(&self) -> CallGate {
        CallGate::open(&self.upsert_gate)
    }

    /// Pauses every single-note fetch until the returned gate releases it.
    pub fn pause_gets(&self) -> CallGate {
        CallGate::open(&self.get_gate)
    }
}

impl RemoteClient for MemoryRemote {
    fn authenticate(&self) -> RemoteResult<String> {
        if self.state().fail_auth {
            return Err(RemoteError::Auth("bad credentials".into()));
        }
        Ok("token".into())
    }

    fn list_notes(&self, full: bool) -> RemoteResult<Vec<RemoteNote>> {
        let state = self.state();
        if state.fail_list {
            return Err(RemoteError::Transport("index unavailable".into()));
        }
        Ok(state
            .notes
            .values()
            .map(|n| if full { n.clone() } else { n.clone().without_content() })
            .collect())
    }

    fn get_note(&self, key: &NoteKey) -> RemoteResult<RemoteNote> {
        pass_gate(&self.get_gate);

        let mut state = self.state();
        state.gets += 1;
        if state.fail_gets.contains(key) {
            return Err(RemoteError::Transport(format!("timeout fetching {}", key)));
        }
        state
            .notes
            .get(key)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(key.clone()))
    }

    fn upsert_note(&self, note: &Note) -> RemoteResult<RemoteNote> {
        pass_gate(&self.upsert_gate);

        let mut state = self.state();
        state.upserts += 1;
        if state.fail_upserts > 0 {
            state.fail_upserts -= 1;
            return Err(RemoteError::Transport("connection reset".into()));
        }

        let key = match &note.key {
            Some(key) => key.clone(),
            None => {
                state.next_id += 1;
                format!("r{}", state.next_id).parse().unwrap()
            }
        };
        let version = state
            .notes
            .get(&key)
            .and_then(|n| n.version)
            .unwrap_or(0)
            + 1;
        let mut stored = RemoteNote::from_note(key.clone(), note);
        stored.version = Some(version);
        state.notes.insert(key, stored.clone());

        if state.lose_acks > 0 {
            state.lose_acks -= 1;
            return Err(RemoteError::Transport("response lost".into()));
        }
        Ok(stored)
    }

    fn delete_note(&self, key: &NoteKey) -> RemoteResult<()> {
        self.state()
            .notes
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound(key.clone()))
    }
}
