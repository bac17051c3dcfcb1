//! Note entity shared between the list view, editor windows and the save
//! worker.
//!
//! # Responsibility
//! - Hold the mutable note state behind one cheaply clonable handle.
//! - Notify registered listeners synchronously on every content change.
//! - Track dirtiness and the revision counter the save worker uses to
//!   decide whether a completed write may clear the dirty flag.
//!
//! # Invariants
//! - `id` is immutable once assigned by the store.
//! - Two handles are equal iff their ids are equal, regardless of state.
//! - Mutable fields are written only from the UI thread; the save worker
//!   reads consistent snapshots through the state lock.
//! - Setting a field to its current value is a no-op: no dirty flag, no
//!   listener notification, no save trigger.

use crate::model::color::NoteColor;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Stable store-assigned identifier, monotonically allocated.
pub type NoteId = i64;

/// Handle returned by [`Note::add_listener`], used for removal.
pub type ListenerId = u64;

type Listener = Arc<dyn Fn(&Note) + Send + Sync>;

/// Plain data form of a note, exchanged with the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteSnapshot {
    pub id: NoteId,
    pub title: String,
    pub text: String,
    pub color: NoteColor,
    /// Epoch milliseconds of the last durable write, if any.
    pub saved_at: Option<i64>,
    /// Whether the note was shown in its own window.
    pub open: bool,
}

#[derive(Debug)]
struct NoteState {
    title: String,
    text: String,
    color: NoteColor,
    saved_at: Option<i64>,
    open: bool,
    dirty: bool,
    /// Bumped on every mutation; lets the save worker detect edits that
    /// landed after its snapshot was taken.
    revision: u64,
}

struct NoteShared {
    id: NoteId,
    state: Mutex<NoteState>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
}

/// Shared in-memory note entity.
///
/// Cloning produces another handle to the same logical note; all clones
/// observe the same state and listener set.
#[derive(Clone)]
pub struct Note {
    shared: Arc<NoteShared>,
}

impl Note {
    /// Hydrates an entity from persisted data.
    ///
    /// The result starts clean: no listener fires and no save is triggered
    /// by construction.
    pub fn from_snapshot(snapshot: NoteSnapshot) -> Self {
        Self {
            shared: Arc::new(NoteShared {
                id: snapshot.id,
                state: Mutex::new(NoteState {
                    title: snapshot.title,
                    text: snapshot.text,
                    color: snapshot.color,
                    saved_at: snapshot.saved_at,
                    open: snapshot.open,
                    dirty: false,
                    revision: 0,
                }),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
            }),
        }
    }

    pub fn id(&self) -> NoteId {
        self.shared.id
    }

    pub fn title(&self) -> String {
        self.state().title.clone()
    }

    pub fn text(&self) -> String {
        self.state().text.clone()
    }

    pub fn color(&self) -> NoteColor {
        self.state().color
    }

    pub fn saved_at(&self) -> Option<i64> {
        self.state().saved_at
    }

    pub fn is_dirty(&self) -> bool {
        self.state().dirty
    }

    pub fn is_open(&self) -> bool {
        self.state().open
    }

    /// Sets the title, marks the note dirty and notifies listeners.
    /// No-op when the value is unchanged.
    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        {
            let mut state = self.state();
            if state.title == title {
                return;
            }
            state.title = title;
            state.dirty = true;
            state.revision += 1;
        }
        self.notify();
    }

    /// Sets the body text, marks the note dirty and notifies listeners.
    /// No-op when the value is unchanged.
    pub fn set_text(&self, text: impl Into<String>) {
        let text = text.into();
        {
            let mut state = self.state();
            if state.text == text {
                return;
            }
            state.text = text;
            state.dirty = true;
            state.revision += 1;
        }
        self.notify();
    }

    /// Sets the color, marks the note dirty and notifies listeners.
    /// No-op when the value is unchanged.
    pub fn set_color(&self, color: NoteColor) {
        {
            let mut state = self.state();
            if state.color == color {
                return;
            }
            state.color = color;
            state.dirty = true;
            state.revision += 1;
        }
        self.notify();
    }

    /// Flags whether the note is shown in its own window.
    ///
    /// Open-flag transitions are persisted (they drive restore-on-launch),
    /// so a change marks the note dirty, but listeners only fire for
    /// content changes and are not notified here.
    pub fn set_open(&self, open: bool) {
        let mut state = self.state();
        if state.open == open {
            return;
        }
        state.open = open;
        state.dirty = true;
        state.revision += 1;
    }

    /// Registers a listener invoked synchronously after every content
    /// mutation (title, text, color). Listeners run in insertion order and
    /// must tolerate reentrant notification.
    pub fn add_listener(&self, listener: impl Fn(&Note) + Send + Sync + 'static) -> ListenerId {
        let id = self.shared.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners().push((id, Arc::new(listener)));
        id
    }

    /// Removes a previously registered listener. Unknown ids are ignored.
    pub fn remove_listener(&self, id: ListenerId) {
        self.listeners().retain(|(entry, _)| *entry != id);
    }

    /// Current plain-data view of the note.
    pub fn snapshot(&self) -> NoteSnapshot {
        let state = self.state();
        NoteSnapshot {
            id: self.shared.id,
            title: state.title.clone(),
            text: state.text.clone(),
            color: state.color,
            saved_at: state.saved_at,
            open: state.open,
        }
    }

    /// Snapshot paired with the revision it was taken at; the save worker
    /// passes the revision back to [`Note::mark_saved`].
    pub(crate) fn save_snapshot(&self) -> (NoteSnapshot, u64) {
        let state = self.state();
        let snapshot = NoteSnapshot {
            id: self.shared.id,
            title: state.title.clone(),
            text: state.text.clone(),
            color: state.color,
            saved_at: state.saved_at,
            open: state.open,
        };
        (snapshot, state.revision)
    }

    /// Records a completed durable write.
    ///
    /// Clears the dirty flag and stamps `saved_at` only when no edit landed
    /// since `revision` was snapshotted; returns whether the flag was
    /// cleared. A stale revision leaves the note dirty so the write queued
    /// by the intervening edit remains authoritative.
    pub(crate) fn mark_saved(&self, revision: u64, saved_at: i64) -> bool {
        let mut state = self.state();
        if state.revision != revision {
            return false;
        }
        state.dirty = false;
        state.saved_at = Some(saved_at);
        true
    }

    fn notify(&self) {
        // Snapshot the listener list so callbacks may add/remove listeners
        // without deadlocking on the registry lock.
        let listeners: Vec<Listener> = self
            .listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(self);
        }
    }

    fn state(&self) -> MutexGuard<'_, NoteState> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<(ListenerId, Listener)>> {
        self.shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        self.shared.id == other.shared.id
    }
}

impl Eq for Note {}

impl Hash for Note {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shared.id.hash(state);
    }
}

impl std::fmt::Debug for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Note")
            .field("id", &self.shared.id)
            .field("title", &state.title)
            .field("dirty", &state.dirty)
            .field("open", &state.open)
            .finish()
    }
}
