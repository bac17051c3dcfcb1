//! Window/session manager.
//!
//! # Responsibility
//! - Single source of truth for which note windows exist.
//! - Reconcile note identity between fresh store queries and notes already
//!   open in a window.
//! - Drive note creation, deletion and the exit state machine.
//!
//! # Invariants
//! - `open` never holds two entries with the same note id.
//! - Every tracked entry owns exactly one host window and one registered
//!   edit listener; untracking releases both.
//! - All methods run on the single-threaded UI context.

use crate::model::note::{ListenerId, Note, NoteId};
use crate::save::SaveCoordinator;
use crate::store::StoreResult;
use log::info;
use std::sync::Arc;

/// Opaque handle for a note editor window, issued by the host.
pub type WindowId = u64;

/// Windowing seam the session manager drives.
///
/// The GUI shell implements this; methods take `&self` so implementors use
/// interior mutability. `close_window` must not re-enter
/// [`SessionManager::window_closed`]; the host reports only user-initiated
/// closes back.
pub trait WindowHost: Send + Sync {
    /// Opens an editor window bound to `note` and returns its handle.
    fn open_window(&self, note: &Note) -> WindowId;
    /// Brings an existing editor window to the foreground.
    fn focus_window(&self, id: WindowId);
    /// Closes an editor window without a `window_closed` callback.
    fn close_window(&self, id: WindowId);
    /// Shows the list/grid view.
    fn show_list(&self);
    /// Brings the already-visible list view to the foreground.
    fn focus_list(&self);
    /// The set of persisted notes changed; the list must re-query.
    fn reload_list(&self);
    /// One note's observable state changed; refresh its list row.
    fn refresh_note(&self, note: &Note);
    /// All windows are gone; the process may exit.
    fn request_exit(&self);
}

struct OpenEntry {
    note: Note,
    window: WindowId,
    listener: ListenerId,
}

/// Session-lifecycle state machine over a [`WindowHost`].
pub struct SessionManager<H: WindowHost + 'static> {
    coordinator: SaveCoordinator,
    host: Arc<H>,
    open: Vec<OpenEntry>,
    list_visible: bool,
    terminated: bool,
}

impl<H: WindowHost + 'static> SessionManager<H> {
    /// Initial state: no windows, list hidden. Call [`launch`] next.
    ///
    /// [`launch`]: SessionManager::launch
    pub fn new(coordinator: SaveCoordinator, host: Arc<H>) -> Self {
        Self {
            coordinator,
            host,
            open: Vec::new(),
            list_visible: false,
            terminated: false,
        }
    }

    /// Restores the previous session: reopens every note flagged open, or
    /// shows the list view when there is none.
    pub fn launch(&mut self) -> StoreResult<()> {
        let restored = self.coordinator.get_open_notes()?;
        info!(
            "event=session_launch module=session status=ok restored={}",
            restored.len()
        );
        for note in restored {
            self.show_note(note);
        }
        if self.open.is_empty() {
            self.show_list();
        }
        Ok(())
    }

    /// Shows `note` in its own window.
    ///
    /// When a window for the same id already exists it is focused instead;
    /// the argument is discarded so in-progress edits in the open instance
    /// are never clobbered by a stale query result.
    pub fn show_note(&mut self, note: Note) {
        if self.terminated {
            return;
        }
        if let Some(entry) = self.find(note.id()) {
            self.host.focus_window(entry.window);
            return;
        }

        let window = self.host.open_window(&note);
        let listener = {
            let coordinator = self.coordinator.clone();
            let host = Arc::clone(&self.host);
            note.add_listener(move |changed| {
                coordinator.queue_save(changed);
                host.refresh_note(changed);
            })
        };

        // Persist the open flag so the next launch restores this window.
        note.set_open(true);
        if note.is_dirty() {
            self.coordinator.queue_save(&note);
        }

        info!(
            "event=window_open module=session status=ok note_id={} window_id={window}",
            note.id()
        );
        self.open.push(OpenEntry {
            note,
            window,
            listener,
        });
    }

    /// Shows the list view, or focuses it when already visible.
    pub fn show_list(&mut self) {
        if self.terminated {
            return;
        }
        if self.list_visible {
            self.host.focus_list();
        } else {
            self.list_visible = true;
            self.host.show_list();
        }
    }

    /// Host callback: the list view was hidden by the user.
    pub fn list_hidden(&mut self) {
        self.list_visible = false;
        self.maybe_exit();
    }

    /// Host callback: the user closed an editor window.
    ///
    /// Untracks the note, clears its open flag and issues the final save
    /// whenever the note is still dirty, so nothing is lost on close.
    pub fn window_closed(&mut self, window: WindowId) {
        if self.terminated {
            return;
        }
        let Some(index) = self.open.iter().position(|entry| entry.window == window) else {
            return;
        };
        let entry = self.open.remove(index);
        entry.note.remove_listener(entry.listener);
        entry.note.set_open(false);
        if entry.note.is_dirty() {
            self.coordinator.queue_save(&entry.note);
        }
        info!(
            "event=window_close module=session status=ok note_id={} window_id={window}",
            entry.note.id()
        );
        self.maybe_exit();
    }

    /// Replaces freshly queried notes with the already-open instance of the
    /// same id, so the list never shows a stale title for a note being
    /// actively edited.
    pub fn reconcile(&self, notes: Vec<Note>) -> Vec<Note> {
        notes
            .into_iter()
            .map(|note| match self.find(note.id()) {
                Some(entry) => entry.note.clone(),
                None => note,
            })
            .collect()
    }

    /// Store query plus reconciliation; the list view's search path.
    pub fn query_notes(&self, filter: Option<&str>) -> StoreResult<Vec<Note>> {
        Ok(self.reconcile(self.coordinator.get_notes(filter)?))
    }

    /// Creates a new note, shows it and refreshes the list.
    pub fn create_note(&mut self) -> StoreResult<Note> {
        let note = self.coordinator.create_note()?;
        self.show_note(note.clone());
        self.host.reload_list();
        Ok(note)
    }

    /// Deletes one note: closes its window if open, cancels any pending
    /// save and removes the row, then refreshes the list.
    pub fn delete_note(&mut self, note: &Note) -> StoreResult<()> {
        self.delete_untracked(note)?;
        self.host.reload_list();
        self.maybe_exit();
        Ok(())
    }

    /// Deletes a batch of notes with a single list refresh at the end.
    pub fn delete_all_notes(&mut self, notes: &[Note]) -> StoreResult<()> {
        for note in notes {
            self.delete_untracked(note)?;
        }
        self.host.reload_list();
        self.maybe_exit();
        Ok(())
    }

    /// Closes every open window without deleting anything.
    ///
    /// With the list hidden this is a global close: open flags stay set so
    /// the next launch restores the same windows (and the session then
    /// terminates). With the list visible it is a plain "close all" and the
    /// open flags are cleared.
    pub fn exit_all_notes(&mut self) {
        if self.terminated {
            return;
        }
        let global_close = !self.list_visible;
        let entries = std::mem::take(&mut self.open);
        for entry in entries {
            entry.note.remove_listener(entry.listener);
            if !global_close {
                entry.note.set_open(false);
            }
            if entry.note.is_dirty() {
                self.coordinator.queue_save(&entry.note);
            }
            self.host.close_window(entry.window);
        }
        info!(
            "event=exit_all module=session status=ok global_close={}",
            global_close
        );
        self.maybe_exit();
    }

    /// Notes currently shown in their own window, in opening order.
    pub fn open_notes(&self) -> Vec<Note> {
        self.open.iter().map(|entry| entry.note.clone()).collect()
    }

    pub fn is_list_visible(&self) -> bool {
        self.list_visible
    }

    /// Whether the session reached its terminal state.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    fn find(&self, id: NoteId) -> Option<&OpenEntry> {
        self.open.iter().find(|entry| entry.note.id() == id)
    }

    fn delete_untracked(&mut self, note: &Note) -> StoreResult<()> {
        if self.terminated {
            return Ok(());
        }
        if let Some(index) = self.open.iter().position(|entry| entry.note == *note) {
            let entry = self.open.remove(index);
            entry.note.remove_listener(entry.listener);
            self.host.close_window(entry.window);
        }
        self.coordinator.delete_note(note.id())
    }

    fn maybe_exit(&mut self) {
        if self.terminated || !self.open.is_empty() || self.list_visible {
            return;
        }
        self.terminated = true;
        info!("event=session_exit module=session status=start");
        // Drain every queued write, then close the store, before the host
        // tears the process down.
        self.coordinator.shutdown();
        info!("event=session_exit module=session status=ok");
        self.host.request_exit();
    }
}
