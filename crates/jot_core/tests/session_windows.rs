use jot_core::{
    Note, NoteColor, NoteId, NoteSnapshot, SaveCoordinator, SessionManager, SqliteStore, Store,
    WindowHost, WindowId,
};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Recording window-host double; every call is logged for assertions.
#[derive(Default)]
struct FakeHost {
    next_window: AtomicU64,
    opened: Mutex<Vec<(WindowId, NoteId)>>,
    focused: Mutex<Vec<WindowId>>,
    closed: Mutex<Vec<WindowId>>,
    list_shown: AtomicUsize,
    list_focused: AtomicUsize,
    reloads: AtomicUsize,
    refreshed: Mutex<Vec<NoteId>>,
    exit_requested: AtomicBool,
}

impl WindowHost for FakeHost {
    fn open_window(&self, note: &Note) -> WindowId {
        let id = self.next_window.fetch_add(1, Ordering::SeqCst) + 1;
        self.opened.lock().unwrap().push((id, note.id()));
        id
    }

    fn focus_window(&self, id: WindowId) {
        self.focused.lock().unwrap().push(id);
    }

    fn close_window(&self, id: WindowId) {
        self.closed.lock().unwrap().push(id);
    }

    fn show_list(&self) {
        self.list_shown.fetch_add(1, Ordering::SeqCst);
    }

    fn focus_list(&self) {
        self.list_focused.fetch_add(1, Ordering::SeqCst);
    }

    fn reload_list(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }

    fn refresh_note(&self, note: &Note) {
        self.refreshed.lock().unwrap().push(note.id());
    }

    fn request_exit(&self) {
        self.exit_requested.store(true, Ordering::SeqCst);
    }
}

impl FakeHost {
    fn opened_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    fn last_window(&self) -> WindowId {
        self.opened.lock().unwrap().last().expect("a window").0
    }
}

fn fresh_session() -> (SessionManager<FakeHost>, SaveCoordinator, Arc<FakeHost>) {
    let store = SqliteStore::open_in_memory().unwrap();
    session_over(Box::new(store))
}

fn session_over(
    store: Box<dyn Store>,
) -> (SessionManager<FakeHost>, SaveCoordinator, Arc<FakeHost>) {
    let coordinator = SaveCoordinator::new(store).unwrap();
    let host = Arc::new(FakeHost::default());
    let session = SessionManager::new(coordinator.clone(), Arc::clone(&host));
    (session, coordinator, host)
}

/// Store seeded with `open_count` notes flagged open from a prior session.
fn seeded_store(open_count: usize) -> Box<dyn Store> {
    let mut store = SqliteStore::open_in_memory().unwrap();
    for _ in 0..open_count {
        let mut snapshot = store.create_note().unwrap();
        snapshot.open = true;
        store.update(&snapshot).unwrap();
    }
    Box::new(store)
}

fn stale_instance(id: NoteId, title: &str) -> Note {
    Note::from_snapshot(NoteSnapshot {
        id,
        title: title.to_string(),
        text: String::new(),
        color: NoteColor::DEFAULT,
        saved_at: Some(0),
        open: false,
    })
}

#[test]
fn launch_with_empty_store_shows_the_list() {
    let (mut session, _coordinator, host) = fresh_session();
    session.launch().unwrap();

    assert_eq!(host.list_shown.load(Ordering::SeqCst), 1);
    assert_eq!(host.opened_count(), 0);
    assert!(session.is_list_visible());
    assert!(!session.is_terminated());
}

#[test]
fn launch_restores_previously_open_notes_instead_of_the_list() {
    let (mut session, _coordinator, host) = session_over(seeded_store(2));
    session.launch().unwrap();

    assert_eq!(host.opened_count(), 2);
    assert_eq!(host.list_shown.load(Ordering::SeqCst), 0);
    assert!(!session.is_list_visible());
    assert_eq!(session.open_notes().len(), 2);
}

#[test]
fn showing_an_open_note_again_focuses_the_existing_window() {
    let (mut session, _coordinator, host) = fresh_session();
    session.launch().unwrap();
    let note = session.create_note().unwrap();

    session.show_note(note.clone());
    session.show_note(stale_instance(note.id(), "stale copy"));

    assert_eq!(host.opened_count(), 1, "no duplicate window may open");
    assert_eq!(host.focused.lock().unwrap().len(), 2);
    // The open instance stays authoritative.
    assert_eq!(session.open_notes()[0].title(), note.title());
}

#[test]
fn reconcile_prefers_the_open_instance_over_a_stale_query_row() {
    let (mut session, _coordinator, _host) = fresh_session();
    session.launch().unwrap();
    let note = session.create_note().unwrap();
    note.set_title("Foo");

    let display = session.reconcile(vec![stale_instance(note.id(), "Bar")]);

    assert_eq!(display.len(), 1);
    assert_eq!(display[0].title(), "Foo");
    assert_eq!(display[0], note);
}

#[test]
fn query_notes_reconciles_against_open_windows() {
    let (mut session, _coordinator, _host) = fresh_session();
    session.launch().unwrap();
    let note = session.create_note().unwrap();
    note.set_title("edited but unsaved title");

    // The row fetched from the store carries whatever was last written, but
    // the display list must show the live instance.
    let display = session.query_notes(None).unwrap();
    assert_eq!(display.len(), 1);
    assert_eq!(display[0].title(), "edited but unsaved title");
}

#[test]
fn hiding_the_list_with_no_windows_terminates() {
    let (mut session, _coordinator, host) = fresh_session();
    session.launch().unwrap();
    assert!(!host.exit_requested.load(Ordering::SeqCst));

    session.list_hidden();

    assert!(session.is_terminated());
    assert!(host.exit_requested.load(Ordering::SeqCst));
}

#[test]
fn closing_the_last_window_without_the_list_terminates() {
    let (mut session, _coordinator, host) = session_over(seeded_store(1));
    session.launch().unwrap();
    assert!(!session.is_list_visible());

    session.window_closed(host.last_window());

    assert!(session.is_terminated());
    assert!(host.exit_requested.load(Ordering::SeqCst));
}

#[test]
fn closing_a_window_with_the_list_visible_does_not_terminate() {
    let (mut session, _coordinator, host) = fresh_session();
    session.launch().unwrap();
    let _note = session.create_note().unwrap();

    session.window_closed(host.last_window());

    assert!(!session.is_terminated());
    assert!(!host.exit_requested.load(Ordering::SeqCst));
    assert!(session.open_notes().is_empty());
}

#[test]
fn window_close_issues_a_final_save_for_dirty_notes() {
    let (mut session, coordinator, host) = fresh_session();
    session.launch().unwrap();
    let note = session.create_note().unwrap();
    note.set_title("Final title");

    session.window_closed(host.last_window());

    // Synchronous fetch is FIFO-sequenced after the close-time save.
    let persisted = coordinator.get_note(note.id()).unwrap().unwrap();
    assert_eq!(persisted.title(), "Final title");
    assert!(!persisted.is_open());
    coordinator.shutdown();
}

#[test]
fn editing_an_open_note_refreshes_its_list_row() {
    let (mut session, _coordinator, host) = fresh_session();
    session.launch().unwrap();
    let note = session.create_note().unwrap();

    note.set_title("renamed");
    note.set_text("body");

    let refreshed = host.refreshed.lock().unwrap();
    assert_eq!(refreshed.as_slice(), [note.id(), note.id()]);
}

#[test]
fn deleting_an_open_note_closes_its_window_and_removes_the_row() {
    let (mut session, coordinator, host) = fresh_session();
    session.launch().unwrap();
    let note = session.create_note().unwrap();
    note.set_title("to be deleted");
    let window = host.last_window();

    session.delete_note(&note).unwrap();

    assert!(host.closed.lock().unwrap().contains(&window));
    assert!(session.open_notes().is_empty());
    assert!(coordinator.get_note(note.id()).unwrap().is_none());
}

#[test]
fn batch_delete_reloads_the_list_once() {
    let (mut session, coordinator, host) = fresh_session();
    session.launch().unwrap();
    let first = session.create_note().unwrap();
    let second = session.create_note().unwrap();
    let reloads_before = host.reloads.load(Ordering::SeqCst);

    session.delete_all_notes(&[first.clone(), second.clone()]).unwrap();

    assert_eq!(host.reloads.load(Ordering::SeqCst) - reloads_before, 1);
    assert!(coordinator.get_note(first.id()).unwrap().is_none());
    assert!(coordinator.get_note(second.id()).unwrap().is_none());
}

#[test]
fn global_close_preserves_open_flags_for_the_next_launch() {
    let (mut session, coordinator, host) = session_over(seeded_store(2));
    session.launch().unwrap();
    assert!(!session.is_list_visible());

    session.exit_all_notes();

    assert!(session.is_terminated());
    assert!(host.exit_requested.load(Ordering::SeqCst));
    assert_eq!(host.closed.lock().unwrap().len(), 2);
    // The coordinator is already shut down; a fresh request reports that.
    assert!(coordinator.create_note().is_err());
}

#[test]
fn close_all_with_the_list_visible_clears_open_flags_and_stays_alive() {
    let (mut session, coordinator, _host) = fresh_session();
    session.launch().unwrap();
    session.create_note().unwrap();
    session.create_note().unwrap();

    session.exit_all_notes();

    assert!(!session.is_terminated());
    assert!(session.open_notes().is_empty());
    // Queued open-flag saves drain before the query (FIFO), so no note is
    // flagged open anymore.
    assert!(coordinator.get_open_notes().unwrap().is_empty());
    coordinator.shutdown();
}

#[test]
fn operations_after_termination_are_ignored() {
    let (mut session, _coordinator, host) = fresh_session();
    session.launch().unwrap();
    session.list_hidden();
    assert!(session.is_terminated());

    session.show_note(stale_instance(1, "late"));
    session.show_list();
    session.exit_all_notes();

    assert_eq!(host.opened_count(), 0);
    assert_eq!(host.list_shown.load(Ordering::SeqCst), 1);
}
