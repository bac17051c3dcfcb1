use jot_core::{Note, NoteColor, NoteSnapshot};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn sample(id: i64, title: &str) -> Note {
    Note::from_snapshot(NoteSnapshot {
        id,
        title: title.to_string(),
        text: String::new(),
        color: NoteColor::DEFAULT,
        saved_at: None,
        open: false,
    })
}

#[test]
fn listener_is_notified_on_each_content_change() {
    let note = sample(1, "a");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    note.add_listener(move |changed| {
        sink.lock().unwrap().push(changed.title());
    });

    note.set_title("b");
    note.set_text("body");
    note.set_color(NoteColor::BLUE);

    assert_eq!(seen.lock().unwrap().as_slice(), ["b", "b", "b"]);
    assert!(note.is_dirty());
}

#[test]
fn setting_an_equal_value_is_a_no_op() {
    let note = sample(1, "same");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    note.add_listener(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    note.set_title("same");
    note.set_text("");
    note.set_color(NoteColor::DEFAULT);

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!note.is_dirty());
}

#[test]
fn removed_listener_is_no_longer_notified() {
    let note = sample(1, "a");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let listener = note.add_listener(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    note.set_title("b");
    note.remove_listener(listener);
    note.set_title("c");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn listeners_fire_in_insertion_order() {
    let note = sample(1, "a");
    let order = Arc::new(Mutex::new(Vec::new()));
    for tag in ["first", "second", "third"] {
        let sink = Arc::clone(&order);
        note.add_listener(move |_| {
            sink.lock().unwrap().push(tag);
        });
    }

    note.set_text("x");

    assert_eq!(order.lock().unwrap().as_slice(), ["first", "second", "third"]);
}

#[test]
fn listener_may_remove_itself_during_notification() {
    let note = sample(1, "a");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let slot: Arc<Mutex<Option<jot_core::ListenerId>>> = Arc::new(Mutex::new(None));
    let handle = Arc::clone(&slot);
    let observer = note.clone();
    let listener = note.add_listener(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(id) = handle.lock().unwrap().take() {
            observer.remove_listener(id);
        }
    });
    *slot.lock().unwrap() = Some(listener);

    note.set_title("b");
    note.set_title("c");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn equality_and_hash_are_by_id_only() {
    let left = sample(42, "left");
    let right = sample(42, "completely different");
    let other = sample(7, "left");

    assert_eq!(left, right);
    assert_ne!(left, other);

    let mut set = HashSet::new();
    set.insert(left);
    set.insert(right);
    set.insert(other);
    assert_eq!(set.len(), 2, "equal ids must collapse in a hash set");
}

#[test]
fn open_flag_marks_dirty_without_notifying() {
    let note = sample(1, "a");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    note.add_listener(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    note.set_open(true);

    assert!(note.is_dirty());
    assert!(note.is_open());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // Unchanged flag stays a no-op.
    let was_dirty = note.is_dirty();
    note.set_open(true);
    assert_eq!(note.is_dirty(), was_dirty);
}

#[test]
fn hydrated_note_starts_clean() {
    let note = Note::from_snapshot(NoteSnapshot {
        id: 3,
        title: "loaded".to_string(),
        text: "persisted body".to_string(),
        color: NoteColor::PINK,
        saved_at: Some(1_000),
        open: true,
    });

    assert!(!note.is_dirty());
    assert_eq!(note.title(), "loaded");
    assert_eq!(note.saved_at(), Some(1_000));
    assert!(note.is_open());
}

#[test]
fn snapshot_reflects_current_state() {
    let note = sample(9, "start");
    note.set_title("now");
    note.set_text("text");

    let snapshot = note.snapshot();
    assert_eq!(snapshot.id, 9);
    assert_eq!(snapshot.title, "now");
    assert_eq!(snapshot.text, "text");
    assert!(!snapshot.open);
}
