//! Background save worker and its coalescing front end.
//!
//! # Responsibility
//! - Run the single worker thread that owns the store and processes
//!   requests strictly FIFO.
//! - Track the pending set that makes `queue_save` coalescing.
//!
//! # Invariants
//! - A note id enters the pending set at most once; it leaves the set when
//!   its write starts executing or when the save is canceled.
//! - Write units read the note's state at execution time, not enqueue time.
//! - Synchronous store calls (create/query/delete) go through the same
//!   worker, so they are totally ordered against background writes.
//! - Store errors are caught here; background write failures never escape
//!   to the caller.

use crate::model::note::{Note, NoteId, NoteSnapshot};
use crate::store::{Store, StoreResult};
use log::{debug, error, info};
use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

enum Request {
    Write(Note),
    Create {
        reply: SyncSender<StoreResult<NoteSnapshot>>,
    },
    Query {
        filter: Option<String>,
        reply: SyncSender<StoreResult<Vec<NoteSnapshot>>>,
    },
    QueryOpen {
        reply: SyncSender<StoreResult<Vec<NoteSnapshot>>>,
    },
    Get {
        id: NoteId,
        reply: SyncSender<StoreResult<Option<NoteSnapshot>>>,
    },
    Delete {
        id: NoteId,
        reply: SyncSender<StoreResult<()>>,
    },
    Shutdown {
        reply: SyncSender<()>,
    },
}

/// Clonable handle to the save worker.
///
/// All clones share one worker thread, one request queue and one pending
/// set. `queue_save` is fire-and-forget; the query/create/delete calls are
/// synchronous round-trips through the same queue.
#[derive(Clone)]
pub struct SaveCoordinator {
    tx: Sender<Request>,
    pending: Arc<Mutex<HashSet<NoteId>>>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SaveCoordinator {
    /// Spawns the worker thread and hands it exclusive ownership of `store`.
    ///
    /// # Errors
    /// Returns `StoreError::WorkerSpawn` when the worker thread cannot be
    /// started; `store` is dropped unused in that case.
    pub fn new(store: Box<dyn Store>) -> StoreResult<Self> {
        let (tx, rx) = mpsc::channel();
        let pending = Arc::new(Mutex::new(HashSet::new()));
        let worker_pending = Arc::clone(&pending);
        let handle = thread::Builder::new()
            .name("jot-save-worker".to_string())
            .spawn(move || run_worker(store, rx, worker_pending))
            .map_err(crate::store::StoreError::WorkerSpawn)?;

        Ok(Self {
            tx,
            pending,
            worker: Arc::new(Mutex::new(Some(handle))),
        })
    }

    /// Enqueues a durable write for `note`.
    ///
    /// Returns immediately when a save for the same id is already queued or
    /// in flight; the eventual write reads the note's state at execution
    /// time, so later edits are folded into it.
    pub fn queue_save(&self, note: &Note) {
        let id = note.id();
        if !lock(&self.pending).insert(id) {
            debug!("event=save_queue module=save status=coalesced note_id={id}");
            return;
        }
        if self.tx.send(Request::Write(note.clone())).is_err() {
            lock(&self.pending).remove(&id);
            error!("event=save_queue module=save status=error note_id={id} error_code=worker_gone");
        }
    }

    /// Drops a queued save for `id` if its write has not started yet.
    /// In-flight writes run to completion.
    pub fn cancel_save(&self, id: NoteId) {
        if lock(&self.pending).remove(&id) {
            debug!("event=save_cancel module=save status=ok note_id={id}");
        }
    }

    /// Whether a save for `id` is currently queued or in flight.
    pub fn is_pending(&self, id: NoteId) -> bool {
        lock(&self.pending).contains(&id)
    }

    /// Creates a fresh note through the worker and hydrates an entity.
    pub fn create_note(&self) -> StoreResult<Note> {
        self.request(|reply| Request::Create { reply })
            .map(Note::from_snapshot)
    }

    /// Queries notes by optional title substring filter.
    pub fn get_notes(&self, filter: Option<&str>) -> StoreResult<Vec<Note>> {
        let filter = filter.map(str::to_owned);
        let snapshots = self.request(|reply| Request::Query { filter, reply })?;
        Ok(snapshots.into_iter().map(Note::from_snapshot).collect())
    }

    /// Queries notes left open by a prior session.
    pub fn get_open_notes(&self) -> StoreResult<Vec<Note>> {
        let snapshots = self.request(|reply| Request::QueryOpen { reply })?;
        Ok(snapshots.into_iter().map(Note::from_snapshot).collect())
    }

    /// Fetches one note by id; `Ok(None)` when it no longer exists.
    pub fn get_note(&self, id: NoteId) -> StoreResult<Option<Note>> {
        let snapshot = self.request(|reply| Request::Get { id, reply })?;
        Ok(snapshot.map(Note::from_snapshot))
    }

    /// Deletes a note row.
    ///
    /// Cancels any still-queued save first so the deleted row cannot be
    /// resurrected, then sequences the delete through the worker, after any
    /// write already in flight for the same note.
    pub fn delete_note(&self, id: NoteId) -> StoreResult<()> {
        self.cancel_save(id);
        self.request(|reply| Request::Delete { id, reply })
    }

    /// Drains the queue, closes the store and joins the worker. Idempotent.
    pub fn shutdown(&self) {
        let (reply, ack) = mpsc::sync_channel(1);
        if self.tx.send(Request::Shutdown { reply }).is_ok() {
            let _ = ack.recv();
        }
        if let Some(handle) = lock_worker(&self.worker).take() {
            let _ = handle.join();
        }
    }

    fn request<T>(
        &self,
        build: impl FnOnce(SyncSender<StoreResult<T>>) -> Request,
    ) -> StoreResult<T> {
        let (reply, rx) = mpsc::sync_channel(1);
        self.tx
            .send(build(reply))
            .map_err(|_| crate::store::StoreError::WorkerGone)?;
        rx.recv().map_err(|_| crate::store::StoreError::WorkerGone)?
    }
}

fn run_worker(
    mut store: Box<dyn Store>,
    rx: Receiver<Request>,
    pending: Arc<Mutex<HashSet<NoteId>>>,
) {
    info!("event=save_worker module=save status=start");
    let mut shutdown_ack = None;

    while let Ok(request) = rx.recv() {
        match request {
            Request::Write(note) => handle_write(store.as_mut(), &pending, &note),
            Request::Create { reply } => {
                let _ = reply.send(store.create_note());
            }
            Request::Query { filter, reply } => {
                let _ = reply.send(store.get_notes(filter.as_deref()));
            }
            Request::QueryOpen { reply } => {
                let _ = reply.send(store.get_open_notes());
            }
            Request::Get { id, reply } => {
                let _ = reply.send(store.get_note(id));
            }
            Request::Delete { id, reply } => {
                let result = store.delete(id);
                if let Err(err) = &result {
                    error!("event=note_delete module=save status=error note_id={id} error={err}");
                } else {
                    info!("event=note_delete module=save status=ok note_id={id}");
                }
                let _ = reply.send(result);
            }
            Request::Shutdown { reply } => {
                shutdown_ack = Some(reply);
                break;
            }
        }
    }

    if let Err(err) = store.close() {
        error!("event=store_close module=save status=error error={err}");
    }
    info!("event=save_worker module=save status=stopped");

    if let Some(ack) = shutdown_ack {
        let _ = ack.send(());
    }
}

fn handle_write(store: &mut dyn Store, pending: &Mutex<HashSet<NoteId>>, note: &Note) {
    let id = note.id();

    // Leaving the pending set before the snapshot is what makes the
    // coalescing lossless: an edit arriving from here on re-enters the
    // queue instead of silently riding on this write.
    if !lock(pending).remove(&id) {
        debug!("event=note_save module=save status=canceled note_id={id}");
        return;
    }

    let (snapshot, revision) = note.save_snapshot();
    match store.update(&snapshot) {
        Ok(()) => {
            if note.mark_saved(revision, epoch_ms()) {
                info!("event=note_save module=save status=ok note_id={id}");
            } else {
                // An edit landed after the snapshot; its re-enqueued write
                // owns the dirty flag now.
                info!("event=note_save module=save status=superseded note_id={id}");
            }
        }
        Err(err) => {
            // The note stays dirty; the next edit re-triggers the save.
            error!("event=note_save module=save status=error note_id={id} error={err}");
        }
    }
}

fn epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

fn lock<'a>(set: &'a Mutex<HashSet<NoteId>>) -> MutexGuard<'a, HashSet<NoteId>> {
    set.lock().unwrap_or_else(PoisonError::into_inner)
}

fn lock_worker<'a>(
    slot: &'a Mutex<Option<JoinHandle<()>>>,
) -> MutexGuard<'a, Option<JoinHandle<()>>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
