//! Durable note storage contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the narrow `Store` interface the rest of the core consumes.
//! - Isolate SQL details behind the SQLite implementation.
//!
//! # Invariants
//! - Store handles are owned exclusively by the save worker after the
//!   coordinator starts; nothing else touches the connection.
//! - Read paths never fail on malformed color data; they substitute the
//!   default color instead.

use crate::db::DbError;
use crate::model::note::{NoteId, NoteSnapshot};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod sqlite;

pub use sqlite::SqliteStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Error for note persistence and query operations.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    NotFound(NoteId),
    InvalidData(String),
    /// The save worker thread could not be started.
    WorkerSpawn(std::io::Error),
    /// The save worker is gone; the request could not be delivered.
    WorkerGone,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
            Self::WorkerSpawn(err) => write!(f, "failed to start save worker: {err}"),
            Self::WorkerGone => write!(f, "save worker is no longer running"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::WorkerSpawn(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable CRUD contract for notes.
///
/// Implementations are moved onto the save worker thread, so they must be
/// `Send`. All methods are synchronous; serialization against concurrent
/// access is the coordinator's job, not the store's.
pub trait Store: Send {
    /// Allocates a fresh identity, inserts a note titled `"untitled note N"`
    /// and returns the hydrated snapshot.
    fn create_note(&mut self) -> StoreResult<NoteSnapshot>;

    /// Returns notes whose title contains `filter` as a case-sensitive
    /// substring, or all notes for an empty/absent filter. Ordered by id.
    fn get_notes(&mut self, filter: Option<&str>) -> StoreResult<Vec<NoteSnapshot>>;

    /// Returns notes flagged open by a prior session, for restore-on-launch.
    fn get_open_notes(&mut self) -> StoreResult<Vec<NoteSnapshot>>;

    /// Fetches one note by id; an unknown id is `Ok(None)`, not an error.
    fn get_note(&mut self, id: NoteId) -> StoreResult<Option<NoteSnapshot>>;

    /// Writes title, content, color and open flag for an existing id and
    /// stamps the save timestamp. Unknown ids yield `StoreError::NotFound`.
    fn update(&mut self, snapshot: &NoteSnapshot) -> StoreResult<()>;

    /// Removes the row for `id`. Deleting an absent row is a no-op.
    fn delete(&mut self, id: NoteId) -> StoreResult<()>;

    /// Releases the underlying connection. Must only be called after the
    /// save worker has drained its queue.
    fn close(self: Box<Self>) -> StoreResult<()>;
}
