//! Persistence-coordination and session-lifecycle core for the Jot
//! sticky-notes application.
//! This crate is the single source of truth for save and session invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod save;
pub mod session;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::color::NoteColor;
pub use model::note::{ListenerId, Note, NoteId, NoteSnapshot};
pub use save::SaveCoordinator;
pub use session::{SessionManager, WindowHost, WindowId};
pub use store::{SqliteStore, Store, StoreError, StoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
