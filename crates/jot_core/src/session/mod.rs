//! Session lifecycle: open windows, identity reconciliation, exit.
//!
//! # Responsibility
//! - Track which notes are shown in their own window vs. the list view.
//! - Decide when the whole application may terminate.
//!
//! # Invariants
//! - At most one window per note id; the open instance is authoritative.
//! - Termination happens exactly when no window is open and the list view
//!   is hidden, and only after the save queue has drained.

mod manager;

pub use manager::{SessionManager, WindowHost, WindowId};
