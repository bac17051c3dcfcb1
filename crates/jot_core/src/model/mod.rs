//! Domain model for sticky notes.
//!
//! # Responsibility
//! - Define the in-memory note entity and its observable state.
//! - Keep a single shared identity per note across list view and editors.
//!
//! # Invariants
//! - Note identity is decided solely by the store-assigned `NoteId`.
//! - Entity mutation happens on the UI thread; the save worker only reads
//!   snapshots.

pub mod color;
pub mod note;
