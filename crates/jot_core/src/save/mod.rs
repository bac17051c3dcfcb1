//! Write-coalescing save queue.
//!
//! # Responsibility
//! - Serialize every durable note write onto one background worker.
//! - Coalesce repeated saves of the same note into a single write.
//!
//! # Invariants
//! - At most one save per note id is queued or in flight at any time.
//! - For any edit there exists a future completed write reflecting that
//!   edit or a later one (eventual durability).
//! - The store handle is owned exclusively by the worker thread.

mod coordinator;

pub use coordinator::SaveCoordinator;
