//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `jot_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("jot_core ping={}", jot_core::ping());
    println!("jot_core version={}", jot_core::core_version());
}
