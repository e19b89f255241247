// src/watch/mod.rs

//! File watching and change routing.
//!
//! This module is responsible for:
//! - Compiling per-task watch subscriptions (glob set -> task id), validated
//!   against the task graph before watch mode starts.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Debouncing change bursts into coalesced trigger batches.
//!
//! It does **not** know about task dependencies; it only turns filesystem
//! changes into task-level triggers.

pub mod debounce;
pub mod patterns;
pub mod watcher;

pub use debounce::spawn_debouncer;
pub use patterns::{build_watch_profiles, WatchProfile};
pub use watcher::{spawn_watcher, WatcherHandle};
