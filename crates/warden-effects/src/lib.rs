//! # Warden Effects - Layer 3: Effect Handlers
//!
//! Production implementations of the effect traits declared in
//! `warden-core`:
//!
//! - [`MemoryStorageHandler`]: key-value store with per-key expiry,
//!   compare-and-swap and atomic batches
//! - [`RealTimeHandler`]: operating system wall clock
//! - [`MemoryHandleRegistry`]: handle to identity resolution
//!
//! Deterministic test doubles live in `warden-testkit`.

#![forbid(unsafe_code)]

pub mod handles;
pub mod storage;
pub mod time;

pub use handles::MemoryHandleRegistry;
pub use storage::MemoryStorageHandler;
pub use time::RealTimeHandler;
