//! Effect interfaces
//!
//! Traits describe the collaborators the recovery service depends on;
//! production handlers live in `warden-effects` and deterministic ones in
//! `warden-testkit`.

pub mod handles;
pub mod storage;
pub mod time;

pub use handles::{HandleRecord, HandleRegistry, HandleResolver};
pub use storage::{BatchOp, Expiry, StorageEffects, StorageError};
pub use time::{PhysicalTime, PhysicalTimeEffects, TimeError};
