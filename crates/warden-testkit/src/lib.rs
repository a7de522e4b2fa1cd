//! Warden Testing Infrastructure
//!
//! Shared fixtures for tests across the workspace: a clock tests can move,
//! storage that fails on demand, deterministic identities and a composed
//! effects bundle implementing every effect trait the recovery service
//! needs.
//!
//! ```toml
//! [dev-dependencies]
//! warden-testkit = { workspace = true }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod effects;
pub mod faults;
pub mod identity;
pub mod time;

pub use effects::TestEffects;
pub use faults::{FaultyStorage, StorageOp};
pub use identity::{identities, identity};
pub use time::{ControllableTime, DEFAULT_START_MS};
