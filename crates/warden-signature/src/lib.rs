//! # Warden Signature - Layer 2: Request Authentication
//!
//! The signature gate guarding every mutating or authenticated recovery
//! operation. A request carries the claimed signer, a hex Ed25519
//! signature and a millisecond timestamp; the gate rebuilds the action's
//! canonical message, checks the timestamp is within the freshness window
//! in both directions, and verifies the signature.
//!
//! No authorization logic lives here (guardian membership and ownership are
//! checked by `warden-recovery`); this crate answers only "did this key sign
//! this action recently".

#![forbid(unsafe_code)]

pub mod canonical;
pub mod gate;

pub use canonical::SignedAction;
pub use gate::{verify, RequestAuth, SignatureGate, DEFAULT_MAX_CLOCK_SKEW};
