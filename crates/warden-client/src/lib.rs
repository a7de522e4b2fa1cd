//! Warden Client
//!
//! Client-side half of guardian recovery. Everything that touches plaintext
//! shares lives here and runs on user hardware:
//!
//! - the owner splits their identity seed and seals one share to each
//!   guardian ([`prepare_configuration`]);
//! - a guardian opens their share and re-seals it to a recovering device's
//!   one-time key ([`reseal_for_recovery`]);
//! - the recovering device opens the submitted shares and reconstructs the
//!   seed ([`RecoveryKeypair::reconstruct`]).
//!
//! Requests are authenticated with [`RequestSigner`].

mod device;
mod error;
mod guardian;
mod identity;
mod owner;
pub mod sealing;
mod signer;

pub use device::RecoveryKeypair;
pub use error::{ClientError, Result};
pub use guardian::reseal_for_recovery;
pub use identity::Identity;
pub use owner::{prepare_configuration, GuardianContact, GuardianShard, PreparedConfiguration};
pub use sealing::EncryptionKeypair;
pub use signer::RequestSigner;
