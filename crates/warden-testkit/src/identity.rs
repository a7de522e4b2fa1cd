//! Deterministic identities

use sha2::{Digest, Sha256};
use warden_client::Identity;

/// Identity whose keys are derived from `label`
///
/// The same label always yields the same signing and encryption keys.
pub fn identity(label: &str) -> Identity {
    let seed: [u8; 32] = Sha256::new()
        .chain_update(b"warden-testkit/identity")
        .chain_update(label.as_bytes())
        .finalize()
        .into();
    Identity::from_seed(&seed)
}

/// `count` identities labelled `<prefix>-1 ..= <prefix>-<count>`
pub fn identities(prefix: &str, count: usize) -> Vec<Identity> {
    (1..=count)
        .map(|i| identity(&format!("{prefix}-{i}")))
        .collect()
}
