//! Error type for splitting and reconstruction

/// Failures of [`split`](crate::split) and [`combine`](crate::combine)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShamirError {
    /// Threshold or share count outside `2 <= threshold <= share_count <= 255`
    #[error("invalid parameters: threshold {threshold}, share count {share_count}")]
    InvalidParameters {
        /// Requested threshold
        threshold: usize,
        /// Requested share count
        share_count: usize,
    },

    /// The secret has no bytes
    #[error("secret must not be empty")]
    EmptySecret,

    /// Fewer shares than the threshold were supplied
    #[error("insufficient shares: {provided} provided, {threshold} required")]
    InsufficientShares {
        /// Shares supplied
        provided: usize,
        /// Shares required
        threshold: usize,
    },

    /// Share index zero would reveal the secret directly
    #[error("share index must be non-zero")]
    ZeroIndex,

    /// Two shares carry the same index
    #[error("duplicate share index {index}")]
    DuplicateIndex {
        /// Repeated index
        index: u8,
    },

    /// Shares differ in length
    #[error("inconsistent share lengths: expected {expected}, found {found}")]
    InconsistentLength {
        /// Length of the first share
        expected: usize,
        /// Length of the offending share
        found: usize,
    },

    /// Reconstructed secret does not match the expected digest
    #[error("reconstructed secret does not match its digest")]
    DigestMismatch,
}
