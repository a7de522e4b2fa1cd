//! Shamir secret sharing over GF(256)
//!
//! A secret of `L` bytes is split byte-wise: for each byte a random
//! polynomial of degree `threshold - 1` is drawn whose constant term is
//! that byte, and share `i` holds the evaluations at `x = i` for
//! `i = 1..=share_count`. Any `threshold` shares recover the secret by
//! Lagrange interpolation at zero; fewer reveal nothing about it.
//!
//! Interpolation cannot tell a corrupted share from a good one. Use
//! [`combine_verified`] with the [`SecretDigest`] returned by [`split`]
//! when integrity matters.

mod digest;
mod error;
pub mod field;

pub use digest::SecretDigest;
pub use error::ShamirError;

use field::Gf256;
use rand_core::{CryptoRng, RngCore};
use std::collections::HashSet;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Largest number of shares a secret can be split into
pub const MAX_SHARES: usize = 255;

/// Smallest meaningful threshold
pub const MIN_THRESHOLD: usize = 2;

/// Result alias for this crate
pub type Result<T> = std::result::Result<T, ShamirError>;

/// One evaluation point of the sharing polynomials
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Share {
    index: u8,
    data: Vec<u8>,
}

impl Share {
    /// Assemble a share from its index and evaluations
    pub fn new(index: u8, data: Vec<u8>) -> Self {
        Self { index, data }
    }

    /// x-coordinate, never zero for shares produced by [`split`]
    pub fn index(&self) -> u8 {
        self.index
    }

    /// y-coordinates, one per secret byte
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Serialized form: index byte followed by the evaluations
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        let mut bytes = Zeroizing::new(Vec::with_capacity(self.data.len() + 1));
        bytes.push(self.index);
        bytes.extend_from_slice(&self.data);
        bytes
    }

    /// Parse the form produced by [`Share::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes.split_first() {
            Some((&0, _)) => Err(ShamirError::ZeroIndex),
            Some((_, [])) | None => Err(ShamirError::EmptySecret),
            Some((&index, data)) => Ok(Self::new(index, data.to_vec())),
        }
    }
}

impl fmt::Debug for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Share")
            .field("index", &self.index)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Output of [`split`]
#[derive(Debug, Clone)]
pub struct SplitSecret {
    /// Shares with indices `1..=share_count`, in order
    pub shares: Vec<Share>,
    /// Threshold the shares were generated for
    pub threshold: usize,
    /// Commitment to the original secret
    pub digest: SecretDigest,
}

/// Split `secret` into `share_count` shares, any `threshold` of which recover it
pub fn split<R>(
    secret: &[u8],
    share_count: usize,
    threshold: usize,
    rng: &mut R,
) -> Result<SplitSecret>
where
    R: RngCore + CryptoRng,
{
    if threshold < MIN_THRESHOLD || threshold > share_count || share_count > MAX_SHARES {
        return Err(ShamirError::InvalidParameters {
            threshold,
            share_count,
        });
    }
    if secret.is_empty() {
        return Err(ShamirError::EmptySecret);
    }

    let mut shares: Vec<Share> = (1..=share_count)
        .map(|i| Share::new(i as u8, Vec::with_capacity(secret.len())))
        .collect();

    let mut coefficients = Zeroizing::new(vec![Gf256::ZERO; threshold]);
    let mut random = Zeroizing::new(vec![0u8; threshold - 1]);
    for &byte in secret {
        rng.fill_bytes(&mut random);
        coefficients[0] = Gf256(byte);
        for (slot, &r) in coefficients[1..].iter_mut().zip(random.iter()) {
            *slot = Gf256(r);
        }
        for share in &mut shares {
            let y = Gf256::eval_polynomial(&coefficients, Gf256(share.index));
            share.data.push(y.0);
        }
    }

    Ok(SplitSecret {
        shares,
        threshold,
        digest: SecretDigest::of(secret),
    })
}

/// Recover a secret from at least `threshold` shares
///
/// All supplied shares take part in the interpolation. Shares must have
/// distinct non-zero indices and equal, non-zero lengths.
pub fn combine(shares: &[Share], threshold: usize) -> Result<Zeroizing<Vec<u8>>> {
    if threshold < MIN_THRESHOLD {
        return Err(ShamirError::InvalidParameters {
            threshold,
            share_count: shares.len(),
        });
    }
    if shares.len() < threshold {
        return Err(ShamirError::InsufficientShares {
            provided: shares.len(),
            threshold,
        });
    }

    let len = shares[0].data.len();
    if len == 0 {
        return Err(ShamirError::EmptySecret);
    }
    let mut seen = HashSet::with_capacity(shares.len());
    for share in shares {
        if share.index == 0 {
            return Err(ShamirError::ZeroIndex);
        }
        if !seen.insert(share.index) {
            return Err(ShamirError::DuplicateIndex { index: share.index });
        }
        if share.data.len() != len {
            return Err(ShamirError::InconsistentLength {
                expected: len,
                found: share.data.len(),
            });
        }
    }

    let basis = lagrange_basis_at_zero(shares);
    let mut secret = Zeroizing::new(vec![0u8; len]);
    for (position, out) in secret.iter_mut().enumerate() {
        let value = shares
            .iter()
            .zip(&basis)
            .fold(Gf256::ZERO, |acc, (share, &l)| {
                acc + Gf256(share.data[position]) * l
            });
        *out = value.0;
    }
    Ok(secret)
}

/// [`combine`], then check the result against `digest`
pub fn combine_verified(
    shares: &[Share],
    threshold: usize,
    digest: &SecretDigest,
) -> Result<Zeroizing<Vec<u8>>> {
    let secret = combine(shares, threshold)?;
    if !digest.matches(&secret) {
        return Err(ShamirError::DigestMismatch);
    }
    Ok(secret)
}

/// Lagrange basis polynomials of the share indices, evaluated at zero
///
/// Indices are assumed distinct and non-zero, so no denominator vanishes.
fn lagrange_basis_at_zero(shares: &[Share]) -> Vec<Gf256> {
    shares
        .iter()
        .map(|si| {
            let xi = Gf256(si.index);
            shares
                .iter()
                .filter(|sj| sj.index != si.index)
                .fold(Gf256::ONE, |acc, sj| {
                    let xj = Gf256(sj.index);
                    // (0 - xj) / (xi - xj); negation is the identity in GF(2^8)
                    acc * (xj / (xi - xj))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(7)
    }

    #[test]
    fn split_rejects_bad_parameters() {
        let mut rng = rng();
        assert_matches!(
            split(b"s", 3, 1, &mut rng),
            Err(ShamirError::InvalidParameters { .. })
        );
        assert_matches!(
            split(b"s", 2, 3, &mut rng),
            Err(ShamirError::InvalidParameters { .. })
        );
        assert_matches!(
            split(b"s", 256, 2, &mut rng),
            Err(ShamirError::InvalidParameters { .. })
        );
        assert_matches!(split(b"", 3, 2, &mut rng), Err(ShamirError::EmptySecret));
    }

    #[test]
    fn shares_are_indexed_from_one() {
        let out = split(b"secret", 5, 3, &mut rng()).unwrap();
        let indices: Vec<u8> = out.shares.iter().map(Share::index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);
        assert!(out.shares.iter().all(|s| s.data().len() == 6));
    }

    #[test]
    fn combine_validates_inputs() {
        let out = split(b"secret", 3, 2, &mut rng()).unwrap();
        let s = &out.shares;

        assert_matches!(
            combine(&s[..1], 2),
            Err(ShamirError::InsufficientShares { provided: 1, threshold: 2 })
        );
        assert_matches!(
            combine(&[s[0].clone(), s[0].clone()], 2),
            Err(ShamirError::DuplicateIndex { index: 1 })
        );
        assert_matches!(
            combine(&[Share::new(0, s[0].data().to_vec()), s[1].clone()], 2),
            Err(ShamirError::ZeroIndex)
        );
        assert_matches!(
            combine(&[s[0].clone(), Share::new(2, vec![1, 2])], 2),
            Err(ShamirError::InconsistentLength { expected: 6, found: 2 })
        );
        assert_matches!(
            combine(&[Share::new(1, vec![]), Share::new(2, vec![])], 2),
            Err(ShamirError::EmptySecret)
        );
    }

    #[test]
    fn share_bytes_round_trip() {
        let share = Share::new(9, vec![1, 2, 3]);
        assert_eq!(&share.to_bytes()[..], &[9, 1, 2, 3]);
        assert_eq!(Share::from_bytes(&share.to_bytes()).unwrap(), share);
        assert_matches!(Share::from_bytes(&[0, 1]), Err(ShamirError::ZeroIndex));
        assert_matches!(Share::from_bytes(&[4]), Err(ShamirError::EmptySecret));
        assert_matches!(Share::from_bytes(&[]), Err(ShamirError::EmptySecret));
    }

    #[test]
    fn debug_does_not_print_share_data() {
        let share = Share::new(1, vec![0xAB; 4]);
        let rendered = format!("{share:?}");
        assert!(!rendered.contains("171"));
        assert!(rendered.contains("len: 4"));
    }
}
