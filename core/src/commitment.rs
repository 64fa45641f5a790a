//! SHA-256 based commitments.
//!
//! A commitment to `msg` is `c = SHA-256(msg || r)` for 32 random bytes
//! `r`; publishing `c` reveals nothing about `msg` (hiding) and `r` cannot
//! be reused for a different message (binding). Messages are
//! arbitrary-length byte strings, so the scheme also covers re-committing
//! to already-encrypted ciphertexts.

use rand::{CryptoRng, Rng};
use sha2::{Digest, Sha256};

use crate::errors::ProtocolError;

pub const COMMITMENT_LEN: usize = 32;
pub const OPENING_LEN: usize = 32;

/// The public, binding and hiding half of a commitment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Commitment([u8; COMMITMENT_LEN]);

/// The decommitment value handed over when the commitment is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Opening([u8; OPENING_LEN]);

impl Commitment {
    pub fn as_bytes(&self) -> &[u8; COMMITMENT_LEN] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        bytes
            .try_into()
            .map(Self)
            .map_err(|_| ProtocolError::MalformedPackage("commitment must be 32 bytes"))
    }
}

impl Opening {
    pub fn as_bytes(&self) -> &[u8; OPENING_LEN] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        bytes
            .try_into()
            .map(Self)
            .map_err(|_| ProtocolError::MalformedPackage("opening must be 32 bytes"))
    }
}

/// Commits to a message.
pub fn commit<R: Rng + CryptoRng>(msg: &[u8], rng: &mut R) -> (Commitment, Opening) {
    let mut randomness = [0u8; OPENING_LEN];
    rng.fill_bytes(&mut randomness);
    (Commitment(digest(msg, &randomness)), Opening(randomness))
}

/// Checks whether `commitment` is a valid commitment to `msg` under the
/// given opening.
pub fn verify(msg: &[u8], opening: &Opening, commitment: &Commitment) -> bool {
    digest(msg, &opening.0) == commitment.0
}

fn digest(msg: &[u8], randomness: &[u8; OPENING_LEN]) -> [u8; COMMITMENT_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(msg);
    hasher.update(randomness);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_commit_verify() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let (c, d) = commit(b"42", &mut rng);
        assert!(verify(b"42", &d, &c));
    }

    #[test]
    fn test_binding() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let (c1, d1) = commit(b"bid value 10", &mut rng);

        assert!(!verify(b"bid value 11", &d1, &c1));

        let (c2, _) = commit(b"bid value 11", &mut rng);
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_hiding_randomness() {
        // Two commitments to the same value must differ, otherwise the
        // commitment would leak equality of hidden bids.
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let (c1, _) = commit(b"quantity 30", &mut rng);
        let (c2, _) = commit(b"quantity 30", &mut rng);
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_arbitrary_length_messages() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let long: Vec<u8> = (0..4096).map(|i| (i % 256) as u8).collect();
        let (c, d) = commit(&long, &mut rng);
        assert!(verify(&long, &d, &c));

        let (c, d) = commit(&[], &mut rng);
        assert!(verify(&[], &d, &c));
    }

    #[test]
    fn test_from_slice_rejects_wrong_width() {
        assert!(Commitment::from_slice(&[0u8; 31]).is_err());
        assert!(Opening::from_slice(&[0u8; 33]).is_err());
        assert!(Commitment::from_slice(&[0u8; 32]).is_ok());
    }
}
