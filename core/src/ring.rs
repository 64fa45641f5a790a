//! RSA-based ring signatures.
//!
//! Rivest-Shamir-Tauman scheme with the combining function replaced by a
//! hash-closed loop: the signer seeds the chain with a random value,
//! walks every other member's slot with a random `x` pushed through that
//! member's public RSA permutation, and finally solves for their own `x`
//! with the private exponent so the chain closes on the glue value.
//! Verification recomputes the chain over all public keys and succeeds iff
//! it returns to the glue, proving that *some* ring member signed without
//! revealing which one.

use num_bigint::BigUint;
use num_traits::Zero;
use rand::{CryptoRng, Rng};
use sha2::{Digest, Sha256};

use crate::errors::ProtocolError;
use rsa_encryption::{RsaPrivateKey, RsaPublicKey};

/// Width of the chain values and of the random `x` draws, in bytes.
const CHAIN_BYTES: usize = 32;

/// One position in a ring. Every member's slot carries only their public
/// key; the signer's slot carries signing material instead, which keeps
/// public and private key values out of a single untagged sequence.
#[derive(Clone, Debug)]
pub enum RingSlot {
    Decoy(RsaPublicKey),
    Signer(RsaPrivateKey),
}

impl RingSlot {
    pub fn public_key(&self) -> &RsaPublicKey {
        match self {
            RingSlot::Decoy(key) => key,
            RingSlot::Signer(keypair) => keypair.public(),
        }
    }
}

/// An ordered ring of possible signers with exactly one signer slot.
#[derive(Clone, Debug)]
pub struct Ring {
    slots: Vec<RingSlot>,
    signer_index: usize,
}

impl Ring {
    /// Validates the slot sequence: at least one slot, exactly one signer,
    /// and every modulus wide enough to embed the 256-bit chain values.
    pub fn new(slots: Vec<RingSlot>) -> Result<Self, ProtocolError> {
        if slots.is_empty() {
            return Err(ProtocolError::RingTooSmall);
        }

        let mut signer_index = None;
        for (index, slot) in slots.iter().enumerate() {
            if slot.public_key().n().bits() <= (CHAIN_BYTES * 8) as u64 {
                return Err(ProtocolError::KeyTooSmall);
            }
            if let RingSlot::Signer(_) = slot {
                if signer_index.replace(index).is_some() {
                    return Err(ProtocolError::MalformedRing);
                }
            }
        }

        match signer_index {
            Some(signer_index) => Ok(Self { slots, signer_index }),
            None => Err(ProtocolError::MalformedRing),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The ring's public keys in slot order, as a verifier sees them.
    pub fn public_keys(&self) -> Vec<RsaPublicKey> {
        self.slots.iter().map(|slot| slot.public_key().clone()).collect()
    }

    pub(crate) fn signer_index(&self) -> usize {
        self.signer_index
    }

    /// Signs `msg` on behalf of the whole ring.
    ///
    /// The signature serializes as `[glue, x_0, .., x_{len-1}]`, each value
    /// at the ring's fixed field width, big-endian.
    pub fn sign<R: Rng + CryptoRng>(&self, msg: &[u8], rng: &mut R) -> Vec<u8> {
        let keys = self.public_keys();
        let width = field_width(&keys);
        let key = chain_key(msg);
        let s = self.signer_index;

        let seed = random_chain_value(rng);
        let mut xs = vec![BigUint::zero(); self.slots.len()];

        let mut v = chain_step(&seed, &key, width);
        for i in (s + 1)..self.slots.len() {
            xs[i] = random_chain_value(rng);
            let y = xs[i].modpow(keys[i].e(), keys[i].n());
            v = chain_step(&(&v ^ &y), &key, width);
        }

        let glue = v.clone();
        for i in 0..s {
            xs[i] = random_chain_value(rng);
            let y = xs[i].modpow(keys[i].e(), keys[i].n());
            v = chain_step(&(&v ^ &y), &key, width);
        }

        // Close the loop: solve for the signer's slot with the private
        // exponent so that applying the public permutation yields v' ^ v.
        let RingSlot::Signer(keypair) = &self.slots[s] else {
            unreachable!("validated at construction");
        };
        let y_s = &seed ^ &v;
        xs[s] = y_s.modpow(keypair.d(), keypair.public().n());

        let mut out = Vec::with_capacity((self.slots.len() + 1) * width);
        out.extend_from_slice(&encode(&glue, width));
        for x in &xs {
            out.extend_from_slice(&encode(x, width));
        }
        out
    }
}

/// Verifies a ring signature against the full set of public keys.
pub fn verify(signature: &[u8], msg: &[u8], keys: &[RsaPublicKey]) -> bool {
    if keys.is_empty() {
        return false;
    }

    let width = field_width(keys);
    if signature.len() != (keys.len() + 1) * width {
        return false;
    }

    let mut values = signature
        .chunks(width)
        .map(BigUint::from_bytes_be);
    let glue = match values.next() {
        Some(glue) => glue,
        None => return false,
    };

    let key = chain_key(msg);
    let mut v = glue.clone();
    for (x, member) in values.zip(keys) {
        let y = x.modpow(member.e(), member.n());
        v = chain_step(&(&v ^ &y), &key, width);
    }

    v == glue
}

/// Keyed one-way function `E_k(v) = SHA-256(encode(v) || k)` interpreted
/// as a 256-bit integer.
fn chain_step(value: &BigUint, key: &[u8; 32], width: usize) -> BigUint {
    let mut hasher = Sha256::new();
    hasher.update(encode(value, width));
    hasher.update(key);
    BigUint::from_bytes_be(&hasher.finalize())
}

fn chain_key(msg: &[u8]) -> [u8; 32] {
    Sha256::digest(msg).into()
}

fn random_chain_value<R: Rng + CryptoRng>(rng: &mut R) -> BigUint {
    let mut bytes = [0u8; CHAIN_BYTES];
    rng.fill_bytes(&mut bytes);
    BigUint::from_bytes_be(&bytes)
}

/// Fixed field width for one ring: wide enough for the chain values and
/// for any member's modulus-sized `x`.
fn field_width(keys: &[RsaPublicKey]) -> usize {
    keys.iter()
        .map(|key| key.modulus_len())
        .max()
        .unwrap_or(0)
        .max(CHAIN_BYTES)
}

fn encode(value: &BigUint, width: usize) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    let mut out = vec![0u8; width - bytes.len()];
    out.extend_from_slice(&bytes);
    out
}
