use crate::errors::Error;
use crate::key::{PrivateKey, PublicKey};
use crate::prime;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::One;
use rand::{thread_rng, Rng};

/// Public exponent used for every generated key.
const PUBLIC_EXPONENT: u32 = 65_537;

/// Overhead of one encryption block: the leading `00 02`, at least
/// [`MIN_PAD_LEN`] nonzero pad bytes and the `00` separator (RFC 2313).
const BLOCK_OVERHEAD: usize = 11;
const MIN_PAD_LEN: usize = 8;

/// Smallest accepted modulus. Ring signatures fold 256-bit chain values
/// through the key, so the modulus must be strictly wider than that.
const MIN_MODULUS_BITS: u64 = 384;

const MAX_KEYGEN_ATTEMPTS: usize = 16;

/// Represents the public half of an RSA key: the modulus `n` and the
/// public exponent `e`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    n: BigUint,
    e: BigUint,
}

impl RsaPublicKey {
    pub fn n(&self) -> &BigUint {
        &self.n
    }

    pub fn e(&self) -> &BigUint {
        &self.e
    }

    /// Size of the modulus in whole bytes.
    pub fn modulus_len(&self) -> usize {
        self.n.bits().div_ceil(8) as usize
    }

    /// Largest plaintext slice a single encryption block can carry.
    ///
    /// Longer payloads are chunked by [`PublicKey::encrypt`]; for a
    /// 2048-bit modulus this bound is 245 bytes.
    pub fn block_len(&self) -> usize {
        self.modulus_len() - BLOCK_OVERHEAD
    }

    /// Byte-exact export of the key: length-prefixed `n`, then `e`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let n_bytes = self.n.to_bytes_be();
        let e_bytes = self.e.to_bytes_be();
        let mut out = Vec::with_capacity(8 + n_bytes.len() + e_bytes.len());
        out.extend_from_slice(&(n_bytes.len() as u32).to_be_bytes());
        out.extend_from_slice(&n_bytes);
        out.extend_from_slice(&(e_bytes.len() as u32).to_be_bytes());
        out.extend_from_slice(&e_bytes);
        out
    }

    /// Inverse of [`RsaPublicKey::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let (n_bytes, rest) = split_field(bytes)?;
        let (e_bytes, rest) = split_field(rest)?;
        if !rest.is_empty() {
            return Err(Error::MalformedKey);
        }

        let n = BigUint::from_bytes_be(n_bytes);
        let e = BigUint::from_bytes_be(e_bytes);
        if n.bits() < MIN_MODULUS_BITS || e < BigUint::from(3usize) {
            return Err(Error::MalformedKey);
        }

        Ok(Self { n, e })
    }
}

fn split_field(bytes: &[u8]) -> Result<(&[u8], &[u8]), Error> {
    if bytes.len() < 4 {
        return Err(Error::MalformedKey);
    }
    let (prefix, rest) = bytes.split_at(4);
    let len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    if rest.len() < len {
        return Err(Error::MalformedKey);
    }
    Ok(rest.split_at(len))
}

impl PublicKey for RsaPublicKey {
    /// Encrypts an arbitrary-length payload by splitting it into blocks of
    /// [`RsaPublicKey::block_len`] bytes, each framed as
    /// `00 02 <nonzero pad> 00 <data>` before exponentiation. Ciphertext
    /// blocks are emitted at fixed modulus width.
    fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let block_len = self.block_len();
        let modulus_len = self.modulus_len();
        let mut rng = thread_rng();

        let blocks = plaintext.chunks(block_len).count().max(1);
        let mut ciphertext = Vec::with_capacity(blocks * modulus_len);

        let mut encrypt_block = |data: &[u8]| {
            let mut frame = vec![0u8; modulus_len];
            frame[1] = 0x02;
            let pad_end = modulus_len - data.len() - 1;
            for byte in &mut frame[2..pad_end] {
                *byte = rng.gen_range(1..=u8::MAX);
            }
            frame[pad_end + 1..].copy_from_slice(data);

            let m = BigUint::from_bytes_be(&frame);
            let c = m.modpow(&self.e, &self.n);
            ciphertext.extend_from_slice(&pad_left(&c.to_bytes_be(), modulus_len));
        };

        if plaintext.is_empty() {
            encrypt_block(&[]);
        } else {
            for chunk in plaintext.chunks(block_len) {
                encrypt_block(chunk);
            }
        }

        ciphertext
    }
}

/// Represents the private half of an RSA key. The private exponent never
/// leaves this struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPrivateKey {
    public: RsaPublicKey,
    d: BigUint,
}

impl RsaPrivateKey {
    pub fn public(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn d(&self) -> &BigUint {
        &self.d
    }
}

impl PrivateKey for RsaPrivateKey {
    /// Decrypts a sequence of whole ciphertext blocks.
    ///
    /// Fails with [`Error::MalformedCiphertext`] when the input is not a
    /// multiple of the modulus width or a block does not reduce modulo `n`,
    /// and with [`Error::Decryption`] when a decrypted block does not carry
    /// a well-formed padding frame (wrong key, or corrupted bytes).
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        let modulus_len = self.public.modulus_len();
        if ciphertext.is_empty() || ciphertext.len() % modulus_len != 0 {
            return Err(Error::MalformedCiphertext);
        }

        let mut plaintext = Vec::new();
        for block in ciphertext.chunks(modulus_len) {
            let c = BigUint::from_bytes_be(block);
            if c >= *self.public.n() {
                return Err(Error::MalformedCiphertext);
            }

            let m = c.modpow(&self.d, self.public.n());
            let frame = pad_left(&m.to_bytes_be(), modulus_len);
            plaintext.extend_from_slice(unframe(&frame)?);
        }

        Ok(plaintext)
    }
}

/// Strips the `00 02 <pad> 00` framing from a decrypted block.
fn unframe(frame: &[u8]) -> Result<&[u8], Error> {
    if frame.len() < BLOCK_OVERHEAD || frame[0] != 0x00 || frame[1] != 0x02 {
        return Err(Error::Decryption);
    }
    let separator = frame[2..]
        .iter()
        .position(|&byte| byte == 0x00)
        .ok_or(Error::Decryption)?;
    if separator < MIN_PAD_LEN {
        return Err(Error::Decryption);
    }
    Ok(&frame[2 + separator + 1..])
}

fn pad_left(bytes: &[u8], width: usize) -> Vec<u8> {
    let mut out = vec![0u8; width - bytes.len()];
    out.extend_from_slice(bytes);
    out
}

/// Generates public and private keys with a modulus of `bit_size` bits.
///
/// Primes are drawn with their two most significant bits set so the
/// product has the full requested width; prime pairs whose totient shares
/// a factor with `e = 65537` are re-drawn.
pub fn generate_keys(bit_size: u64) -> Result<(RsaPublicKey, RsaPrivateKey), Error> {
    if bit_size < MIN_MODULUS_BITS {
        return Err(Error::LengthPublicKeyModulus);
    }

    let e = BigUint::from(PUBLIC_EXPONENT);
    let one = BigUint::one();

    for _ in 0..MAX_KEYGEN_ATTEMPTS {
        let (p, q) = generate_primes(bit_size / 2, bit_size - bit_size / 2);
        let phi = (&p - &one) * (&q - &one);
        if !phi.gcd(&e).is_one() {
            continue;
        }

        // gcd(e, phi) = 1, so the inverse exists
        let d = match e.modinv(&phi) {
            Some(d) => d,
            None => continue,
        };

        let n = &p * &q;
        let public = RsaPublicKey { n, e };
        let private = RsaPrivateKey { public: public.clone(), d };
        return Ok((public, private));
    }

    Err(Error::CouldNotGenerateKeys)
}

/// Generates two distinct primes for key generation.
fn generate_primes(p_bits: u64, q_bits: u64) -> (BigUint, BigUint) {
    let p = prime::generate_prime(p_bits);
    let mut q = prime::generate_prime(q_bits);

    while p == q {
        q = prime::generate_prime(q_bits);
    }

    (p, q)
}
