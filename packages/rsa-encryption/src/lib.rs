//! # RSA public-key encryption
//!
//! `rsa_encryption` provides RSA key generation over randomly drawn primes
//! and block-based encryption of arbitrary-length byte payloads. It exists
//! so that an auctioneer can receive payloads only it can read, and so that
//! ring signatures can be built over the same keys.

/// Errors during key generation and decryption.
pub mod errors;
/// Generic traits for operations on keys.
pub mod key;
/// Prime generation and primality testing functions.
pub mod prime;
/// RSA keys and the chunked block cipher built on them.
pub mod rsa;

pub use errors::Error;
pub use key::{PrivateKey, PublicKey};
pub use rsa::{generate_keys, RsaPrivateKey, RsaPublicKey};
