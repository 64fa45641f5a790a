use crate::errors::Error;

/// Generic trait for operations on a public key.
pub trait PublicKey {
    fn encrypt(&self, plaintext: &[u8]) -> Vec<u8>;
}

/// Generic trait for operations on a private key.
pub trait PrivateKey {
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, Error>;
}
