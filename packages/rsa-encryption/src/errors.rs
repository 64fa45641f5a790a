use thiserror::Error;

/// Error type for key generation and RSA block processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("length of public key modulus should be at least 384 bits")]
    LengthPublicKeyModulus,
    #[error("could not generate private/public keys")]
    CouldNotGenerateKeys,
    #[error("ciphertext is not a sequence of whole blocks for this key")]
    MalformedCiphertext,
    #[error("block was not produced for this key or is corrupted")]
    Decryption,
    #[error("malformed public key encoding")]
    MalformedKey,
}
