use thiserror::Error;

use crate::protocols::sealed::bidder::BidderState;

/// Errors raised while building or opening bid packages.
///
/// During bid opening every one of these is non-fatal to the auction: the
/// auctioneer converts them into a failed opening for that single bidder.
/// On the bidder side they are surfaced to the caller.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("ring signature does not verify against the supplied ring")]
    SignatureVerification,
    #[error("opening does not reproduce the commitment")]
    CommitmentMismatch,
    #[error("decryption failed: {0}")]
    Decryption(rsa_encryption::Error),
    #[error("decrypted reveal does not match the submitted commitment or signature")]
    BindingViolation,
    #[error("malformed package: {0}")]
    MalformedPackage(&'static str),
    #[error("ring key could not be imported: {0}")]
    KeyImport(rsa_encryption::Error),
    #[error("key generation failed: {0}")]
    KeyGeneration(rsa_encryption::Error),
    #[error("a ring needs at least one member")]
    RingTooSmall,
    #[error("a ring must contain exactly one signer slot")]
    MalformedRing,
    #[error("ring keys must be wider than the 256-bit chain values")]
    KeyTooSmall,
    #[error("operation not allowed in bidder state {0:?}")]
    InvalidState(BidderState),
}
