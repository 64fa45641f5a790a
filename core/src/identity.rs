//! Participant identity: a keypair plus an opaque transport address.
//!
//! Bidders and the auctioneer share nothing but this value type, so both
//! roles embed it by composition.

use crate::errors::ProtocolError;
use rsa_encryption::{generate_keys, RsaPrivateKey, RsaPublicKey};

#[derive(Clone, Debug)]
pub struct Identity {
    public_key: RsaPublicKey,
    private_key: RsaPrivateKey,
    address: String,
}

impl Identity {
    /// Creates an identity with a freshly generated keypair.
    pub fn generate(
        address: impl Into<String>,
        modulus_bits: u64,
    ) -> Result<Self, ProtocolError> {
        let (public_key, private_key) =
            generate_keys(modulus_bits).map_err(ProtocolError::KeyGeneration)?;
        Ok(Self {
            public_key,
            private_key,
            address: address.into(),
        })
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}
