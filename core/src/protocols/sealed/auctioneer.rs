use std::collections::HashMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::commitment::{self, Commitment, Opening};
use crate::errors::ProtocolError;
use crate::identity::Identity;
use crate::ring;
use rsa_encryption::{PrivateKey, RsaPublicKey};

use super::bidder::BidderType;

/// One bidder's opened bid, keyed by address in the [`BidBook`].
///
/// A provisional record (all zero, no side, `status == false`) is written
/// when opening starts and overwritten only when every check passes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BidRecord {
    pub quantity: u64,
    pub bid_value: u64,
    pub bidder_type: Option<BidderType>,
    pub status: bool,
}

impl BidRecord {
    fn provisional() -> Self {
        Self {
            quantity: 0,
            bid_value: 0,
            bidder_type: None,
            status: false,
        }
    }
}

/// Per-round bid-record table. Explicit state passed to each call, so a
/// fresh book starts a fresh round.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BidBook {
    records: HashMap<String, BidRecord>,
}

impl BidBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &HashMap<String, BidRecord> {
        &self.records
    }

    pub fn get(&self, address: &str) -> Option<&BidRecord> {
        self.records.get(address)
    }

    pub fn insert(&mut self, address: impl Into<String>, record: BidRecord) {
        self.records.insert(address.into(), record);
    }

    /// Removes a bidder from the round, e.g. after a failed opening when
    /// the transport layer issues the penalty.
    pub fn evict(&mut self, address: &str) -> Option<BidRecord> {
        self.records.remove(address)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The auctioneer: opens revealed bids and clears the market.
pub struct Auctioneer {
    identity: Identity,
}

impl Auctioneer {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        self.identity.public_key()
    }

    pub fn address(&self) -> &str {
        self.identity.address()
    }

    /// Opens the bid for the bidder at `address` and stores it.
    ///
    /// Writes a provisional invalid record first, then runs the check
    /// chain: ring signatures over both commitments, outer commitments to
    /// the ciphertexts, decryption, binding of the embedded commitment and
    /// signature to the submitted ones, and finally the inner value
    /// commitments. Only full success overwrites the record. Any failure
    /// returns `false` and leaves the provisional record for the caller to
    /// evict and punish; it never aborts the round.
    #[allow(clippy::too_many_arguments)]
    pub fn bid_opening(
        &self,
        book: &mut BidBook,
        address: &str,
        ring_bytes: &[u8],
        c_quantity: &[u8],
        c_bid_value: &[u8],
        sig: &[u8],
        tau_1: &[u8],
        tau_2: &[u8],
        bidder_type: BidderType,
    ) -> bool {
        info!("opening bid for bidder at {address}");
        book.insert(address, BidRecord::provisional());

        match self.try_open(ring_bytes, c_quantity, c_bid_value, sig, tau_1, tau_2) {
            Ok((quantity, bid_value)) => {
                debug!("bid opening succeeded for {address}");
                book.insert(
                    address,
                    BidRecord {
                        quantity,
                        bid_value,
                        bidder_type: Some(bidder_type),
                        status: true,
                    },
                );
                true
            }
            Err(err) => {
                warn!("bid opening failed for {address}: {err}");
                false
            }
        }
    }

    fn try_open(
        &self,
        ring_bytes: &[u8],
        c_quantity: &[u8],
        c_bid_value: &[u8],
        sig: &[u8],
        tau_1: &[u8],
        tau_2: &[u8],
    ) -> Result<(u64, u64), ProtocolError> {
        let ring_keys = parse_ring(ring_bytes)?;
        let [sigma_quantity, sigma_bid_value, c1_quantity, c1_bid_value] =
            codec::parse_n::<4>(sig)?;
        let c1_quantity = Commitment::from_slice(&c1_quantity)?;
        let c1_bid_value = Commitment::from_slice(&c1_bid_value)?;

        if !ring::verify(&sigma_quantity, c_quantity, &ring_keys)
            || !ring::verify(&sigma_bid_value, c_bid_value, &ring_keys)
        {
            return Err(ProtocolError::SignatureVerification);
        }
        debug!("ring signatures verified");

        let [cipher_quantity, d1_quantity] = codec::parse_n::<2>(tau_1)?;
        let [cipher_bid_value, d1_bid_value] = codec::parse_n::<2>(tau_2)?;
        let d1_quantity = Opening::from_slice(&d1_quantity)?;
        let d1_bid_value = Opening::from_slice(&d1_bid_value)?;

        if !commitment::verify(&cipher_quantity, &d1_quantity, &c1_quantity)
            || !commitment::verify(&cipher_bid_value, &d1_bid_value, &c1_bid_value)
        {
            return Err(ProtocolError::CommitmentMismatch);
        }
        debug!("ciphertext commitments verified");

        let private_key = self.identity.private_key();
        let quantity_msg = private_key
            .decrypt(&cipher_quantity)
            .map_err(ProtocolError::Decryption)?;
        let bid_value_msg = private_key
            .decrypt(&cipher_bid_value)
            .map_err(ProtocolError::Decryption)?;

        let quantity = open_value(&quantity_msg, c_quantity, &sigma_quantity)?;
        let bid_value = open_value(&bid_value_msg, c_bid_value, &sigma_bid_value)?;

        Ok((quantity, bid_value))
    }
}

/// Checks one decrypted `c || sigma || value || d` bundle against the
/// submitted commitment and signature, then opens the value commitment.
fn open_value(
    msg: &[u8],
    submitted_commitment: &[u8],
    submitted_sigma: &[u8],
) -> Result<u64, ProtocolError> {
    let [c_tilde, sigma_tilde, value_bytes, d] = codec::parse_n::<4>(msg)?;

    // The embedded copies bind the encrypted reveal to what was signed at
    // submission time.
    if c_tilde != submitted_commitment || sigma_tilde != submitted_sigma {
        return Err(ProtocolError::BindingViolation);
    }

    let commitment_value = Commitment::from_slice(submitted_commitment)?;
    let opening = Opening::from_slice(&d)?;
    if !commitment::verify(&value_bytes, &opening, &commitment_value) {
        return Err(ProtocolError::CommitmentMismatch);
    }

    codec::decode_value(&value_bytes)
}

fn parse_ring(ring_bytes: &[u8]) -> Result<Vec<RsaPublicKey>, ProtocolError> {
    codec::parse(ring_bytes)?
        .iter()
        .map(|key| RsaPublicKey::from_bytes(key).map_err(ProtocolError::KeyImport))
        .collect()
}
