//! Sealed-bid double auction with ring-signed, committed bids.
//!
//! A round runs in two phases. Every bidder first submits commitments to
//! its quantity and bid value, ring-signed so the submission is
//! authenticated by the group without identifying the signer. Once all
//! submissions are in, bidders reveal their opening tokens, the
//! auctioneer opens and checks each bid, and the market clears at a
//! uniform price.

pub mod auctioneer;
pub mod bidder;
pub mod clearing;

pub use auctioneer::{Auctioneer, BidBook, BidRecord};
pub use bidder::{BidOpening, BidSubmission, Bidder, BidderState, BidderType};
pub use clearing::{uniform_price, ClearingResult, ClearingType};

use serde::{Deserialize, Serialize};

/// Round-wide parameters shared by every participant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuctionConfig {
    /// RSA modulus size for every participant keypair.
    pub modulus_bits: u64,
    /// Fixed byte width of encoded quantities and bid values.
    pub value_width: usize,
}

impl AuctionConfig {
    pub fn new(modulus_bits: u64, value_width: usize) -> Self {
        Self {
            modulus_bits,
            value_width,
        }
    }

    /// Small keys for tests. Trivially factorable, never for production.
    pub fn low_security() -> Self {
        Self {
            modulus_bits: 512,
            value_width: 32,
        }
    }
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            modulus_bits: 2048,
            value_width: 32,
        }
    }
}
