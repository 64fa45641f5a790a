use log::{debug, info};
use rand::seq::SliceRandom;
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::commitment;
use crate::errors::ProtocolError;
use crate::identity::Identity;
use crate::ring::{Ring, RingSlot};
use rsa_encryption::{PublicKey, RsaPublicKey};

use super::AuctionConfig;

/// Side of the market a bidder trades on. Tags preserve the original wire
/// values: 0 = generation (seller), 1 = consumption (buyer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BidderType {
    Seller,
    Buyer,
}

impl BidderType {
    pub fn tag(self) -> u8 {
        match self {
            BidderType::Seller => 0,
            BidderType::Buyer => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(BidderType::Seller),
            1 => Some(BidderType::Buyer),
            _ => None,
        }
    }
}

/// Bidder lifecycle. Each protocol call is valid in exactly one state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BidderState {
    Created,
    RingBuilt,
    BidCommitted,
    BidSubmitted,
    BidOpened,
}

/// Phase-1 package handed to the transport layer: the two commitments,
/// the combined ring signature, the exported ring and the side tag.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BidSubmission {
    pub c_quantity: Vec<u8>,
    pub c_bid_value: Vec<u8>,
    pub sig: Vec<u8>,
    pub ring: Vec<u8>,
    pub bidder_type: BidderType,
}

/// Phase-2 opening tokens, revealed only after every submission is in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BidOpening {
    pub tau_1: Vec<u8>,
    pub tau_2: Vec<u8>,
}

/// A bidder with a fixed quantity, bid value and side for this round.
pub struct Bidder {
    identity: Identity,
    quantity: u64,
    bid_value: u64,
    bidder_type: BidderType,
    auctioneer_key: RsaPublicKey,
    value_width: usize,
    state: BidderState,
    ring: Option<Ring>,
    tau_1: Option<Vec<u8>>,
    tau_2: Option<Vec<u8>>,
}

impl Bidder {
    pub fn new(
        identity: Identity,
        quantity: u64,
        bid_value: u64,
        bidder_type: BidderType,
        auctioneer_key: RsaPublicKey,
        config: &AuctionConfig,
    ) -> Self {
        Self {
            identity,
            quantity,
            bid_value,
            bidder_type,
            auctioneer_key,
            value_width: config.value_width,
            state: BidderState::Created,
            ring: None,
            tau_1: None,
            tau_2: None,
        }
    }

    pub fn address(&self) -> &str {
        self.identity.address()
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        self.identity.public_key()
    }

    pub fn state(&self) -> BidderState {
        self.state
    }

    pub fn bidder_type(&self) -> BidderType {
        self.bidder_type
    }

    /// Builds a ring of possible signers out of the published keys: this
    /// bidder, the auctioneer, and a random number of decoys, shuffled so
    /// the slot position leaks nothing. The signer index stays private.
    pub fn make_ring<R: Rng + CryptoRng>(
        &mut self,
        keys: &[RsaPublicKey],
        rng: &mut R,
    ) -> Result<(), ProtocolError> {
        if self.state != BidderState::Created {
            return Err(ProtocolError::InvalidState(self.state));
        }

        let decoys: Vec<&RsaPublicKey> = keys
            .iter()
            .filter(|key| *key != self.identity.public_key() && **key != self.auctioneer_key)
            .collect();
        let decoy_count = rng.gen_range(0..=decoys.len());

        let mut slots = vec![
            RingSlot::Signer(self.identity.private_key().clone()),
            RingSlot::Decoy(self.auctioneer_key.clone()),
        ];
        slots.extend(
            decoys
                .choose_multiple(rng, decoy_count)
                .map(|key| RingSlot::Decoy((*key).clone())),
        );
        slots.shuffle(rng);

        let ring = Ring::new(slots)?;
        info!(
            "ring of size {} created for bidder at {}",
            ring.len(),
            self.identity.address()
        );
        debug!("signer hidden at index {}", ring.signer_index());

        self.ring = Some(ring);
        self.state = BidderState::RingBuilt;
        Ok(())
    }

    /// Exports the ring as a length-prefixed concatenation of public keys,
    /// byte-exact reversible on the auctioneer side.
    pub fn export_ring(&self) -> Result<Vec<u8>, ProtocolError> {
        let ring = self
            .ring
            .as_ref()
            .ok_or(ProtocolError::InvalidState(self.state))?;
        let exports: Vec<Vec<u8>> = ring
            .public_keys()
            .iter()
            .map(|key| key.to_bytes())
            .collect();
        let refs: Vec<&[u8]> = exports.iter().map(|e| e.as_slice()).collect();
        Ok(codec::concatenate(&refs))
    }

    /// Builds the two-phase bid package.
    ///
    /// Commits to quantity and bid value, ring-signs both commitments,
    /// encrypts the `c || sigma || value || d` bundles to the auctioneer,
    /// and commits again to each ciphertext. The outer commitment lets the
    /// auctioneer prove post-hoc that the opened ciphertext is exactly the
    /// one referenced at submission time, so a bid cannot be substituted
    /// between submission and opening.
    pub fn bid<R: Rng + CryptoRng>(
        &mut self,
        rng: &mut R,
    ) -> Result<BidSubmission, ProtocolError> {
        if self.state != BidderState::RingBuilt {
            return Err(ProtocolError::InvalidState(self.state));
        }
        let ring = self.ring.as_ref().ok_or(ProtocolError::InvalidState(self.state))?;

        info!("generating bid for bidder at {}", self.identity.address());
        let quantity_bytes = codec::encode_value(self.quantity, self.value_width);
        let bid_value_bytes = codec::encode_value(self.bid_value, self.value_width);

        let (c_quantity, d_quantity) = commitment::commit(&quantity_bytes, rng);
        let (c_bid_value, d_bid_value) = commitment::commit(&bid_value_bytes, rng);
        self.state = BidderState::BidCommitted;

        debug!("ring-signing both commitments");
        let sigma_quantity = ring.sign(c_quantity.as_bytes(), rng);
        let sigma_bid_value = ring.sign(c_bid_value.as_bytes(), rng);

        let quantity_msg = codec::concatenate(&[
            c_quantity.as_bytes(),
            &sigma_quantity,
            &quantity_bytes,
            d_quantity.as_bytes(),
        ]);
        let bid_value_msg = codec::concatenate(&[
            c_bid_value.as_bytes(),
            &sigma_bid_value,
            &bid_value_bytes,
            d_bid_value.as_bytes(),
        ]);

        debug!("encrypting opening bundles to the auctioneer");
        let cipher_quantity = self.auctioneer_key.encrypt(&quantity_msg);
        let cipher_bid_value = self.auctioneer_key.encrypt(&bid_value_msg);

        let (c1_quantity, d1_quantity) = commitment::commit(&cipher_quantity, rng);
        let (c1_bid_value, d1_bid_value) = commitment::commit(&cipher_bid_value, rng);

        let sig = codec::concatenate(&[
            &sigma_quantity,
            &sigma_bid_value,
            c1_quantity.as_bytes(),
            c1_bid_value.as_bytes(),
        ]);
        self.tau_1 = Some(codec::concatenate(&[&cipher_quantity, d1_quantity.as_bytes()]));
        self.tau_2 = Some(codec::concatenate(&[&cipher_bid_value, d1_bid_value.as_bytes()]));

        self.state = BidderState::BidSubmitted;
        Ok(BidSubmission {
            c_quantity: c_quantity.as_bytes().to_vec(),
            c_bid_value: c_bid_value.as_bytes().to_vec(),
            sig,
            ring: self.export_ring()?,
            bidder_type: self.bidder_type,
        })
    }

    /// Reveals the opening tokens retained by [`Bidder::bid`].
    pub fn open_bid(&mut self) -> Result<BidOpening, ProtocolError> {
        if self.state != BidderState::BidSubmitted {
            return Err(ProtocolError::InvalidState(self.state));
        }

        let tau_1 = self.tau_1.clone().ok_or(ProtocolError::InvalidState(self.state))?;
        let tau_2 = self.tau_2.clone().ok_or(ProtocolError::InvalidState(self.state))?;

        self.state = BidderState::BidOpened;
        info!("bidder at {} revealed opening tokens", self.identity.address());
        Ok(BidOpening { tau_1, tau_2 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use crate::ring;

    fn bidder_with_auctioneer() -> (Bidder, Identity) {
        let config = AuctionConfig::low_security();
        let auctioneer = Identity::generate("0xa0", config.modulus_bits).unwrap();
        let identity = Identity::generate("0xb1", config.modulus_bits).unwrap();
        let bidder = Bidder::new(
            identity,
            30,
            5,
            BidderType::Seller,
            auctioneer.public_key().clone(),
            &config,
        );
        (bidder, auctioneer)
    }

    #[test]
    fn test_state_machine_enforced() {
        let (mut bidder, _) = bidder_with_auctioneer();
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        // bid() and open_bid() before make_ring() must fail.
        assert!(matches!(bidder.bid(&mut rng), Err(ProtocolError::InvalidState(_))));
        assert!(matches!(bidder.open_bid(), Err(ProtocolError::InvalidState(_))));

        bidder.make_ring(&[], &mut rng).unwrap();
        assert_eq!(bidder.state(), BidderState::RingBuilt);
        assert!(matches!(
            bidder.make_ring(&[], &mut rng),
            Err(ProtocolError::InvalidState(BidderState::RingBuilt))
        ));

        bidder.bid(&mut rng).unwrap();
        assert_eq!(bidder.state(), BidderState::BidSubmitted);

        bidder.open_bid().unwrap();
        assert_eq!(bidder.state(), BidderState::BidOpened);
        assert!(matches!(bidder.open_bid(), Err(ProtocolError::InvalidState(_))));
    }

    #[test]
    fn test_ring_always_contains_self_and_auctioneer() {
        let (mut bidder, auctioneer) = bidder_with_auctioneer();
        let mut rng = ChaCha20Rng::seed_from_u64(2);

        // No published keys at all: the ring is still signer + auctioneer.
        bidder.make_ring(&[], &mut rng).unwrap();
        let ring_bytes = bidder.export_ring().unwrap();
        let keys = codec::parse(&ring_bytes).unwrap();
        assert_eq!(keys.len(), 2);

        let exported: Vec<Vec<u8>> = keys;
        assert!(exported.contains(&bidder.public_key().to_bytes()));
        assert!(exported.contains(&auctioneer.public_key().to_bytes()));
    }

    #[test]
    fn test_signature_verifies_against_exported_ring() {
        let (mut bidder, _) = bidder_with_auctioneer();
        let mut rng = ChaCha20Rng::seed_from_u64(3);

        bidder.make_ring(&[], &mut rng).unwrap();
        let submission = bidder.bid(&mut rng).unwrap();

        let keys: Vec<RsaPublicKey> = codec::parse(&submission.ring)
            .unwrap()
            .iter()
            .map(|k| RsaPublicKey::from_bytes(k).unwrap())
            .collect();
        let [sigma_quantity, sigma_bid_value, _, _] =
            codec::parse_n::<4>(&submission.sig).unwrap();

        assert!(ring::verify(&sigma_quantity, &submission.c_quantity, &keys));
        assert!(ring::verify(&sigma_bid_value, &submission.c_bid_value, &keys));
    }

    #[test]
    fn test_bidder_type_tags() {
        assert_eq!(BidderType::Seller.tag(), 0);
        assert_eq!(BidderType::Buyer.tag(), 1);
        assert_eq!(BidderType::from_tag(0), Some(BidderType::Seller));
        assert_eq!(BidderType::from_tag(1), Some(BidderType::Buyer));
        assert_eq!(BidderType::from_tag(2), None);
    }
}
