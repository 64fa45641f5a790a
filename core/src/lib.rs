//! Core protocol logic for an anonymous sealed-bid double auction.
//!
//! Bidders commit to a quantity and a bid value, ring-sign the commitments
//! so nobody learns which ring member placed the bid, and encrypt the
//! openings to the auctioneer. The auctioneer verifies each revealed bid
//! against its commitments and signatures, then computes a uniform clearing
//! price over all validly opened bids. Transport of the opaque byte blobs
//! between the parties is left to an external collaborator.

pub mod codec;
pub mod commitment;
pub mod errors;
pub mod identity;
pub mod protocols;
pub mod ring;

pub use errors::ProtocolError;
pub use identity::Identity;
