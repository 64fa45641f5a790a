//! Uniform-price clearing over the validly opened bid records.
//!
//! Supply is walked in ascending price order, demand in descending order,
//! with cumulative quantities on both sides. Each iteration overwrites the
//! classification and quantity, so only the final iteration's values
//! survive; the touched prices of that final iteration pick the clearing
//! price.

use std::collections::BTreeMap;

use log::info;
use serde::{Deserialize, Serialize};

use super::auctioneer::BidBook;
use super::bidder::BidderType;

/// Terminal classification of the clearing walk. Tags preserve the
/// original wire values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClearingType {
    /// No crossing occurred (an empty side, or demand never meets supply).
    NoTrade,
    /// Cumulative supply exceeded demand: the marginal seller sets the price.
    SellerMarginal,
    /// Cumulative demand exceeded supply: the marginal buyer sets the price.
    BuyerMarginal,
    /// Both sides matched exactly; the price splits the touched pair.
    QuantityAgreement,
}

impl ClearingType {
    pub fn tag(self) -> u8 {
        match self {
            ClearingType::NoTrade => 0,
            ClearingType::SellerMarginal => 1,
            ClearingType::BuyerMarginal => 2,
            ClearingType::QuantityAgreement => 3,
        }
    }
}

/// The round's public result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClearingResult {
    pub quantity: u64,
    pub price: f64,
    pub clearing_type: ClearingType,
}

impl ClearingResult {
    fn no_trade() -> Self {
        Self {
            quantity: 0,
            price: 0.0,
            clearing_type: ClearingType::NoTrade,
        }
    }
}

/// Computes the market clearing quantity, price and classification from
/// all records with `status == true`. Records that never passed opening
/// are ignored.
pub fn uniform_price(book: &BidBook) -> ClearingResult {
    let mut supply: BTreeMap<u64, u64> = BTreeMap::new();
    let mut demand: BTreeMap<u64, u64> = BTreeMap::new();

    for record in book.records().values().filter(|record| record.status) {
        match record.bidder_type {
            Some(BidderType::Seller) => {
                *supply.entry(record.bid_value).or_insert(0) += record.quantity;
            }
            Some(BidderType::Buyer) => {
                *demand.entry(record.bid_value).or_insert(0) += record.quantity;
            }
            None => {}
        }
    }

    // Supply curve ascending, demand curve descending.
    let supply_prices: Vec<u64> = supply.keys().copied().collect();
    let demand_prices: Vec<u64> = demand.keys().rev().copied().collect();

    let mut demand_quantity = 0u64;
    let mut supply_quantity = 0u64;
    let mut clearing_quantity = 0u64;
    let mut clearing_type = ClearingType::NoTrade;
    // Last touched prices; both are rewritten by every iteration.
    let mut buyer_price = 0u64;
    let mut seller_price = 0u64;

    let mut i = 0; // demand cursor
    let mut j = 0; // supply cursor
    while j < supply_prices.len()
        && i < demand_prices.len()
        && demand_prices[i] >= supply_prices[j]
    {
        let buy_quantity = demand_quantity + demand[&demand_prices[i]];
        let sell_quantity = supply_quantity + supply[&supply_prices[j]];

        if buy_quantity > sell_quantity {
            // Supply exhausted at this price level: the buyer side is
            // limiting, so the buyer price is the touched one.
            supply_quantity = sell_quantity;
            clearing_quantity = sell_quantity;
            buyer_price = demand_prices[i];
            seller_price = demand_prices[i];
            j += 1;
            clearing_type = ClearingType::BuyerMarginal;
        } else if buy_quantity < sell_quantity {
            demand_quantity = buy_quantity;
            clearing_quantity = buy_quantity;
            buyer_price = supply_prices[j];
            seller_price = supply_prices[j];
            i += 1;
            clearing_type = ClearingType::SellerMarginal;
        } else {
            supply_quantity = buy_quantity;
            demand_quantity = buy_quantity;
            clearing_quantity = buy_quantity;
            buyer_price = demand_prices[i];
            seller_price = supply_prices[j];
            i += 1;
            j += 1;
            clearing_type = ClearingType::QuantityAgreement;
        }
    }

    let result = match clearing_type {
        ClearingType::NoTrade => ClearingResult::no_trade(),
        ClearingType::SellerMarginal => ClearingResult {
            quantity: clearing_quantity,
            price: seller_price as f64,
            clearing_type,
        },
        ClearingType::BuyerMarginal => ClearingResult {
            quantity: clearing_quantity,
            price: buyer_price as f64,
            clearing_type,
        },
        ClearingType::QuantityAgreement => ClearingResult {
            quantity: clearing_quantity,
            price: (buyer_price as f64 + seller_price as f64) / 2.0,
            clearing_type,
        },
    };

    info!(
        "clearing: quantity {}, price {}, type {:?}",
        result.quantity, result.price, result.clearing_type
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::sealed::auctioneer::BidRecord;

    fn record(quantity: u64, bid_value: u64, bidder_type: BidderType) -> BidRecord {
        BidRecord {
            quantity,
            bid_value,
            bidder_type: Some(bidder_type),
            status: true,
        }
    }

    fn book(entries: &[(u64, u64, BidderType)]) -> BidBook {
        let mut book = BidBook::new();
        for (index, &(quantity, bid_value, bidder_type)) in entries.iter().enumerate() {
            book.insert(format!("0x{index:02x}"), record(quantity, bid_value, bidder_type));
        }
        book
    }

    #[test]
    fn test_regression_fixture() {
        // Sellers {5: 30, 8: 20}, buyers {10: 25, 6: 15}: the walk takes
        // the 25@10 demand against 30@5 supply (seller marginal), then the
        // remaining 15@6 pushes cumulative demand to 40 against 30 of
        // supply, leaving the buyer side marginal at price 6.
        let book = book(&[
            (30, 5, BidderType::Seller),
            (20, 8, BidderType::Seller),
            (25, 10, BidderType::Buyer),
            (15, 6, BidderType::Buyer),
        ]);

        let result = uniform_price(&book);
        assert_eq!(
            result,
            ClearingResult {
                quantity: 30,
                price: 6.0,
                clearing_type: ClearingType::BuyerMarginal,
            }
        );
    }

    #[test]
    fn test_quantity_agreement_averages_prices() {
        let book = book(&[
            (10, 4, BidderType::Seller),
            (10, 9, BidderType::Buyer),
        ]);

        let result = uniform_price(&book);
        assert_eq!(result.quantity, 10);
        assert_eq!(result.price, 6.5);
        assert_eq!(result.clearing_type, ClearingType::QuantityAgreement);
    }

    #[test]
    fn test_identical_prices_aggregate_quantity() {
        // Two sellers at the same price act as one supply step.
        let book = book(&[
            (10, 5, BidderType::Seller),
            (20, 5, BidderType::Seller),
            (30, 7, BidderType::Buyer),
        ]);

        let result = uniform_price(&book);
        assert_eq!(result.quantity, 30);
        assert_eq!(result.clearing_type, ClearingType::QuantityAgreement);
        assert_eq!(result.price, 6.0);
    }

    #[test]
    fn test_seller_marginal_prices_at_supply_step() {
        let book = book(&[
            (50, 3, BidderType::Seller),
            (20, 8, BidderType::Buyer),
        ]);

        let result = uniform_price(&book);
        assert_eq!(result.quantity, 20);
        assert_eq!(result.price, 3.0);
        assert_eq!(result.clearing_type, ClearingType::SellerMarginal);
    }

    #[test]
    fn test_price_tie_on_cross_condition_still_trades() {
        // demand price == supply price is still a crossing.
        let book = book(&[
            (10, 5, BidderType::Seller),
            (10, 5, BidderType::Buyer),
        ]);

        let result = uniform_price(&book);
        assert_eq!(result.quantity, 10);
        assert_eq!(result.price, 5.0);
        assert_eq!(result.clearing_type, ClearingType::QuantityAgreement);
    }

    #[test]
    fn test_no_crossing_yields_no_trade() {
        // Best buyer below best seller: the loop never runs.
        let book = book(&[
            (10, 9, BidderType::Seller),
            (10, 4, BidderType::Buyer),
        ]);

        assert_eq!(uniform_price(&book), ClearingResult::no_trade());
    }

    #[test]
    fn test_empty_sides() {
        assert_eq!(uniform_price(&BidBook::new()), ClearingResult::no_trade());

        let sellers_only = book(&[(10, 2, BidderType::Seller)]);
        assert_eq!(uniform_price(&sellers_only), ClearingResult::no_trade());

        let buyers_only = book(&[(10, 2, BidderType::Buyer)]);
        assert_eq!(uniform_price(&buyers_only), ClearingResult::no_trade());
    }

    #[test]
    fn test_invalid_records_are_ignored() {
        let mut book = book(&[
            (10, 4, BidderType::Seller),
            (10, 9, BidderType::Buyer),
        ]);
        book.insert(
            "0xbad",
            BidRecord {
                quantity: 1000,
                bid_value: 1,
                bidder_type: Some(BidderType::Seller),
                status: false,
            },
        );

        let result = uniform_price(&book);
        assert_eq!(result.quantity, 10);
        assert_eq!(result.clearing_type, ClearingType::QuantityAgreement);
    }
}
