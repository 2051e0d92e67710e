//! Resource trading between players.
//!
//! An offer names one resource amount given and one requested. Submitting
//! escrows the offered amount from the player's empire stock, so a matched
//! offer can always be paid. Settlement walks open offers in submission
//! order and pairs each with the earliest compatible counter-offer; offers
//! that stay unmatched for the configured number of cycles expire and are
//! refunded.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ActionError;
use crate::ids::{PlayerId, TradeId};
use crate::resources::{Resource, ResourceStock};

/// An amount of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeAmount {
    /// Resource kind.
    pub resource: Resource,
    /// Quantity.
    pub amount: u32,
}

impl TradeAmount {
    /// Create an amount.
    #[must_use]
    pub const fn new(resource: Resource, amount: u32) -> Self {
        Self { resource, amount }
    }

    /// Credit this amount to a stock.
    pub fn credit(self, stock: &mut ResourceStock) {
        stock.add(self.resource, self.amount);
    }
}

/// Lifecycle of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    /// Open and waiting for a counter-offer.
    Submitted,
    /// Paired with a counter-offer and paid out.
    Matched,
    /// Withdrawn by its owner.
    Cancelled,
    /// Timed out unmatched.
    Expired,
}

/// One trade offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOffer {
    /// Identifier; ascending ids are submission order.
    pub id: TradeId,
    /// Offering player.
    pub player: PlayerId,
    /// Escrowed amount given.
    pub offered: TradeAmount,
    /// Amount wanted in return.
    pub requested: TradeAmount,
    /// Cycle in which the offer was submitted.
    pub submitted_cycle: u64,
    /// Lifecycle status.
    pub status: TradeStatus,
}

impl TradeOffer {
    /// Whether `other` mirrors this offer and each side covers the other.
    #[must_use]
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.player != other.player
            && self.offered.resource == other.requested.resource
            && self.requested.resource == other.offered.resource
            && self.offered.amount >= other.requested.amount
            && other.offered.amount >= self.requested.amount
    }
}

/// Outcome of settling one offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// Two offers were paired. `first` was submitted earlier.
    Matched {
        /// Earlier offer.
        first: TradeOffer,
        /// Counter-offer.
        second: TradeOffer,
    },
    /// An offer expired and its escrow is due back to its owner.
    Expired(TradeOffer),
}

/// All open offers of a game.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TradeBook {
    offers: BTreeMap<TradeId, TradeOffer>,
    next_id: u32,
}

impl TradeBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self {
            offers: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Open an offer, escrowing `offered` from `stock`.
    pub fn submit(
        &mut self,
        player: PlayerId,
        offered: TradeAmount,
        requested: TradeAmount,
        cycle: u64,
        stock: &mut ResourceStock,
    ) -> Result<TradeId, ActionError> {
        if offered.amount == 0 || requested.amount == 0 || offered.resource == requested.resource {
            return Err(ActionError::InvalidTrade);
        }
        if !stock.try_spend(offered.resource, offered.amount) {
            return Err(ActionError::InsufficientResources);
        }

        let id = TradeId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        self.offers.insert(
            id,
            TradeOffer {
                id,
                player,
                offered,
                requested,
                submitted_cycle: cycle,
                status: TradeStatus::Submitted,
            },
        );
        Ok(id)
    }

    /// Withdraw an offer and refund its escrow into `stock`.
    pub fn cancel(
        &mut self,
        player: PlayerId,
        id: TradeId,
        stock: &mut ResourceStock,
    ) -> Result<TradeOffer, ActionError> {
        let offer = self.offers.get(&id).ok_or(ActionError::UnknownTrade(id))?;
        if offer.player != player {
            return Err(ActionError::NotTradeOwner { trade: id, player });
        }
        let mut offer = self
            .offers
            .remove(&id)
            .ok_or(ActionError::UnknownTrade(id))?;
        offer.offered.credit(stock);
        offer.status = TradeStatus::Cancelled;
        Ok(offer)
    }

    /// Match and expire offers for one cycle.
    ///
    /// Resolved offers leave the book. Payment is up to the caller: each
    /// side of a match receives the other's escrow, and an expired offer
    /// returns its own escrow to its owner.
    pub fn settle(&mut self, cycle: u64, expiry_cycles: u64) -> Vec<Settlement> {
        let mut settlements = Vec::new();
        let ids: Vec<TradeId> = self.offers.keys().copied().collect();

        for id in &ids {
            let Some(offer) = self.offers.get(id) else {
                continue;
            };
            let counter = self
                .offers
                .values()
                .find(|other| other.id != *id && offer.is_compatible(other))
                .map(|other| other.id);

            if let Some(counter) = counter {
                let first = self.offers.remove(id);
                let second = self.offers.remove(&counter);
                if let (Some(mut first), Some(mut second)) = (first, second) {
                    first.status = TradeStatus::Matched;
                    second.status = TradeStatus::Matched;
                    let (first, second) = if first.id < second.id {
                        (first, second)
                    } else {
                        (second, first)
                    };
                    settlements.push(Settlement::Matched { first, second });
                }
            }
        }

        let expired: Vec<TradeId> = self
            .offers
            .values()
            .filter(|o| cycle.saturating_sub(o.submitted_cycle) >= expiry_cycles)
            .map(|o| o.id)
            .collect();
        for id in expired {
            if let Some(mut offer) = self.offers.remove(&id) {
                offer.status = TradeStatus::Expired;
                settlements.push(Settlement::Expired(offer));
            }
        }

        settlements
    }

    /// Look up an open offer.
    #[must_use]
    pub fn get(&self, id: TradeId) -> Option<&TradeOffer> {
        self.offers.get(&id)
    }

    /// Open offers in submission order.
    pub fn iter(&self) -> impl Iterator<Item = &TradeOffer> {
        self.offers.values()
    }

    /// Total escrow held per player.
    #[must_use]
    pub fn escrow_of(&self, player: PlayerId) -> ResourceStock {
        let mut stock = ResourceStock::ZERO;
        for offer in self.offers.values().filter(|o| o.player == player) {
            offer.offered.credit(&mut stock);
        }
        stock
    }

    /// Number of open offers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    /// Check if there are no open offers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rich() -> ResourceStock {
        ResourceStock {
            food: 100,
            energy: 100,
            research: 0,
            ore: 100,
            iridium: 100,
        }
    }

    #[test]
    fn test_submit_escrows() {
        let mut book = TradeBook::new();
        let mut stock = rich();
        let id = book
            .submit(
                PlayerId(1),
                TradeAmount::new(Resource::Ore, 30),
                TradeAmount::new(Resource::Food, 20),
                0,
                &mut stock,
            )
            .unwrap();
        assert_eq!(id, TradeId(1));
        assert_eq!(stock.ore, 70);
        assert_eq!(book.escrow_of(PlayerId(1)).ore, 30);
    }

    #[test]
    fn test_submit_rejects_bad_offers() {
        let mut book = TradeBook::new();
        let mut stock = ResourceStock::of(Resource::Ore, 5);
        let same = book.submit(
            PlayerId(1),
            TradeAmount::new(Resource::Ore, 1),
            TradeAmount::new(Resource::Ore, 1),
            0,
            &mut stock,
        );
        assert_eq!(same, Err(ActionError::InvalidTrade));
        let broke = book.submit(
            PlayerId(1),
            TradeAmount::new(Resource::Ore, 6),
            TradeAmount::new(Resource::Food, 1),
            0,
            &mut stock,
        );
        assert_eq!(broke, Err(ActionError::InsufficientResources));
        assert_eq!(stock.ore, 5);
        assert!(book.is_empty());
    }

    #[test]
    fn test_matches_earliest_compatible_counter() {
        let mut book = TradeBook::new();
        let mut a = rich();
        let mut b = rich();
        let mut c = rich();
        let first = book
            .submit(
                PlayerId(1),
                TradeAmount::new(Resource::Ore, 30),
                TradeAmount::new(Resource::Food, 20),
                0,
                &mut a,
            )
            .unwrap();
        // too small to cover the request
        book.submit(
            PlayerId(2),
            TradeAmount::new(Resource::Food, 10),
            TradeAmount::new(Resource::Ore, 10),
            0,
            &mut b,
        )
        .unwrap();
        let third = book
            .submit(
                PlayerId(3),
                TradeAmount::new(Resource::Food, 25),
                TradeAmount::new(Resource::Ore, 30),
                0,
                &mut c,
            )
            .unwrap();

        let settlements = book.settle(0, 5);
        assert_eq!(settlements.len(), 1);
        match &settlements[0] {
            Settlement::Matched { first: f, second: s } => {
                assert_eq!(f.id, first);
                assert_eq!(s.id, third);
                assert_eq!(f.status, TradeStatus::Matched);
            }
            other => panic!("unexpected settlement {other:?}"),
        }
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_expiry_after_configured_cycles() {
        let mut book = TradeBook::new();
        let mut stock = rich();
        book.submit(
            PlayerId(1),
            TradeAmount::new(Resource::Energy, 10),
            TradeAmount::new(Resource::Iridium, 1),
            3,
            &mut stock,
        )
        .unwrap();

        assert!(book.settle(7, 5).is_empty());
        let settlements = book.settle(8, 5);
        assert!(matches!(
            settlements.as_slice(),
            [Settlement::Expired(offer)] if offer.status == TradeStatus::Expired
        ));
        assert!(book.is_empty());
    }

    #[test]
    fn test_cancel_refunds_owner_only() {
        let mut book = TradeBook::new();
        let mut stock = rich();
        let id = book
            .submit(
                PlayerId(1),
                TradeAmount::new(Resource::Food, 40),
                TradeAmount::new(Resource::Ore, 10),
                0,
                &mut stock,
            )
            .unwrap();
        let mut other = rich();
        assert_eq!(
            book.cancel(PlayerId(2), id, &mut other),
            Err(ActionError::NotTradeOwner {
                trade: id,
                player: PlayerId(2),
            })
        );
        let offer = book.cancel(PlayerId(1), id, &mut stock).unwrap();
        assert_eq!(offer.status, TradeStatus::Cancelled);
        assert_eq!(stock.food, 100);
        assert_eq!(
            book.cancel(PlayerId(1), id, &mut stock),
            Err(ActionError::UnknownTrade(id))
        );
    }
}
