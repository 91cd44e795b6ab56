//! [`ActorState`] implementation for the stock ledger.
//!
//! [`StockBook`] owns every SKU's counters. Each batch command is checked
//! against the current counters for *all* lines before a single counter is
//! written, so a rejected batch leaves the book untouched.

use super::actions::{StockCommand, StockReply};
use super::error::StockError;
use crate::framework::ActorState;
use crate::model::{OrderItem, Sku, Stock};
use std::collections::{HashMap, HashSet};

/// In-memory stock ledger state.
#[derive(Debug, Clone, Default)]
pub struct StockBook {
    stocks: HashMap<Sku, Stock>,
}

impl StockBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the book from seed records, rejecting records that break the
    /// invariant and SKUs listed twice.
    pub fn from_seed(stocks: impl IntoIterator<Item = Stock>) -> Result<Self, StockError> {
        let stocks: Vec<Stock> = stocks.into_iter().collect();
        check_seed(&stocks)?;
        Ok(Self {
            stocks: stocks.into_iter().map(|stock| (stock.sku, stock)).collect(),
        })
    }

    pub fn get(&self, sku: Sku) -> Option<&Stock> {
        self.stocks.get(&sku)
    }

    pub fn reserve(&mut self, items: &[OrderItem]) -> Result<(), StockError> {
        self.apply_batch(items, |stock, change| {
            let reserved = u32::try_from(u64::from(stock.reserved) + change).ok()?;
            (reserved <= stock.total_count).then_some(Stock { reserved, ..*stock })
        })
    }

    pub fn remove_reserved(&mut self, items: &[OrderItem]) -> Result<(), StockError> {
        self.apply_batch(items, |stock, change| {
            let change = u32::try_from(change).ok()?;
            Some(Stock {
                reserved: stock.reserved.checked_sub(change)?,
                total_count: stock.total_count.checked_sub(change)?,
                ..*stock
            })
        })
    }

    pub fn cancel_reserved(&mut self, items: &[OrderItem]) -> Result<(), StockError> {
        self.apply_batch(items, |stock, change| {
            let change = u32::try_from(change).ok()?;
            Some(Stock {
                reserved: stock.reserved.checked_sub(change)?,
                ..*stock
            })
        })
    }

    pub fn available(&self, sku: Sku) -> Result<u32, StockError> {
        self.lookup(sku).map(Stock::available)
    }

    fn lookup(&self, sku: Sku) -> Result<&Stock, StockError> {
        self.stocks.get(&sku).ok_or(StockError::NotFound { sku })
    }

    /// Two-phase batch update: compute every new record, then write them all.
    ///
    /// `next` returns `None` when the change would break `reserved <= total_count`
    /// or underflow a counter. Lines for the same SKU are summed first, so a
    /// batch can't sneak past the check by splitting one SKU across lines.
    fn apply_batch(
        &mut self,
        items: &[OrderItem],
        next: impl Fn(&Stock, u64) -> Option<Stock>,
    ) -> Result<(), StockError> {
        let mut updated = Vec::new();
        for (sku, change) in aggregate(items) {
            let stock = self.lookup(sku)?;
            let record = next(stock, change).ok_or(StockError::OutOfBounds {
                sku,
                reserved: stock.reserved,
                total_count: stock.total_count,
                change,
            })?;
            updated.push(record);
        }
        for record in updated {
            self.stocks.insert(record.sku, record);
        }
        Ok(())
    }
}

/// Seed records must hold the invariant and name each SKU once.
pub(crate) fn check_seed(stocks: &[Stock]) -> Result<(), StockError> {
    let mut seen = HashSet::with_capacity(stocks.len());
    for stock in stocks {
        if stock.reserved > stock.total_count {
            return Err(StockError::InvalidSeed {
                sku: stock.sku,
                reserved: stock.reserved,
                total_count: stock.total_count,
            });
        }
        if !seen.insert(stock.sku) {
            return Err(StockError::DuplicateSeed { sku: stock.sku });
        }
    }
    Ok(())
}

/// Sum counts per SKU, keeping first-seen order for deterministic errors.
pub(crate) fn aggregate(items: &[OrderItem]) -> Vec<(Sku, u64)> {
    let mut batch: Vec<(Sku, u64)> = Vec::with_capacity(items.len());
    for item in items {
        match batch.iter_mut().find(|(sku, _)| *sku == item.sku) {
            Some((_, total)) => *total += u64::from(item.count),
            None => batch.push((item.sku, u64::from(item.count))),
        }
    }
    batch
}

impl ActorState for StockBook {
    type Command = StockCommand;
    type Reply = StockReply;
    type Error = StockError;

    /// Handles stock commands.
    ///
    /// # Commands
    /// - `Reserve`: fails with `NotFound` / `OutOfBounds`, otherwise bumps `reserved`
    /// - `RemoveReserved`: settles a paid order, lowering `total_count` and `reserved`
    /// - `CancelReserved`: releases a hold, lowering `reserved`
    /// - `Available` / `Snapshot`: reads
    fn handle(&mut self, command: StockCommand) -> Result<StockReply, StockError> {
        match command {
            StockCommand::Reserve(items) => {
                self.reserve(&items)?;
                Ok(StockReply::Reserved)
            }
            StockCommand::RemoveReserved(items) => {
                self.remove_reserved(&items)?;
                Ok(StockReply::RemovedReserved)
            }
            StockCommand::CancelReserved(items) => {
                self.cancel_reserved(&items)?;
                Ok(StockReply::CancelledReserved)
            }
            StockCommand::Available(sku) => self.available(sku).map(StockReply::Available),
            StockCommand::Snapshot(sku) => self.lookup(sku).map(|s| StockReply::Snapshot(*s)),
        }
    }

    fn size(&self) -> usize {
        self.stocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> StockBook {
        StockBook::from_seed([Stock::new(1, 10, 0), Stock::new(2, 5, 3)]).unwrap()
    }

    #[test]
    fn second_reservation_past_capacity_is_rejected() {
        let mut book = book();
        book.reserve(&[OrderItem::new(1, 6)]).unwrap();
        assert_eq!(book.get(1).unwrap().reserved, 6);

        let err = book.reserve(&[OrderItem::new(1, 6)]).unwrap_err();
        assert_eq!(
            err,
            StockError::OutOfBounds {
                sku: 1,
                reserved: 6,
                total_count: 10,
                change: 6
            }
        );
        assert_eq!(book.get(1).unwrap().reserved, 6);
    }

    #[test]
    fn failing_line_leaves_whole_batch_unapplied() {
        let mut book = book();
        let err = book
            .reserve(&[OrderItem::new(1, 4), OrderItem::new(2, 3)])
            .unwrap_err();
        assert!(matches!(err, StockError::OutOfBounds { sku: 2, .. }));
        assert_eq!(book.get(1).unwrap().reserved, 0);
        assert_eq!(book.get(2).unwrap().reserved, 3);
    }

    #[test]
    fn unknown_sku_is_not_found() {
        let mut book = book();
        assert_eq!(
            book.reserve(&[OrderItem::new(1, 1), OrderItem::new(99, 1)]),
            Err(StockError::NotFound { sku: 99 })
        );
        assert_eq!(book.get(1).unwrap().reserved, 0);
        assert_eq!(book.available(99), Err(StockError::NotFound { sku: 99 }));
    }

    #[test]
    fn duplicate_lines_are_checked_together() {
        let mut book = book();
        let err = book
            .reserve(&[OrderItem::new(1, 6), OrderItem::new(1, 6)])
            .unwrap_err();
        assert!(matches!(err, StockError::OutOfBounds { sku: 1, change: 12, .. }));
        assert_eq!(book.get(1).unwrap().reserved, 0);
    }

    #[test]
    fn remove_reserved_settles_both_counters() {
        let mut book = book();
        book.remove_reserved(&[OrderItem::new(2, 2)]).unwrap();
        assert_eq!(*book.get(2).unwrap(), Stock::new(2, 3, 1));
        assert_eq!(book.available(2), Ok(2));
    }

    #[test]
    fn cannot_settle_or_cancel_more_than_reserved() {
        let mut book = book();
        assert!(matches!(
            book.remove_reserved(&[OrderItem::new(2, 4)]),
            Err(StockError::OutOfBounds { sku: 2, reserved: 3, .. })
        ));
        assert!(matches!(
            book.cancel_reserved(&[OrderItem::new(1, 1)]),
            Err(StockError::OutOfBounds { sku: 1, reserved: 0, .. })
        ));
        assert_eq!(*book.get(2).unwrap(), Stock::new(2, 5, 3));
    }

    #[test]
    fn cancel_reserved_only_touches_reserved() {
        let mut book = book();
        book.cancel_reserved(&[OrderItem::new(2, 3)]).unwrap();
        assert_eq!(*book.get(2).unwrap(), Stock::new(2, 5, 0));
    }

    #[test]
    fn seed_with_broken_invariant_is_rejected() {
        assert!(matches!(
            StockBook::from_seed([Stock::new(3, 1, 2)]),
            Err(StockError::InvalidSeed { sku: 3, .. })
        ));
    }

    #[test]
    fn seed_listing_a_sku_twice_is_rejected() {
        assert_eq!(
            StockBook::from_seed([Stock::new(1, 10, 0), Stock::new(2, 1, 0), Stock::new(1, 5, 0)])
                .unwrap_err(),
            StockError::DuplicateSeed { sku: 1 }
        );
    }
}
