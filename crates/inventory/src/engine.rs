//! Inventory engine façade (operation-level orchestration).
//!
//! This module wires the ledger, the authorization gate and the per-variant
//! locks into the six operations upstream callers see:
//!
//! ```text
//! register(product)                       -> units created
//! adjust(product)                         -> ()
//! remove(selector)                        -> units removed
//! add_reserve(lines, status?)             -> units reserved
//! clear_reserve(lines, new?, old?)        -> ()
//! backorder(descriptor, count)            -> created unit ids
//! ```
//!
//! ## Ordering
//!
//! Every operation validates its input first, then consults the
//! [`Authorizer`] (for the privileged ones), and only then touches the ledger.
//! A rejected call therefore leaves the ledger exactly as it was.
//!
//! ## Privileged operations
//!
//! `register`, `adjust` and `remove` require [`Permission::MANAGE_STOCK`] in
//! the target shop. Reservation and backorder calls come from shoppers; the
//! front door throttles them instead.
//!
//! ## Concurrency
//!
//! Every mutating operation runs under the lock of each variant it touches.
//! `remove` looks up the variants its selector hits first and takes their
//! locks one at a time. Reservation changes also go through the ledger's
//! atomic `claim`, so two carts can never take the same unit.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use stockroom_auth::{Authorizer, Permission, Principal};
use stockroom_core::{ShopId, StockUnitId};

use crate::backorder::BackorderGenerator;
use crate::catalog::{CartLine, Product, ReservationDescriptor};
use crate::error::InventoryResult;
use crate::ledger::{FindOptions, UnitFilter, UnitLedger};
use crate::locks::VariantLocks;
use crate::reconciler::Reconciler;
use crate::remover::UnitRemover;
use crate::reservation::ReservationManager;
use crate::unit::{UnitKey, UnitStatus};
use crate::validation::Validate;

/// Per-status unit counts for one variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevels {
    pub new: u64,
    pub reserved: u64,
    pub backorder: u64,
    pub sold: u64,
    pub returned: u64,
    pub retired: u64,
}

impl StockLevels {
    /// Units counted against the declared target quantity.
    pub fn stocked(&self) -> u64 {
        self.new + self.reserved + self.backorder + self.sold
    }

    pub fn count(&self, status: UnitStatus) -> u64 {
        match status {
            UnitStatus::New => self.new,
            UnitStatus::Reserved => self.reserved,
            UnitStatus::Backorder => self.backorder,
            UnitStatus::Sold => self.sold,
            UnitStatus::Returned => self.returned,
            UnitStatus::Retired => self.retired,
        }
    }

    fn slot(&mut self, status: UnitStatus) -> &mut u64 {
        match status {
            UnitStatus::New => &mut self.new,
            UnitStatus::Reserved => &mut self.reserved,
            UnitStatus::Backorder => &mut self.backorder,
            UnitStatus::Sold => &mut self.sold,
            UnitStatus::Returned => &mut self.returned,
            UnitStatus::Retired => &mut self.retired,
        }
    }
}

#[derive(Debug)]
pub struct InventoryEngine<L, A> {
    ledger: L,
    authorizer: A,
    locks: VariantLocks,
}

impl<L, A> InventoryEngine<L, A> {
    pub fn new(ledger: L, authorizer: A) -> Self {
        Self {
            ledger,
            authorizer,
            locks: VariantLocks::new(),
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn authorizer(&self) -> &A {
        &self.authorizer
    }
}

impl<L, A> InventoryEngine<L, A>
where
    L: UnitLedger,
    A: Authorizer,
{
    fn require_manage(&self, principal: &Principal, shop_id: ShopId) -> InventoryResult<()> {
        self.authorizer
            .authorize(principal, shop_id, &Permission::MANAGE_STOCK)?;
        Ok(())
    }

    /// Create `new` units until every variant of `product` reaches its
    /// declared quantity. Returns the number of units created.
    #[instrument(
        skip(self, principal, product),
        fields(principal_id = %principal.principal_id, product_id = %product.id),
        err
    )]
    pub fn register(&self, principal: &Principal, product: &Product) -> InventoryResult<u64> {
        product.validate()?;
        self.require_manage(principal, product.shop_id)?;
        Reconciler::new(&self.ledger, &self.locks).register(product)
    }

    /// Converge every variant of `product` on its declared quantity.
    #[instrument(
        skip(self, principal, product),
        fields(principal_id = %principal.principal_id, product_id = %product.id),
        err
    )]
    pub fn adjust(&self, principal: &Principal, product: &Product) -> InventoryResult<()> {
        product.validate()?;
        self.require_manage(principal, product.shop_id)?;
        Reconciler::new(&self.ledger, &self.locks).adjust(product)
    }

    /// Permanently delete the removable units matching `selector`.
    #[instrument(skip(self, principal), fields(principal_id = %principal.principal_id), err)]
    pub fn remove(&self, principal: &Principal, selector: &UnitFilter) -> InventoryResult<u64> {
        selector.validate()?;
        // A valid selector always names its shop.
        if let Some(shop_id) = selector.shop_id {
            self.require_manage(principal, shop_id)?;
        }

        let remover = UnitRemover::new(&self.ledger);
        let mut removed = 0;
        for key in self.affected_variants(selector)? {
            let narrowed = UnitFilter {
                product_id: Some(key.product_id),
                variant_id: Some(key.variant_id),
                ..selector.clone()
            };
            removed += self.locks.with_variant(key, || remover.remove(&narrowed))?;
        }
        Ok(removed)
    }

    /// Hold units for each line's order, backordering any shortfall.
    ///
    /// Returns the number of existing units reserved (backorders excluded).
    #[instrument(skip(self, lines), fields(lines = lines.len()), err)]
    pub fn add_reserve(&self, lines: &[CartLine], status: Option<UnitStatus>) -> InventoryResult<u64> {
        let summary = ReservationManager::new(&self.ledger, &self.locks)
            .add_reserve(lines, status.unwrap_or(UnitStatus::Reserved))?;
        Ok(summary.reserved)
    }

    /// Release each line's units back to `new_status` (default `new`).
    #[instrument(skip(self, lines), fields(lines = lines.len()), err)]
    pub fn clear_reserve(
        &self,
        lines: &[CartLine],
        new_status: Option<UnitStatus>,
        old_status: Option<UnitStatus>,
    ) -> InventoryResult<()> {
        ReservationManager::new(&self.ledger, &self.locks).clear_reserve(
            lines,
            new_status.unwrap_or(UnitStatus::New),
            old_status.unwrap_or(UnitStatus::Reserved),
        )?;
        Ok(())
    }

    /// Create `count` units bound to the descriptor's order.
    #[instrument(
        skip(self, descriptor),
        fields(order_id = %descriptor.order_id, variant_id = %descriptor.variant_id),
        err
    )]
    pub fn backorder(
        &self,
        descriptor: &ReservationDescriptor,
        count: i64,
    ) -> InventoryResult<Vec<StockUnitId>> {
        self.locks.with_variant(descriptor.key(), || {
            BackorderGenerator::new(&self.ledger).backorder(descriptor, count)
        })
    }

    /// Variants that currently hold units `selector` would remove.
    fn affected_variants(&self, selector: &UnitFilter) -> InventoryResult<Vec<UnitKey>> {
        let mut filter = selector.clone();
        if filter.statuses.is_empty() {
            filter.statuses = UnitStatus::REMOVABLE.to_vec();
        }

        let mut keys = Vec::new();
        for unit in self.ledger.find(&filter, FindOptions::default())? {
            let key = unit.key();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    pub fn stock_levels(&self, key: UnitKey) -> InventoryResult<StockLevels> {
        let mut levels = StockLevels::default();
        for status in UnitStatus::ALL {
            *levels.slot(status) = self
                .ledger
                .count(&UnitFilter::variant(key).with_status(status))?;
        }
        Ok(levels)
    }
}
