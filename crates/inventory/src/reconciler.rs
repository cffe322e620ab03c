//! Reconciler: keeps each variant's unit count in line with its declared
//! target quantity.

use tracing::{debug, info, warn};

use crate::catalog::Product;
use crate::error::{InventoryError, InventoryResult};
use crate::ledger::{FindOptions, UnitFilter, UnitLedger};
use crate::locks::VariantLocks;
use crate::remover::UnitRemover;
use crate::unit::{NewUnit, UnitKey, UnitStatus};

/// Filter selecting every unit that counts against a variant's target.
pub fn stocked(key: UnitKey) -> UnitFilter {
    UnitFilter::variant(key).with_statuses(UnitStatus::STOCKED)
}

pub struct Reconciler<'a, L: ?Sized> {
    ledger: &'a L,
    locks: &'a VariantLocks,
}

impl<'a, L> Reconciler<'a, L>
where
    L: UnitLedger + ?Sized,
{
    pub fn new(ledger: &'a L, locks: &'a VariantLocks) -> Self {
        Self { ledger, locks }
    }

    /// Top up every short variant with `new` units. Returns units created.
    ///
    /// Variants at or above target are untouched; calling this twice in a row
    /// creates nothing the second time.
    pub fn register(&self, product: &Product) -> InventoryResult<u64> {
        let mut created = 0;
        for variant in &product.variants {
            let key = product.key_for(variant.id);
            let target = u64::from(variant.inventory_quantity);
            created += self
                .locks
                .with_variant(key, || self.top_up(key, target))?;
        }

        info!(product_id = %product.id, created, "product registered");
        Ok(created)
    }

    /// Bring every variant to its target: short variants are registered,
    /// over-target variants lose their most recently updated `new` units.
    pub fn adjust(&self, product: &Product) -> InventoryResult<()> {
        let mut short = false;
        let mut removed = 0;

        for variant in &product.variants {
            let key = product.key_for(variant.id);
            let target = u64::from(variant.inventory_quantity);

            removed += self.locks.with_variant(key, || -> InventoryResult<u64> {
                let current = self.ledger.count(&stocked(key))?;
                if current < target {
                    short = true;
                    Ok(0)
                } else if current > target {
                    self.trim_excess(key, current - target)
                } else {
                    Ok(0)
                }
            })?;
        }

        // Register re-checks every variant; it takes the variant locks itself.
        let created = if short { self.register(product)? } else { 0 };

        info!(product_id = %product.id, created, removed, "product adjusted");
        Ok(())
    }

    fn top_up(&self, key: UnitKey, target: u64) -> InventoryResult<u64> {
        let filter = stocked(key);
        let existing = self.ledger.count(&filter)?;
        if existing >= target {
            return Ok(0);
        }

        let missing = target - existing;
        let units = (0..missing).map(|_| NewUnit::available(key)).collect();
        let written = self.ledger.create_many(units)?.len() as u64;

        let found = self.ledger.count(&filter)?;
        if found != target {
            return Err(InventoryError::Anomaly {
                key,
                expected: target,
                found,
            });
        }

        debug!(key = %key, existing, created = written, "variant topped up");
        Ok(written)
    }

    /// Remove up to `excess` `new` units, newest first, one removal per unit.
    fn trim_excess(&self, key: UnitKey, excess: u64) -> InventoryResult<u64> {
        let limit = usize::try_from(excess).unwrap_or(usize::MAX);
        let candidates = self.ledger.find(
            &UnitFilter::variant(key).with_status(UnitStatus::New),
            FindOptions::newest_first().limit(limit),
        )?;

        let remover = UnitRemover::new(self.ledger);
        let mut removed = 0;
        for unit in &candidates {
            removed += remover.remove(&UnitFilter::unit(unit.id).in_shop(key.shop_id))?;
        }

        if removed < excess {
            warn!(
                key = %key,
                excess,
                removed,
                "not enough new units to reach target; variant stays over target"
            );
        }
        Ok(removed)
    }
}
