//! Backorder generator: units created already bound to an order.

use tracing::debug;

use stockroom_core::StockUnitId;

use crate::catalog::ReservationDescriptor;
use crate::error::{InventoryError, InventoryResult};
use crate::ledger::UnitLedger;
use crate::unit::NewUnit;
use crate::validation::{MAX_LINE_QUANTITY, Validate};

pub struct BackorderGenerator<'a, L: ?Sized> {
    ledger: &'a L,
}

impl<'a, L> BackorderGenerator<'a, L>
where
    L: UnitLedger + ?Sized,
{
    pub fn new(ledger: &'a L) -> Self {
        Self { ledger }
    }

    /// Insert `count` units bound to the descriptor's order.
    ///
    /// Status defaults to `backorder`. `count` is signed because it arrives
    /// from external callers; negative values are rejected.
    pub fn backorder(
        &self,
        descriptor: &ReservationDescriptor,
        count: i64,
    ) -> InventoryResult<Vec<StockUnitId>> {
        let count = Self::checked_count(count)?;
        descriptor.validate()?;

        if count == 0 {
            return Ok(Vec::new());
        }

        let key = descriptor.key();
        let status = descriptor.effective_status();
        let units = (0..count)
            .map(|_| NewUnit::held(key, descriptor.order_id, status))
            .collect();

        let created = self.ledger.create_many(units)?;
        debug!(
            key = %key,
            order_id = %descriptor.order_id,
            status = %status,
            count = created.len(),
            "backorder units created"
        );
        Ok(created.into_iter().map(|unit| unit.id).collect())
    }

    fn checked_count(count: i64) -> InventoryResult<u32> {
        if count < 0 {
            return Err(InventoryError::validation(format!(
                "backorder count must not be negative, got {count}"
            )));
        }
        u32::try_from(count)
            .ok()
            .filter(|n| *n <= MAX_LINE_QUANTITY)
            .ok_or_else(|| {
                InventoryError::validation(format!(
                    "backorder count {count} exceeds maximum {MAX_LINE_QUANTITY}"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{InMemoryUnitLedger, UnitFilter};
    use crate::unit::UnitStatus;
    use stockroom_core::{OrderId, ProductId, ShopId, VariantId};

    fn descriptor(status: Option<UnitStatus>) -> ReservationDescriptor {
        ReservationDescriptor {
            shop_id: ShopId::new(),
            product_id: ProductId::new(),
            variant_id: VariantId::new(),
            order_id: OrderId::new(),
            status,
        }
    }

    #[test]
    fn creates_bound_backorder_units() {
        let ledger = InMemoryUnitLedger::new();
        let d = descriptor(None);

        let ids = BackorderGenerator::new(&ledger).backorder(&d, 3).unwrap();

        assert_eq!(ids.len(), 3);
        let filter = UnitFilter::variant(d.key())
            .for_order(d.order_id)
            .with_status(UnitStatus::Backorder);
        assert_eq!(ledger.count(&filter).unwrap(), 3);
    }

    #[test]
    fn descriptor_status_is_used() {
        let ledger = InMemoryUnitLedger::new();
        let d = descriptor(Some(UnitStatus::Reserved));
        BackorderGenerator::new(&ledger).backorder(&d, 2).unwrap();
        assert_eq!(
            ledger
                .count(&UnitFilter::variant(d.key()).with_status(UnitStatus::Reserved))
                .unwrap(),
            2
        );
    }

    #[test]
    fn negative_count_is_rejected_before_writing() {
        let ledger = InMemoryUnitLedger::new();
        let err = BackorderGenerator::new(&ledger)
            .backorder(&descriptor(None), -1)
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
        assert_eq!(ledger.count(&UnitFilter::any()).unwrap(), 0);
    }

    #[test]
    fn unbound_status_is_rejected() {
        let ledger = InMemoryUnitLedger::new();
        let err = BackorderGenerator::new(&ledger)
            .backorder(&descriptor(Some(UnitStatus::New)), 1)
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
    }

    #[test]
    fn zero_count_creates_nothing() {
        let ledger = InMemoryUnitLedger::new();
        let ids = BackorderGenerator::new(&ledger)
            .backorder(&descriptor(None), 0)
            .unwrap();
        assert!(ids.is_empty());
    }
}
