//! Reservation manager: binds available units to orders and releases them.

use tracing::{debug, info};

use crate::backorder::BackorderGenerator;
use crate::catalog::{CartLine, ReservationDescriptor};
use crate::error::InventoryResult;
use crate::ledger::{UnitFilter, UnitLedger, UnitPatch};
use crate::locks::VariantLocks;
use crate::unit::UnitStatus;
use crate::validation::{Validate, ensure_hold_status, ensure_release_status};

/// What one `add_reserve` call did, summed over its lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReserveSummary {
    /// Existing `new` units moved to the hold status.
    pub reserved: u64,
    /// Units created by the backorder generator to cover shortfalls.
    pub backordered: u64,
}

pub struct ReservationManager<'a, L: ?Sized> {
    ledger: &'a L,
    locks: &'a VariantLocks,
}

impl<'a, L> ReservationManager<'a, L>
where
    L: UnitLedger + ?Sized,
{
    pub fn new(ledger: &'a L, locks: &'a VariantLocks) -> Self {
        Self { ledger, locks }
    }

    /// Hold `quantity` units per line for the line's order.
    ///
    /// Units already bound to the order count toward the line. Available
    /// units are claimed first; whatever remains is backordered.
    pub fn add_reserve(&self, lines: &[CartLine], status: UnitStatus) -> InventoryResult<ReserveSummary> {
        ensure_hold_status(status)?;
        lines.validate()?;

        let mut summary = ReserveSummary::default();
        for line in lines {
            let key = line.key();
            let (reserved, backordered) = self.locks.with_variant(key, || -> InventoryResult<(u64, u64)> {
                let existing = self
                    .ledger
                    .count(&UnitFilter::variant(key).for_order(line.order_id))?;
                let needed = u64::from(line.quantity).saturating_sub(existing);
                if needed == 0 {
                    return Ok((0, 0));
                }

                let claimed = self
                    .ledger
                    .claim(
                        &UnitFilter::variant(key).with_status(UnitStatus::New),
                        &UnitPatch::hold(status, line.order_id),
                        needed,
                    )?
                    .len() as u64;

                let shortfall = needed - claimed;
                if shortfall > 0 {
                    let count = i64::try_from(shortfall).unwrap_or(i64::MAX);
                    BackorderGenerator::new(self.ledger)
                        .backorder(&ReservationDescriptor::for_line(line), count)?;
                }

                debug!(
                    key = %key,
                    order_id = %line.order_id,
                    existing,
                    claimed,
                    shortfall,
                    "line reserved"
                );
                Ok((claimed, shortfall))
            })?;

            summary.reserved += reserved;
            summary.backordered += backordered;
        }

        info!(
            lines = lines.len(),
            reserved = summary.reserved,
            backordered = summary.backordered,
            "reservation added"
        );
        Ok(summary)
    }

    /// Release at most `quantity` units per line from `old_status` back to
    /// `new_status`, clearing their order. Returns units released.
    pub fn clear_reserve(
        &self,
        lines: &[CartLine],
        new_status: UnitStatus,
        old_status: UnitStatus,
    ) -> InventoryResult<u64> {
        ensure_release_status(new_status)?;
        ensure_hold_status(old_status)?;
        lines.validate()?;

        let mut released = 0;
        for line in lines {
            let key = line.key();
            let filter = UnitFilter::variant(key)
                .for_order(line.order_id)
                .with_status(old_status);

            released += self.locks.with_variant(key, || -> InventoryResult<u64> {
                let units = self.ledger.claim(
                    &filter,
                    &UnitPatch::release(new_status),
                    u64::from(line.quantity),
                )?;
                Ok(units.len() as u64)
            })?;
        }

        info!(lines = lines.len(), released, "reservation cleared");
        Ok(released)
    }
}
