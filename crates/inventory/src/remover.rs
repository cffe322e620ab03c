//! Unit remover: permanent deletion of removable units.

use tracing::debug;

use crate::error::InventoryResult;
use crate::ledger::{UnitFilter, UnitLedger};
use crate::unit::UnitStatus;
use crate::validation::Validate;

pub struct UnitRemover<'a, L: ?Sized> {
    ledger: &'a L,
}

impl<'a, L> UnitRemover<'a, L>
where
    L: UnitLedger + ?Sized,
{
    pub fn new(ledger: &'a L) -> Self {
        Self { ledger }
    }

    /// Delete the matching units, restricted to removable statuses.
    pub fn remove(&self, selector: &UnitFilter) -> InventoryResult<u64> {
        selector.validate()?;

        let mut filter = selector.clone();
        if filter.statuses.is_empty() {
            filter.statuses = UnitStatus::REMOVABLE.to_vec();
        }

        let removed = self.ledger.remove(&filter)?;
        debug!(removed, selector = ?selector, "units removed");
        Ok(removed)
    }
}
