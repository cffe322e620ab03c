use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use stockroom_core::StockUnitId;

use super::{FindOptions, LedgerError, SortOrder, UnitFilter, UnitLedger, UnitPatch};
use crate::unit::{NewUnit, StockUnit};

/// In-memory unit ledger.
///
/// Intended for tests/dev and single-process deployments. Every call holds the
/// write (or read) lock for its whole duration, which makes `claim` atomic.
#[derive(Debug, Default)]
pub struct InMemoryUnitLedger {
    units: RwLock<HashMap<StockUnitId, StockUnit>>,
}

impl InMemoryUnitLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record, oldest update first.
    pub fn snapshot(&self) -> Result<Vec<StockUnit>, LedgerError> {
        self.find(&UnitFilter::any(), FindOptions::default())
    }

    fn poisoned() -> LedgerError {
        LedgerError::Unavailable("lock poisoned".to_string())
    }

    fn sorted(mut units: Vec<StockUnit>, sort: SortOrder) -> Vec<StockUnit> {
        // Id breaks ties: ids are time-ordered, so equal timestamps still sort by age.
        units.sort_by(|a, b| (a.updated_at, a.id).cmp(&(b.updated_at, b.id)));
        if sort == SortOrder::UpdatedAtDesc {
            units.reverse();
        }
        units
    }

    fn patched(unit: &StockUnit, patch: &UnitPatch) -> Result<StockUnit, LedgerError> {
        let mut next = unit.clone();
        patch.apply(&mut next);
        next.check_invariants()
            .map_err(|e| LedgerError::Invariant(e.to_string()))?;
        Ok(next)
    }
}

impl UnitLedger for InMemoryUnitLedger {
    fn create(&self, unit: NewUnit) -> Result<StockUnit, LedgerError> {
        let mut created = self.create_many(vec![unit])?;
        created
            .pop()
            .ok_or_else(|| LedgerError::Unavailable("insert produced no record".to_string()))
    }

    fn create_many(&self, units: Vec<NewUnit>) -> Result<Vec<StockUnit>, LedgerError> {
        let now = Utc::now();
        let records = units
            .into_iter()
            .map(|unit| {
                unit.into_unit(StockUnitId::new(), now)
                    .map_err(|e| LedgerError::Invariant(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut map = self.units.write().map_err(|_| Self::poisoned())?;
        for record in &records {
            map.insert(record.id, record.clone());
        }
        Ok(records)
    }

    fn count(&self, filter: &UnitFilter) -> Result<u64, LedgerError> {
        let map = self.units.read().map_err(|_| Self::poisoned())?;
        Ok(map.values().filter(|unit| filter.matches(unit)).count() as u64)
    }

    fn find(&self, filter: &UnitFilter, options: FindOptions) -> Result<Vec<StockUnit>, LedgerError> {
        let map = self.units.read().map_err(|_| Self::poisoned())?;
        let matched = map.values().filter(|unit| filter.matches(unit)).cloned().collect();
        let mut sorted = Self::sorted(matched, options.sort);
        if let Some(limit) = options.limit {
            sorted.truncate(limit);
        }
        Ok(sorted)
    }

    fn update(&self, filter: &UnitFilter, patch: &UnitPatch) -> Result<u64, LedgerError> {
        let mut map = self.units.write().map_err(|_| Self::poisoned())?;

        // Validate every change before committing any of them.
        let now = Utc::now();
        let mut changed = Vec::new();
        for unit in map.values().filter(|unit| filter.matches(unit)) {
            let mut next = Self::patched(unit, patch)?;
            next.updated_at = now;
            changed.push(next);
        }

        let count = changed.len() as u64;
        for unit in changed {
            map.insert(unit.id, unit);
        }
        Ok(count)
    }

    fn claim(
        &self,
        filter: &UnitFilter,
        patch: &UnitPatch,
        limit: u64,
    ) -> Result<Vec<StockUnit>, LedgerError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut map = self.units.write().map_err(|_| Self::poisoned())?;

        let candidates = map.values().filter(|unit| filter.matches(unit)).cloned().collect();
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);

        let now = Utc::now();
        let claimed = Self::sorted(candidates, SortOrder::UpdatedAtAsc)
            .iter()
            .take(limit)
            .map(|unit| {
                let mut next = Self::patched(unit, patch)?;
                next.updated_at = now;
                Ok(next)
            })
            .collect::<Result<Vec<_>, LedgerError>>()?;

        for unit in &claimed {
            map.insert(unit.id, unit.clone());
        }
        Ok(claimed)
    }

    fn remove(&self, filter: &UnitFilter) -> Result<u64, LedgerError> {
        let mut map = self.units.write().map_err(|_| Self::poisoned())?;
        let before = map.len();
        map.retain(|_, unit| !filter.matches(unit));
        Ok((before - map.len()) as u64)
    }
}
