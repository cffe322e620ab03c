//! Unit ledger: the persistent collection of stock unit records.
//!
//! The ledger is the single source of truth for stock. The engine never
//! caches counts; every decision re-reads the ledger.

pub mod in_memory;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroom_core::{OrderId, ProductId, ShopId, StockUnitId, VariantId};

use crate::unit::{NewUnit, StockUnit, UnitKey, UnitStatus};

pub use in_memory::InMemoryUnitLedger;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The backing store could not serve the request.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// A write would leave a record violating the status/order rules.
    #[error("ledger invariant violated: {0}")]
    Invariant(String),
}

/// Record selector. Unset fields match everything; an empty status list
/// matches every status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<StockUnitId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<ShopId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statuses: Vec<UnitStatus>,
}

impl UnitFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn variant(key: UnitKey) -> Self {
        Self {
            shop_id: Some(key.shop_id),
            product_id: Some(key.product_id),
            variant_id: Some(key.variant_id),
            ..Self::default()
        }
    }

    pub fn unit(id: StockUnitId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn in_shop(mut self, shop_id: ShopId) -> Self {
        self.shop_id = Some(shop_id);
        self
    }

    pub fn for_order(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_status(mut self, status: UnitStatus) -> Self {
        self.statuses = vec![status];
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = UnitStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn matches(&self, unit: &StockUnit) -> bool {
        self.id.is_none_or(|id| unit.id == id)
            && self.shop_id.is_none_or(|id| unit.shop_id == id)
            && self.product_id.is_none_or(|id| unit.product_id == id)
            && self.variant_id.is_none_or(|id| unit.variant_id == id)
            && self.order_id.is_none_or(|id| unit.order_id == Some(id))
            && (self.statuses.is_empty() || self.statuses.contains(&unit.status))
    }
}

/// How a patch treats the order binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderPatch {
    #[default]
    Keep,
    Set(OrderId),
    Clear,
}

/// Partial update applied to matched records. Identity fields are never patched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitPatch {
    pub status: Option<UnitStatus>,
    pub order: OrderPatch,
}

impl UnitPatch {
    /// Bind units to `order_id` under `status`.
    pub fn hold(status: UnitStatus, order_id: OrderId) -> Self {
        Self {
            status: Some(status),
            order: OrderPatch::Set(order_id),
        }
    }

    /// Unbind units and move them to `status`.
    pub fn release(status: UnitStatus) -> Self {
        Self {
            status: Some(status),
            order: OrderPatch::Clear,
        }
    }

    pub fn apply(&self, unit: &mut StockUnit) {
        if let Some(status) = self.status {
            unit.status = status;
        }
        match self.order {
            OrderPatch::Keep => {}
            OrderPatch::Set(order_id) => unit.order_id = Some(order_id),
            OrderPatch::Clear => unit.order_id = None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Least recently touched first.
    #[default]
    UpdatedAtAsc,
    UpdatedAtDesc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub sort: SortOrder,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn newest_first() -> Self {
        Self {
            sort: SortOrder::UpdatedAtDesc,
            limit: None,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Storage abstraction for stock units.
///
/// Implementations must make each call atomic with respect to other calls;
/// in particular `claim` must never hand the same record to two callers.
pub trait UnitLedger: Send + Sync {
    fn create(&self, unit: NewUnit) -> Result<StockUnit, LedgerError>;

    /// Insert several records. Not atomic by default: a failure may leave a
    /// prefix written, which the caller detects via its post-write count.
    fn create_many(&self, units: Vec<NewUnit>) -> Result<Vec<StockUnit>, LedgerError> {
        units.into_iter().map(|unit| self.create(unit)).collect()
    }

    fn count(&self, filter: &UnitFilter) -> Result<u64, LedgerError>;

    fn find(&self, filter: &UnitFilter, options: FindOptions) -> Result<Vec<StockUnit>, LedgerError>;

    /// Patch every matching record, returning how many changed.
    fn update(&self, filter: &UnitFilter, patch: &UnitPatch) -> Result<u64, LedgerError>;

    /// Atomically select up to `limit` matching records (least recently
    /// updated first) and patch them. Returns the patched records.
    fn claim(
        &self,
        filter: &UnitFilter,
        patch: &UnitPatch,
        limit: u64,
    ) -> Result<Vec<StockUnit>, LedgerError>;

    /// Delete every matching record, returning how many were removed.
    fn remove(&self, filter: &UnitFilter) -> Result<u64, LedgerError>;
}

impl<L> UnitLedger for Arc<L>
where
    L: UnitLedger + ?Sized,
{
    fn create(&self, unit: NewUnit) -> Result<StockUnit, LedgerError> {
        (**self).create(unit)
    }

    fn create_many(&self, units: Vec<NewUnit>) -> Result<Vec<StockUnit>, LedgerError> {
        (**self).create_many(units)
    }

    fn count(&self, filter: &UnitFilter) -> Result<u64, LedgerError> {
        (**self).count(filter)
    }

    fn find(&self, filter: &UnitFilter, options: FindOptions) -> Result<Vec<StockUnit>, LedgerError> {
        (**self).find(filter, options)
    }

    fn update(&self, filter: &UnitFilter, patch: &UnitPatch) -> Result<u64, LedgerError> {
        (**self).update(filter, patch)
    }

    fn claim(
        &self,
        filter: &UnitFilter,
        patch: &UnitPatch,
        limit: u64,
    ) -> Result<Vec<StockUnit>, LedgerError> {
        (**self).claim(filter, patch, limit)
    }

    fn remove(&self, filter: &UnitFilter) -> Result<u64, LedgerError> {
        (**self).remove(filter)
    }
}
