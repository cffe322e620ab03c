//! Stock unit records: one record = one sellable unit of one variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, OrderId, ProductId, ShopId, StockUnitId, VariantId};

/// Lifecycle status of a stock unit.
///
/// Only `New`, `Reserved` and `Backorder` are produced by the engine; the
/// remaining statuses belong to fulfilment flows handled elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    New,
    Reserved,
    Backorder,
    Sold,
    Returned,
    Retired,
}

impl UnitStatus {
    pub const ALL: [UnitStatus; 6] = [
        UnitStatus::New,
        UnitStatus::Reserved,
        UnitStatus::Backorder,
        UnitStatus::Sold,
        UnitStatus::Returned,
        UnitStatus::Retired,
    ];

    /// Statuses whose units count against a variant's declared quantity.
    pub const STOCKED: [UnitStatus; 4] = [
        UnitStatus::New,
        UnitStatus::Reserved,
        UnitStatus::Backorder,
        UnitStatus::Sold,
    ];

    /// Statuses the unit remover may delete.
    pub const REMOVABLE: [UnitStatus; 2] = [UnitStatus::New, UnitStatus::Backorder];

    pub fn as_str(self) -> &'static str {
        match self {
            UnitStatus::New => "new",
            UnitStatus::Reserved => "reserved",
            UnitStatus::Backorder => "backorder",
            UnitStatus::Sold => "sold",
            UnitStatus::Returned => "returned",
            UnitStatus::Retired => "retired",
        }
    }

    /// A held unit is bound to an order and must carry its id.
    pub fn is_held(self) -> bool {
        matches!(
            self,
            UnitStatus::Reserved | UnitStatus::Backorder | UnitStatus::Sold
        )
    }

    pub fn counts_toward_stock(self) -> bool {
        Self::STOCKED.contains(&self)
    }

    pub fn is_removable(self) -> bool {
        Self::REMOVABLE.contains(&self)
    }
}

impl core::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for UnitStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnitStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown unit status '{s}'")))
    }
}

/// The (shop, product, variant) triple a unit belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitKey {
    pub shop_id: ShopId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
}

impl UnitKey {
    pub fn new(shop_id: ShopId, product_id: ProductId, variant_id: VariantId) -> Self {
        Self {
            shop_id,
            product_id,
            variant_id,
        }
    }
}

impl core::fmt::Display for UnitKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}/{}", self.shop_id, self.product_id, self.variant_id)
    }
}

/// Ledger record.
///
/// `shop_id`, `product_id` and `variant_id` are fixed at creation; only the
/// status, the order binding and `updated_at` ever change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUnit {
    pub id: StockUnitId,
    pub shop_id: ShopId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub order_id: Option<OrderId>,
    pub status: UnitStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockUnit {
    pub fn key(&self) -> UnitKey {
        UnitKey::new(self.shop_id, self.product_id, self.variant_id)
    }

    /// `new` units are unbound; held units are bound to exactly one order.
    pub fn check_invariants(&self) -> DomainResult<()> {
        match (self.status, self.order_id) {
            (UnitStatus::New, Some(order_id)) => Err(DomainError::invariant(format!(
                "unit {} is new but bound to order {order_id}",
                self.id
            ))),
            (status, None) if status.is_held() => Err(DomainError::invariant(format!(
                "unit {} is {status} without an order",
                self.id
            ))),
            _ => Ok(()),
        }
    }
}

impl Entity for StockUnit {
    type Id = StockUnitId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A unit about to be inserted; the ledger assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUnit {
    pub key: UnitKey,
    pub order_id: Option<OrderId>,
    pub status: UnitStatus,
}

impl NewUnit {
    /// Unbound, sellable stock.
    pub fn available(key: UnitKey) -> Self {
        Self {
            key,
            order_id: None,
            status: UnitStatus::New,
        }
    }

    /// A unit created already bound to `order_id`.
    pub fn held(key: UnitKey, order_id: OrderId, status: UnitStatus) -> Self {
        Self {
            key,
            order_id: Some(order_id),
            status,
        }
    }

    /// Materialize the record, enforcing the status/order invariants.
    pub fn into_unit(self, id: StockUnitId, now: DateTime<Utc>) -> DomainResult<StockUnit> {
        let unit = StockUnit {
            id,
            shop_id: self.key.shop_id,
            product_id: self.key.product_id,
            variant_id: self.key.variant_id,
            order_id: self.order_id,
            status: self.status,
            created_at: now,
            updated_at: now,
        };
        unit.check_invariants()?;
        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> UnitKey {
        UnitKey::new(ShopId::new(), ProductId::new(), VariantId::new())
    }

    #[test]
    fn status_sets() {
        assert!(UnitStatus::New.counts_toward_stock());
        assert!(UnitStatus::Sold.counts_toward_stock());
        assert!(!UnitStatus::Returned.counts_toward_stock());
        assert!(!UnitStatus::Retired.counts_toward_stock());

        assert!(UnitStatus::Reserved.is_held());
        assert!(UnitStatus::Backorder.is_held());
        assert!(!UnitStatus::New.is_held());

        assert!(UnitStatus::New.is_removable());
        assert!(UnitStatus::Backorder.is_removable());
        assert!(!UnitStatus::Reserved.is_removable());
        assert!(!UnitStatus::Sold.is_removable());
    }

    #[test]
    fn status_parses_from_wire_name() {
        assert_eq!("backorder".parse::<UnitStatus>().unwrap(), UnitStatus::Backorder);
        assert!("backordered".parse::<UnitStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&UnitStatus::Reserved).unwrap(),
            "\"reserved\""
        );
    }

    #[test]
    fn new_unit_with_order_is_rejected() {
        let unit = NewUnit {
            key: key(),
            order_id: Some(OrderId::new()),
            status: UnitStatus::New,
        };
        assert!(matches!(
            unit.into_unit(StockUnitId::new(), Utc::now()),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn held_unit_without_order_is_rejected() {
        let unit = NewUnit {
            key: key(),
            order_id: None,
            status: UnitStatus::Backorder,
        };
        assert!(unit.into_unit(StockUnitId::new(), Utc::now()).is_err());
    }

    #[test]
    fn held_unit_keeps_its_key() {
        let key = key();
        let order = OrderId::new();
        let unit = NewUnit::held(key, order, UnitStatus::Reserved)
            .into_unit(StockUnitId::new(), Utc::now())
            .unwrap();
        assert_eq!(unit.key(), key);
        assert_eq!(unit.order_id, Some(order));
        assert_eq!(unit.created_at, unit.updated_at);
    }
}
