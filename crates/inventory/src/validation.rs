//! Structural checks applied to every input before the ledger is touched.

use std::collections::HashSet;

use serde::de::DeserializeOwned;

use crate::catalog::{CartLine, Product, ReservationDescriptor};
use crate::error::{InventoryError, InventoryResult};
use crate::ledger::UnitFilter;
use crate::unit::UnitStatus;

/// Upper bound on units demanded by one cart line or one backorder request.
pub const MAX_LINE_QUANTITY: u32 = 10_000;

pub trait Validate {
    fn validate(&self) -> InventoryResult<()>;
}

impl Validate for Product {
    fn validate(&self) -> InventoryResult<()> {
        let mut seen = HashSet::with_capacity(self.variants.len());
        for variant in &self.variants {
            if !seen.insert(variant.id) {
                return Err(InventoryError::validation(format!(
                    "product {} lists variant {} more than once",
                    self.id, variant.id
                )));
            }
        }
        Ok(())
    }
}

impl Validate for CartLine {
    fn validate(&self) -> InventoryResult<()> {
        if self.quantity > MAX_LINE_QUANTITY {
            return Err(InventoryError::validation(format!(
                "cart line quantity {} exceeds maximum {MAX_LINE_QUANTITY}",
                self.quantity
            )));
        }
        Ok(())
    }
}

impl Validate for ReservationDescriptor {
    fn validate(&self) -> InventoryResult<()> {
        match self.status {
            Some(status) if !status.is_held() => Err(InventoryError::validation(format!(
                "reservation status must be bound to an order, got '{status}'"
            ))),
            _ => Ok(()),
        }
    }
}

/// Removal selectors must stay inside one shop and name a unit or a product.
/// An explicit status that cannot be removed is rejected outright.
impl Validate for UnitFilter {
    fn validate(&self) -> InventoryResult<()> {
        if self.shop_id.is_none() {
            return Err(InventoryError::validation("unit selector requires a shop_id"));
        }
        if self.id.is_none() && self.product_id.is_none() {
            return Err(InventoryError::validation(
                "unit selector requires an id or a product_id",
            ));
        }
        if let Some(status) = self.statuses.iter().find(|s| !s.is_removable()) {
            return Err(InventoryError::validation(format!(
                "units in status '{status}' cannot be removed"
            )));
        }
        Ok(())
    }
}

impl<T: Validate> Validate for [T] {
    fn validate(&self) -> InventoryResult<()> {
        self.iter().try_for_each(Validate::validate)
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> InventoryResult<()> {
        self.as_slice().validate()
    }
}

/// Status a reservation moves units into: must bind them to the order.
pub fn ensure_hold_status(status: UnitStatus) -> InventoryResult<()> {
    if status.is_held() {
        Ok(())
    } else {
        Err(InventoryError::validation(format!(
            "'{status}' does not bind units to an order"
        )))
    }
}

/// Status released units move into: must leave them unbound.
pub fn ensure_release_status(status: UnitStatus) -> InventoryResult<()> {
    if status.is_held() {
        Err(InventoryError::validation(format!(
            "'{status}' requires an order and cannot be used for released units"
        )))
    } else {
        Ok(())
    }
}

/// Deserialize and validate untrusted input in one step.
pub fn parse_input<T>(value: serde_json::Value) -> InventoryResult<T>
where
    T: DeserializeOwned + Validate,
{
    let parsed: T = serde_json::from_value(value)
        .map_err(|e| InventoryError::validation(format!("malformed input: {e}")))?;
    parsed.validate()?;
    Ok(parsed)
}
