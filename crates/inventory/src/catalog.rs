//! Inputs owned by the catalog/cart subsystem (read-only for the engine).

use serde::{Deserialize, Serialize};

use stockroom_core::{OrderId, ProductId, ShopId, VariantId};

use crate::unit::{UnitKey, UnitStatus};

/// A product variant and the number of units that should exist for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    /// Declared target stock count; absent means zero.
    #[serde(default)]
    pub inventory_quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub shop_id: ShopId,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

impl Product {
    pub fn key_for(&self, variant_id: VariantId) -> UnitKey {
        UnitKey::new(self.shop_id, self.id, variant_id)
    }
}

/// One line of a cart/order: `quantity` units of a variant demanded by `order_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub order_id: OrderId,
    pub shop_id: ShopId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
}

impl CartLine {
    pub fn key(&self) -> UnitKey {
        UnitKey::new(self.shop_id, self.product_id, self.variant_id)
    }
}

/// Identifies which variant and order a backorder unit is created for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDescriptor {
    pub shop_id: ShopId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub order_id: OrderId,
    /// Status for the created units; `backorder` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UnitStatus>,
}

impl ReservationDescriptor {
    pub fn key(&self) -> UnitKey {
        UnitKey::new(self.shop_id, self.product_id, self.variant_id)
    }

    pub fn for_line(line: &CartLine) -> Self {
        Self {
            shop_id: line.shop_id,
            product_id: line.product_id,
            variant_id: line.variant_id,
            order_id: line.order_id,
            status: None,
        }
    }

    pub fn effective_status(&self) -> UnitStatus {
        self.status.unwrap_or(UnitStatus::Backorder)
    }
}
