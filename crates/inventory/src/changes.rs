//! Change notifications from the catalog/cart subsystem and how the engine
//! reacts to them.
//!
//! The notifier decides *what* changed; this module only maps each change
//! onto engine operations:
//!
//! - cart items added or incremented → `add_reserve(cart_items)`
//! - cart items removed → `clear_reserve(removed_items)`
//! - variants pulled from a product → removable units of those variants are deleted
//! - a variant pushed onto a product → `register(product)`
//! - product fields set → `adjust(product)`

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use stockroom_auth::{Authorizer, Principal};
use stockroom_core::{OrderId, ShopId, VariantId};
use stockroom_events::{Event, ShopScoped};

use crate::catalog::{CartLine, Product, ProductVariant};
use crate::engine::InventoryEngine;
use crate::error::{InventoryError, InventoryResult};
use crate::ledger::{UnitFilter, UnitLedger};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartUpdated {
    pub shop_id: ShopId,
    pub cart_id: OrderId,
    /// Full cart contents after the change.
    #[serde(default)]
    pub cart_items: Vec<CartLine>,
    #[serde(default)]
    pub added_items: Vec<CartLine>,
    #[serde(default)]
    pub incremented_items: Vec<CartLine>,
    #[serde(default)]
    pub removed_items: Vec<CartLine>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdated {
    /// Staff member whose edit produced the change; handling runs as them.
    pub actor: Principal,
    /// Product state after the change.
    pub product: Product,
    #[serde(default)]
    pub pushed_variant: Option<ProductVariant>,
    #[serde(default)]
    pub set_fields: Vec<String>,
    #[serde(default)]
    pub pulled_variants: Vec<VariantId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogChange {
    CartUpdated(CartUpdated),
    ProductUpdated(ProductUpdated),
}

impl Event for CatalogChange {
    fn event_type(&self) -> &'static str {
        match self {
            CatalogChange::CartUpdated(_) => "catalog.cart.updated",
            CatalogChange::ProductUpdated(_) => "catalog.product.updated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CatalogChange::CartUpdated(e) => e.occurred_at,
            CatalogChange::ProductUpdated(e) => e.occurred_at,
        }
    }
}

impl ShopScoped for CatalogChange {
    fn shop_id(&self) -> ShopId {
        match self {
            CatalogChange::CartUpdated(e) => e.shop_id,
            CatalogChange::ProductUpdated(e) => e.product.shop_id,
        }
    }
}

/// Engine effects of handling one change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOutcome {
    pub registered: u64,
    pub reserved: u64,
    pub removed: u64,
}

/// Reacts to catalog changes. Failures are returned, never retried.
pub trait ChangeHandler: Send + Sync {
    fn handle(&self, change: &CatalogChange) -> InventoryResult<ChangeOutcome>;
}

impl<H> ChangeHandler for Arc<H>
where
    H: ChangeHandler + ?Sized,
{
    fn handle(&self, change: &CatalogChange) -> InventoryResult<ChangeOutcome> {
        (**self).handle(change)
    }
}

impl<L, A> ChangeHandler for InventoryEngine<L, A>
where
    L: UnitLedger,
    A: Authorizer,
{
    fn handle(&self, change: &CatalogChange) -> InventoryResult<ChangeOutcome> {
        debug!(event_type = change.event_type(), shop_id = %change.shop_id(), "handling change");
        match change {
            CatalogChange::CartUpdated(cart) => self.on_cart_updated(cart),
            CatalogChange::ProductUpdated(product) => self.on_product_updated(product),
        }
    }
}

impl<L, A> InventoryEngine<L, A>
where
    L: UnitLedger,
    A: Authorizer,
{
    fn on_cart_updated(&self, change: &CartUpdated) -> InventoryResult<ChangeOutcome> {
        let mut lines = change
            .cart_items
            .iter()
            .chain(&change.added_items)
            .chain(&change.incremented_items)
            .chain(&change.removed_items);
        if let Some(line) = lines.find(|line| line.shop_id != change.shop_id) {
            return Err(InventoryError::validation(format!(
                "cart {} in shop {} carries a line for shop {}",
                change.cart_id, change.shop_id, line.shop_id
            )));
        }

        let mut outcome = ChangeOutcome::default();

        if !change.added_items.is_empty() || !change.incremented_items.is_empty() {
            outcome.reserved = self.add_reserve(&change.cart_items, None)?;
        }
        if !change.removed_items.is_empty() {
            self.clear_reserve(&change.removed_items, None, None)?;
        }
        Ok(outcome)
    }

    fn on_product_updated(&self, change: &ProductUpdated) -> InventoryResult<ChangeOutcome> {
        let mut outcome = ChangeOutcome::default();
        let product = &change.product;

        for variant_id in &change.pulled_variants {
            let selector = UnitFilter::variant(product.key_for(*variant_id));
            outcome.removed += self.remove(&change.actor, &selector)?;
        }
        if change.pushed_variant.is_some() {
            outcome.registered = self.register(&change.actor, product)?;
        }
        if !change.set_fields.is_empty() {
            self.adjust(&change.actor, product)?;
        }
        Ok(outcome)
    }
}
