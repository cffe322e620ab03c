//! Rate-limited front door for external callers.
//!
//! Exposes the engine operations under their wire names
//! (`inventory/register`, `inventory/addReserve`, ...) and throttles the ones
//! shoppers can reach: reservation, release and backorder. Staff holding the
//! stock-management capability are not throttled.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, warn};

use stockroom_auth::{Authorizer, Permission, Principal};
use stockroom_core::StockUnitId;
use stockroom_inventory::{
    CartLine, InventoryEngine, InventoryError, InventoryResult, Product, ReservationDescriptor,
    UnitFilter, UnitLedger, UnitStatus, Validate, parse_input,
};

use crate::rate_limit::RateLimiter;

pub const REGISTER: &str = "inventory/register";
pub const ADJUST: &str = "inventory/adjust";
pub const REMOVE: &str = "inventory/remove";
pub const ADD_RESERVE: &str = "inventory/addReserve";
pub const CLEAR_RESERVE: &str = "inventory/clearReserve";
pub const BACKORDER: &str = "inventory/backorder";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("rate limit exceeded for {operation}; retry in {}ms", .retry_after.as_millis())]
    RateLimited {
        operation: &'static str,
        retry_after: Duration,
    },

    #[error("unknown method '{0}'")]
    UnknownMethod(String),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct AddReserveParams {
    cart_items: Vec<CartLine>,
    #[serde(default)]
    status: Option<UnitStatus>,
}

impl Validate for AddReserveParams {
    fn validate(&self) -> InventoryResult<()> {
        self.cart_items.validate()
    }
}

#[derive(Debug, Deserialize)]
struct ClearReserveParams {
    cart_items: Vec<CartLine>,
    #[serde(default)]
    new_status: Option<UnitStatus>,
    #[serde(default)]
    old_status: Option<UnitStatus>,
}

impl Validate for ClearReserveParams {
    fn validate(&self) -> InventoryResult<()> {
        self.cart_items.validate()
    }
}

#[derive(Debug, Deserialize)]
struct BackorderParams {
    reservation: ReservationDescriptor,
    count: i64,
}

impl Validate for BackorderParams {
    fn validate(&self) -> InventoryResult<()> {
        self.reservation.validate()
    }
}

pub struct InventoryGateway<L, A> {
    engine: Arc<InventoryEngine<L, A>>,
    limiter: RateLimiter,
}

impl<L, A> InventoryGateway<L, A>
where
    L: UnitLedger,
    A: Authorizer,
{
    pub fn new(engine: Arc<InventoryEngine<L, A>>, limiter: RateLimiter) -> Self {
        Self { engine, limiter }
    }

    pub fn engine(&self) -> &Arc<InventoryEngine<L, A>> {
        &self.engine
    }

    fn throttle(&self, principal: &Principal, operation: &'static str) -> Result<(), GatewayError> {
        let exempt = self.engine.authorizer().is_allowed(
            principal,
            principal.active_shop_id,
            &Permission::MANAGE_STOCK,
        );
        if exempt {
            return Ok(());
        }

        self.limiter
            .check(principal.principal_id, operation)
            .map_err(|retry_after| {
                warn!(
                    principal_id = %principal.principal_id,
                    operation,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "rate limit exceeded"
                );
                GatewayError::RateLimited {
                    operation,
                    retry_after,
                }
            })
    }

    pub fn register(&self, principal: &Principal, product: &Product) -> Result<u64, GatewayError> {
        Ok(self.engine.register(principal, product)?)
    }

    pub fn adjust(&self, principal: &Principal, product: &Product) -> Result<(), GatewayError> {
        Ok(self.engine.adjust(principal, product)?)
    }

    pub fn remove(&self, principal: &Principal, selector: &UnitFilter) -> Result<u64, GatewayError> {
        Ok(self.engine.remove(principal, selector)?)
    }

    pub fn add_reserve(
        &self,
        principal: &Principal,
        lines: &[CartLine],
        status: Option<UnitStatus>,
    ) -> Result<u64, GatewayError> {
        self.throttle(principal, ADD_RESERVE)?;
        Ok(self.engine.add_reserve(lines, status)?)
    }

    pub fn clear_reserve(
        &self,
        principal: &Principal,
        lines: &[CartLine],
        new_status: Option<UnitStatus>,
        old_status: Option<UnitStatus>,
    ) -> Result<(), GatewayError> {
        self.throttle(principal, CLEAR_RESERVE)?;
        Ok(self.engine.clear_reserve(lines, new_status, old_status)?)
    }

    pub fn backorder(
        &self,
        principal: &Principal,
        descriptor: &ReservationDescriptor,
        count: i64,
    ) -> Result<Vec<StockUnitId>, GatewayError> {
        self.throttle(principal, BACKORDER)?;
        Ok(self.engine.backorder(descriptor, count)?)
    }

    /// Dispatch a call by wire name with untrusted JSON parameters.
    ///
    /// Parameters are deserialized and validated before anything else
    /// happens; results are returned as JSON.
    pub fn call(
        &self,
        principal: &Principal,
        method: &str,
        params: JsonValue,
    ) -> Result<JsonValue, GatewayError> {
        debug!(principal_id = %principal.principal_id, method, "gateway call");
        match method {
            REGISTER => {
                let product: Product = parse_input(params)?;
                Ok(serde_json::to_value(self.register(principal, &product)?)?)
            }
            ADJUST => {
                let product: Product = parse_input(params)?;
                self.adjust(principal, &product)?;
                Ok(JsonValue::Null)
            }
            REMOVE => {
                let selector: UnitFilter = parse_input(params)?;
                Ok(serde_json::to_value(self.remove(principal, &selector)?)?)
            }
            ADD_RESERVE => {
                let p: AddReserveParams = parse_input(params)?;
                Ok(serde_json::to_value(self.add_reserve(principal, &p.cart_items, p.status)?)?)
            }
            CLEAR_RESERVE => {
                let p: ClearReserveParams = parse_input(params)?;
                self.clear_reserve(principal, &p.cart_items, p.new_status, p.old_status)?;
                Ok(JsonValue::Null)
            }
            BACKORDER => {
                let p: BackorderParams = parse_input(params)?;
                Ok(serde_json::to_value(self.backorder(principal, &p.reservation, p.count)?)?)
            }
            other => Err(GatewayError::UnknownMethod(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use serde_json::json;
    use stockroom_auth::{PrincipalId, Role, RoleAuthorizer};
    use stockroom_core::{OrderId, ProductId, ShopId, VariantId};
    use stockroom_inventory::{InMemoryUnitLedger, ProductVariant};

    type TestGateway = InventoryGateway<InMemoryUnitLedger, RoleAuthorizer>;

    fn gateway(max_calls: u32) -> TestGateway {
        let engine = Arc::new(InventoryEngine::new(InMemoryUnitLedger::new(), RoleAuthorizer));
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: true,
            max_calls,
            window: Duration::from_secs(60),
        });
        InventoryGateway::new(engine, limiter)
    }

    fn product(shop_id: ShopId, quantity: u32) -> Product {
        Product {
            id: ProductId::new(),
            shop_id,
            variants: vec![ProductVariant {
                id: VariantId::new(),
                inventory_quantity: quantity,
            }],
        }
    }

    fn line(p: &Product, quantity: u32) -> CartLine {
        CartLine {
            order_id: OrderId::new(),
            shop_id: p.shop_id,
            product_id: p.id,
            variant_id: p.variants[0].id,
            quantity,
        }
    }

    #[test]
    fn shoppers_are_throttled() {
        let gw = gateway(2);
        let shop = ShopId::new();
        let p = product(shop, 10);
        let owner = Principal::with_roles(PrincipalId::new(), shop, vec![Role::OWNER]);
        gw.register(&owner, &p).unwrap();

        let shopper = Principal::guest(shop);
        gw.add_reserve(&shopper, &[line(&p, 1)], None).unwrap();
        gw.add_reserve(&shopper, &[line(&p, 1)], None).unwrap();
        let err = gw.add_reserve(&shopper, &[line(&p, 1)], None).unwrap_err();

        assert!(matches!(
            err,
            GatewayError::RateLimited { operation: ADD_RESERVE, .. }
        ));
        let key = p.key_for(p.variants[0].id);
        assert_eq!(gw.engine().stock_levels(key).unwrap().reserved, 2);
    }

    #[test]
    fn staff_are_exempt() {
        let gw = gateway(1);
        let shop = ShopId::new();
        let p = product(shop, 10);
        let manager = Principal::with_roles(PrincipalId::new(), shop, vec![Role::MANAGER]);
        gw.register(&manager, &p).unwrap();

        for _ in 0..5 {
            gw.add_reserve(&manager, &[line(&p, 1)], None).unwrap();
        }
    }

    #[test]
    fn call_dispatches_by_method_name() {
        let gw = gateway(10);
        let shop = ShopId::new();
        let p = product(shop, 4);
        let owner = Principal::with_roles(PrincipalId::new(), shop, vec![Role::OWNER]);

        let created = gw
            .call(&owner, REGISTER, serde_json::to_value(&p).unwrap())
            .unwrap();
        assert_eq!(created, json!(4));

        let l = line(&p, 6);
        let reserved = gw
            .call(&owner, ADD_RESERVE, json!({ "cart_items": [l] }))
            .unwrap();
        assert_eq!(reserved, json!(4));

        let key = p.key_for(p.variants[0].id);
        assert_eq!(gw.engine().stock_levels(key).unwrap().backorder, 2);
    }

    #[test]
    fn call_rejects_malformed_params() {
        let gw = gateway(10);
        let shopper = Principal::guest(ShopId::new());

        let err = gw
            .call(&shopper, BACKORDER, json!({ "reservation": {}, "count": 1 }))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Inventory(InventoryError::Validation(_))));

        let err = gw.call(&shopper, "inventory/ship", json!({})).unwrap_err();
        assert!(matches!(err, GatewayError::UnknownMethod(_)));
    }

    #[test]
    fn backorder_call_returns_ids() {
        let gw = gateway(10);
        let shop = ShopId::new();
        let p = product(shop, 0);
        let descriptor = ReservationDescriptor::for_line(&line(&p, 1));

        let ids = gw
            .call(
                &Principal::guest(shop),
                BACKORDER,
                json!({ "reservation": descriptor, "count": 2 }),
            )
            .unwrap();
        assert_eq!(ids.as_array().map(Vec::len), Some(2));
    }
}
