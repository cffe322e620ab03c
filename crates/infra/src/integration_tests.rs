//! Integration tests for the full change pipeline.
//!
//! Tests: CatalogChange → EventBus → ChangeWorker → InventoryEngine → UnitLedger
//!
//! Verifies:
//! - Product and cart changes drive registration and reservation
//! - Shop pinning keeps workers away from other shops
//! - Concurrent carts never share a unit
//! - A failing change is logged and does not stop the worker

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use chrono::Utc;

    use stockroom_auth::{Principal, PrincipalId, Role, RoleAuthorizer};
    use stockroom_core::{OrderId, ProductId, ShopId, VariantId};
    use stockroom_events::{EventBus, InMemoryEventBus};
    use stockroom_inventory::{
        CartLine, CartUpdated, CatalogChange, InMemoryUnitLedger, InventoryEngine, Product,
        ProductUpdated, ProductVariant, UnitFilter, UnitKey, UnitLedger, UnitStatus,
    };

    use crate::config::StockroomConfig;
    use crate::gateway::InventoryGateway;
    use crate::rate_limit::RateLimiter;
    use crate::workers::ChangeWorker;

    type Engine = InventoryEngine<Arc<InMemoryUnitLedger>, RoleAuthorizer>;

    fn setup() -> (Arc<Engine>, Arc<InMemoryEventBus<CatalogChange>>) {
        let ledger = Arc::new(InMemoryUnitLedger::new());
        let engine = Arc::new(InventoryEngine::new(ledger, RoleAuthorizer));
        let bus = Arc::new(InMemoryEventBus::new());
        (engine, bus)
    }

    fn owner(shop_id: ShopId) -> Principal {
        Principal::with_roles(PrincipalId::new(), shop_id, vec![Role::OWNER])
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

    fn key(p: &Product) -> UnitKey {
        p.key_for(p.variants[0].id)
    }

    fn variant_pushed(actor: Principal, p: &Product) -> CatalogChange {
        CatalogChange::ProductUpdated(ProductUpdated {
            actor,
            product: p.clone(),
            pushed_variant: Some(p.variants[0].clone()),
            set_fields: Vec::new(),
            pulled_variants: Vec::new(),
            occurred_at: Utc::now(),
        })
    }

    fn item_added(p: &Product, cart_id: OrderId, quantity: u32) -> CatalogChange {
        let line = CartLine {
            order_id: cart_id,
            shop_id: p.shop_id,
            product_id: p.id,
            variant_id: p.variants[0].id,
            quantity,
        };
        CatalogChange::CartUpdated(CartUpdated {
            shop_id: p.shop_id,
            cart_id,
            cart_items: vec![line.clone()],
            added_items: vec![line],
            incremented_items: Vec::new(),
            removed_items: Vec::new(),
            occurred_at: Utc::now(),
        })
    }

    /// Poll until `cond` holds; the worker processes changes asynchronously.
    fn wait_for(cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        cond()
    }

    #[test]
    fn product_and_cart_changes_flow_through_worker() {
        let (engine, bus) = setup();
        let worker = ChangeWorker::spawn("inventory-changes", bus.clone(), None, engine.clone()).unwrap();

        let shop = ShopId::new();
        let p = product(shop, 5);
        bus.publish(variant_pushed(owner(shop), &p)).unwrap();
        assert!(wait_for(|| engine.stock_levels(key(&p)).unwrap().new == 5));

        let cart = OrderId::new();
        bus.publish(item_added(&p, cart, 3)).unwrap();
        assert!(wait_for(|| engine.stock_levels(key(&p)).unwrap().reserved == 3));

        let held = engine
            .ledger()
            .count(&UnitFilter::variant(key(&p)).for_order(cart))
            .unwrap();
        assert_eq!(held, 3);

        worker.shutdown();
    }

    #[test]
    fn pinned_worker_ignores_other_shops() {
        let (engine, bus) = setup();
        let mine = ShopId::new();
        let theirs = ShopId::new();
        let worker = ChangeWorker::spawn("pinned", bus.clone(), Some(mine), engine.clone()).unwrap();

        let other = product(theirs, 4);
        let own = product(mine, 2);
        bus.publish(variant_pushed(owner(theirs), &other)).unwrap();
        bus.publish(variant_pushed(owner(mine), &own)).unwrap();

        assert!(wait_for(|| engine.stock_levels(key(&own)).unwrap().new == 2));
        assert_eq!(engine.stock_levels(key(&other)).unwrap().stocked(), 0);

        worker.shutdown();
    }

    #[test]
    fn failed_change_does_not_stop_worker() {
        let (engine, bus) = setup();
        let worker = ChangeWorker::spawn("resilient", bus.clone(), None, engine.clone()).unwrap();

        let shop = ShopId::new();
        let p = product(shop, 3);
        // A guest may not register stock; the worker logs and keeps going.
        bus.publish(variant_pushed(Principal::guest(shop), &p)).unwrap();
        bus.publish(variant_pushed(owner(shop), &p)).unwrap();

        assert!(wait_for(|| engine.stock_levels(key(&p)).unwrap().new == 3));
        worker.shutdown();
    }

    #[test]
    fn replayed_cart_change_does_not_double_reserve() {
        let (engine, bus) = setup();
        let worker = ChangeWorker::spawn("replay", bus.clone(), None, engine.clone()).unwrap();

        let shop = ShopId::new();
        let p = product(shop, 5);
        engine.register(&owner(shop), &p).unwrap();

        let change = item_added(&p, OrderId::new(), 2);
        bus.publish(change.clone()).unwrap();
        bus.publish(change).unwrap();

        assert!(wait_for(|| engine.stock_levels(key(&p)).unwrap().reserved == 2));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(engine.stock_levels(key(&p)).unwrap().reserved, 2);

        worker.shutdown();
    }

    #[test]
    fn concurrent_carts_never_share_units() {
        let (engine, _) = setup();
        let shop = ShopId::new();
        let p = product(shop, 10);
        engine.register(&owner(shop), &p).unwrap();

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let engine = engine.clone();
                let p = p.clone();
                thread::spawn(move || {
                    let line = CartLine {
                        order_id: OrderId::new(),
                        shop_id: p.shop_id,
                        product_id: p.id,
                        variant_id: p.variants[0].id,
                        quantity: 3,
                    };
                    engine.add_reserve(&[line], None).unwrap()
                })
            })
            .collect();

        let reserved: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        let levels = engine.stock_levels(key(&p)).unwrap();

        assert_eq!(reserved, 10);
        assert_eq!(levels.reserved, 10);
        assert_eq!(levels.new, 0);
        assert_eq!(levels.backorder, 18 - 10);

        let units = engine.ledger().snapshot().unwrap();
        assert!(units.iter().all(|u| u.check_invariants().is_ok()));
        assert!(
            units
                .iter()
                .filter(|u| u.status == UnitStatus::Reserved)
                .all(|u| u.order_id.is_some())
        );
    }

    #[test]
    fn gateway_built_from_config() {
        let config = StockroomConfig::from_lookup(|key| match key {
            "STOCKROOM_RATE_LIMIT_CALLS" => Some("1".to_string()),
            _ => None,
        })
        .unwrap();
        let (engine, _) = setup();
        let gateway = InventoryGateway::new(engine, RateLimiter::new(config.rate_limit));

        let shop = ShopId::new();
        let p = product(shop, 2);
        gateway.register(&owner(shop), &p).unwrap();

        let shopper = Principal::guest(shop);
        let line = CartLine {
            order_id: OrderId::new(),
            shop_id: shop,
            product_id: p.id,
            variant_id: p.variants[0].id,
            quantity: 1,
        };
        assert_eq!(gateway.add_reserve(&shopper, &[line.clone()], None).unwrap(), 1);
        assert!(gateway.add_reserve(&shopper, &[line], None).is_err());
    }
}
