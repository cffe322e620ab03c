//! Inventory reservation engine.
//!
//! Tracks individually addressable stock units per product variant, reserves
//! them against orders and creates backorders when stock runs out. Storage is
//! abstracted behind [`UnitLedger`]; authorization behind
//! [`stockroom_auth::Authorizer`].

pub mod backorder;
pub mod catalog;
pub mod changes;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod reconciler;
pub mod remover;
pub mod reservation;
pub mod unit;
pub mod validation;

pub use backorder::BackorderGenerator;
pub use catalog::{CartLine, Product, ProductVariant, ReservationDescriptor};
pub use changes::{CartUpdated, CatalogChange, ChangeHandler, ChangeOutcome, ProductUpdated};
pub use engine::{InventoryEngine, StockLevels};
pub use error::{InventoryError, InventoryResult};
pub use ledger::{
    FindOptions, InMemoryUnitLedger, LedgerError, OrderPatch, SortOrder, UnitFilter, UnitLedger,
    UnitPatch,
};
pub use locks::VariantLocks;
pub use reconciler::Reconciler;
pub use remover::UnitRemover;
pub use reservation::{ReservationManager, ReserveSummary};
pub use unit::{NewUnit, StockUnit, UnitKey, UnitStatus};
pub use validation::{MAX_LINE_QUANTITY, Validate, parse_input};
