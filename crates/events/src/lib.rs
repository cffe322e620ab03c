//! Change notifications flowing into the inventory engine.
//!
//! Mechanics only: the event trait, shop scoping and a broadcast bus. The
//! concrete change events live next to the code that reacts to them.

pub mod bus;
pub mod event;
pub mod in_memory_bus;
pub mod shop;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use shop::ShopScoped;
