//! Event mechanics shared by the warehouse crates.
//!
//! Domain events (unit transitions) implement [`Event`]; committed activity
//! entries are fanned out to live feeds over an [`EventBus`].

pub mod bus;
pub mod event;
pub mod execute;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use execute::execute;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
