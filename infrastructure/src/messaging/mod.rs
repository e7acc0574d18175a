//! Message bus adapters

mod event_bus;

pub use event_bus::InProcessEventBus;
