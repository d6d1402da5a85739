// crates/hubcore/src/events/mod.rs

mod base;

pub use base::{EventBus, SessionEvent};
