//! In-process publish/subscribe for odds updates

mod broker;

pub use broker::{Channel, EventBroker, Subscription};
