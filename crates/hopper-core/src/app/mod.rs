//! Application layer: the publisher and the consume/dispatch/retry loop.

pub mod consumer_loop;
pub mod publisher;

pub use consumer_loop::{ConsumerLoop, MessageHandler};
pub use publisher::Publisher;
