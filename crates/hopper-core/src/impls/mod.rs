//! Concrete port implementations (in-memory transport for dev/test).

pub mod inmem_transport;

pub use inmem_transport::{InMemoryTransport, ProducedRecord};
