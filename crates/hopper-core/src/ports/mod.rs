//! Ports: abstractions over external collaborators (transport, time).

pub mod clock;
pub mod transport;

pub use clock::{Clock, FixedClock, SystemClock};
pub use transport::Transport;
