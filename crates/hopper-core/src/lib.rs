//! hopper-core
//!
//! Retry and dead-letter routing engine for an at-least-once message bus:
//! consume, dispatch to a user handler, and on failure walk the message
//! through `TOPIC-RETRY-1..N` to `TOPIC-DLQ`, carrying a metadata trail and
//! the correlation id across every hop.
//!
//! # Module layout
//! - **domain**: topic shapes, wire envelope, message types, errors
//! - **ports**: transport and clock abstractions
//! - **app**: publisher + consume/dispatch/retry loop
//! - **impls**: in-memory transport (dev/test)
//! - **correlation**: `X-Correlation-ID` propagation
//! - **settings**: `BROKER_*` environment configuration

pub mod app;
pub mod correlation;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod settings;
