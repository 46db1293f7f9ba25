//! Testing infrastructure for nested serializers
//!
//! - [`InMemoryStore`]: a `ModelStore` with natural ordering, link tables
//!   and write counters
//! - [`fixtures`]: request fixtures for rstest
//! - [`logging`]: one-shot `tracing` subscriber for tests

pub mod fixtures;
pub mod logging;
pub mod store;

pub use fixtures::{admin, anonymous, authenticated};
pub use logging::init_test_logging;
pub use store::{InMemoryStore, OpCounters};
