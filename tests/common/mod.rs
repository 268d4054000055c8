//! Common test utilities
//!
//! This module is shared across all integration tests

pub mod fixtures;
pub mod helpers;

#[allow(unused_imports)]
pub use fixtures::{TestEnvironment, CUSTOMER, OPERATOR, OTHER_CUSTOMER};
#[allow(unused_imports)]
pub use helpers::{customer, operator, wait_for_message};
