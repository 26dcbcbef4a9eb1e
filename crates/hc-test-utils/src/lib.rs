//! Shared test utilities for the hosted-channel crates.
//!
//! Fixtures live in [`helpers`]; [`MockTransport`] records what a node sends
//! so tests can deliver it to another node.

pub mod helpers;
pub mod mock_transport;

pub use helpers::*;
pub use mock_transport::MockTransport;
