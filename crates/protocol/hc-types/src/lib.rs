//! Data structures for hosted channels.
//!
//! This crate holds the identifiers, constants and enumerations shared by
//! every other crate in the workspace. It contains no business logic.
//!
//! # Module Organization
//!
//! - [`ids`] - Channel, chain and node identifiers
//! - [`enums`] - Channel phases and sides
//! - [`constants`] - Wire limits and default Host terms
//! - [`error`] - Identifier parsing errors
//!
//! # Example
//!
//! ```
//! use hc_crypto::identity_from_seed;
//! use hc_types::{ChannelId, ChannelPhase};
//!
//! let (_, client) = identity_from_seed([1u8; 32]);
//! let (_, host) = identity_from_seed([2u8; 32]);
//!
//! let id = ChannelId::from_nodes(&client, &host);
//! assert_eq!(id, ChannelId::from_nodes(&host, &client));
//! assert_eq!(ChannelPhase::default(), ChannelPhase::Uninitialized);
//! ```

pub mod constants;
pub mod enums;
pub mod error;
pub mod ids;

pub use constants::*;
pub use enums::{ChannelPhase, Side};
pub use error::ParseIdError;
pub use ids::{ChainHash, ChannelId, NodeId};

/// Amount in millisatoshi.
pub type MilliSatoshi = u64;

/// Amount in satoshi.
pub type Satoshi = u64;

/// Day-granularity clock used for liability deadlines.
pub type Blockday = u32;
