//! Topic-addressed publish/subscribe channel.
//!
//! The dispatch core only depends on the [`BroadcastChannel`] trait; the
//! in-memory implementation backs tests and the demo binary.

pub mod channel;
pub mod error;
pub mod memory;
pub mod topic;

pub use channel::BroadcastChannel;
pub use error::{PublishError, Result};
pub use memory::{InMemoryBroadcastChannel, Message, Subscription};
