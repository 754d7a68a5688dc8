//! Study group directory: a single persisted collection of groups, shared
//! between every store instance subscribed to the same relay.
//!
//! Every mutation rewrites the whole collection and publishes the whole
//! collection. Concurrent writers race and the last write wins.

pub mod access;
pub mod directory;
pub mod error;
pub mod presentation;
pub mod relay;
pub mod store;

pub use directory::{DirectoryStore, Outcome, Reason};
pub use error::DirectoryError;
pub use relay::{Broadcaster, Relay, SyncEnvelope};
pub use store::PersistedStore;
