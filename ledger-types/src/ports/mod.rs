//! Port traits implemented by adapters.

pub mod store;

pub use store::{CommitBundle, LedgerStore};
