//! Durable handle→table store.
//!
//! This crate provides the persistence and identity authority for
//! HandleDB: minting opaque [`Handle`] tokens, binding them to tables,
//! and keeping the bindings recoverable across process restarts through
//! a single-file append-only log.

mod error;
mod handle;
mod log;
mod store;

pub use error::{StoreError, StoreResult};
pub use handle::Handle;
pub use log::StoreLog;
pub use store::HandleStore;
