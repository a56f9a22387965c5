//! The HandleDB engine.
//!
//! Ties the handle store, the seed catalog, and the operation catalog
//! into one dispatch surface. Callers hold opaque handles; tables never
//! leave the engine except through `materialize`.

mod config;
mod engine;
mod error;
mod seed;

#[cfg(feature = "unsafe-exec")]
mod script;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use seed::SeedCatalog;

pub use handledb_store::Handle;
