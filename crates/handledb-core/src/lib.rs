//! Core data model for HandleDB.
//!
//! This crate defines the leaf types shared by the store and the
//! operation catalog: [`Value`], [`DataType`], [`Field`], [`Schema`],
//! [`Row`], and [`Table`]. Nothing here knows about handles or
//! persistence; tables are plain, immutable-by-contract relations.

mod schema;
mod table;
mod value;

pub use schema::{DataType, Field, Schema};
pub use table::{Row, Table};
pub use value::Value;
