//! Table-algebra operation catalog.
//!
//! Every operation here is a pure function `(tables, params) -> Result`
//! over already-resolved [`Table`](handledb_core::Table) values. Handle
//! resolution and persistence live in the engine; this crate knows
//! nothing about handles or storage.

mod aggregate;
mod catalog;
mod error;
mod predicate;
mod render;

pub use aggregate::{AggFunc, Accumulator};
pub use catalog::{
    combine_columns, describe_schema, drop_columns, filter_rows, group_by, join, remove_duplicates,
    select_columns, JoinKind,
};
pub use error::{OpError, OpResult};
pub use predicate::Predicate;
pub use render::{materialize, RenderFormat};
