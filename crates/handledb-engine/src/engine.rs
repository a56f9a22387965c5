//! Engine dispatch.
//!
//! One method per catalog operation. Each method resolves its input
//! handles, invokes the pure operation, and binds the result: every
//! operation mints a fresh handle except `combine_columns`, which
//! rebinds its input in place.

use std::str::FromStr;

use tracing::{debug, info};

use handledb_core::Table;
use handledb_ops::{self as ops, AggFunc, JoinKind, RenderFormat};
use handledb_store::{Handle, HandleStore};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::seed::SeedCatalog;

/// The operation engine: handle store, seed catalog, configuration.
#[derive(Debug)]
pub struct Engine {
    store: HandleStore,
    seeds: SeedCatalog,
    config: EngineConfig,
}

impl Engine {
    /// Builds an engine from configuration, opening the durable store
    /// when one is configured.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let store = match (&config.store_path, config.memory_mode) {
            (Some(path), false) => HandleStore::open(path)?,
            _ => HandleStore::in_memory(),
        };
        info!(
            durable = store.is_durable(),
            handles = store.len(),
            "engine started"
        );
        Ok(Self {
            store,
            seeds: SeedCatalog::new(),
            config,
        })
    }

    /// Builds a memory-only engine with default configuration.
    pub fn in_memory() -> Self {
        Self {
            store: HandleStore::in_memory(),
            seeds: SeedCatalog::new(),
            config: EngineConfig::default(),
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &HandleStore {
        &self.store
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Names of every queryable seed table.
    pub fn get_db_tables(&self) -> Vec<String> {
        self.seeds.table_names()
    }

    /// Copies a seed table into a fresh handle.
    pub fn query_database(&self, name: &str) -> EngineResult<Handle> {
        let table = self
            .seeds
            .get(name)
            .ok_or_else(|| EngineError::TableNotFound(name.to_string()))?;
        let handle = self.store.create(table.clone())?;
        debug!(table = name, handle = %handle, "seed table bound");
        Ok(handle)
    }

    /// Returns the shape of the bound table as `"(rows, cols)"`.
    pub fn get_shape(&self, handle: &Handle) -> EngineResult<String> {
        let table = self.resolve(handle)?;
        let (rows, cols) = table.shape();
        Ok(format!("({}, {})", rows, cols))
    }

    /// Projects to the named columns; returns a fresh handle.
    pub fn select_columns(&self, handle: &Handle, names: &[String]) -> EngineResult<Handle> {
        let table = self.resolve(handle)?;
        let result = ops::select_columns(&table, names)?;
        self.bind_fresh("select_columns", result)
    }

    /// Keeps rows matching the predicate; returns a fresh handle.
    pub fn filter_rows(&self, handle: &Handle, expr: &str) -> EngineResult<Handle> {
        let table = self.resolve(handle)?;
        let result = ops::filter_rows(&table, expr)?;
        self.bind_fresh("filter_rows", result)
    }

    /// Removes the named columns; returns a fresh handle.
    pub fn drop_columns(&self, handle: &Handle, names: &[String]) -> EngineResult<Handle> {
        let table = self.resolve(handle)?;
        let result = ops::drop_columns(&table, names);
        self.bind_fresh("drop_columns", result)
    }

    /// Appends a combined text column and rebinds the input handle in
    /// place. This is the only operation that mutates a binding.
    pub fn combine_columns(
        &self,
        handle: &Handle,
        col1: &str,
        col2: &str,
        new_name: &str,
        sep: Option<&str>,
    ) -> EngineResult<Handle> {
        let table = self.resolve(handle)?;
        let result = ops::combine_columns(&table, col1, col2, new_name, sep)?;
        self.store.rebind(handle, result)?;
        debug!(op = "combine_columns", handle = %handle, "handle rebound");
        Ok(handle.clone())
    }

    /// Equi-joins two handles; returns a fresh handle. The join kind is
    /// validated before either handle is resolved.
    pub fn join(
        &self,
        left: &Handle,
        right: &Handle,
        on: &str,
        kind: &str,
    ) -> EngineResult<Handle> {
        let kind = JoinKind::from_str(kind)?;
        let left_table = self.resolve(left)?;
        let right_table = self.resolve(right)?;
        let result = ops::join(&left_table, &right_table, on, kind)?;
        self.bind_fresh("join", result)
    }

    /// Drops duplicate rows; returns a fresh handle.
    pub fn remove_duplicates(
        &self,
        handle: &Handle,
        subset: Option<&[String]>,
    ) -> EngineResult<Handle> {
        let table = self.resolve(handle)?;
        let result = ops::remove_duplicates(&table, subset)?;
        self.bind_fresh("remove_duplicates", result)
    }

    /// Groups and aggregates; returns a fresh handle. `aggs` pairs a
    /// column with an aggregation function name; names are validated
    /// before the handle is resolved.
    pub fn group_by(
        &self,
        handle: &Handle,
        group_cols: &[String],
        aggs: &[(String, String)],
    ) -> EngineResult<Handle> {
        let parsed: Vec<(String, AggFunc)> = aggs
            .iter()
            .map(|(col, func)| Ok((col.clone(), AggFunc::from_str(func)?)))
            .collect::<Result<_, EngineError>>()?;
        let table = self.resolve(handle)?;
        let result = ops::group_by(&table, group_cols, &parsed)?;
        self.bind_fresh("group_by", result)
    }

    /// Describes the bound table's schema; returns a fresh handle.
    pub fn describe_schema(&self, handle: &Handle) -> EngineResult<Handle> {
        let table = self.resolve(handle)?;
        let result = ops::describe_schema(&table);
        self.bind_fresh("describe_schema", result)
    }

    /// Renders the bound table to a string.
    pub fn materialize(
        &self,
        handle: &Handle,
        format: &str,
        n: Option<i64>,
    ) -> EngineResult<String> {
        let format = RenderFormat::from_str(format)?;
        let table = self.resolve(handle)?;
        // Missing and non-positive counts both fall back to the
        // configured preview size.
        let n = match n {
            Some(v) if v > 0 => v,
            _ => self.config.preview_rows as i64,
        };
        Ok(ops::materialize(&table, format, Some(n))?)
    }

    pub(crate) fn resolve(&self, handle: &Handle) -> EngineResult<Table> {
        match self.store.resolve(handle)? {
            Some(table) => Ok(table),
            None => {
                debug!(
                    handle = %handle,
                    known = ?self.store.list_tokens(),
                    "resolution miss"
                );
                Err(EngineError::HandleNotFound(handle.as_str().to_string()))
            }
        }
    }

    fn bind_fresh(&self, op: &str, table: Table) -> EngineResult<Handle> {
        let handle = self.store.create(table)?;
        debug!(op, handle = %handle, "result bound");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handledb_core::Value;

    #[test]
    fn test_query_database_and_shape() {
        let engine = Engine::in_memory();
        assert_eq!(engine.get_db_tables(), vec!["users", "orders"]);

        let users = engine.query_database("users").unwrap();
        assert_eq!(engine.get_shape(&users).unwrap(), "(6, 3)");

        let err = engine.query_database("missing").unwrap_err();
        assert!(matches!(err, EngineError::TableNotFound(_)));
    }

    #[test]
    fn test_fresh_handle_per_operation() {
        let engine = Engine::in_memory();
        let users = engine.query_database("users").unwrap();

        let selected = engine
            .select_columns(&users, &["name".to_string()])
            .unwrap();
        assert_ne!(selected, users);
        // The source handle still resolves to the full table.
        assert_eq!(engine.get_shape(&users).unwrap(), "(6, 3)");
        assert_eq!(engine.get_shape(&selected).unwrap(), "(6, 1)");
    }

    #[test]
    fn test_combine_columns_rebinds_in_place() {
        let engine = Engine::in_memory();
        let users = engine.query_database("users").unwrap();
        let before = engine.store().len();

        let returned = engine
            .combine_columns(&users, "name", "city", "label", None)
            .unwrap();
        assert_eq!(returned, users);
        assert_eq!(engine.store().len(), before);
        assert_eq!(engine.get_shape(&users).unwrap(), "(6, 4)");
    }

    #[test]
    fn test_unknown_handle_leaves_store_untouched() {
        let engine = Engine::in_memory();
        let ghost = Handle::from_token("no-such-token");

        let err = engine.filter_rows(&ghost, "user_id > 1").unwrap_err();
        assert!(matches!(err, EngineError::HandleNotFound(_)));
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_join_kind_checked_before_resolution() {
        let engine = Engine::in_memory();
        let ghost = Handle::from_token("no-such-token");

        let err = engine.join(&ghost, &ghost, "user_id", "sideways").unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter(_)));
    }

    #[test]
    fn test_group_by_totals() {
        let engine = Engine::in_memory();
        let orders = engine.query_database("orders").unwrap();

        let grouped = engine
            .group_by(
                &orders,
                &["user_id".to_string()],
                &[("amount".to_string(), "sum".to_string())],
            )
            .unwrap();
        let table = engine.resolve(&grouped).unwrap();
        // user 1: 1200 + 25, user 2: 75 + 250
        assert_eq!(
            table.column_values("amount").unwrap()[0],
            Value::int(1225)
        );
        assert_eq!(table.column_values("amount").unwrap()[1], Value::int(325));
    }

    #[test]
    fn test_materialize_uses_configured_preview() {
        let engine = Engine::in_memory();
        let users = engine.query_database("users").unwrap();

        let preview = engine.materialize(&users, "head", None).unwrap();
        assert!(preview.contains("Eve"));
        assert!(!preview.contains("Alice2"));

        let err = engine.materialize(&users, "hologram", None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter(_)));
    }

    #[test]
    fn test_materialize_honors_custom_preview_size() {
        let config = EngineConfig {
            preview_rows: 2,
            ..EngineConfig::default()
        };
        let engine = Engine::new(config).unwrap();
        let users = engine.query_database("users").unwrap();

        for n in [None, Some(0), Some(-4)] {
            let preview = engine.materialize(&users, "head", n).unwrap();
            assert!(preview.contains("Bob"));
            assert!(!preview.contains("Charlie"));
        }
    }
}
