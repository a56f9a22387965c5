//! Script escape hatch (feature `unsafe-exec`).
//!
//! Not a general-purpose language: a script is a sequence of
//! `alias = op(args...)` statements separated by newlines or `;`, where
//! `op` is a catalog operation and arguments are aliases, quoted
//! strings, integers, or string lists. Inputs are resolved into a
//! scratch scope; nothing touches the store until the whole script has
//! succeeded.

use std::collections::HashMap;
use std::str::FromStr;

use tracing::debug;

use handledb_core::Table;
use handledb_ops::{self as ops, AggFunc, JoinKind};
use handledb_store::Handle;

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone)]
enum Arg {
    Ident(String),
    Str(String),
    Int(i64),
    List(Vec<String>),
}

#[derive(Debug)]
struct Statement {
    target: String,
    op: String,
    args: Vec<Arg>,
}

impl Engine {
    /// Runs a script against a scratch scope seeded from
    /// `input_handles`. Every alias in `output_aliases` must be bound to
    /// a table when the script finishes; each is then wrapped in a fresh
    /// handle. Any failure aborts the whole call without writing to the
    /// store.
    pub fn run_script(
        &self,
        code: &str,
        input_handles: &HashMap<String, Handle>,
        output_aliases: &[String],
    ) -> EngineResult<HashMap<String, Handle>> {
        if !self.config().allow_scripts {
            return Err(EngineError::Execution(
                "script execution is disabled by configuration".to_string(),
            ));
        }

        let mut scope: HashMap<String, Table> = HashMap::new();
        for (alias, handle) in input_handles {
            scope.insert(alias.clone(), self.resolve(handle)?);
        }

        let statements = parse_script(code)?;
        for (i, stmt) in statements.iter().enumerate() {
            let result = execute_statement(stmt, &scope).map_err(|e| {
                EngineError::Execution(format!(
                    "statement {} ('{} = {}(...)'): {}",
                    i + 1,
                    stmt.target,
                    stmt.op,
                    e
                ))
            })?;
            debug!(target = %stmt.target, op = %stmt.op, "script statement executed");
            scope.insert(stmt.target.clone(), result);
        }

        // Validate every requested alias before minting anything, so a
        // failed call never leaves partial handles behind.
        let mut resolved = Vec::with_capacity(output_aliases.len());
        for alias in output_aliases {
            let table = scope.get(alias).ok_or_else(|| {
                EngineError::Execution(format!(
                    "output alias '{}' is not bound to a table",
                    alias
                ))
            })?;
            resolved.push((alias, table));
        }

        let mut outputs = HashMap::new();
        for (alias, table) in resolved {
            outputs.insert(alias.clone(), self.store().create(table.clone())?);
        }
        Ok(outputs)
    }
}

fn parse_script(code: &str) -> EngineResult<Vec<Statement>> {
    let mut statements = Vec::new();
    for raw in code.split(['\n', ';']) {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        statements.push(parse_statement(line).map_err(EngineError::Execution)?);
    }
    if statements.is_empty() {
        return Err(EngineError::Execution("empty script".to_string()));
    }
    Ok(statements)
}

fn parse_statement(line: &str) -> Result<Statement, String> {
    let (target, rest) = line
        .split_once('=')
        .ok_or_else(|| format!("expected 'alias = op(args)', got '{}'", line))?;
    let target = target.trim();
    if target.is_empty() || !is_ident(target) {
        return Err(format!("invalid alias '{}'", target));
    }

    let rest = rest.trim();
    let open = rest
        .find('(')
        .ok_or_else(|| format!("expected call in '{}'", rest))?;
    if !rest.ends_with(')') {
        return Err(format!("unterminated call in '{}'", rest));
    }
    let op = rest[..open].trim();
    if !is_ident(op) {
        return Err(format!("invalid operation name '{}'", op));
    }
    let args = parse_args(&rest[open + 1..rest.len() - 1])?;
    Ok(Statement {
        target: target.to_string(),
        op: op.to_string(),
        args,
    })
}

fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn parse_args(text: &str) -> Result<Vec<Arg>, String> {
    let mut args = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() || c == ',' => i += 1,
            '\'' | '"' => {
                let (s, next) = scan_string(&chars, i)?;
                args.push(Arg::Str(s));
                i = next;
            }
            '[' => {
                let close = find_close(&chars, i)?;
                let inner: String = chars[i + 1..close].iter().collect();
                let mut items = Vec::new();
                for item in split_list(&inner) {
                    let item = item.trim();
                    if item.is_empty() {
                        continue;
                    }
                    if item.starts_with('\'') || item.starts_with('"') {
                        let item_chars: Vec<char> = item.chars().collect();
                        let (s, end) = scan_string(&item_chars, 0)?;
                        if end != item_chars.len() {
                            return Err(format!("trailing text after string in '{}'", item));
                        }
                        items.push(s);
                    } else {
                        items.push(item.to_string());
                    }
                }
                args.push(Arg::List(items));
                i = close + 1;
            }
            c if c.is_ascii_digit() || c == '-' => {
                let start = i;
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let v = text
                    .parse()
                    .map_err(|_| format!("invalid integer '{}'", text))?;
                args.push(Arg::Int(v));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                args.push(Arg::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character '{}' in arguments", other)),
        }
    }
    Ok(args)
}

fn scan_string(chars: &[char], start: usize) -> Result<(String, usize), String> {
    let quote = chars[start];
    let mut j = start + 1;
    while j < chars.len() && chars[j] != quote {
        j += 1;
    }
    if j == chars.len() {
        return Err("unterminated string literal".to_string());
    }
    Ok((chars[start + 1..j].iter().collect(), j + 1))
}

fn find_close(chars: &[char], open: usize) -> Result<usize, String> {
    chars[open..]
        .iter()
        .position(|&c| c == ']')
        .map(|p| open + p)
        .ok_or_else(|| "unterminated list".to_string())
}

fn split_list(inner: &str) -> Vec<&str> {
    // Lists hold only simple items, so splitting on commas outside
    // quotes is enough.
    let mut items = Vec::new();
    let mut depth_quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match (c, depth_quote) {
            ('\'' | '"', None) => depth_quote = Some(c),
            (q, Some(open)) if q == open => depth_quote = None,
            (',', None) => {
                items.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&inner[start..]);
    items
}

fn execute_statement(stmt: &Statement, scope: &HashMap<String, Table>) -> Result<Table, String> {
    let args = &stmt.args;
    match stmt.op.as_str() {
        "select_columns" => {
            let table = table_arg(scope, args, 0)?;
            let names = list_arg(args, 1)?;
            ops::select_columns(table, &names).map_err(|e| e.to_string())
        }
        "filter_rows" => {
            let table = table_arg(scope, args, 0)?;
            let expr = str_arg(args, 1)?;
            ops::filter_rows(table, &expr).map_err(|e| e.to_string())
        }
        "drop_columns" => {
            let table = table_arg(scope, args, 0)?;
            let names = list_arg(args, 1)?;
            Ok(ops::drop_columns(table, &names))
        }
        "combine_columns" => {
            let table = table_arg(scope, args, 0)?;
            let col1 = str_arg(args, 1)?;
            let col2 = str_arg(args, 2)?;
            let new_name = str_arg(args, 3)?;
            let sep = match args.get(4) {
                Some(Arg::Str(s)) => Some(s.clone()),
                Some(other) => return Err(format!("separator must be a string, got {:?}", other)),
                None => None,
            };
            ops::combine_columns(table, &col1, &col2, &new_name, sep.as_deref())
                .map_err(|e| e.to_string())
        }
        "join" => {
            let left = table_arg(scope, args, 0)?;
            let right = table_arg(scope, args, 1)?;
            let on = str_arg(args, 2)?;
            let kind = JoinKind::from_str(&str_arg(args, 3)?).map_err(|e| e.to_string())?;
            ops::join(left, right, &on, kind).map_err(|e| e.to_string())
        }
        "remove_duplicates" => {
            let table = table_arg(scope, args, 0)?;
            let subset = match args.get(1) {
                Some(Arg::List(items)) => Some(items.clone()),
                Some(other) => return Err(format!("subset must be a list, got {:?}", other)),
                None => None,
            };
            ops::remove_duplicates(table, subset.as_deref()).map_err(|e| e.to_string())
        }
        "group_by" => {
            let table = table_arg(scope, args, 0)?;
            let group_cols = list_arg(args, 1)?;
            // Aggregations are "column:func" items.
            let mut aggs = Vec::new();
            for spec in list_arg(args, 2)? {
                let (col, func) = spec
                    .split_once(':')
                    .ok_or_else(|| format!("expected 'column:func', got '{}'", spec))?;
                let func = AggFunc::from_str(func.trim()).map_err(|e| e.to_string())?;
                aggs.push((col.trim().to_string(), func));
            }
            ops::group_by(table, &group_cols, &aggs).map_err(|e| e.to_string())
        }
        "describe_schema" => {
            let table = table_arg(scope, args, 0)?;
            Ok(ops::describe_schema(table))
        }
        other => Err(format!("unknown operation '{}'", other)),
    }
}

fn table_arg<'a>(
    scope: &'a HashMap<String, Table>,
    args: &[Arg],
    index: usize,
) -> Result<&'a Table, String> {
    match args.get(index) {
        Some(Arg::Ident(alias)) => scope
            .get(alias)
            .ok_or_else(|| format!("alias '{}' is not bound to a table", alias)),
        Some(other) => Err(format!("argument {} must be an alias, got {:?}", index, other)),
        None => Err(format!("missing table argument at position {}", index)),
    }
}

fn str_arg(args: &[Arg], index: usize) -> Result<String, String> {
    match args.get(index) {
        Some(Arg::Str(s)) => Ok(s.clone()),
        Some(other) => Err(format!("argument {} must be a string, got {:?}", index, other)),
        None => Err(format!("missing string argument at position {}", index)),
    }
}

fn list_arg(args: &[Arg], index: usize) -> Result<Vec<String>, String> {
    match args.get(index) {
        Some(Arg::List(items)) => Ok(items.clone()),
        Some(other) => Err(format!("argument {} must be a list, got {:?}", index, other)),
        None => Err(format!("missing list argument at position {}", index)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use handledb_core::Value;

    fn scripted_engine() -> Engine {
        let config = EngineConfig {
            allow_scripts: true,
            ..EngineConfig::default()
        };
        Engine::new(config).unwrap()
    }

    #[test]
    fn test_script_pipeline() {
        let engine = scripted_engine();
        let users = engine.query_database("users").unwrap();
        let orders = engine.query_database("orders").unwrap();

        let inputs = HashMap::from([
            ("users".to_string(), users),
            ("orders".to_string(), orders),
        ]);
        let outputs = engine
            .run_script(
                "joined = join(users, orders, 'user_id', 'inner')\n\
                 totals = group_by(joined, [name], ['amount:sum'])",
                &inputs,
                &["totals".to_string()],
            )
            .unwrap();

        let totals = engine.resolve(&outputs["totals"]).unwrap();
        assert_eq!(totals.num_rows(), 4);
        assert_eq!(totals.column_values("amount").unwrap()[0], Value::int(1225));
    }

    #[test]
    fn test_script_disabled_by_default() {
        let engine = Engine::in_memory();
        let err = engine
            .run_script("x = describe_schema(y)", &HashMap::new(), &[])
            .unwrap_err();
        assert!(matches!(err, EngineError::Execution(_)));
    }

    #[test]
    fn test_script_missing_output_alias() {
        let engine = scripted_engine();
        let users = engine.query_database("users").unwrap();
        let inputs = HashMap::from([("users".to_string(), users)]);

        let err = engine
            .run_script(
                "described = describe_schema(users)",
                &inputs,
                &["missing".to_string()],
            )
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_missing_output_alias_persists_nothing() {
        let engine = scripted_engine();
        let users = engine.query_database("users").unwrap();
        let inputs = HashMap::from([("users".to_string(), users)]);
        let before = engine.store().len();

        // "described" is bound but "missing" is not; the bound alias
        // must not be handed a handle when the call fails.
        let err = engine
            .run_script(
                "described = describe_schema(users)",
                &inputs,
                &["described".to_string(), "missing".to_string()],
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::Execution(_)));
        assert_eq!(engine.store().len(), before);
    }

    #[test]
    fn test_script_parse_error_aborts() {
        let engine = scripted_engine();
        let users = engine.query_database("users").unwrap();
        let inputs = HashMap::from([("users".to_string(), users)]);
        let before = engine.store().len();

        let err = engine
            .run_script("this is not a statement", &inputs, &[])
            .unwrap_err();
        assert!(matches!(err, EngineError::Execution(_)));
        assert_eq!(engine.store().len(), before);
    }
}
