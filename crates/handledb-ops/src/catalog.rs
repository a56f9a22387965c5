//! The operation catalog.
//!
//! Pure table-in, table-out functions. Every operation that references
//! columns validates them up front and reports all missing names at
//! once.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use handledb_core::{DataType, Field, Row, Schema, Table, Value};

use crate::aggregate::{Accumulator, AggFunc};
use crate::error::{OpError, OpResult};
use crate::predicate::Predicate;

/// Projects a table to exactly the named columns, in the given order.
pub fn select_columns(table: &Table, names: &[String]) -> OpResult<Table> {
    let missing = table.schema().missing_columns(names);
    if !missing.is_empty() {
        return Err(OpError::columns(missing));
    }

    let indices: Vec<usize> = names
        .iter()
        .filter_map(|n| table.schema().index_of(n))
        .collect();
    let schema = table.schema().project(&indices);
    let rows = table.rows().iter().map(|r| r.project(&indices)).collect();
    Table::new(schema, rows).map_err(OpError::Internal)
}

/// Keeps rows matching the predicate expression.
pub fn filter_rows(table: &Table, expr: &str) -> OpResult<Table> {
    let predicate = Predicate::parse(expr)?;
    let missing = predicate.missing_columns(table.schema());
    if !missing.is_empty() {
        return Err(OpError::columns(missing));
    }

    let mut rows = Vec::new();
    for row in table.rows() {
        if predicate.matches(row, table.schema())? {
            rows.push(row.clone());
        }
    }
    Ok(table.with_rows(rows))
}

/// Removes the named columns. Unknown names are ignored; dropping every
/// column yields a zero-column table.
pub fn drop_columns(table: &Table, names: &[String]) -> Table {
    let dropped: HashSet<&str> = names.iter().map(String::as_str).collect();
    let kept: Vec<usize> = table
        .schema()
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| !dropped.contains(f.name.as_str()))
        .map(|(i, _)| i)
        .collect();

    let schema = table.schema().project(&kept);
    let rows = table.rows().iter().map(|r| r.project(&kept)).collect();
    Table::empty(schema).with_rows(rows)
}

/// Appends a text column formed by rendering `col1` and `col2` with a
/// separator between them. The separator defaults to a single space.
pub fn combine_columns(
    table: &Table,
    col1: &str,
    col2: &str,
    new_name: &str,
    sep: Option<&str>,
) -> OpResult<Table> {
    let missing = table.schema().missing_columns(&[col1, col2]);
    if !missing.is_empty() {
        return Err(OpError::columns(missing));
    }
    let sep = sep.unwrap_or(" ");

    let i1 = table.schema().index_of(col1).ok_or_else(|| {
        OpError::Internal(format!("column '{}' vanished after validation", col1))
    })?;
    let i2 = table.schema().index_of(col2).ok_or_else(|| {
        OpError::Internal(format!("column '{}' vanished after validation", col2))
    })?;

    let values: Vec<Value> = table
        .rows()
        .iter()
        .map(|row| {
            let a = row.get(i1).map(Value::render).unwrap_or_default();
            let b = row.get(i2).map(Value::render).unwrap_or_default();
            Value::String(format!("{}{}{}", a, sep, b))
        })
        .collect();

    table.with_column(new_name, values).map_err(OpError::Internal)
}

/// Join variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Outer,
}

impl FromStr for JoinKind {
    type Err = OpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inner" => Ok(JoinKind::Inner),
            "left" => Ok(JoinKind::Left),
            "right" => Ok(JoinKind::Right),
            "outer" => Ok(JoinKind::Outer),
            other => Err(OpError::invalid(format!(
                "unsupported join kind '{}', expected inner, left, right or outer",
                other
            ))),
        }
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinKind::Inner => "inner",
            JoinKind::Left => "left",
            JoinKind::Right => "right",
            JoinKind::Outer => "outer",
        };
        write!(f, "{}", name)
    }
}

/// Hash equi-join on a single column present in both tables. The join
/// column is emitted once, at its position in the left table. Null keys
/// never match.
pub fn join(left: &Table, right: &Table, on: &str, kind: JoinKind) -> OpResult<Table> {
    let mut missing = Vec::new();
    let left_key = left.schema().index_of(on);
    let right_key = right.schema().index_of(on);
    if left_key.is_none() {
        missing.push(format!("{} (left table)", on));
    }
    if right_key.is_none() {
        missing.push(format!("{} (right table)", on));
    }
    if !missing.is_empty() {
        return Err(OpError::columns(missing));
    }
    let (left_key, right_key) = match (left_key, right_key) {
        (Some(l), Some(r)) => (l, r),
        _ => return Err(OpError::Internal("join key vanished after validation".into())),
    };

    // Right-side columns minus the key.
    let right_indices: Vec<usize> = (0..right.num_columns())
        .filter(|&i| i != right_key)
        .collect();
    let schema = left
        .schema()
        .merge(&right.schema().project(&right_indices));

    // Build phase: hash the right side by key.
    let mut build: HashMap<Value, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        let key = row.get(right_key).cloned().unwrap_or(Value::Null);
        if !key.is_null() {
            build.entry(key).or_default().push(i);
        }
    }

    let emit_left_unmatched = matches!(kind, JoinKind::Left | JoinKind::Outer);
    let emit_right_unmatched = matches!(kind, JoinKind::Right | JoinKind::Outer);

    let mut rows = Vec::new();
    let mut matched_right = vec![false; right.num_rows()];
    for row in left.rows() {
        let key = row.get(left_key).cloned().unwrap_or(Value::Null);
        let matches = if key.is_null() { None } else { build.get(&key) };
        match matches {
            Some(indices) => {
                for &ri in indices {
                    matched_right[ri] = true;
                    let right_row = right
                        .row(ri)
                        .map(|r| r.project(&right_indices))
                        .unwrap_or_else(|| Row::nulls(right_indices.len()));
                    rows.push(row.concat(&right_row));
                }
            }
            None if emit_left_unmatched => {
                rows.push(row.concat(&Row::nulls(right_indices.len())));
            }
            None => {}
        }
    }

    if emit_right_unmatched {
        for (ri, row) in right.rows().iter().enumerate() {
            if matched_right[ri] {
                continue;
            }
            // Left side is all null except the key column, which takes
            // the right side's key value.
            let mut left_row = Row::nulls(left.num_columns());
            let mut values = left_row.into_values();
            values[left_key] = row.get(right_key).cloned().unwrap_or(Value::Null);
            left_row = Row::new(values);
            rows.push(left_row.concat(&row.project(&right_indices)));
        }
    }

    Table::new(schema, rows).map_err(OpError::Internal)
}

/// Drops duplicate rows, keeping the first occurrence. With a subset,
/// duplicates are judged on (and the output projected to) those columns.
pub fn remove_duplicates(table: &Table, subset: Option<&[String]>) -> OpResult<Table> {
    let view = match subset {
        Some(names) => {
            let missing = table.schema().missing_columns(names);
            if !missing.is_empty() {
                return Err(OpError::columns(missing));
            }
            select_columns(table, names)?
        }
        None => table.clone(),
    };

    let mut seen = HashSet::new();
    let rows: Vec<Row> = view
        .rows()
        .iter()
        .filter(|row| seen.insert((*row).clone()))
        .cloned()
        .collect();
    Ok(view.with_rows(rows))
}

/// Hash-groups rows on the group-column tuple and aggregates. Output
/// rows appear in first-occurrence order of each group; output columns
/// are the group columns followed by the aggregated columns in the
/// order given.
pub fn group_by(
    table: &Table,
    group_cols: &[String],
    aggs: &[(String, AggFunc)],
) -> OpResult<Table> {
    if group_cols.is_empty() {
        return Err(OpError::invalid("group_by requires at least one group column"));
    }

    let mut referenced: Vec<&str> = group_cols.iter().map(String::as_str).collect();
    referenced.extend(aggs.iter().map(|(c, _)| c.as_str()));
    let missing = table.schema().missing_columns(&referenced);
    if !missing.is_empty() {
        return Err(OpError::columns(missing));
    }

    let group_indices: Vec<usize> = group_cols
        .iter()
        .filter_map(|n| table.schema().index_of(n))
        .collect();
    let agg_indices: Vec<usize> = aggs
        .iter()
        .filter_map(|(n, _)| table.schema().index_of(n))
        .collect();

    // Groups keep first-occurrence order so output is deterministic.
    let mut group_order: Vec<Vec<Value>> = Vec::new();
    let mut groups: HashMap<Vec<Value>, Vec<Accumulator>> = HashMap::new();
    for row in table.rows() {
        let key: Vec<Value> = group_indices
            .iter()
            .map(|&i| row.get(i).cloned().unwrap_or(Value::Null))
            .collect();
        let accumulators = groups.entry(key.clone()).or_insert_with(|| {
            group_order.push(key);
            aggs.iter().map(|(_, f)| Accumulator::new(*f)).collect()
        });
        for (acc, &idx) in accumulators.iter_mut().zip(&agg_indices) {
            acc.accumulate(row.get(idx).unwrap_or(&Value::Null));
        }
    }

    let mut fields: Vec<Field> = group_indices
        .iter()
        .filter_map(|&i| table.schema().field(i).cloned())
        .collect();
    let mut rows = Vec::with_capacity(group_order.len());
    let mut agg_columns: Vec<Vec<Value>> = vec![Vec::new(); aggs.len()];
    for key in &group_order {
        let accumulators = groups.get(key).ok_or_else(|| {
            OpError::Internal("group key vanished during aggregation".into())
        })?;
        let mut row = Row::new(key.clone());
        for (col, acc) in agg_columns.iter_mut().zip(accumulators) {
            let value = acc.result();
            row.push(value.clone());
            col.push(value);
        }
        rows.push(row);
    }
    for ((name, _), values) in aggs.iter().zip(&agg_columns) {
        fields.push(Field::new(name.clone(), Schema::infer_type(values)));
    }

    Table::new(Schema::new(fields), rows).map_err(OpError::Internal)
}

/// Describes a table's schema as a table: one row per column with its
/// name, declared type, and the source row count.
pub fn describe_schema(table: &Table) -> Table {
    let num_rows = table.num_rows() as i64;
    let schema = Schema::new(vec![
        Field::new("column", DataType::Text),
        Field::new("dtype", DataType::Text),
        Field::new("num_rows", DataType::Integer),
    ]);
    let rows = table
        .schema()
        .fields()
        .iter()
        .map(|f| {
            Row::new(vec![
                Value::string(f.name.clone()),
                Value::string(f.data_type.to_string()),
                Value::int(num_rows),
            ])
        })
        .collect();
    Table::empty(schema).with_rows(rows)
}
