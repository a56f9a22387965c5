//! Materialization: rendering a table to a string.
//!
//! Preview formats (`head`, `tail`, `sample`) take a row count, `full`
//! dumps everything up to a hard cap, and the remaining formats produce
//! machine-readable JSON or CSV.

use std::fmt;
use std::str::FromStr;

use comfy_table::{Cell, ContentArrangement};
use rand::seq::index::sample as sample_indices;
use serde_json::{json, Value as JsonValue};

use handledb_core::{Table, Value};

use crate::error::{OpError, OpResult};

/// Rows a preview shows when no count (or a non-positive count) is
/// given.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Hard cap on `full` output.
pub const FULL_ROW_CAP: usize = 1000;

/// Materialization formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    /// First `n` rows as a human-readable table.
    Head,
    /// Last `n` rows as a human-readable table.
    Tail,
    /// `n` randomly sampled rows as a human-readable table.
    Sample,
    /// Every row (capped) as a human-readable table.
    Full,
    /// JSON array of `{column: value}` objects.
    JsonRecords,
    /// JSON object `{"columns": [...], "data": [[...], ...]}`.
    JsonSplit,
    /// CSV with a header row.
    Csv,
}

impl RenderFormat {
    /// All recognized names, for error messages.
    pub const NAMES: &'static [&'static str] = &[
        "head",
        "tail",
        "sample",
        "full",
        "json-records",
        "json-split",
        "csv",
    ];
}

impl FromStr for RenderFormat {
    type Err = OpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "head" => Ok(RenderFormat::Head),
            "tail" => Ok(RenderFormat::Tail),
            "sample" => Ok(RenderFormat::Sample),
            "full" => Ok(RenderFormat::Full),
            "json-records" | "json_records" => Ok(RenderFormat::JsonRecords),
            "json-split" | "json_split" => Ok(RenderFormat::JsonSplit),
            "csv" => Ok(RenderFormat::Csv),
            other => Err(OpError::invalid(format!(
                "unsupported format '{}', expected one of: {}",
                other,
                Self::NAMES.join(", ")
            ))),
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderFormat::Head => "head",
            RenderFormat::Tail => "tail",
            RenderFormat::Sample => "sample",
            RenderFormat::Full => "full",
            RenderFormat::JsonRecords => "json-records",
            RenderFormat::JsonSplit => "json-split",
            RenderFormat::Csv => "csv",
        };
        write!(f, "{}", name)
    }
}

/// Renders a table to a string. `n` controls the preview formats; a
/// non-positive value falls back to the default of 5.
pub fn materialize(table: &Table, format: RenderFormat, n: Option<i64>) -> OpResult<String> {
    let n = match n {
        Some(v) if v > 0 => v as usize,
        _ => DEFAULT_PREVIEW_ROWS,
    };

    match format {
        RenderFormat::Head => {
            let rows = &table.rows()[..n.min(table.num_rows())];
            Ok(render_table(table, rows))
        }
        RenderFormat::Tail => {
            let start = table.num_rows().saturating_sub(n);
            Ok(render_table(table, &table.rows()[start..]))
        }
        RenderFormat::Sample => {
            let count = n.min(table.num_rows());
            let mut indices: Vec<usize> =
                sample_indices(&mut rand::thread_rng(), table.num_rows(), count).into_vec();
            indices.sort_unstable();
            let rows: Vec<_> = indices
                .iter()
                .filter_map(|&i| table.row(i).cloned())
                .collect();
            Ok(render_table(table, &rows))
        }
        RenderFormat::Full => {
            let capped = table.num_rows().min(FULL_ROW_CAP);
            let mut out = render_table(table, &table.rows()[..capped]);
            if table.num_rows() > FULL_ROW_CAP {
                out.push_str(&format!(
                    "\n[showing first {} of {} rows]",
                    FULL_ROW_CAP,
                    table.num_rows()
                ));
            }
            Ok(out)
        }
        RenderFormat::JsonRecords => render_json_records(table),
        RenderFormat::JsonSplit => render_json_split(table),
        RenderFormat::Csv => Ok(render_csv(table)),
    }
}

fn render_table(table: &Table, rows: &[handledb_core::Row]) -> String {
    let mut out = comfy_table::Table::new();
    out.set_content_arrangement(ContentArrangement::Dynamic)
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);

    if !table.schema().is_empty() {
        out.set_header(table.schema().fields().iter().map(|f| Cell::new(&f.name)));
    }
    for row in rows {
        out.add_row(row.iter().map(|v| Cell::new(v.to_string())));
    }
    out.to_string()
}

fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => json!(*b),
        Value::Integer(i) => json!(*i),
        Value::Float(f) => json!(*f),
        Value::String(s) => json!(s),
    }
}

fn render_json_records(table: &Table) -> OpResult<String> {
    let records: Vec<JsonValue> = table
        .rows()
        .iter()
        .map(|row| {
            let mut obj = serde_json::Map::new();
            for (field, value) in table.schema().fields().iter().zip(row.iter()) {
                obj.insert(field.name.clone(), value_to_json(value));
            }
            JsonValue::Object(obj)
        })
        .collect();
    serde_json::to_string(&records).map_err(|e| OpError::Internal(e.to_string()))
}

fn render_json_split(table: &Table) -> OpResult<String> {
    let columns: Vec<&str> = table
        .schema()
        .fields()
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    let data: Vec<Vec<JsonValue>> = table
        .rows()
        .iter()
        .map(|row| row.iter().map(value_to_json).collect())
        .collect();
    serde_json::to_string(&json!({ "columns": columns, "data": data }))
        .map_err(|e| OpError::Internal(e.to_string()))
}

fn render_csv(table: &Table) -> String {
    let mut output = String::new();

    if !table.schema().is_empty() {
        let header: Vec<String> = table
            .schema()
            .fields()
            .iter()
            .map(|f| escape_csv(&f.name))
            .collect();
        output.push_str(&header.join(","));
        output.push('\n');
    }

    for row in table.rows() {
        let values: Vec<String> = row.iter().map(|v| escape_csv(&v.render())).collect();
        output.push_str(&values.join(","));
        output.push('\n');
    }

    output
}

/// Escapes a value for CSV output.
fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table(rows: usize) -> Table {
        let ids: Vec<Value> = (0..rows as i64).map(Value::int).collect();
        let names: Vec<Value> = (0..rows).map(|i| Value::string(format!("n{}", i))).collect();
        Table::from_columns(vec![("id".to_string(), ids), ("name".to_string(), names)])
            .unwrap()
    }

    #[test]
    fn test_head_and_tail() {
        let t = sample_table(10);
        let head = materialize(&t, RenderFormat::Head, Some(2)).unwrap();
        assert!(head.contains("n0"));
        assert!(head.contains("n1"));
        assert!(!head.contains("n2"));

        let tail = materialize(&t, RenderFormat::Tail, Some(2)).unwrap();
        assert!(tail.contains("n9"));
        assert!(!tail.contains("n7"));
    }

    #[test]
    fn test_default_n_fallback() {
        let t = sample_table(10);
        for n in [None, Some(0), Some(-3)] {
            let out = materialize(&t, RenderFormat::Head, n).unwrap();
            assert!(out.contains("n4"));
            assert!(!out.contains("n5"));
        }
    }

    #[test]
    fn test_sample_row_count() {
        let t = sample_table(10);
        let out = materialize(&t, RenderFormat::Sample, Some(3)).unwrap();
        // 3 sampled rows plus header and borders
        let data_lines = out
            .lines()
            .filter(|l| l.contains('n') && !l.contains("name"))
            .count();
        assert_eq!(data_lines, 3);
    }

    #[test]
    fn test_full_cap_notice() {
        let t = sample_table(1005);
        let out = materialize(&t, RenderFormat::Full, None).unwrap();
        assert!(out.contains("[showing first 1000 of 1005 rows]"));
        assert!(!out.contains("n1004"));

        let small = materialize(&sample_table(3), RenderFormat::Full, None).unwrap();
        assert!(!small.contains("showing first"));
        assert!(small.contains("n2"));
    }

    #[test]
    fn test_json_records() {
        let t = sample_table(2);
        let out = materialize(&t, RenderFormat::JsonRecords, None).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["id"], json!(0));
        assert_eq!(parsed[0]["name"], json!("n0"));
    }

    #[test]
    fn test_json_split() {
        let t = sample_table(2);
        let out = materialize(&t, RenderFormat::JsonSplit, None).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["columns"], json!(["id", "name"]));
        assert_eq!(parsed["data"][1], json!([1, "n1"]));
    }

    #[test]
    fn test_csv_with_escaping() {
        let t = Table::from_columns(vec![
            ("a".to_string(), vec![Value::string("x,y"), Value::Null]),
            ("b".to_string(), vec![Value::int(1), Value::int(2)]),
        ])
        .unwrap();
        let out = materialize(&t, RenderFormat::Csv, None).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "a,b");
        assert_eq!(lines[1], "\"x,y\",1");
        // Nulls render empty in CSV
        assert_eq!(lines[2], ",2");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("HEAD".parse::<RenderFormat>().unwrap(), RenderFormat::Head);
        assert_eq!(
            "json_records".parse::<RenderFormat>().unwrap(),
            RenderFormat::JsonRecords
        );
        assert!(matches!(
            "xml".parse::<RenderFormat>(),
            Err(OpError::InvalidParameter(_))
        ));
    }
}
