//! Table and row representation.
//!
//! A `Table` is an immutable-by-contract relation: a schema plus an
//! ordered sequence of rows. Operations never mutate a table in place;
//! they build a new one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::{Field, Schema};
use crate::value::Value;

/// A single row of values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row with the given values.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Creates a row of `n` null values.
    pub fn nulls(n: usize) -> Self {
        Self {
            values: vec![Value::Null; n],
        }
    }

    /// Returns the number of values in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value at the given index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Appends a value to this row.
    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Returns an iterator over the values.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Returns the values as a slice.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consumes the row and returns the values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Projects this row to the given indices. Out-of-range indices
    /// produce nulls.
    pub fn project(&self, indices: &[usize]) -> Row {
        let values = indices
            .iter()
            .map(|&i| self.values.get(i).cloned().unwrap_or(Value::Null))
            .collect();
        Row { values }
    }

    /// Concatenates this row with another row.
    pub fn concat(&self, other: &Row) -> Row {
        let mut values = self.values.clone();
        values.extend(other.values.iter().cloned());
        Row { values }
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

/// An immutable relation: named, typed columns and an ordered sequence
/// of rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    schema: Schema,
    rows: Vec<Row>,
}

impl Table {
    /// Creates a new table, validating that every row matches the schema
    /// arity.
    pub fn new(schema: Schema, rows: Vec<Row>) -> Result<Self, String> {
        let width = schema.len();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    width
                ));
            }
        }
        Ok(Self { schema, rows })
    }

    /// Creates an empty table with the given schema.
    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Builds a table column-by-column, inferring each column's type from
    /// its first non-null value. All columns must have the same length.
    pub fn from_columns(columns: Vec<(String, Vec<Value>)>) -> Result<Self, String> {
        let num_rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut fields = Vec::with_capacity(columns.len());
        for (name, values) in &columns {
            if values.len() != num_rows {
                return Err(format!(
                    "column '{}' has {} values, expected {}",
                    name,
                    values.len(),
                    num_rows
                ));
            }
            fields.push(Field::new(name.clone(), Schema::infer_type(values)));
        }

        let mut rows = vec![Row::new(Vec::with_capacity(columns.len())); num_rows];
        for (_, values) in columns {
            for (row, value) in rows.iter_mut().zip(values) {
                row.push(value);
            }
        }
        Ok(Self {
            schema: Schema::new(fields),
            rows,
        })
    }

    /// Returns the schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the number of rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of columns.
    pub fn num_columns(&self) -> usize {
        self.schema.len()
    }

    /// Returns `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows(), self.num_columns())
    }

    /// Returns the rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the row at the given index.
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Returns all values of the named column, or `None` if the column
    /// does not exist.
    pub fn column_values(&self, name: &str) -> Option<Vec<Value>> {
        let idx = self.schema.index_of(name)?;
        Some(
            self.rows
                .iter()
                .map(|r| r.get(idx).cloned().unwrap_or(Value::Null))
                .collect(),
        )
    }

    /// Builds a new table holding the given slice of this table's rows.
    pub fn with_rows(&self, rows: Vec<Row>) -> Self {
        Self {
            schema: self.schema.clone(),
            rows,
        }
    }

    /// Appends a computed column, recomputing its declared type from the
    /// supplied values. Used by operations that add columns; the table
    /// itself stays immutable (a new table is returned).
    pub fn with_column(&self, name: impl Into<String>, values: Vec<Value>) -> Result<Self, String> {
        let name = name.into();
        if values.len() != self.num_rows() {
            return Err(format!(
                "column '{}' has {} values, expected {}",
                name,
                values.len(),
                self.num_rows()
            ));
        }
        let data_type = Schema::infer_type(&values);

        let mut fields: Vec<Field> = self.schema.fields().to_vec();
        let mut rows = self.rows.clone();
        if let Some(idx) = self.schema.index_of(&name) {
            // Replacing an existing column keeps its position.
            fields[idx] = Field::new(name, data_type);
            for (row, value) in rows.iter_mut().zip(values) {
                row.values[idx] = value;
            }
        } else {
            fields.push(Field::new(name, data_type));
            for (row, value) in rows.iter_mut().zip(values) {
                row.push(value);
            }
        }
        Ok(Self {
            schema: Schema::new(fields),
            rows,
        })
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::empty(Schema::empty())
    }
}
