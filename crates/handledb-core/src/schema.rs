//! Schema representation for tables.
//!
//! A schema is an ordered list of named, typed columns with a name index
//! for fast lookup. Column names are unique within a schema.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 64-bit signed integer.
    Integer,
    /// 64-bit floating point.
    Float,
    /// UTF-8 string.
    Text,
    /// Boolean.
    Boolean,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "integer"),
            DataType::Float => write!(f, "float"),
            DataType::Text => write!(f, "text"),
            DataType::Boolean => write!(f, "boolean"),
        }
    }
}

/// A column in a schema (name + type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Column name.
    pub name: String,
    /// Declared data type.
    pub data_type: DataType,
}

impl Field {
    /// Creates a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.data_type)
    }
}

/// Schema describes the ordered columns of a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    /// Fields in column order.
    fields: Vec<Field>,
    /// Index by column name for fast lookup.
    #[serde(skip)]
    index: HashMap<String, usize>,
}

// Deserialization rebuilds the name index from the field list.
impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct SchemaData {
            fields: Vec<Field>,
        }
        let data = SchemaData::deserialize(deserializer)?;
        Ok(Schema::new(data.fields))
    }
}

impl Schema {
    /// Creates an empty schema.
    pub fn empty() -> Self {
        Self {
            fields: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Creates a schema from a list of fields.
    pub fn new(fields: Vec<Field>) -> Self {
        let mut schema = Self::empty();
        for field in fields {
            schema.add_field(field);
        }
        schema
    }

    /// Adds a field to the schema. A field with a duplicate name replaces
    /// nothing; the first occurrence wins the index entry.
    pub fn add_field(&mut self, field: Field) {
        if !self.index.contains_key(&field.name) {
            self.index.insert(field.name.clone(), self.fields.len());
        }
        self.fields.push(field);
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the fields.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the field at the given index.
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Finds a field by name.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.index.get(name).and_then(|&i| self.fields.get(i))
    }

    /// Finds the index of a field by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Returns true if the schema contains the named column.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns every name in `names` that is not a column of this schema,
    /// in the order given. Used by operations to report all unknown
    /// columns at once.
    pub fn missing_columns<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        names
            .iter()
            .filter(|n| !self.contains(n.as_ref()))
            .map(|n| n.as_ref().to_string())
            .collect()
    }

    /// Merges two schemas (for joins).
    pub fn merge(&self, other: &Schema) -> Self {
        let mut fields = self.fields.clone();
        fields.extend(other.fields.iter().cloned());
        Schema::new(fields)
    }

    /// Projects the schema to the specified column indices.
    pub fn project(&self, indices: &[usize]) -> Self {
        let fields: Vec<_> = indices
            .iter()
            .filter_map(|&i| self.fields.get(i).cloned())
            .collect();
        Schema::new(fields)
    }

    /// Infers a column type from the first non-null value in `values`,
    /// defaulting to `Text` when every value is null.
    pub fn infer_type(values: &[Value]) -> DataType {
        values
            .iter()
            .find_map(|v| v.data_type())
            .unwrap_or(DataType::Text)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", field)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lookup() {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Integer),
            Field::new("name", DataType::Text),
        ]);

        assert_eq!(schema.len(), 2);
        assert_eq!(schema.index_of("id"), Some(0));
        assert_eq!(schema.index_of("name"), Some(1));
        assert_eq!(schema.index_of("missing"), None);
        assert!(schema.contains("id"));
    }

    #[test]
    fn test_schema_missing_columns() {
        let schema = Schema::new(vec![
            Field::new("a", DataType::Integer),
            Field::new("b", DataType::Text),
        ]);

        let missing = schema.missing_columns(&["a", "x", "b", "y"]);
        assert_eq!(missing, vec!["x".to_string(), "y".to_string()]);
        assert!(schema.missing_columns(&["a", "b"]).is_empty());
    }

    #[test]
    fn test_schema_merge_and_project() {
        let s1 = Schema::new(vec![Field::new("a", DataType::Integer)]);
        let s2 = Schema::new(vec![Field::new("b", DataType::Text)]);
        let merged = s1.merge(&s2);
        assert_eq!(merged.len(), 2);

        let projected = merged.project(&[1]);
        assert_eq!(projected.len(), 1);
        assert_eq!(projected.field(0).unwrap().name, "b");
    }

    #[test]
    fn test_schema_infer_type() {
        assert_eq!(
            Schema::infer_type(&[Value::Null, Value::int(1)]),
            DataType::Integer
        );
        assert_eq!(Schema::infer_type(&[Value::Null]), DataType::Text);
    }

    #[test]
    fn test_schema_index_survives_serde() {
        let schema = Schema::new(vec![
            Field::new("a", DataType::Integer),
            Field::new("b", DataType::Float),
        ]);
        let encoded = serde_json::to_string(&schema).unwrap();
        let decoded: Schema = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.index_of("b"), Some(1));
        assert_eq!(decoded, schema);
    }
}
