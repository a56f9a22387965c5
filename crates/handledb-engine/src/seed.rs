//! Seed catalog: the fixed demo tables callers can query by name.

use handledb_core::{Table, Value};

/// Registry of the built-in demo tables.
#[derive(Debug)]
pub struct SeedCatalog {
    tables: Vec<(String, Table)>,
}

impl SeedCatalog {
    /// Builds the catalog with the `users` and `orders` demo tables.
    pub fn new() -> Self {
        Self {
            tables: vec![
                ("users".to_string(), users_table()),
                ("orders".to_string(), orders_table()),
            ],
        }
    }

    /// Names of every seed table, in registration order.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Looks up a seed table by name.
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, table)| table)
    }
}

impl Default for SeedCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn users_table() -> Table {
    let columns = vec![
        (
            "user_id".to_string(),
            (1..=6).map(Value::int).collect(),
        ),
        (
            "name".to_string(),
            ["Alice", "Bob", "Charlie", "David", "Eve", "Alice2"]
                .into_iter()
                .map(Value::string)
                .collect(),
        ),
        (
            "city".to_string(),
            ["New York", "London", "Paris", "London", "Tokyo", "New York"]
                .into_iter()
                .map(Value::string)
                .collect(),
        ),
    ];
    // The demo data is static and well-formed; a failure here is a bug.
    Table::from_columns(columns).unwrap_or_default()
}

fn orders_table() -> Table {
    let columns = vec![
        (
            "order_id".to_string(),
            (101..=106).map(Value::int).collect(),
        ),
        (
            "user_id".to_string(),
            [1, 2, 1, 3, 5, 2].into_iter().map(Value::int).collect(),
        ),
        (
            "product".to_string(),
            ["Laptop", "Keyboard", "Mouse", "Monitor", "Webcam", "Desk"]
                .into_iter()
                .map(Value::string)
                .collect(),
        ),
        (
            "amount".to_string(),
            [1200, 75, 25, 300, 50, 250]
                .into_iter()
                .map(Value::int)
                .collect(),
        ),
    ];
    Table::from_columns(columns).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_contents() {
        let catalog = SeedCatalog::new();
        assert_eq!(catalog.table_names(), vec!["users", "orders"]);

        let users = catalog.get("users").unwrap();
        assert_eq!(users.shape(), (6, 3));
        assert_eq!(
            users.column_values("name").unwrap()[0],
            Value::string("Alice")
        );

        let orders = catalog.get("orders").unwrap();
        assert_eq!(orders.shape(), (6, 4));
        assert_eq!(orders.column_values("amount").unwrap()[3], Value::int(300));

        assert!(catalog.get("inventory").is_none());
    }
}
