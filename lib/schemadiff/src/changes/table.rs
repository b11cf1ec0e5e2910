use serde::{Deserialize, Serialize};

use super::ModelChange;
use crate::error::{EntityKind, Result, SchemaError};
use crate::schema::{Database, Table};
use crate::types::CaseSensitivity;

/// Adds a table. Foreign keys are added separately once every table exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddTable {
    pub table_name: String,
    pub new_table: Table,
}

impl AddTable {
    pub fn new(table: &Table) -> Self {
        Self {
            table_name: table.name.clone(),
            new_table: table.clone_without_foreign_keys(),
        }
    }
}

impl ModelChange for AddTable {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn apply(&self, database: &mut Database, case: CaseSensitivity) -> Result<()> {
        if database.find_table(&self.table_name, case).is_some() {
            return Err(SchemaError::duplicate_in(EntityKind::Table, &self.table_name, None));
        }
        database.tables.push(self.new_table.clone_without_foreign_keys());
        Ok(())
    }
}

/// Drops a table. Foreign keys pointing at it must already be gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveTable {
    pub table_name: String,
}

impl RemoveTable {
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
        }
    }
}

impl ModelChange for RemoveTable {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn apply(&self, database: &mut Database, case: CaseSensitivity) -> Result<()> {
        let position = database
            .table_position(&self.table_name, case)
            .ok_or_else(|| SchemaError::table_not_found(&self.table_name))?;
        database.tables.remove(position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, ForeignKey};
    use crate::types::TypeCode;

    #[test]
    fn test_add_table_drops_foreign_keys() {
        let table = Table::new("b")
            .with_column(Column::new("a_id", TypeCode::Integer))
            .with_foreign_key(ForeignKey::new(None, "a", &[("a_id", "id")]));
        let mut db = Database::new("db");
        AddTable::new(&table).apply(&mut db, CaseSensitivity::Sensitive).unwrap();
        assert!(db.tables[0].foreign_keys.is_empty());
        assert_eq!(db.tables[0].column_names(), vec!["a_id"]);
    }

    #[test]
    fn test_add_existing_table_fails() {
        let mut db = Database::new("db").with_table(Table::new("Orders"));
        let err = AddTable::new(&Table::new("orders"))
            .apply(&mut db, CaseSensitivity::Insensitive)
            .unwrap_err();
        assert_eq!(err.to_string(), "table 'orders' already exists");
    }

    #[test]
    fn test_remove_table() {
        let mut db = Database::new("db").with_table(Table::new("a")).with_table(Table::new("b"));
        RemoveTable::new("A").apply(&mut db, CaseSensitivity::Insensitive).unwrap();
        assert_eq!(db.table_names(), vec!["b"]);
        assert!(RemoveTable::new("a").apply(&mut db, CaseSensitivity::Sensitive).is_err());
    }
}
