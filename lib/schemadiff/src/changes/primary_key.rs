use serde::{Deserialize, Serialize};

use super::{ColumnLevelChange, ModelChange, apply_column_level};
use crate::error::{EntityKind, Result, SchemaError};
use crate::schema::{Database, Table};
use crate::types::CaseSensitivity;

fn set_primary_key(table: &mut Table, columns: &[String], case: CaseSensitivity) -> Result<()> {
    // resolve first so a bad name leaves the table untouched
    let positions = columns
        .iter()
        .map(|name| table.require_column_position(name, case))
        .collect::<Result<Vec<_>>>()?;
    for position in positions {
        table.columns[position].primary_key = true;
    }
    Ok(())
}

fn clear_primary_key(table: &mut Table) {
    for column in &mut table.columns {
        column.primary_key = false;
    }
}

// ============ AddPrimaryKey ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddPrimaryKey {
    pub table_name: String,
    pub primary_key_columns: Vec<String>,
}

impl AddPrimaryKey {
    pub fn new(table_name: &str, primary_key_columns: Vec<String>) -> Self {
        Self {
            table_name: table_name.to_string(),
            primary_key_columns,
        }
    }
}

impl ModelChange for AddPrimaryKey {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn apply(&self, database: &mut Database, case: CaseSensitivity) -> Result<()> {
        apply_column_level(self, database, case)
    }
}

impl ColumnLevelChange for AddPrimaryKey {
    fn apply_to_table(&self, table: &mut Table, case: CaseSensitivity) -> Result<()> {
        if table.has_primary_key() {
            return Err(SchemaError::duplicate_in(
                EntityKind::PrimaryKey,
                table.primary_key_names().join(", "),
                Some(table.name.as_str()),
            ));
        }
        set_primary_key(table, &self.primary_key_columns, case)
    }
}

// ============ PrimaryKeyChange ============

/// Replaces the primary key wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKeyChange {
    pub table_name: String,
    pub new_primary_key_columns: Vec<String>,
}

impl PrimaryKeyChange {
    pub fn new(table_name: &str, new_primary_key_columns: Vec<String>) -> Self {
        Self {
            table_name: table_name.to_string(),
            new_primary_key_columns,
        }
    }
}

impl ModelChange for PrimaryKeyChange {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn apply(&self, database: &mut Database, case: CaseSensitivity) -> Result<()> {
        apply_column_level(self, database, case)
    }
}

impl ColumnLevelChange for PrimaryKeyChange {
    fn apply_to_table(&self, table: &mut Table, case: CaseSensitivity) -> Result<()> {
        for name in &self.new_primary_key_columns {
            table.require_column_position(name, case)?;
        }
        clear_primary_key(table);
        set_primary_key(table, &self.new_primary_key_columns, case)
    }
}

// ============ RemovePrimaryKey ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovePrimaryKey {
    pub table_name: String,
}

impl RemovePrimaryKey {
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
        }
    }
}

impl ModelChange for RemovePrimaryKey {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn apply(&self, database: &mut Database, case: CaseSensitivity) -> Result<()> {
        apply_column_level(self, database, case)
    }
}

impl ColumnLevelChange for RemovePrimaryKey {
    fn apply_to_table(&self, table: &mut Table, _case: CaseSensitivity) -> Result<()> {
        clear_primary_key(table);
        Ok(())
    }
}
