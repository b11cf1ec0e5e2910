use serde::{Deserialize, Serialize};

use super::ModelChange;
use crate::error::{EntityKind, Result, SchemaError};
use crate::schema::{Database, ForeignKey};
use crate::types::CaseSensitivity;

/// Adds a foreign key to its referencing table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddForeignKey {
    pub table_name: String,
    pub foreign_key: ForeignKey,
}

impl AddForeignKey {
    pub fn new(table_name: &str, foreign_key: ForeignKey) -> Self {
        Self {
            table_name: table_name.to_string(),
            foreign_key,
        }
    }
}

impl ModelChange for AddForeignKey {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Both ends are resolved against `database`: the local columns in the
    /// owning table, the foreign columns in the referenced one.
    fn apply(&self, database: &mut Database, case: CaseSensitivity) -> Result<()> {
        let mut foreign_key = self.foreign_key.clone();

        let foreign_table = database
            .find_table(&foreign_key.foreign_table, case)
            .ok_or_else(|| SchemaError::table_not_found(&foreign_key.foreign_table))?;
        foreign_key.foreign_table = foreign_table.name.clone();
        for reference in &mut foreign_key.references {
            let column = foreign_table.find_column(&reference.foreign, case).ok_or_else(|| {
                SchemaError::not_found_in(EntityKind::Column, &reference.foreign, &foreign_table.name)
            })?;
            reference.foreign = column.name.clone();
        }

        let table = database.require_table_mut(&self.table_name, case)?;
        for reference in &mut foreign_key.references {
            let column = table
                .find_column(&reference.local, case)
                .ok_or_else(|| SchemaError::not_found_in(EntityKind::Column, &reference.local, &table.name))?;
            reference.local = column.name.clone();
        }

        table.foreign_keys.push(foreign_key);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveForeignKey {
    pub table_name: String,
    pub foreign_key: ForeignKey,
}

impl RemoveForeignKey {
    pub fn new(table_name: &str, foreign_key: ForeignKey) -> Self {
        Self {
            table_name: table_name.to_string(),
            foreign_key,
        }
    }
}

impl ModelChange for RemoveForeignKey {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn apply(&self, database: &mut Database, case: CaseSensitivity) -> Result<()> {
        let table = database.require_table_mut(&self.table_name, case)?;
        let position = table.foreign_key_position(&self.foreign_key, case).ok_or_else(|| {
            SchemaError::not_found_in(EntityKind::ForeignKey, self.foreign_key.display_name(), &table.name)
        })?;
        table.foreign_keys.remove(position);
        Ok(())
    }
}
