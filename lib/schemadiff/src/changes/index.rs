use serde::{Deserialize, Serialize};

use super::ModelChange;
use crate::error::{EntityKind, Result, SchemaError};
use crate::schema::{Database, Index};
use crate::types::CaseSensitivity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddIndex {
    pub table_name: String,
    pub new_index: Index,
}

impl AddIndex {
    pub fn new(table_name: &str, new_index: Index) -> Self {
        Self {
            table_name: table_name.to_string(),
            new_index,
        }
    }
}

impl ModelChange for AddIndex {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Index columns are re-resolved against the table being changed, so the
    /// stored names always carry the model's own spelling.
    fn apply(&self, database: &mut Database, case: CaseSensitivity) -> Result<()> {
        let table = database.require_table_mut(&self.table_name, case)?;

        let mut index = self.new_index.clone();
        for index_column in &mut index.columns {
            let column = table
                .find_column(&index_column.name, case)
                .ok_or_else(|| SchemaError::not_found_in(EntityKind::Column, &index_column.name, &table.name))?;
            index_column.name = column.name.clone();
        }

        table.indexes.push(index);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveIndex {
    pub table_name: String,
    pub index: Index,
}

impl RemoveIndex {
    pub fn new(table_name: &str, index: Index) -> Self {
        Self {
            table_name: table_name.to_string(),
            index,
        }
    }
}

impl ModelChange for RemoveIndex {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn apply(&self, database: &mut Database, case: CaseSensitivity) -> Result<()> {
        let table = database.require_table_mut(&self.table_name, case)?;
        let position = table
            .index_position(&self.index, case)
            .ok_or_else(|| SchemaError::not_found_in(EntityKind::Index, self.index.display_name(), &table.name))?;
        table.indexes.remove(position);
        Ok(())
    }
}
