use serde::{Deserialize, Serialize};

use super::{Change, ModelChange};
use crate::error::{Result, SchemaError};
use crate::schema::{Database, Table};
use crate::types::CaseSensitivity;

/// A table that cannot be altered in place and is rebuilt instead.
///
/// The rebuild is described by the table as it was before the change plus
/// the column-level changes that turn it into the new structure. Generating
/// the actual copy statements (temporary table, row copy, rename) is left to
/// whoever turns changes into DDL; [`RecreateTable::target_table`] and
/// [`RecreateTable::copied_columns`] give it what it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecreateTable {
    pub table_name: String,
    pub original_table: Table,
    pub changes: Vec<Change>,
}

impl RecreateTable {
    /// Fails if any wrapped change is not column-level or belongs to
    /// another table.
    pub fn new(original_table: Table, changes: Vec<Change>) -> Result<Self> {
        for change in &changes {
            if !change.is_column_level() {
                return Err(SchemaError::InvalidChange(format!(
                    "{} cannot be part of a table rebuild",
                    change.kind()
                )));
            }
            if change.table_name() != original_table.name {
                return Err(SchemaError::InvalidChange(format!(
                    "{} on '{}' wrapped in rebuild of '{}'",
                    change.kind(),
                    change.table_name(),
                    original_table.name
                )));
            }
        }

        Ok(Self {
            table_name: original_table.name.clone(),
            original_table,
            changes,
        })
    }

    /// The table after all wrapped changes.
    pub fn target_table(&self, case: CaseSensitivity) -> Result<Table> {
        rebuild(&self.original_table, &self.changes, case)
    }

    /// Columns whose data survives the rebuild, in their new order.
    pub fn copied_columns(&self, case: CaseSensitivity) -> Result<Vec<String>> {
        let target = self.target_table(case)?;
        Ok(target
            .columns
            .iter()
            .filter(|c| self.original_table.find_column(&c.name, case).is_some())
            .map(|c| c.name.clone())
            .collect())
    }
}

fn rebuild(table: &Table, changes: &[Change], case: CaseSensitivity) -> Result<Table> {
    let mut scratch = table.clone();
    for change in changes {
        change.apply_to_table(&mut scratch, case)?;
    }
    Ok(scratch)
}

impl ModelChange for RecreateTable {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Replaces the table in place, keeping its position in the model.
    fn apply(&self, database: &mut Database, case: CaseSensitivity) -> Result<()> {
        let position = database
            .table_position(&self.table_name, case)
            .ok_or_else(|| SchemaError::table_not_found(&self.table_name))?;
        let rebuilt = rebuild(&database.tables[position], &self.changes, case)?;
        database.tables[position] = rebuilt;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::{AddColumn, ColumnDefinitionChange, RemoveColumn, RemoveTable};
    use crate::schema::Column;
    use crate::types::TypeCode;

    const CS: CaseSensitivity = CaseSensitivity::Sensitive;

    fn original() -> Table {
        Table::new("t")
            .with_column(Column::new("id", TypeCode::Integer).primary_key())
            .with_column(Column::new("old", TypeCode::Varchar).with_size(10))
            .with_column(Column::new("val", TypeCode::Integer))
    }

    fn changes() -> Vec<Change> {
        vec![
            RemoveColumn::new("t", "old").into(),
            ColumnDefinitionChange::new("t", "val", Column::new("val", TypeCode::Double)).into(),
            AddColumn::new("t", Column::new("extra", TypeCode::Date), Some("val"), None).into(),
        ]
    }

    #[test]
    fn test_rejects_table_level_changes() {
        let err = RecreateTable::new(original(), vec![RemoveTable::new("t").into()]).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidChange(_)));
    }

    #[test]
    fn test_rejects_changes_of_other_tables() {
        let err = RecreateTable::new(original(), vec![RemoveColumn::new("u", "x").into()]).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidChange(_)));
    }

    #[test]
    fn test_target_table_and_copied_columns() {
        let recreate = RecreateTable::new(original(), changes()).unwrap();
        let target = recreate.target_table(CS).unwrap();
        assert_eq!(target.column_names(), vec!["id", "val", "extra"]);
        assert_eq!(target.columns[1].type_code, TypeCode::Double);
        assert_eq!(recreate.copied_columns(CS).unwrap(), vec!["id", "val"]);
    }

    #[test]
    fn test_apply_replaces_table_in_place() {
        let mut db = Database::new("db")
            .with_table(Table::new("a"))
            .with_table(original())
            .with_table(Table::new("z"));
        RecreateTable::new(original(), changes()).unwrap().apply(&mut db, CS).unwrap();
        assert_eq!(db.table_names(), vec!["a", "t", "z"]);
        assert_eq!(db.tables[1].column_names(), vec!["id", "val", "extra"]);
    }
}
