//! The change algebra.
//!
//! Every structural edit the comparator can emit is one variant of
//! [`Change`]. Each variant carries the name of the table it belongs to and
//! knows how to apply itself to a [`Database`]. Column-level variants can
//! also be applied to a detached [`Table`], which is what
//! [`RecreateTable`] uses to compute the rebuilt structure.

mod column;
mod foreign_key;
mod index;
mod primary_key;
mod recreate;
mod table;

pub use column::{AddColumn, ColumnDefinitionChange, ColumnOrderChange, RemoveColumn};
pub use foreign_key::{AddForeignKey, RemoveForeignKey};
pub use index::{AddIndex, RemoveIndex};
pub use primary_key::{AddPrimaryKey, PrimaryKeyChange, RemovePrimaryKey};
pub use recreate::RecreateTable;
pub use table::{AddTable, RemoveTable};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SchemaError};
use crate::schema::{Column, Database, Table};
use crate::types::CaseSensitivity;

/// Behaviour shared by every change payload.
pub trait ModelChange {
    /// Table the change belongs to. Foreign key changes report the
    /// referencing table.
    fn table_name(&self) -> &str;

    /// Apply the change to `database`, resolving names under `case`.
    fn apply(&self, database: &mut Database, case: CaseSensitivity) -> Result<()>;
}

/// Changes that only touch the inside of one table.
pub trait ColumnLevelChange: ModelChange {
    fn apply_to_table(&self, table: &mut Table, case: CaseSensitivity) -> Result<()>;
}

/// Locate `table_name` in `database` and run a column-level change on it.
pub(crate) fn apply_column_level<C: ColumnLevelChange>(
    change: &C,
    database: &mut Database,
    case: CaseSensitivity,
) -> Result<()> {
    let table = database.require_table_mut(change.table_name(), case)?;
    change.apply_to_table(table, case)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    AddTable(AddTable),
    RemoveTable(RemoveTable),
    AddColumn(AddColumn),
    RemoveColumn(RemoveColumn),
    ColumnDefinition(ColumnDefinitionChange),
    ColumnOrder(ColumnOrderChange),
    AddPrimaryKey(AddPrimaryKey),
    PrimaryKey(PrimaryKeyChange),
    RemovePrimaryKey(RemovePrimaryKey),
    AddIndex(AddIndex),
    RemoveIndex(RemoveIndex),
    AddForeignKey(AddForeignKey),
    RemoveForeignKey(RemoveForeignKey),
    RecreateTable(RecreateTable),
}

macro_rules! change_from {
    ($($variant:ident($payload:ty)),* $(,)?) => {
        $(
            impl From<$payload> for Change {
                fn from(change: $payload) -> Self {
                    Change::$variant(change)
                }
            }
        )*
    };
}

change_from!(
    AddTable(AddTable),
    RemoveTable(RemoveTable),
    AddColumn(AddColumn),
    RemoveColumn(RemoveColumn),
    ColumnDefinition(ColumnDefinitionChange),
    ColumnOrder(ColumnOrderChange),
    AddPrimaryKey(AddPrimaryKey),
    PrimaryKey(PrimaryKeyChange),
    RemovePrimaryKey(RemovePrimaryKey),
    AddIndex(AddIndex),
    RemoveIndex(RemoveIndex),
    AddForeignKey(AddForeignKey),
    RemoveForeignKey(RemoveForeignKey),
    RecreateTable(RecreateTable),
);

impl Change {
    /// Stable snake_case name of the variant, as used in serialized output.
    pub fn kind(&self) -> &'static str {
        match self {
            Change::AddTable(_) => "add_table",
            Change::RemoveTable(_) => "remove_table",
            Change::AddColumn(_) => "add_column",
            Change::RemoveColumn(_) => "remove_column",
            Change::ColumnDefinition(_) => "column_definition",
            Change::ColumnOrder(_) => "column_order",
            Change::AddPrimaryKey(_) => "add_primary_key",
            Change::PrimaryKey(_) => "primary_key",
            Change::RemovePrimaryKey(_) => "remove_primary_key",
            Change::AddIndex(_) => "add_index",
            Change::RemoveIndex(_) => "remove_index",
            Change::AddForeignKey(_) => "add_foreign_key",
            Change::RemoveForeignKey(_) => "remove_foreign_key",
            Change::RecreateTable(_) => "recreate_table",
        }
    }

    fn payload(&self) -> &dyn ModelChange {
        match self {
            Change::AddTable(c) => c,
            Change::RemoveTable(c) => c,
            Change::AddColumn(c) => c,
            Change::RemoveColumn(c) => c,
            Change::ColumnDefinition(c) => c,
            Change::ColumnOrder(c) => c,
            Change::AddPrimaryKey(c) => c,
            Change::PrimaryKey(c) => c,
            Change::RemovePrimaryKey(c) => c,
            Change::AddIndex(c) => c,
            Change::RemoveIndex(c) => c,
            Change::AddForeignKey(c) => c,
            Change::RemoveForeignKey(c) => c,
            Change::RecreateTable(c) => c,
        }
    }

    pub fn table_name(&self) -> &str {
        self.payload().table_name()
    }

    pub fn apply(&self, database: &mut Database, case: CaseSensitivity) -> Result<()> {
        self.payload().apply(database, case)
    }

    /// Column and primary key changes: the kinds a feasibility policy is
    /// asked about and a table rebuild may wrap.
    pub fn is_column_level(&self) -> bool {
        self.as_column_level().is_some()
    }

    fn as_column_level(&self) -> Option<&dyn ColumnLevelChange> {
        match self {
            Change::AddColumn(c) => Some(c),
            Change::RemoveColumn(c) => Some(c),
            Change::ColumnDefinition(c) => Some(c),
            Change::ColumnOrder(c) => Some(c),
            Change::AddPrimaryKey(c) => Some(c),
            Change::PrimaryKey(c) => Some(c),
            Change::RemovePrimaryKey(c) => Some(c),
            _ => None,
        }
    }

    /// Apply a column-level change to a detached table.
    pub fn apply_to_table(&self, table: &mut Table, case: CaseSensitivity) -> Result<()> {
        match self.as_column_level() {
            Some(change) => change.apply_to_table(table, case),
            None => Err(SchemaError::InvalidChange(format!(
                "{} cannot be applied to a single table",
                self.kind()
            ))),
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::AddTable(c) => write!(f, "add table {} ({} columns)", c.table_name, c.new_table.columns.len()),
            Change::RemoveTable(c) => write!(f, "remove table {}", c.table_name),
            Change::AddColumn(c) => {
                write!(f, "add column {}.{} {}", c.table_name, c.new_column.name, column_type(&c.new_column))?;
                match (&c.previous_column, &c.next_column) {
                    (Some(prev), _) => write!(f, " after {}", prev),
                    (None, Some(next)) => write!(f, " before {}", next),
                    (None, None) => Ok(()),
                }
            }
            Change::RemoveColumn(c) => write!(f, "remove column {}.{}", c.table_name, c.column_name),
            Change::ColumnDefinition(c) => write!(
                f,
                "change column {}.{} to {}{}",
                c.table_name,
                c.column_name,
                column_type(&c.new_column),
                if c.new_column.required { " NOT NULL" } else { "" }
            ),
            Change::ColumnOrder(c) => write!(f, "reorder columns of {}: {}", c.table_name, c.ordered_names().join(", ")),
            Change::AddPrimaryKey(c) => {
                write!(f, "add primary key on {} ({})", c.table_name, c.primary_key_columns.join(", "))
            }
            Change::PrimaryKey(c) => write!(
                f,
                "change primary key of {} to ({})",
                c.table_name,
                c.new_primary_key_columns.join(", ")
            ),
            Change::RemovePrimaryKey(c) => write!(f, "remove primary key of {}", c.table_name),
            Change::AddIndex(c) => write!(
                f,
                "add {}index {} on {} ({})",
                if c.new_index.unique { "unique " } else { "" },
                c.new_index.display_name(),
                c.table_name,
                c.new_index.column_names().join(", ")
            ),
            Change::RemoveIndex(c) => write!(f, "remove index {} on {}", c.index.display_name(), c.table_name),
            Change::AddForeignKey(c) => write!(
                f,
                "add foreign key {} on {} ({}) -> {} ({})",
                c.foreign_key.display_name(),
                c.table_name,
                c.foreign_key.local_column_names().join(", "),
                c.foreign_key.foreign_table,
                c.foreign_key.foreign_column_names().join(", ")
            ),
            Change::RemoveForeignKey(c) => write!(
                f,
                "remove foreign key {} on {} -> {}",
                c.foreign_key.display_name(),
                c.table_name,
                c.foreign_key.foreign_table
            ),
            Change::RecreateTable(c) => {
                write!(f, "recreate table {} ({} column changes)", c.table_name, c.changes.len())
            }
        }
    }
}

fn column_type(column: &Column) -> String {
    match (column.size, column.scale) {
        (Some(size), Some(scale)) => format!("{}({},{})", column.type_code, size, scale),
        (Some(size), None) => format!("{}({})", column.type_code, size),
        _ => column.type_code.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;
    use crate::types::TypeCode;

    fn table() -> Table {
        Table::new("orders").with_column(Column::new("id", TypeCode::Integer).primary_key())
    }

    #[test]
    fn test_column_level_classification() {
        let add = Change::from(AddColumn::new(
            "orders",
            Column::new("note", TypeCode::Varchar),
            Some("id"),
            None,
        ));
        let drop = Change::from(RemoveTable::new("orders"));
        assert!(add.is_column_level());
        assert!(!drop.is_column_level());
    }

    #[test]
    fn test_apply_to_table_rejects_table_level_change() {
        let mut t = table();
        let err = Change::from(RemoveTable::new("orders"))
            .apply_to_table(&mut t, CaseSensitivity::Sensitive)
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidChange(_)));
    }

    #[test]
    fn test_serialized_shape_is_tagged() {
        let change = Change::from(RemoveColumn::new("orders", "note"));
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["kind"], "remove_column");
        assert_eq!(json["table_name"], "orders");
        assert_eq!(json["column_name"], "note");

        let back: Change = serde_json::from_value(json).unwrap();
        assert_eq!(back, change);
    }

    #[test]
    fn test_display_audit_line() {
        let change = Change::from(AddColumn::new(
            "orders",
            Column::new("note", TypeCode::Varchar).with_size(200),
            Some("id"),
            None,
        ));
        assert_eq!(change.to_string(), "add column orders.note VARCHAR(200) after id");
    }
}
