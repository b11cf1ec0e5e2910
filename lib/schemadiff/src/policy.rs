//! Feasibility policies: can a batch of column-level changes be applied to
//! a table in place, or must the table be rebuilt?

use serde::{Deserialize, Serialize};

use crate::changes::{AddColumn, Change, ColumnDefinitionChange};
use crate::platform::PlatformInfo;
use crate::schema::Table;
use crate::types::CaseSensitivity;

/// Decides whether a change can be applied to `table` without rebuilding it.
///
/// `table` is the table as it stands before the batch. Policies are only
/// asked about column-level changes.
pub trait FeasibilityPolicy: Send + Sync {
    fn is_supported(&self, table: &Table, change: &Change) -> bool;

    /// A batch is supported only if every change in it is.
    fn are_supported(&self, table: &Table, changes: &[Change]) -> bool {
        changes.iter().all(|change| self.is_supported(table, change))
    }
}

impl<F> FeasibilityPolicy for F
where
    F: Fn(&Table, &Change) -> bool + Send + Sync,
{
    fn is_supported(&self, table: &Table, change: &Change) -> bool {
        self(table, change)
    }
}

/// Everything can be altered in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermitAll;

impl FeasibilityPolicy for PermitAll {
    fn is_supported(&self, _table: &Table, _change: &Change) -> bool {
        true
    }
}

/// Nothing can be altered in place; every column-level delta rebuilds the table.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl FeasibilityPolicy for DenyAll {
    fn is_supported(&self, _table: &Table, _change: &Change) -> bool {
        false
    }
}

// ============ CapabilityPolicy ============

/// Declarative description of what an engine can alter in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityPolicy {
    /// Append columns at the end of a table.
    pub add_columns: bool,
    /// Insert columns at any position, not only at the end.
    pub add_columns_anywhere: bool,
    pub add_required_columns_without_default: bool,
    pub add_auto_increment_columns: bool,
    pub drop_columns: bool,
    pub change_column_type: bool,
    /// Grow a column (or change it without shrinking it).
    pub change_column_size: bool,
    pub reduce_column_size: bool,
    pub change_nullability: bool,
    pub change_default: bool,
    pub change_auto_increment: bool,
    pub reorder_columns: bool,
    pub add_primary_key: bool,
    pub change_primary_key: bool,
    pub drop_primary_key: bool,
    #[serde(skip)]
    platform: PlatformInfo,
}

impl Default for CapabilityPolicy {
    /// Append nullable or defaulted columns, drop columns, and add, replace
    /// or drop primary keys. Everything else needs a rebuild.
    fn default() -> Self {
        Self {
            add_columns: true,
            add_columns_anywhere: false,
            add_required_columns_without_default: false,
            add_auto_increment_columns: false,
            drop_columns: true,
            change_column_type: false,
            change_column_size: false,
            reduce_column_size: false,
            change_nullability: false,
            change_default: false,
            change_auto_increment: false,
            reorder_columns: false,
            add_primary_key: true,
            change_primary_key: true,
            drop_primary_key: true,
            platform: PlatformInfo::generic(),
        }
    }
}

impl CapabilityPolicy {
    pub fn postgres() -> Self {
        Self {
            add_auto_increment_columns: true,
            change_column_type: true,
            change_column_size: true,
            change_nullability: true,
            change_default: true,
            ..Self::default()
        }
        .with_platform(PlatformInfo::postgres())
    }

    pub fn mysql() -> Self {
        Self {
            add_columns_anywhere: true,
            add_required_columns_without_default: true,
            change_column_type: true,
            change_column_size: true,
            reduce_column_size: true,
            change_nullability: true,
            change_default: true,
            change_auto_increment: true,
            reorder_columns: true,
            ..Self::default()
        }
        .with_platform(PlatformInfo::mysql())
    }

    /// SQLite can append and drop columns; anything touching the key or a
    /// column definition means rebuilding the table.
    pub fn sqlite() -> Self {
        Self {
            add_primary_key: false,
            change_primary_key: false,
            drop_primary_key: false,
            ..Self::default()
        }
        .with_platform(PlatformInfo::sqlite())
    }

    /// Preset for a platform name, falling back to the conservative default.
    pub fn for_platform(platform: &PlatformInfo) -> Self {
        let policy = match platform.name.as_str() {
            "postgres" => Self::postgres(),
            "mysql" => Self::mysql(),
            "sqlite" => Self::sqlite(),
            _ => Self::default(),
        };
        policy.with_platform(platform.clone())
    }

    /// Platform used to judge size changes.
    pub fn with_platform(mut self, platform: PlatformInfo) -> Self {
        self.platform = platform;
        self
    }

    fn add_column_supported(&self, change: &AddColumn) -> bool {
        let column = &change.new_column;
        if !self.add_columns || (!change.is_at_end() && !self.add_columns_anywhere) {
            return false;
        }
        if column.auto_increment && !self.add_auto_increment_columns {
            return false;
        }
        if column.required
            && column.default_value.is_none()
            && !column.auto_increment
            && !self.add_required_columns_without_default
        {
            return false;
        }
        true
    }

    fn definition_change_supported(&self, table: &Table, change: &ColumnDefinitionChange) -> bool {
        // planned changes carry the table's own spelling; hand-built ones may not
        let source = table
            .find_column(&change.column_name, CaseSensitivity::Sensitive)
            .or_else(|| table.find_column(&change.column_name, CaseSensitivity::Insensitive));
        let Some(source) = source else {
            return false;
        };
        let target = &change.new_column;
        let platform = &self.platform;

        if ColumnDefinitionChange::is_type_changed(platform, source, target) && !self.change_column_type {
            return false;
        }
        if ColumnDefinitionChange::is_size_changed(platform, source, target) {
            let allowed = if ColumnDefinitionChange::is_size_reduced(platform, source, target) {
                self.reduce_column_size
            } else {
                self.change_column_size
            };
            if !allowed {
                return false;
            }
        }
        if ColumnDefinitionChange::is_required_status_changed(source, target) && !self.change_nullability {
            return false;
        }
        if ColumnDefinitionChange::is_default_value_changed(source, target) && !self.change_default {
            return false;
        }
        if ColumnDefinitionChange::is_auto_increment_changed(source, target) && !self.change_auto_increment {
            return false;
        }
        true
    }
}

impl FeasibilityPolicy for CapabilityPolicy {
    fn is_supported(&self, table: &Table, change: &Change) -> bool {
        match change {
            Change::AddColumn(c) => self.add_column_supported(c),
            Change::RemoveColumn(_) => self.drop_columns,
            Change::ColumnDefinition(c) => self.definition_change_supported(table, c),
            Change::ColumnOrder(_) => self.reorder_columns,
            Change::AddPrimaryKey(_) => self.add_primary_key,
            Change::PrimaryKey(_) => self.change_primary_key,
            Change::RemovePrimaryKey(_) => self.drop_primary_key,
            // unknown to this policy
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::{ColumnOrderChange, RemoveColumn, RemoveTable};
    use crate::schema::Column;
    use crate::types::TypeCode;
    use std::collections::BTreeMap;

    fn table() -> Table {
        Table::new("t")
            .with_column(Column::new("id", TypeCode::Integer).primary_key())
            .with_column(Column::new("name", TypeCode::Varchar).with_size(64))
    }

    fn add(column: Column, next: Option<&str>) -> Change {
        AddColumn::new("t", column, Some("name"), next).into()
    }

    #[test]
    fn test_default_appends_nullable_columns_only() {
        let policy = CapabilityPolicy::default();
        let t = table();
        assert!(policy.is_supported(&t, &add(Column::new("note", TypeCode::Varchar), None)));
        assert!(!policy.is_supported(&t, &add(Column::new("note", TypeCode::Varchar), Some("x"))));
        assert!(!policy.is_supported(&t, &add(Column::new("n", TypeCode::Integer).required(), None)));
        assert!(policy.is_supported(
            &t,
            &add(Column::new("n", TypeCode::Integer).required().with_default("0"), None)
        ));
        assert!(!policy.is_supported(&t, &add(Column::new("seq", TypeCode::Integer).auto_increment(), None)));
    }

    #[test]
    fn test_default_refuses_definition_changes_and_reorder() {
        let policy = CapabilityPolicy::default();
        let t = table();
        let retype = ColumnDefinitionChange::new("t", "name", Column::new("name", TypeCode::Clob)).into();
        let reorder = ColumnOrderChange::new("t", BTreeMap::new()).into();
        assert!(!policy.is_supported(&t, &retype));
        assert!(!policy.is_supported(&t, &reorder));
        assert!(policy.is_supported(&t, &RemoveColumn::new("t", "name").into()));
    }

    #[test]
    fn test_table_level_changes_are_never_supported() {
        assert!(!CapabilityPolicy::mysql().is_supported(&table(), &RemoveTable::new("t").into()));
    }

    #[test]
    fn test_postgres_grows_but_does_not_shrink() {
        let policy = CapabilityPolicy::postgres();
        let t = table();
        let grow = ColumnDefinitionChange::new("t", "name", Column::new("name", TypeCode::Varchar).with_size(128));
        let shrink = ColumnDefinitionChange::new("t", "name", Column::new("name", TypeCode::Varchar).with_size(32));
        assert!(policy.is_supported(&t, &grow.into()));
        assert!(!policy.is_supported(&t, &shrink.into()));
    }

    #[test]
    fn test_definition_change_resolves_column_in_any_case() {
        let policy = CapabilityPolicy::postgres();
        let t = table();
        let grow = ColumnDefinitionChange::new("t", "NAME", Column::new("NAME", TypeCode::Varchar).with_size(128));
        let shrink = ColumnDefinitionChange::new("t", "Name", Column::new("Name", TypeCode::Varchar).with_size(32));
        let missing = ColumnDefinitionChange::new("t", "title", Column::new("title", TypeCode::Varchar).with_size(128));
        assert!(policy.is_supported(&t, &grow.into()));
        assert!(!policy.is_supported(&t, &shrink.into()));
        assert!(!policy.is_supported(&t, &missing.into()));
    }

    #[test]
    fn test_batch_fails_on_single_unsupported_change() {
        let t = table();
        let batch = vec![
            RemoveColumn::new("t", "name").into(),
            ColumnOrderChange::new("t", BTreeMap::new()).into(),
        ];
        assert!(!CapabilityPolicy::default().are_supported(&t, &batch));
        assert!(CapabilityPolicy::mysql().are_supported(&t, &batch));
        assert!(PermitAll.are_supported(&t, &batch));
        assert!(!DenyAll.are_supported(&t, &batch));
    }

    #[test]
    fn test_closure_policy() {
        let only_drops = |_: &Table, change: &Change| matches!(change, Change::RemoveColumn(_));
        assert!(only_drops.is_supported(&table(), &RemoveColumn::new("t", "name").into()));
    }

    #[test]
    fn test_capabilities_from_toml() {
        let policy: CapabilityPolicy = toml::from_str("reorder_columns = true\ndrop_columns = false\n").unwrap();
        assert!(policy.reorder_columns);
        assert!(!policy.drop_columns);
        assert!(policy.add_columns);
    }
}
