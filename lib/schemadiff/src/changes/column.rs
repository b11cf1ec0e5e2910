use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ColumnLevelChange, ModelChange, apply_column_level};
use crate::error::{EntityKind, Result, SchemaError};
use crate::platform::PlatformInfo;
use crate::schema::{Column, Database, Table};
use crate::types::CaseSensitivity;

// ============ AddColumn ============

/// Inserts a column next to a named neighbour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddColumn {
    pub table_name: String,
    pub new_column: Column,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_column: Option<String>,
}

impl AddColumn {
    pub fn new(table_name: &str, new_column: Column, previous_column: Option<&str>, next_column: Option<&str>) -> Self {
        Self {
            table_name: table_name.to_string(),
            new_column,
            previous_column: previous_column.map(str::to_string),
            next_column: next_column.map(str::to_string),
        }
    }

    /// True when the column lands after every existing column; engines that
    /// can only append check this.
    pub fn is_at_end(&self) -> bool {
        self.next_column.is_none()
    }
}

impl ModelChange for AddColumn {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn apply(&self, database: &mut Database, case: CaseSensitivity) -> Result<()> {
        apply_column_level(self, database, case)
    }
}

impl ColumnLevelChange for AddColumn {
    fn apply_to_table(&self, table: &mut Table, case: CaseSensitivity) -> Result<()> {
        if table.find_column(&self.new_column.name, case).is_some() {
            return Err(SchemaError::duplicate_in(
                EntityKind::Column,
                &self.new_column.name,
                Some(table.name.as_str()),
            ));
        }

        // previous wins, then next, then append
        let position = match (&self.previous_column, &self.next_column) {
            (Some(prev), _) => table.require_column_position(prev, case)? + 1,
            (None, Some(next)) => table.require_column_position(next, case)?,
            (None, None) => table.columns.len(),
        };

        table.columns.insert(position, self.new_column.clone());
        Ok(())
    }
}

// ============ RemoveColumn ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveColumn {
    pub table_name: String,
    pub column_name: String,
}

impl RemoveColumn {
    pub fn new(table_name: &str, column_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            column_name: column_name.to_string(),
        }
    }
}

impl ModelChange for RemoveColumn {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn apply(&self, database: &mut Database, case: CaseSensitivity) -> Result<()> {
        apply_column_level(self, database, case)
    }
}

impl ColumnLevelChange for RemoveColumn {
    fn apply_to_table(&self, table: &mut Table, case: CaseSensitivity) -> Result<()> {
        let position = table.require_column_position(&self.column_name, case)?;
        table.columns.remove(position);
        Ok(())
    }
}

// ============ ColumnDefinitionChange ============

/// Replaces the definition of an existing column. Name and primary key
/// membership are left alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinitionChange {
    pub table_name: String,
    pub column_name: String,
    pub new_column: Column,
}

impl ColumnDefinitionChange {
    pub fn new(table_name: &str, column_name: &str, new_column: Column) -> Self {
        Self {
            table_name: table_name.to_string(),
            column_name: column_name.to_string(),
            new_column,
        }
    }

    /// Any difference the engine would notice.
    pub fn is_changed(platform: &PlatformInfo, source: &Column, target: &Column) -> bool {
        Self::is_type_changed(platform, source, target)
            || Self::is_size_changed(platform, source, target)
            || Self::is_default_value_changed(source, target)
            || Self::is_required_status_changed(source, target)
            || Self::is_auto_increment_changed(source, target)
    }

    /// Compares the native types, so two codes the engine folds together
    /// are not a change.
    pub fn is_type_changed(platform: &PlatformInfo, source: &Column, target: &Column) -> bool {
        platform.target_type(source.type_code) != platform.target_type(target.type_code)
    }

    pub fn is_size_changed(platform: &PlatformInfo, source: &Column, target: &Column) -> bool {
        let native = platform.target_type(target.type_code);
        if platform.has_precision_and_scale(native) {
            platform.effective_size(source) != platform.effective_size(target)
                || source.scale_or_zero() != target.scale_or_zero()
        } else if platform.has_size(native) {
            platform.effective_size(source) != platform.effective_size(target)
        } else {
            false
        }
    }

    /// Precision and scale are checked separately: a smaller scale truncates
    /// even when the precision grows.
    pub fn is_size_reduced(platform: &PlatformInfo, source: &Column, target: &Column) -> bool {
        let native = platform.target_type(target.type_code);
        if !platform.has_size(native) && !platform.has_precision_and_scale(native) {
            return false;
        }

        let size_reduced = match (platform.effective_size(source), platform.effective_size(target)) {
            (Some(old), Some(new)) => new < old,
            // unbounded to bounded
            (None, Some(_)) => true,
            _ => false,
        };

        if platform.has_precision_and_scale(native) {
            size_reduced || target.scale_or_zero() < source.scale_or_zero()
        } else {
            size_reduced
        }
    }

    /// Defaults are compared by their parsed value.
    pub fn is_default_value_changed(source: &Column, target: &Column) -> bool {
        source.parsed_default_value() != target.parsed_default_value()
    }

    pub fn is_required_status_changed(source: &Column, target: &Column) -> bool {
        source.required != target.required
    }

    pub fn is_auto_increment_changed(source: &Column, target: &Column) -> bool {
        source.auto_increment != target.auto_increment
    }
}

impl ModelChange for ColumnDefinitionChange {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn apply(&self, database: &mut Database, case: CaseSensitivity) -> Result<()> {
        apply_column_level(self, database, case)
    }
}

impl ColumnLevelChange for ColumnDefinitionChange {
    fn apply_to_table(&self, table: &mut Table, case: CaseSensitivity) -> Result<()> {
        let table_name = table.name.clone();
        let column = table
            .find_column_mut(&self.column_name, case)
            .ok_or_else(|| SchemaError::not_found_in(EntityKind::Column, &self.column_name, table_name))?;

        let new = &self.new_column;
        column.type_code = new.type_code;
        column.size = new.size;
        column.scale = new.scale;
        column.auto_increment = new.auto_increment;
        column.required = new.required;
        column.default_value = new.default_value.clone();
        column.description = new.description.clone();
        Ok(())
    }
}

// ============ ColumnOrderChange ============

/// Reorders the columns of a table. Carries the complete
/// name → position mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnOrderChange {
    pub table_name: String,
    pub new_positions: BTreeMap<String, usize>,
}

impl ColumnOrderChange {
    pub fn new(table_name: &str, new_positions: BTreeMap<String, usize>) -> Self {
        Self {
            table_name: table_name.to_string(),
            new_positions,
        }
    }

    /// Column names sorted by their new position.
    pub fn ordered_names(&self) -> Vec<&str> {
        let mut names: Vec<(&usize, &str)> = self
            .new_positions
            .iter()
            .map(|(name, pos)| (pos, name.as_str()))
            .collect();
        names.sort();
        names.into_iter().map(|(_, name)| name).collect()
    }

    fn position_of(&self, column: &str, case: CaseSensitivity) -> Option<usize> {
        self.new_positions
            .iter()
            .find(|(name, _)| case.matches(name, column))
            .map(|(_, pos)| *pos)
    }
}

impl ModelChange for ColumnOrderChange {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn apply(&self, database: &mut Database, case: CaseSensitivity) -> Result<()> {
        apply_column_level(self, database, case)
    }
}

impl ColumnLevelChange for ColumnOrderChange {
    fn apply_to_table(&self, table: &mut Table, case: CaseSensitivity) -> Result<()> {
        let mut keyed = Vec::with_capacity(table.columns.len());
        for column in table.columns.drain(..) {
            let position = self.position_of(&column.name, case);
            keyed.push((position, column));
        }

        if let Some((_, column)) = keyed.iter().find(|(pos, _)| pos.is_none()) {
            let missing = column.name.clone();
            table.columns = keyed.into_iter().map(|(_, c)| c).collect();
            return Err(SchemaError::not_found_in(EntityKind::Column, missing, &table.name));
        }

        keyed.sort_by_key(|(pos, _)| *pos);
        table.columns = keyed.into_iter().map(|(_, c)| c).collect();
        Ok(())
    }
}
