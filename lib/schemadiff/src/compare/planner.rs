use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::matching::Claims;
use super::{Comparison, Diagnostic, ModelComparator, PrimaryKeyChangeStyle, type_or_size_changed};
use crate::changes::{
    AddColumn, AddForeignKey, AddIndex, AddPrimaryKey, AddTable, Change, ColumnDefinitionChange,
    ColumnOrderChange, PrimaryKeyChange, RecreateTable, RemoveColumn, RemoveForeignKey, RemoveIndex,
    RemovePrimaryKey, RemoveTable,
};
use crate::error::{Result, SchemaError};
use crate::schema::{Column, Database, ForeignKey, Table};
use crate::types::CaseSensitivity;

/// State of one comparison: the intermediate model and what has been
/// emitted so far.
pub(super) struct Planner<'a> {
    config: &'a ModelComparator,
    target: &'a Database,
    intermediate: Database,
    changes: Vec<Change>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Planner<'a> {
    pub fn new(config: &'a ModelComparator, source: &Database, target: &'a Database) -> Self {
        Self {
            config,
            target,
            intermediate: source.clone(),
            changes: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn case(&self) -> CaseSensitivity {
        self.config.case
    }

    pub fn run(mut self) -> Result<Comparison> {
        self.remove_stale_foreign_keys()?;
        self.remove_stale_tables()?;

        for table_name in self.intermediate.table_names() {
            self.reconcile_table(&table_name)?;
        }

        self.add_new_tables()?;
        self.add_new_foreign_keys()?;

        let comparison = Comparison {
            changes: self.changes,
            intermediate: self.intermediate,
            diagnostics: self.diagnostics,
        };
        info!(
            "Comparison produced {} changes ({} tables recreated, {} diagnostics)",
            comparison.changes.len(),
            comparison.recreated_tables().len(),
            comparison.diagnostics.len()
        );
        Ok(comparison)
    }

    /// Apply `change` to the intermediate model, then record it. A change
    /// that cannot be applied aborts the comparison.
    fn emit(&mut self, change: impl Into<Change>) -> Result<()> {
        let change = change.into();
        let case = self.case();
        change.apply(&mut self.intermediate, case)?;
        debug!("[{}] {}", change.kind(), change);
        self.changes.push(change);
        Ok(())
    }

    fn ambiguous(&mut self, table_name: &str, what: &str, name: &str, candidates: usize) {
        let message = format!(
            "{} {} matches {} structurally identical candidates, using the first",
            what, name, candidates
        );
        warn!("{}: {}", table_name, message);
        self.diagnostics.push(Diagnostic {
            table_name: table_name.to_string(),
            message,
        });
    }

    // ============ Step 1: stale foreign keys ============

    fn remove_stale_foreign_keys(&mut self) -> Result<()> {
        let case = self.case();
        let mut removals = Vec::new();
        let mut ambiguous = Vec::new();

        for table in &self.intermediate.tables {
            let Some(target_table) = self.target.find_table(&table.name, case) else {
                for fk in &table.foreign_keys {
                    removals.push(RemoveForeignKey::new(&table.name, fk.clone()));
                }
                continue;
            };

            let mut claims = Claims::new(&target_table.foreign_keys);
            for fk in &table.foreign_keys {
                let claim = claims.claim(|candidate| candidate.matches(fk, case));
                if claim.is_ambiguous() {
                    ambiguous.push((table.name.clone(), fk.display_name().to_string(), claim.candidates));
                }
                if claim.position.is_none() || self.foreign_key_invalidated(table, target_table, fk) {
                    removals.push(RemoveForeignKey::new(&table.name, fk.clone()));
                }
            }
        }

        for (table, name, candidates) in ambiguous {
            self.ambiguous(&table, "foreign key", &name, candidates);
        }
        for removal in removals {
            self.emit(removal)?;
        }
        Ok(())
    }

    /// True when the hook says a column on either end of `fk` changed in a
    /// way that invalidates the key.
    fn foreign_key_invalidated(&self, table: &Table, target_table: &Table, fk: &ForeignKey) -> bool {
        if self.config.constraint_hook.is_none() {
            return false;
        }
        let case = self.case();
        let local_changed = fk
            .references
            .iter()
            .any(|r| self.column_invalidated(table, target_table, &r.local));

        let foreign_changed = match (
            self.intermediate.find_table(&fk.foreign_table, case),
            self.target.find_table(&fk.foreign_table, case),
        ) {
            (Some(current), Some(target)) => fk
                .references
                .iter()
                .any(|r| self.column_invalidated(current, target, &r.foreign)),
            _ => false,
        };

        local_changed || foreign_changed
    }

    fn column_invalidated(&self, current: &Table, target: &Table, column: &str) -> bool {
        let Some(hook) = &self.config.constraint_hook else {
            return false;
        };
        match (current.find_column(column, self.case()), target.find_column(column, self.case())) {
            (Some(old), Some(new)) => hook(&self.config.platform, old, new),
            _ => false,
        }
    }

    // ============ Step 2: stale tables ============

    fn remove_stale_tables(&mut self) -> Result<()> {
        let case = self.case();
        let stale: Vec<String> = self
            .intermediate
            .tables
            .iter()
            .filter(|t| self.target.find_table(&t.name, case).is_none())
            .map(|t| t.name.clone())
            .collect();

        for name in stale {
            self.emit(RemoveTable::new(&name))?;
        }
        Ok(())
    }

    // ============ Step 3: per-table reconciliation ============

    fn reconcile_table(&mut self, table_name: &str) -> Result<()> {
        let case = self.case();
        let target = self.target;
        let Some(target_table) = target.find_table(table_name, case) else {
            return Ok(());
        };

        self.remove_stale_indexes(table_name, target_table)?;

        let current = self.current_table(table_name)?;
        let changes = self.column_changes(&current, target_table)?;
        if !changes.is_empty() {
            self.remove_indexes_on_retyped_columns(&current, &changes)?;
            let current = self.current_table(table_name)?;
            let supported = self
                .config
                .policy
                .as_ref()
                .is_none_or(|policy| policy.are_supported(&current, &changes));

            if supported {
                for change in changes {
                    self.emit(change)?;
                }
            } else {
                debug!("Table {} cannot be altered in place, recreating", table_name);
                self.remove_foreign_keys_touching(table_name)?;
                let original = self.current_table(table_name)?;
                self.emit(RecreateTable::new(original, changes)?)?;
            }
        }

        self.add_new_indexes(table_name, target_table)
    }

    fn current_table(&self, table_name: &str) -> Result<Table> {
        self.intermediate
            .find_table(table_name, self.case())
            .cloned()
            .ok_or_else(|| SchemaError::table_not_found(table_name))
    }

    fn remove_stale_indexes(&mut self, table_name: &str, target_table: &Table) -> Result<()> {
        let case = self.case();
        let current = self.current_table(table_name)?;

        let mut claims = Claims::new(&target_table.indexes);
        let mut removals = Vec::new();
        for index in &current.indexes {
            let claim = claims.claim(|candidate| candidate.matches(index, case));
            if claim.is_ambiguous() {
                self.ambiguous(table_name, "index", index.display_name(), claim.candidates);
            }
            let invalidated = index
                .columns
                .iter()
                .any(|c| self.column_invalidated(&current, target_table, &c.name));
            if claim.position.is_none() || invalidated {
                removals.push(RemoveIndex::new(&current.name, index.clone()));
            }
        }

        for removal in removals {
            self.emit(removal)?;
        }
        Ok(())
    }

    /// Indexes on a column whose type or size changes are dropped before
    /// the column is altered or the table recreated; `add_new_indexes`
    /// restores them from the target.
    fn remove_indexes_on_retyped_columns(&mut self, current: &Table, changes: &[Change]) -> Result<()> {
        let case = self.case();
        let retyped: Vec<String> = changes
            .iter()
            .filter_map(|change| match change {
                Change::ColumnDefinition(definition) => Some(definition),
                _ => None,
            })
            .filter(|definition| {
                current
                    .find_column(&definition.column_name, case)
                    .is_some_and(|source| type_or_size_changed(&self.config.platform, source, &definition.new_column))
            })
            .map(|definition| definition.column_name.clone())
            .collect();
        if retyped.is_empty() {
            return Ok(());
        }

        let removals: Vec<RemoveIndex> = current
            .indexes
            .iter()
            .filter(|index| retyped.iter().any(|column| index.references_column(column, case)))
            .map(|index| RemoveIndex::new(&current.name, index.clone()))
            .collect();
        for removal in removals {
            self.emit(removal)?;
        }
        Ok(())
    }

    fn add_new_indexes(&mut self, table_name: &str, target_table: &Table) -> Result<()> {
        let case = self.case();
        let current = self.current_table(table_name)?;

        let mut claims = Claims::new(&current.indexes);
        let mut additions = Vec::new();
        for index in &target_table.indexes {
            if claims.claim(|candidate| candidate.matches(index, case)).position.is_none() {
                additions.push(AddIndex::new(&current.name, index.clone()));
            }
        }

        for addition in additions {
            self.emit(addition)?;
        }
        Ok(())
    }

    /// Remove the table's own foreign keys and every foreign key pointing at it.
    fn remove_foreign_keys_touching(&mut self, table_name: &str) -> Result<()> {
        let case = self.case();
        let mut removals = Vec::new();
        for table in &self.intermediate.tables {
            let owned = case.matches(&table.name, table_name);
            for fk in &table.foreign_keys {
                if owned || fk.points_to(table_name, case) {
                    removals.push(RemoveForeignKey::new(&table.name, fk.clone()));
                }
            }
        }

        for removal in removals {
            self.emit(removal)?;
        }
        Ok(())
    }

    /// Column and primary key changes for one table, computed on a scratch
    /// copy so each change sees the effect of the ones before it.
    fn column_changes(&self, current: &Table, target: &Table) -> Result<Vec<Change>> {
        let case = self.case();
        let platform = &self.config.platform;
        let table_name = current.name.as_str();
        let mut scratch = current.clone();
        let mut changes: Vec<Change> = Vec::new();

        let mut push = |scratch: &mut Table, change: Change| -> Result<()> {
            change.apply_to_table(scratch, case)?;
            changes.push(change);
            Ok(())
        };

        // removed columns
        let removed: Vec<Column> = scratch
            .columns
            .iter()
            .filter(|c| target.find_column(&c.name, case).is_none())
            .cloned()
            .collect();

        if !self.config.can_drop_primary_key_columns && removed.iter().any(|c| c.primary_key) {
            let remaining: Vec<String> = scratch
                .primary_key_columns()
                .into_iter()
                .filter(|c| !removed.iter().any(|r| case.matches(&r.name, &c.name)))
                .map(|c| c.name.clone())
                .collect();
            let narrowed = if remaining.is_empty() {
                vec![RemovePrimaryKey::new(table_name).into()]
            } else {
                self.replace_primary_key(table_name, remaining)
            };
            for change in narrowed {
                push(&mut scratch, change)?;
            }
        }

        for column in &removed {
            push(&mut scratch, RemoveColumn::new(table_name, &column.name).into())?;
        }

        // reorder the surviving columns
        let target_order: Vec<&str> = target
            .columns
            .iter()
            .filter(|c| scratch.find_column(&c.name, case).is_some())
            .map(|c| c.name.as_str())
            .collect();
        let mut new_positions = BTreeMap::new();
        let mut moved_primary_key_columns = 0;
        let mut reordered = false;
        for (position, column) in scratch.columns.iter().enumerate() {
            let new_position = target_order
                .iter()
                .position(|name| case.matches(name, &column.name))
                .unwrap_or(position);
            if new_position != position {
                reordered = true;
                if column.primary_key {
                    moved_primary_key_columns += 1;
                }
            }
            new_positions.insert(column.name.clone(), new_position);
        }
        if reordered {
            push(&mut scratch, ColumnOrderChange::new(table_name, new_positions).into())?;
            if moved_primary_key_columns > 1 {
                for change in self.replace_primary_key(table_name, scratch.primary_key_names()) {
                    push(&mut scratch, change)?;
                }
            }
        }

        // changed definitions
        let mut redefinitions = Vec::new();
        for column in &scratch.columns {
            if let Some(target_column) = target.find_column(&column.name, case) {
                if ColumnDefinitionChange::is_changed(platform, column, target_column) {
                    redefinitions.push(ColumnDefinitionChange::new(
                        table_name,
                        &column.name,
                        target_column.clone_without_primary_key(),
                    ));
                }
            }
        }
        for change in redefinitions {
            push(&mut scratch, change.into())?;
        }

        // added columns, in target order next to their neighbours
        for (position, target_column) in target.columns.iter().enumerate() {
            if scratch.find_column(&target_column.name, case).is_some() {
                continue;
            }
            let previous = position
                .checked_sub(1)
                .and_then(|p| scratch.columns.get(p))
                .map(|c| c.name.clone());
            let next = scratch.columns.get(position).map(|c| c.name.clone());
            let change = AddColumn::new(
                table_name,
                target_column.clone_without_primary_key(),
                previous.as_deref(),
                next.as_deref(),
            );
            push(&mut scratch, change.into())?;
        }

        // primary key
        let current_key = scratch.primary_key_names();
        let target_key = target.primary_key_names();
        let same_key = current_key.len() == target_key.len()
            && current_key.iter().zip(&target_key).all(|(a, b)| case.matches(a, b));
        if !same_key {
            if target_key.is_empty() {
                push(&mut scratch, RemovePrimaryKey::new(table_name).into())?;
            } else if current_key.is_empty() {
                push(&mut scratch, AddPrimaryKey::new(table_name, target_key).into())?;
            } else {
                for change in self.replace_primary_key(table_name, target_key) {
                    push(&mut scratch, change)?;
                }
            }
        }

        Ok(changes)
    }

    /// Swap an existing primary key for one on `columns`, in the configured style.
    fn replace_primary_key(&self, table_name: &str, columns: Vec<String>) -> Vec<Change> {
        match self.config.primary_key_style {
            PrimaryKeyChangeStyle::Replace => vec![PrimaryKeyChange::new(table_name, columns).into()],
            PrimaryKeyChangeStyle::RemoveAndAdd => vec![
                RemovePrimaryKey::new(table_name).into(),
                AddPrimaryKey::new(table_name, columns).into(),
            ],
        }
    }

    // ============ Steps 4 and 5: new tables and foreign keys ============

    fn add_new_tables(&mut self) -> Result<()> {
        let case = self.case();
        let target = self.target;
        for table in &target.tables {
            if self.intermediate.find_table(&table.name, case).is_none() {
                self.emit(AddTable::new(table))?;
            }
        }
        Ok(())
    }

    fn add_new_foreign_keys(&mut self) -> Result<()> {
        let case = self.case();
        let target = self.target;
        let mut additions = Vec::new();

        for target_table in &target.tables {
            let current = self
                .intermediate
                .find_table(&target_table.name, case)
                .ok_or_else(|| SchemaError::table_not_found(&target_table.name))?;

            let mut claims = Claims::new(&current.foreign_keys);
            for fk in &target_table.foreign_keys {
                if claims.claim(|candidate| candidate.matches(fk, case)).position.is_none() {
                    additions.push(AddForeignKey::new(&current.name, fk.clone()));
                }
            }
        }

        for addition in additions {
            self.emit(addition)?;
        }
        Ok(())
    }
}
