//! The differencing algorithm.
//!
//! [`ModelComparator`] turns a current and a desired [`Database`] into an
//! ordered list of [`Change`]s. It plans and applies at the same time: each
//! change is applied to an intermediate copy of the current model as soon as
//! it is emitted, and later steps look at that intermediate model. Applying
//! the returned changes, in order, to a copy of the current model therefore
//! reproduces the intermediate model, which is equivalent to the desired one.
//!
//! Engine differences are expressed through configuration rather than
//! subclassing: a [`FeasibilityPolicy`], a [`PrimaryKeyChangeStyle`], a flag
//! that forbids dropping primary key columns directly, and an optional hook
//! that forces indexes and foreign keys to be rebuilt when one of their
//! columns changes.

mod matching;
mod planner;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::changes::{Change, ColumnDefinitionChange};
use crate::error::Result;
use crate::platform::PlatformInfo;
use crate::policy::FeasibilityPolicy;
use crate::schema::{Column, Database};
use crate::types::CaseSensitivity;

use planner::Planner;

/// How a changed primary key is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrimaryKeyChangeStyle {
    /// One [`crate::changes::PrimaryKeyChange`].
    #[default]
    Replace,
    /// A [`crate::changes::RemovePrimaryKey`] followed by an
    /// [`crate::changes::AddPrimaryKey`], for engines without a replace
    /// statement.
    RemoveAndAdd,
}

/// Predicate deciding whether a change from `source` to `target` column
/// invalidates the indexes and foreign keys built on that column.
pub type ConstraintHook = dyn Fn(&PlatformInfo, &Column, &Column) -> bool + Send + Sync;

/// Stock hook: rebuild constraints when a column's type or size changes.
/// Indexes follow this rule without a hook; installing it extends it to
/// foreign keys.
pub fn type_or_size_changed(platform: &PlatformInfo, source: &Column, target: &Column) -> bool {
    ColumnDefinitionChange::is_type_changed(platform, source, target)
        || ColumnDefinitionChange::is_size_changed(platform, source, target)
}

/// A non-fatal finding made while comparing, such as an ambiguous match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub table_name: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.table_name, self.message)
    }
}

/// Result of [`ModelComparator::compare_incremental`].
#[derive(Debug, Clone)]
pub struct Comparison {
    pub changes: Vec<Change>,
    /// The current model with every change applied.
    pub intermediate: Database,
    pub diagnostics: Vec<Diagnostic>,
}

impl Comparison {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Names of the tables that are rebuilt rather than altered.
    pub fn recreated_tables(&self) -> Vec<&str> {
        self.changes
            .iter()
            .filter_map(|c| match c {
                Change::RecreateTable(r) => Some(r.table_name.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Compares two schema models. Holds read-only configuration only, so one
/// instance can serve any number of comparisons, including concurrent ones.
#[derive(Clone)]
pub struct ModelComparator {
    platform: PlatformInfo,
    case: CaseSensitivity,
    policy: Option<Arc<dyn FeasibilityPolicy>>,
    primary_key_style: PrimaryKeyChangeStyle,
    can_drop_primary_key_columns: bool,
    constraint_hook: Option<Arc<ConstraintHook>>,
}

impl Default for ModelComparator {
    fn default() -> Self {
        Self::new(PlatformInfo::generic())
    }
}

impl fmt::Debug for ModelComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelComparator")
            .field("platform", &self.platform.name)
            .field("case", &self.case)
            .field("policy", &self.policy.is_some())
            .field("primary_key_style", &self.primary_key_style)
            .field("can_drop_primary_key_columns", &self.can_drop_primary_key_columns)
            .field("constraint_hook", &self.constraint_hook.is_some())
            .finish()
    }
}

impl ModelComparator {
    /// Case-sensitive comparator without a feasibility policy: every
    /// column-level change is considered directly applicable.
    pub fn new(platform: PlatformInfo) -> Self {
        Self {
            platform,
            case: CaseSensitivity::Sensitive,
            policy: None,
            primary_key_style: PrimaryKeyChangeStyle::Replace,
            can_drop_primary_key_columns: true,
            constraint_hook: None,
        }
    }

    pub fn case_sensitivity(mut self, case: CaseSensitivity) -> Self {
        self.case = case;
        self
    }

    pub fn with_policy(mut self, policy: impl FeasibilityPolicy + 'static) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    pub fn with_shared_policy(mut self, policy: Arc<dyn FeasibilityPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn primary_key_changes(mut self, style: PrimaryKeyChangeStyle) -> Self {
        self.primary_key_style = style;
        self
    }

    /// When false, primary key columns are taken out of the key before they
    /// are dropped.
    pub fn can_drop_primary_key_columns(mut self, allowed: bool) -> Self {
        self.can_drop_primary_key_columns = allowed;
        self
    }

    pub fn rebuild_constraints_when(
        mut self,
        hook: impl Fn(&PlatformInfo, &Column, &Column) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.constraint_hook = Some(Arc::new(hook));
        self
    }

    pub fn platform(&self) -> &PlatformInfo {
        &self.platform
    }

    pub fn case(&self) -> CaseSensitivity {
        self.case
    }

    /// Ordered list of changes turning `source` into `target`.
    pub fn compare(&self, source: &Database, target: &Database) -> Result<Vec<Change>> {
        Ok(self.compare_incremental(source, target)?.changes)
    }

    /// Like [`compare`](Self::compare) but also returns the as-applied model
    /// and the diagnostics collected on the way.
    pub fn compare_incremental(&self, source: &Database, target: &Database) -> Result<Comparison> {
        Planner::new(self, source, target).run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::DenyAll;
    use crate::schema::{Index, Table};
    use crate::types::TypeCode;

    fn db(columns: &[(&str, TypeCode)]) -> Database {
        let mut table = Table::new("t").with_column(Column::new("id", TypeCode::Integer).primary_key());
        for (name, type_code) in columns {
            table = table.with_column(Column::new(*name, *type_code));
        }
        Database::new("db").with_table(table)
    }

    #[test]
    fn test_identical_models_produce_nothing() {
        let model = db(&[("a", TypeCode::Date)]);
        let changes = ModelComparator::default().compare(&model, &model).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_added_column_appended() {
        let source = db(&[("a", TypeCode::Date)]);
        let target = db(&[("a", TypeCode::Date), ("b", TypeCode::Integer)]);
        let changes = ModelComparator::default().compare(&source, &target).unwrap();
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            Change::AddColumn(add) => {
                assert_eq!(add.new_column.name, "b");
                assert_eq!(add.previous_column.as_deref(), Some("a"));
                assert!(add.is_at_end());
            }
            other => panic!("unexpected change {other}"),
        }
    }

    #[test]
    fn test_case_insensitive_names_match() {
        let source = db(&[("Name", TypeCode::Varchar)]);
        let target = db(&[("NAME", TypeCode::Varchar)]);
        let comparator = ModelComparator::default().case_sensitivity(CaseSensitivity::Insensitive);
        assert!(comparator.compare(&source, &target).unwrap().is_empty());

        let changes = ModelComparator::default().compare(&source, &target).unwrap();
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn test_remove_and_add_primary_key_style() {
        let source = db(&[("a", TypeCode::Integer)]);
        let mut target = source.clone();
        target.tables[0].columns[0].primary_key = false;
        target.tables[0].columns[1].primary_key = true;

        let changes = ModelComparator::default()
            .primary_key_changes(PrimaryKeyChangeStyle::RemoveAndAdd)
            .compare(&source, &target)
            .unwrap();
        let kinds: Vec<&str> = changes.iter().map(Change::kind).collect();
        assert_eq!(kinds, vec!["remove_primary_key", "add_primary_key"]);
    }

    #[test]
    fn test_primary_key_column_folded_out_before_drop() {
        let mut source = db(&[("a", TypeCode::Integer)]);
        source.tables[0].columns[1].primary_key = true;
        let mut target = db(&[]);
        target.tables[0].columns[0].primary_key = true;

        let changes = ModelComparator::default()
            .can_drop_primary_key_columns(false)
            .compare(&source, &target)
            .unwrap();
        let kinds: Vec<&str> = changes.iter().map(Change::kind).collect();
        assert_eq!(kinds, vec!["primary_key", "remove_column"]);

        let direct = ModelComparator::default().compare(&source, &target).unwrap();
        assert_eq!(direct.iter().map(Change::kind).collect::<Vec<_>>(), vec!["remove_column"]);
    }

    fn kinds(changes: &[Change]) -> Vec<&'static str> {
        changes.iter().map(Change::kind).collect()
    }

    fn composite_key_table(columns: &[&str]) -> Database {
        let table = columns.iter().fold(Table::new("t"), |table, name| {
            let column = Column::new(*name, TypeCode::Integer);
            table.with_column(if name.starts_with('k') { column.primary_key() } else { column })
        });
        Database::new("db").with_table(table)
    }

    #[test]
    fn test_resized_column_rebuilds_its_index() {
        let mut source = db(&[("code", TypeCode::Varchar)]);
        source.tables[0].columns[1].size = Some(64);
        source.tables[0].indexes.push(Index::non_unique("t_code", &["code"]));
        let mut target = source.clone();
        target.tables[0].columns[1].size = Some(128);

        let changes = ModelComparator::default().compare(&source, &target).unwrap();
        assert_eq!(kinds(&changes), vec!["remove_index", "column_definition", "add_index"]);

        // the same change on an unindexed column stays a single alteration
        source.tables[0].indexes.clear();
        target.tables[0].indexes.clear();
        let changes = ModelComparator::default().compare(&source, &target).unwrap();
        assert_eq!(kinds(&changes), vec!["column_definition"]);
    }

    #[test]
    fn test_constraint_hook_rebuilds_index() {
        let mut source = db(&[("code", TypeCode::Varchar)]);
        source.tables[0].columns[1].size = Some(64);
        source.tables[0].indexes.push(Index::non_unique("t_code", &["code"]));
        let mut target = source.clone();
        target.tables[0].columns[1].required = true;

        let plain = ModelComparator::default().compare(&source, &target).unwrap();
        assert_eq!(kinds(&plain), vec!["column_definition"]);

        let hooked = ModelComparator::default()
            .rebuild_constraints_when(|_, old, new| ColumnDefinitionChange::is_required_status_changed(old, new))
            .compare(&source, &target)
            .unwrap();
        assert_eq!(kinds(&hooked), vec!["remove_index", "column_definition", "add_index"]);

        // the stock hook and the built-in rule agree, so nothing is removed twice
        target.tables[0].columns[1].size = Some(128);
        let stock = ModelComparator::default()
            .rebuild_constraints_when(type_or_size_changed)
            .compare(&source, &target)
            .unwrap();
        assert_eq!(kinds(&stock), vec!["remove_index", "column_definition", "add_index"]);
    }

    #[test]
    fn test_remove_and_add_style_restates_reordered_key() {
        let source = composite_key_table(&["k1", "k2", "v"]);
        let target = composite_key_table(&["v", "k1", "k2"]);

        let changes = ModelComparator::default()
            .primary_key_changes(PrimaryKeyChangeStyle::RemoveAndAdd)
            .compare(&source, &target)
            .unwrap();
        assert_eq!(kinds(&changes), vec!["column_order", "remove_primary_key", "add_primary_key"]);
        match &changes[2] {
            Change::AddPrimaryKey(add) => assert_eq!(add.primary_key_columns, vec!["k1", "k2"]),
            other => panic!("unexpected change {other}"),
        }
    }

    #[test]
    fn test_remove_and_add_style_narrows_key_before_drop() {
        let source = composite_key_table(&["k1", "k2", "v"]);
        let target = composite_key_table(&["k1", "v"]);

        let comparison = ModelComparator::default()
            .primary_key_changes(PrimaryKeyChangeStyle::RemoveAndAdd)
            .can_drop_primary_key_columns(false)
            .compare_incremental(&source, &target)
            .unwrap();
        assert_eq!(
            kinds(&comparison.changes),
            vec!["remove_primary_key", "add_primary_key", "remove_column"]
        );
        assert_eq!(comparison.intermediate.tables[0].primary_key_names(), vec!["k1"]);
    }

    #[test]
    fn test_deny_all_reports_recreated_table() {
        let source = db(&[("a", TypeCode::Integer)]);
        let target = db(&[("a", TypeCode::BigInt)]);
        let comparison = ModelComparator::default()
            .with_policy(DenyAll)
            .compare_incremental(&source, &target)
            .unwrap();
        assert_eq!(comparison.recreated_tables(), vec!["t"]);
        assert_eq!(comparison.intermediate.tables[0].columns[1].type_code, TypeCode::BigInt);
    }
}
