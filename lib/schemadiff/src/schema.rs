use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::changes::ColumnDefinitionChange;
use crate::error::{EntityKind, Result, SchemaError};
use crate::platform::PlatformInfo;
use crate::types::{CascadeAction, CaseSensitivity, DefaultValue, TypeCode};

// ============ Type Definitions ============

/// A named, ordered collection of tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declaration order is significant.
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<Index>,
    /// Foreign keys originating from this table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub type_code: TypeCode,
    /// Length, or precision for precision/scale types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    /// Unparsed default literal.
    #[serde(default, rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An index; anonymous indexes are matched by structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub unique: bool,
    pub columns: Vec<IndexColumn>,
}

/// Reference from an index to a column of the owning table, by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "IndexColumnSpec")]
pub struct IndexColumn {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

/// Index columns may be written as a bare name or as `{ name, size }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum IndexColumnSpec {
    Name(String),
    Detailed { name: String, size: Option<u32> },
}

impl From<IndexColumnSpec> for IndexColumn {
    fn from(spec: IndexColumnSpec) -> Self {
        match spec {
            IndexColumnSpec::Name(name) => IndexColumn { name, size: None },
            IndexColumnSpec::Detailed { name, size } => IndexColumn { name, size },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub foreign_table: String,
    pub references: Vec<Reference>,
    #[serde(default, skip_serializing_if = "CascadeAction::is_none")]
    pub on_delete: CascadeAction,
    #[serde(default, skip_serializing_if = "CascadeAction::is_none")]
    pub on_update: CascadeAction,
}

/// One local column → foreign column pair of a foreign key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub local: String,
    pub foreign: String,
}

// ============ Column Methods ============

impl Column {
    pub fn new(name: impl Into<String>, type_code: TypeCode) -> Self {
        Self {
            name: name.into(),
            type_code,
            size: None,
            scale: None,
            required: false,
            primary_key: false,
            auto_increment: false,
            default_value: None,
            description: None,
        }
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.size = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the column as (required) primary key member.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.required = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn with_default(mut self, literal: impl Into<String>) -> Self {
        self.default_value = Some(literal.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Precision of a precision/scale column; same storage as the size.
    pub fn precision_radix(&self) -> Option<u32> {
        self.size
    }

    pub fn scale_or_zero(&self) -> u32 {
        self.scale.unwrap_or(0)
    }

    /// Default literal interpreted for this column's type.
    pub fn parsed_default_value(&self) -> Option<DefaultValue> {
        self.default_value
            .as_deref()
            .map(|raw| DefaultValue::parse(raw, self.type_code))
    }

    /// Copy used when a column crosses into another model as a new column;
    /// primary key membership is a separate change.
    pub fn clone_without_primary_key(&self) -> Column {
        Column {
            primary_key: false,
            ..self.clone()
        }
    }
}

// ============ Index / ForeignKey Methods ============

impl IndexColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
        }
    }
}

impl Index {
    pub fn new(name: Option<&str>, unique: bool, columns: &[&str]) -> Self {
        Self {
            name: name.map(str::to_string),
            unique,
            columns: columns.iter().map(|c| IndexColumn::new(*c)).collect(),
        }
    }

    pub fn unique(name: &str, columns: &[&str]) -> Self {
        Self::new(Some(name), true, columns)
    }

    pub fn non_unique(name: &str, columns: &[&str]) -> Self {
        Self::new(Some(name), false, columns)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn references_column(&self, column: &str, case: CaseSensitivity) -> bool {
        self.columns.iter().any(|c| case.matches(&c.name, column))
    }

    /// Same uniqueness and the same columns in the same order.
    pub fn same_structure(&self, other: &Index, case: CaseSensitivity) -> bool {
        self.unique == other.unique
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| case.matches(&a.name, &b.name) && a.size == b.size)
    }

    /// Two indexes match when their names agree (if both are named) and
    /// their structure is identical.
    pub fn matches(&self, other: &Index, case: CaseSensitivity) -> bool {
        names_compatible(self.name.as_deref(), other.name.as_deref(), case)
            && self.same_structure(other, case)
    }
}

impl ForeignKey {
    pub fn new(name: Option<&str>, foreign_table: &str, references: &[(&str, &str)]) -> Self {
        Self {
            name: name.map(str::to_string),
            foreign_table: foreign_table.to_string(),
            references: references
                .iter()
                .map(|(local, foreign)| Reference {
                    local: local.to_string(),
                    foreign: foreign.to_string(),
                })
                .collect(),
            on_delete: CascadeAction::None,
            on_update: CascadeAction::None,
        }
    }

    pub fn on_delete(mut self, action: CascadeAction) -> Self {
        self.on_delete = action;
        self
    }

    pub fn on_update(mut self, action: CascadeAction) -> Self {
        self.on_update = action;
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    pub fn local_column_names(&self) -> Vec<&str> {
        self.references.iter().map(|r| r.local.as_str()).collect()
    }

    pub fn foreign_column_names(&self) -> Vec<&str> {
        self.references.iter().map(|r| r.foreign.as_str()).collect()
    }

    pub fn points_to(&self, table: &str, case: CaseSensitivity) -> bool {
        case.matches(&self.foreign_table, table)
    }

    /// Same referenced table, the same column pairs in order and the same
    /// referential actions.
    pub fn same_structure(&self, other: &ForeignKey, case: CaseSensitivity) -> bool {
        case.matches(&self.foreign_table, &other.foreign_table)
            && self.on_delete == other.on_delete
            && self.on_update == other.on_update
            && self.references.len() == other.references.len()
            && self
                .references
                .iter()
                .zip(&other.references)
                .all(|(a, b)| case.matches(&a.local, &b.local) && case.matches(&a.foreign, &b.foreign))
    }

    pub fn matches(&self, other: &ForeignKey, case: CaseSensitivity) -> bool {
        names_compatible(self.name.as_deref(), other.name.as_deref(), case)
            && self.same_structure(other, case)
    }
}

/// Explicitly named objects never match across different names.
fn names_compatible(a: Option<&str>, b: Option<&str>, case: CaseSensitivity) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => case.matches(a, b),
        _ => true,
    }
}

// ============ Table Methods ============

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn find_column(&self, name: &str, case: CaseSensitivity) -> Option<&Column> {
        self.columns.iter().find(|c| case.matches(&c.name, name))
    }

    pub fn find_column_mut(&mut self, name: &str, case: CaseSensitivity) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| case.matches(&c.name, name))
    }

    pub fn column_position(&self, name: &str, case: CaseSensitivity) -> Option<usize> {
        self.columns.iter().position(|c| case.matches(&c.name, name))
    }

    /// Position of `name`, or a not-found error naming this table.
    pub fn require_column_position(&self, name: &str, case: CaseSensitivity) -> Result<usize> {
        self.column_position(name, case)
            .ok_or_else(|| SchemaError::not_found_in(EntityKind::Column, name, &self.name))
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Primary key columns in declaration order.
    pub fn primary_key_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    pub fn primary_key_names(&self) -> Vec<String> {
        self.primary_key_columns()
            .into_iter()
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn has_primary_key(&self) -> bool {
        self.columns.iter().any(|c| c.primary_key)
    }

    pub fn find_index(&self, index: &Index, case: CaseSensitivity) -> Option<&Index> {
        self.indexes.iter().find(|i| i.matches(index, case))
    }

    pub fn find_foreign_key(&self, foreign_key: &ForeignKey, case: CaseSensitivity) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.matches(foreign_key, case))
    }

    pub fn index_position(&self, index: &Index, case: CaseSensitivity) -> Option<usize> {
        self.indexes.iter().position(|i| i.matches(index, case))
    }

    pub fn foreign_key_position(&self, foreign_key: &ForeignKey, case: CaseSensitivity) -> Option<usize> {
        self.foreign_keys.iter().position(|fk| fk.matches(foreign_key, case))
    }

    /// Copy of the table carrying its columns and indexes but no foreign keys.
    pub fn clone_without_foreign_keys(&self) -> Table {
        Table {
            name: self.name.clone(),
            description: self.description.clone(),
            columns: self.columns.clone(),
            indexes: self.indexes.clone(),
            foreign_keys: Vec::new(),
        }
    }

    /// Structural equality: columns in order, indexes and foreign keys as sets.
    pub fn is_equivalent(&self, other: &Table, platform: &PlatformInfo, case: CaseSensitivity) -> bool {
        if !case.matches(&self.name, &other.name)
            || self.columns.len() != other.columns.len()
            || self.indexes.len() != other.indexes.len()
            || self.foreign_keys.len() != other.foreign_keys.len()
        {
            return false;
        }

        let columns_equal = self.columns.iter().zip(&other.columns).all(|(a, b)| {
            case.matches(&a.name, &b.name)
                && a.primary_key == b.primary_key
                && !ColumnDefinitionChange::is_changed(platform, a, b)
        });

        columns_equal
            && self
                .indexes
                .iter()
                .all(|i| other.indexes.iter().any(|o| o.matches(i, case)))
            && other
                .indexes
                .iter()
                .all(|i| self.indexes.iter().any(|o| o.matches(i, case)))
            && self
                .foreign_keys
                .iter()
                .all(|fk| other.foreign_keys.iter().any(|o| o.matches(fk, case)))
            && other
                .foreign_keys
                .iter()
                .all(|fk| self.foreign_keys.iter().any(|o| o.matches(fk, case)))
    }
}

// ============ Database Methods ============

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn find_table(&self, name: &str, case: CaseSensitivity) -> Option<&Table> {
        self.tables.iter().find(|t| case.matches(&t.name, name))
    }

    pub fn find_table_mut(&mut self, name: &str, case: CaseSensitivity) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| case.matches(&t.name, name))
    }

    pub fn table_position(&self, name: &str, case: CaseSensitivity) -> Option<usize> {
        self.tables.iter().position(|t| case.matches(&t.name, name))
    }

    /// Mutable table lookup that fails with a not-found error.
    pub fn require_table_mut(&mut self, name: &str, case: CaseSensitivity) -> Result<&mut Table> {
        self.find_table_mut(name, case)
            .ok_or_else(|| SchemaError::table_not_found(name))
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    /// Check the structural invariants of the model.
    pub fn validate(&self, case: CaseSensitivity) -> Result<()> {
        let mut errors = Vec::new();
        let mut seen_tables: Vec<&str> = Vec::new();

        for table in &self.tables {
            if table.name.trim().is_empty() {
                errors.push("table with empty name".to_string());
            }
            if seen_tables.iter().any(|t| case.matches(t, &table.name)) {
                errors.push(format!("duplicate table '{}'", table.name));
            }
            seen_tables.push(&table.name);

            validate_table(self, table, case, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::InvalidModel(errors.join("; ")))
        }
    }

    /// Structural equality ignoring table order; see [`Table::is_equivalent`].
    pub fn is_equivalent(&self, other: &Database, platform: &PlatformInfo, case: CaseSensitivity) -> bool {
        self.tables.len() == other.tables.len()
            && self.tables.iter().all(|table| {
                other
                    .find_table(&table.name, case)
                    .is_some_and(|o| table.is_equivalent(o, platform, case))
            })
    }
}

fn validate_table(db: &Database, table: &Table, case: CaseSensitivity, errors: &mut Vec<String>) {
    let mut seen_columns: Vec<&str> = Vec::new();
    for column in &table.columns {
        if seen_columns.iter().any(|c| case.matches(c, &column.name)) {
            errors.push(format!("duplicate column '{}' in table '{}'", column.name, table.name));
        }
        seen_columns.push(&column.name);
    }

    let mut index_names = HashSet::new();
    for index in &table.indexes {
        if index.columns.is_empty() {
            errors.push(format!("index '{}' on '{}' has no columns", index.display_name(), table.name));
        }
        if let Some(name) = &index.name {
            let key = match case {
                CaseSensitivity::Sensitive => name.clone(),
                CaseSensitivity::Insensitive => name.to_ascii_lowercase(),
            };
            if !index_names.insert(key) {
                errors.push(format!("duplicate index '{}' on '{}'", name, table.name));
            }
        }
        for column in &index.columns {
            if table.find_column(&column.name, case).is_none() {
                errors.push(format!(
                    "index '{}' on '{}' references unknown column '{}'",
                    index.display_name(),
                    table.name,
                    column.name
                ));
            }
        }
    }

    for fk in &table.foreign_keys {
        if fk.references.is_empty() {
            errors.push(format!("foreign key '{}' on '{}' has no references", fk.display_name(), table.name));
        }
        for reference in &fk.references {
            if table.find_column(&reference.local, case).is_none() {
                errors.push(format!(
                    "foreign key '{}' on '{}' uses unknown column '{}'",
                    fk.display_name(),
                    table.name,
                    reference.local
                ));
            }
        }
        match db.find_table(&fk.foreign_table, case) {
            None => errors.push(format!(
                "foreign key '{}' on '{}' references unknown table '{}'",
                fk.display_name(),
                table.name,
                fk.foreign_table
            )),
            Some(foreign) => {
                for reference in &fk.references {
                    if foreign.find_column(&reference.foreign, case).is_none() {
                        errors.push(format!(
                            "foreign key '{}' on '{}' references unknown column '{}.{}'",
                            fk.display_name(),
                            table.name,
                            fk.foreign_table,
                            reference.foreign
                        ));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> Table {
        Table::new("orders")
            .with_column(Column::new("id", TypeCode::Integer).primary_key())
            .with_column(Column::new("customer_id", TypeCode::Integer).required())
            .with_column(Column::new("note", TypeCode::Varchar).with_size(200))
            .with_index(Index::non_unique("orders_customer", &["customer_id"]))
            .with_foreign_key(ForeignKey::new(Some("orders_customer_fk"), "customers", &[("customer_id", "id")]))
    }

    fn shop() -> Database {
        Database::new("shop")
            .with_table(Table::new("customers").with_column(Column::new("id", TypeCode::Integer).primary_key()))
            .with_table(orders())
    }

    #[test]
    fn test_lookup_respects_case_mode() {
        let db = shop();
        assert!(db.find_table("ORDERS", CaseSensitivity::Insensitive).is_some());
        assert!(db.find_table("ORDERS", CaseSensitivity::Sensitive).is_none());
        let table = db.find_table("orders", CaseSensitivity::Sensitive).unwrap();
        assert_eq!(table.column_position("NOTE", CaseSensitivity::Insensitive), Some(2));
    }

    #[test]
    fn test_primary_key_follows_declaration_order() {
        let table = Table::new("t")
            .with_column(Column::new("b", TypeCode::Integer).primary_key())
            .with_column(Column::new("x", TypeCode::Integer))
            .with_column(Column::new("a", TypeCode::Integer).primary_key());
        assert_eq!(table.primary_key_names(), vec!["b", "a"]);
    }

    #[test]
    fn test_clone_is_independent() {
        let db = shop();
        let mut copy = db.clone();
        copy.tables[1].columns[2].size = Some(10);
        assert_eq!(db.tables[1].columns[2].size, Some(200));
    }

    #[test]
    fn test_clone_without_foreign_keys() {
        let table = orders().clone_without_foreign_keys();
        assert!(table.foreign_keys.is_empty());
        assert_eq!(table.indexes.len(), 1);
    }

    #[test]
    fn test_named_indexes_never_match_across_names() {
        let a = Index::non_unique("a", &["x"]);
        let b = Index::non_unique("b", &["x"]);
        let anonymous = Index::new(None, false, &["x"]);
        assert!(!a.matches(&b, CaseSensitivity::Sensitive));
        assert!(a.matches(&anonymous, CaseSensitivity::Sensitive));
    }

    #[test]
    fn test_foreign_key_structure_includes_actions() {
        let a = ForeignKey::new(None, "customers", &[("customer_id", "id")]);
        let b = a.clone().on_delete(CascadeAction::Cascade);
        assert!(!a.matches(&b, CaseSensitivity::Sensitive));
    }

    #[test]
    fn test_validate_accepts_consistent_model() {
        assert!(shop().validate(CaseSensitivity::Sensitive).is_ok());
    }

    #[test]
    fn test_validate_reports_dangling_references() {
        let db = Database::new("broken").with_table(
            Table::new("orders")
                .with_column(Column::new("id", TypeCode::Integer))
                .with_index(Index::non_unique("ix", &["missing"]))
                .with_foreign_key(ForeignKey::new(None, "customers", &[("id", "id")])),
        );
        let err = db.validate(CaseSensitivity::Sensitive).unwrap_err().to_string();
        assert!(err.contains("unknown column 'missing'"));
        assert!(err.contains("unknown table 'customers'"));
    }

    #[test]
    fn test_validate_reports_case_insensitive_duplicates() {
        let db = Database::new("dup")
            .with_table(Table::new("a"))
            .with_table(Table::new("A"));
        assert!(db.validate(CaseSensitivity::Sensitive).is_ok());
        assert!(db.validate(CaseSensitivity::Insensitive).is_err());
    }

    #[test]
    fn test_equivalence_ignores_table_and_index_order() {
        let a = shop();
        let mut b = shop();
        b.tables.reverse();
        b.tables[0].indexes.push(Index::unique("orders_note", &["note"]));
        let mut a2 = a.clone();
        a2.tables[1].indexes.insert(0, Index::unique("orders_note", &["note"]));
        let platform = PlatformInfo::generic();
        assert!(a2.is_equivalent(&b, &platform, CaseSensitivity::Sensitive));
        assert!(!a.is_equivalent(&b, &platform, CaseSensitivity::Sensitive));
    }

    #[test]
    fn test_parsed_default_value() {
        let column = Column::new("qty", TypeCode::Integer).with_default("007");
        assert_eq!(column.parsed_default_value(), Some(DefaultValue::Integer(7)));
    }
}
