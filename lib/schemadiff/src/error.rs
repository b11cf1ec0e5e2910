//! Error types for model handling and change application.

use std::fmt;
use thiserror::Error;

/// The kind of schema object an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Table,
    Column,
    Index,
    ForeignKey,
    PrimaryKey,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Table => write!(f, "table"),
            EntityKind::Column => write!(f, "column"),
            EntityKind::Index => write!(f, "index"),
            EntityKind::ForeignKey => write!(f, "foreign key"),
            EntityKind::PrimaryKey => write!(f, "primary key"),
        }
    }
}

/// Main error type of the schemadiff library.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// A change referenced an object that does not exist in the model it was
    /// applied to. The comparator only emits changes it can apply, so this is
    /// an inconsistent-model error and aborts the comparison.
    #[error("{kind} '{name}' not found{}", in_table(.table))]
    NotFound {
        kind: EntityKind,
        name: String,
        table: Option<String>,
    },

    /// A change tried to create an object whose name is already taken.
    #[error("{kind} '{name}' already exists{}", in_table(.table))]
    Duplicate {
        kind: EntityKind,
        name: String,
        table: Option<String>,
    },

    /// The model violates one of its structural invariants.
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// A change was constructed with a payload it cannot carry.
    #[error("Invalid change: {0}")]
    InvalidChange(String),

    /// IO error (model files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlRead(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

fn in_table(table: &Option<String>) -> String {
    match table {
        Some(t) => format!(" in table '{}'", t),
        None => String::new(),
    }
}

impl SchemaError {
    pub fn table_not_found(name: impl Into<String>) -> Self {
        SchemaError::NotFound {
            kind: EntityKind::Table,
            name: name.into(),
            table: None,
        }
    }

    /// A missing object that lives inside a table (column, index, foreign key).
    pub fn not_found_in(kind: EntityKind, name: impl Into<String>, table: impl Into<String>) -> Self {
        SchemaError::NotFound {
            kind,
            name: name.into(),
            table: Some(table.into()),
        }
    }

    pub fn duplicate_in(kind: EntityKind, name: impl Into<String>, table: Option<&str>) -> Self {
        SchemaError::Duplicate {
            kind,
            name: name.into(),
            table: table.map(str::to_string),
        }
    }

    /// True for the inconsistent-model condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SchemaError::NotFound { .. })
    }
}

/// Result type alias for schemadiff operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
