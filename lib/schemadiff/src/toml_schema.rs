//! Schema models stored as TOML files.
//!
//! ```toml
//! name = "shop"
//!
//! [[table]]
//! name = "orders"
//!
//! [[table.column]]
//! name = "id"
//! type = "INTEGER"
//! primary_key = true
//! required = true
//!
//! [[table.index]]
//! name = "orders_customer"
//! columns = ["customer_id"]
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::schema::{Column, Database, ForeignKey, Index, Table};

// ============ Type Definitions ============

#[derive(Serialize, Deserialize)]
pub struct TomlSchema {
    #[serde(default = "default_database_name")]
    pub name: String,
    #[serde(default)]
    pub table: Vec<TomlTable>,
}

#[derive(Serialize, Deserialize)]
pub struct TomlTable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub column: Vec<Column>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub index: Vec<Index>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_key: Vec<ForeignKey>,
}

fn default_database_name() -> String {
    "database".to_string()
}

// ============ TomlSchema Methods ============

impl TomlSchema {
    /// Read a TomlSchema from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let toml_str = fs::read_to_string(path)?;
        Self::parse(&toml_str)
    }

    pub fn parse(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Write this TomlSchema to a file
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Table order is kept as-is; it is part of the model.
    pub fn from_database(database: &Database) -> Self {
        let table = database
            .tables
            .iter()
            .map(|table| TomlTable {
                name: table.name.clone(),
                description: table.description.clone(),
                column: table.columns.clone(),
                index: table.indexes.clone(),
                foreign_key: table.foreign_keys.clone(),
            })
            .collect();

        TomlSchema {
            name: database.name.clone(),
            table,
        }
    }

    pub fn into_database(self) -> Database {
        Database {
            name: self.name,
            tables: self
                .table
                .into_iter()
                .map(|t| Table {
                    name: t.name,
                    description: t.description,
                    columns: t.column,
                    indexes: t.index,
                    foreign_keys: t.foreign_key,
                })
                .collect(),
        }
    }
}

// ============ Database file helpers ============

impl Database {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Database> {
        Ok(TomlSchema::from_file(path)?.into_database())
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Database> {
        Ok(TomlSchema::parse(toml_str)?.into_database())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        TomlSchema::from_database(self).to_toml()
    }

    pub fn write_toml(&self, path: impl AsRef<Path>) -> Result<()> {
        TomlSchema::from_database(self).write_file(path)
    }
}
