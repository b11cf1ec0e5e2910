//! Engine capability information consumed by the column predicates.
//!
//! A [`PlatformInfo`] answers three questions about a target engine: whether
//! the size of a type is meaningful, whether precision and scale are, and
//! which native type an abstract type code folds into. It is an explicit
//! value handed to the comparator, never global state.

use crate::schema::Column;
use crate::types::TypeCode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub name: String,
    sized_types: BTreeSet<TypeCode>,
    precision_scale_types: BTreeSet<TypeCode>,
    #[serde(default)]
    target_types: BTreeMap<TypeCode, TypeCode>,
    #[serde(default)]
    default_sizes: BTreeMap<TypeCode, u32>,
}

impl Default for PlatformInfo {
    fn default() -> Self {
        Self::generic()
    }
}

impl PlatformInfo {
    /// ANSI-flavoured engine: character and binary types are sized, exact
    /// numerics carry precision and scale, nothing is folded.
    pub fn generic() -> Self {
        Self {
            name: "generic".to_string(),
            sized_types: [
                TypeCode::Char,
                TypeCode::Varchar,
                TypeCode::Binary,
                TypeCode::Varbinary,
            ]
            .into_iter()
            .collect(),
            precision_scale_types: [TypeCode::Decimal, TypeCode::Numeric].into_iter().collect(),
            target_types: BTreeMap::new(),
            default_sizes: BTreeMap::new(),
        }
    }

    pub fn postgres() -> Self {
        Self::generic()
            .named("postgres")
            .with_target_type(TypeCode::TinyInt, TypeCode::SmallInt)
            .with_target_type(TypeCode::Bit, TypeCode::Boolean)
            .with_target_type(TypeCode::Float, TypeCode::Double)
            .with_target_type(TypeCode::LongVarchar, TypeCode::Clob)
            .with_target_type(TypeCode::Binary, TypeCode::Blob)
            .with_target_type(TypeCode::Varbinary, TypeCode::Blob)
            .with_target_type(TypeCode::LongVarbinary, TypeCode::Blob)
            .with_target_type(TypeCode::Numeric, TypeCode::Decimal)
            .without_size(TypeCode::Binary)
            .without_size(TypeCode::Varbinary)
    }

    pub fn mysql() -> Self {
        Self::generic()
            .named("mysql")
            .with_target_type(TypeCode::Boolean, TypeCode::Bit)
            .with_target_type(TypeCode::Real, TypeCode::Double)
            .with_target_type(TypeCode::Numeric, TypeCode::Decimal)
            .with_target_type(TypeCode::Clob, TypeCode::LongVarchar)
            .with_target_type(TypeCode::Blob, TypeCode::LongVarbinary)
            .with_default_size(TypeCode::Char, 1)
            .with_default_size(TypeCode::Varchar, 254)
            .with_default_size(TypeCode::Binary, 254)
            .with_default_size(TypeCode::Varbinary, 254)
    }

    /// SQLite stores by affinity, so sizes never matter.
    pub fn sqlite() -> Self {
        Self {
            name: "sqlite".to_string(),
            sized_types: BTreeSet::new(),
            precision_scale_types: BTreeSet::new(),
            target_types: BTreeMap::new(),
            default_sizes: BTreeMap::new(),
        }
        .with_target_type(TypeCode::Bit, TypeCode::Boolean)
        .with_target_type(TypeCode::Numeric, TypeCode::Decimal)
        .with_target_type(TypeCode::Float, TypeCode::Double)
        .with_target_type(TypeCode::Real, TypeCode::Double)
    }

    /// Look up a preset by name (case-insensitive).
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "generic" | "ansi" => Some(Self::generic()),
            "postgres" | "postgresql" => Some(Self::postgres()),
            "mysql" | "mariadb" => Some(Self::mysql()),
            "sqlite" => Some(Self::sqlite()),
            _ => None,
        }
    }

    fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Fold `from` into the native type `to`.
    pub fn with_target_type(mut self, from: TypeCode, to: TypeCode) -> Self {
        self.target_types.insert(from, to);
        self
    }

    pub fn with_default_size(mut self, type_code: TypeCode, size: u32) -> Self {
        self.default_sizes.insert(type_code, size);
        self
    }

    pub fn with_size(mut self, type_code: TypeCode) -> Self {
        self.sized_types.insert(type_code);
        self
    }

    pub fn without_size(mut self, type_code: TypeCode) -> Self {
        self.sized_types.remove(&type_code);
        self
    }

    pub fn has_size(&self, type_code: TypeCode) -> bool {
        self.sized_types.contains(&type_code)
    }

    pub fn has_precision_and_scale(&self, type_code: TypeCode) -> bool {
        self.precision_scale_types.contains(&type_code)
    }

    /// Native type the engine actually stores for `type_code`.
    pub fn target_type(&self, type_code: TypeCode) -> TypeCode {
        self.target_types.get(&type_code).copied().unwrap_or(type_code)
    }

    pub fn default_size(&self, type_code: TypeCode) -> Option<u32> {
        self.default_sizes.get(&type_code).copied()
    }

    /// Size of `column` as the engine sees it, falling back to the default.
    pub fn effective_size(&self, column: &Column) -> Option<u32> {
        column
            .size
            .or_else(|| self.default_size(self.target_type(column.type_code)))
    }

    /// Whether size or precision/scale matters for the native type of `type_code`.
    pub fn size_matters(&self, type_code: TypeCode) -> bool {
        let native = self.target_type(type_code);
        self.has_size(native) || self.has_precision_and_scale(native)
    }
}
