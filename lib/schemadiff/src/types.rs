use serde::{Deserialize, Serialize};
use std::fmt;

// ============ Identifier matching ============

/// Whether identifier lookups and matching are exact or case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaseSensitivity {
    #[default]
    Sensitive,
    Insensitive,
}

impl CaseSensitivity {
    pub fn from_flag(case_sensitive: bool) -> Self {
        if case_sensitive {
            CaseSensitivity::Sensitive
        } else {
            CaseSensitivity::Insensitive
        }
    }

    /// Compare two identifiers under this mode.
    pub fn matches(self, a: &str, b: &str) -> bool {
        match self {
            CaseSensitivity::Sensitive => a == b,
            CaseSensitivity::Insensitive => a.eq_ignore_ascii_case(b),
        }
    }

    /// Like [`matches`](Self::matches) but for optional names; two absent
    /// names never match.
    pub fn matches_opt(self, a: Option<&str>, b: Option<&str>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => self.matches(a, b),
            _ => false,
        }
    }
}

// ============ Type codes ============

/// Engine-neutral column type, modelled on the standard SQL type categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TypeCode {
    Bit,
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Float,
    Double,
    Decimal,
    Numeric,
    Char,
    Varchar,
    LongVarchar,
    Clob,
    Binary,
    Varbinary,
    LongVarbinary,
    Blob,
    Date,
    Time,
    Timestamp,
    Other,
}

impl TypeCode {
    pub fn name(self) -> &'static str {
        match self {
            TypeCode::Bit => "BIT",
            TypeCode::Boolean => "BOOLEAN",
            TypeCode::TinyInt => "TINYINT",
            TypeCode::SmallInt => "SMALLINT",
            TypeCode::Integer => "INTEGER",
            TypeCode::BigInt => "BIGINT",
            TypeCode::Real => "REAL",
            TypeCode::Float => "FLOAT",
            TypeCode::Double => "DOUBLE",
            TypeCode::Decimal => "DECIMAL",
            TypeCode::Numeric => "NUMERIC",
            TypeCode::Char => "CHAR",
            TypeCode::Varchar => "VARCHAR",
            TypeCode::LongVarchar => "LONGVARCHAR",
            TypeCode::Clob => "CLOB",
            TypeCode::Binary => "BINARY",
            TypeCode::Varbinary => "VARBINARY",
            TypeCode::LongVarbinary => "LONGVARBINARY",
            TypeCode::Blob => "BLOB",
            TypeCode::Date => "DATE",
            TypeCode::Time => "TIME",
            TypeCode::Timestamp => "TIMESTAMP",
            TypeCode::Other => "OTHER",
        }
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            TypeCode::TinyInt | TypeCode::SmallInt | TypeCode::Integer | TypeCode::BigInt
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integral()
            || matches!(
                self,
                TypeCode::Real | TypeCode::Float | TypeCode::Double | TypeCode::Decimal | TypeCode::Numeric
            )
    }

    pub fn is_textual(self) -> bool {
        matches!(
            self,
            TypeCode::Char | TypeCode::Varchar | TypeCode::LongVarchar | TypeCode::Clob
        )
    }

    pub fn is_binary(self) -> bool {
        matches!(
            self,
            TypeCode::Binary | TypeCode::Varbinary | TypeCode::LongVarbinary | TypeCode::Blob
        )
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, TypeCode::Date | TypeCode::Time | TypeCode::Timestamp)
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============ Foreign key actions ============

/// Referential action for ON DELETE / ON UPDATE.
///
/// `None` leaves the choice to the engine's default behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CascadeAction {
    Cascade,
    Restrict,
    SetNull,
    SetDefault,
    #[default]
    None,
}

impl CascadeAction {
    pub fn is_none(&self) -> bool {
        *self == CascadeAction::None
    }
}

impl fmt::Display for CascadeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadeAction::Cascade => write!(f, "CASCADE"),
            CascadeAction::Restrict => write!(f, "RESTRICT"),
            CascadeAction::SetNull => write!(f, "SET NULL"),
            CascadeAction::SetDefault => write!(f, "SET DEFAULT"),
            CascadeAction::None => write!(f, "NO ACTION"),
        }
    }
}

// ============ Parsed default values ============

/// A column default interpreted according to the column's type category.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl DefaultValue {
    /// Interpret `raw` for a column of type `type_code`. Literals that do not
    /// parse for the type fall back to text, trimmed of surrounding quotes.
    pub fn parse(raw: &str, type_code: TypeCode) -> Self {
        let trimmed = raw.trim();

        if type_code.is_integral() {
            if let Ok(v) = trimmed.parse::<i64>() {
                return DefaultValue::Integer(v);
            }
        } else if type_code.is_numeric() {
            if let Ok(v) = trimmed.parse::<f64>() {
                return DefaultValue::Float(v);
            }
        } else if matches!(type_code, TypeCode::Boolean | TypeCode::Bit) {
            match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" | "t" | "yes" => return DefaultValue::Boolean(true),
                "false" | "0" | "f" | "no" => return DefaultValue::Boolean(false),
                _ => {}
            }
        }

        DefaultValue::Text(unquote(trimmed).to_string())
    }
}

fn unquote(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}
