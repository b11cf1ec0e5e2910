pub mod changes;
pub mod compare;
mod error;
mod platform;
pub mod policy;
mod schema;
mod toml_schema;
mod types;

pub use changes::{Change, ColumnLevelChange, ModelChange};
pub use compare::{
    Comparison, ConstraintHook, Diagnostic, ModelComparator, PrimaryKeyChangeStyle, type_or_size_changed,
};
pub use error::{EntityKind, Result, SchemaError};
pub use platform::PlatformInfo;
pub use policy::{CapabilityPolicy, DenyAll, FeasibilityPolicy, PermitAll};
pub use schema::{Column, Database, ForeignKey, Index, IndexColumn, Reference, Table};
pub use toml_schema::{TomlSchema, TomlTable};
pub use types::{CascadeAction, CaseSensitivity, DefaultValue, TypeCode};
