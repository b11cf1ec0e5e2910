use anyhow::Result;
use std::path::Path;

use schemadiff::CaseSensitivity;

use super::load_model;

pub fn run(path: &Path, case_insensitive: bool) -> Result<()> {
    let database = load_model(path, CaseSensitivity::from_flag(!case_insensitive))?;

    let columns: usize = database.tables.iter().map(|t| t.columns.len()).sum();
    let indexes: usize = database.tables.iter().map(|t| t.indexes.len()).sum();
    let foreign_keys: usize = database.tables.iter().map(|t| t.foreign_keys.len()).sum();

    println!("Model '{}' is valid.", database.name);
    println!(
        "{} table(s), {} column(s), {} index(es), {} foreign key(s)",
        database.tables.len(),
        columns,
        indexes,
        foreign_keys
    );
    Ok(())
}
