use anyhow::{Context, Result};
use std::path::Path;

use super::{CompareArgs, prepare};

pub fn run(args: &CompareArgs, output: &Path) -> Result<()> {
    let (settings, current, desired) = prepare(args)?;
    let comparison = settings.comparator()?.compare_incremental(&current, &desired)?;

    for diagnostic in &comparison.diagnostics {
        eprintln!("warning: {}", diagnostic);
    }

    comparison
        .intermediate
        .write_toml(output)
        .with_context(|| format!("Failed to write {:?}", output))?;

    println!(
        "Applied {} change(s), wrote {}",
        comparison.changes.len(),
        output.display()
    );
    Ok(())
}
