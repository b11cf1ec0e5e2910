use anyhow::Result;

use super::{CompareArgs, OutputFormat, prepare};

pub fn run(args: &CompareArgs, format: OutputFormat) -> Result<()> {
    let (settings, current, desired) = prepare(args)?;
    let comparison = settings.comparator()?.compare_incremental(&current, &desired)?;

    for diagnostic in &comparison.diagnostics {
        eprintln!("warning: {}", diagnostic);
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&comparison.changes)?);
        }
        OutputFormat::Text => {
            if comparison.is_empty() {
                println!("No changes needed.");
                return Ok(());
            }
            for (i, change) in comparison.changes.iter().enumerate() {
                println!("{:>3}. {}", i + 1, change);
            }
            println!("\n{} change(s) planned.", comparison.changes.len());
        }
    }

    Ok(())
}
