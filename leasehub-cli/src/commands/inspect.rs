//! `leasehub inspect-sheet` - preview what an xlsx upload will parse to
//!
//! Runs the same reader the bulk-import endpoints use, without touching
//! the database.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;

use leasehub_core::{read_first_sheet, Sheet};

#[derive(Parser, Debug)]
pub struct InspectSheetArgs {
    /// Spreadsheet to read (.xlsx)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print rows as a JSON array instead of a summary
    #[arg(long)]
    pub json: bool,
}

fn summary(sheet: &Sheet) -> String {
    let mut out = format!(
        "sheet: {}\nrows: {}\ncolumns ({}):\n",
        sheet.name,
        sheet.rows.len(),
        sheet.headers.len()
    );
    for header in &sheet.headers {
        out.push_str("  - ");
        out.push_str(header);
        out.push('\n');
    }
    out
}

fn rows_json(sheet: &Sheet) -> Value {
    Value::Array(sheet.rows.iter().map(|row| row.to_json()).collect())
}

pub fn run_inspect_sheet(args: InspectSheetArgs) -> Result<()> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let sheet = read_first_sheet(&bytes)
        .with_context(|| format!("Failed to parse {}", args.file.display()))?;
    tracing::debug!(rows = sheet.rows.len(), "sheet parsed");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows_json(&sheet))?);
    } else {
        print!("{}", summary(&sheet));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use leasehub_core::SheetRow;

    fn sample() -> Sheet {
        Sheet {
            name: "Offices".into(),
            headers: vec!["propertyId".into(), "buildingName".into()],
            rows: vec![SheetRow::new(
                2,
                [
                    ("propertyId".to_owned(), "OF-101".to_owned()),
                    ("buildingName".to_owned(), "Skyline".to_owned()),
                ],
            )],
        }
    }

    #[test]
    fn summary_lists_columns() {
        let text = summary(&sample());
        assert!(text.starts_with("sheet: Offices\nrows: 1\ncolumns (2):\n"));
        assert!(text.contains("  - buildingName\n"));
    }

    #[test]
    fn json_has_one_entry_per_row() {
        let rows = rows_json(&sample());
        assert_eq!(rows.as_array().map(Vec::len), Some(1));
    }
}
