//! Output formatters for finished exports

use anyhow::Result;
use colored::*;
use sheetsched::ExportedFile;
use sheetsched::xlsx::read_worksheets;
use std::path::Path;

/// Sheet names of the exported workbook, empty if it cannot be read back
fn sheet_names(file: &ExportedFile) -> Vec<String> {
    read_worksheets(&file.bytes)
        .map(|sheets| sheets.into_iter().map(|(name, _)| name).collect())
        .unwrap_or_default()
}

/// Print the export summary with colors
pub fn print_human(file: &ExportedFile, path: &Path) {
    println!("{}", format!("✓ Exported {}", file.filename).green().bold());
    println!("  {} {}", "Path:".bold(), path.display());
    println!("  {} {} bytes", "Size:".bold(), file.bytes.len());

    let sheets = sheet_names(file);
    if sheets.len() > 1 {
        println!("  {} {}", "Sheets:".bold(), sheets.len().to_string().cyan());
        for sheet in &sheets {
            println!("    - {}", sheet);
        }
    }
}

/// Print the export summary as JSON
pub fn print_json(file: &ExportedFile, path: &Path) -> Result<()> {
    let output = serde_json::json!({
        "filename": file.filename,
        "path": path.display().to_string(),
        "contentType": ExportedFile::CONTENT_TYPE,
        "size": file.bytes.len(),
        "sheets": sheet_names(file),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
