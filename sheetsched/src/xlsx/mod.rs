//! XLSX package handling with `zip` and `quick-xml`

pub mod package;
pub mod parts;
pub mod sheet;

pub use package::Package;
pub use parts::{DefinedName, Relationship, SheetEntry, WorksheetPart};
pub use sheet::{ColumnWidth, SheetXml};

use crate::error::Result;

/// Parse every worksheet of an XLSX file, in tab order
pub fn read_worksheets(bytes: &[u8]) -> Result<Vec<(String, SheetXml)>> {
    let package = Package::from_bytes(bytes)?;
    parts::worksheet_parts(&package)?
        .into_iter()
        .map(|part| {
            let sheet = SheetXml::parse(package.part_str(&part.path)?)?;
            Ok((part.entry.name, sheet))
        })
        .collect()
}
