//! Copying filled template sheets into one multi-sheet workbook
//!
//! Cloned worksheet parts keep their cell style indices, so every clone is
//! written against the stylesheet of the template it came from. Column
//! widths, row heights, merged regions, margins and page setup live in the
//! worksheet part itself and travel with it.

use std::collections::HashSet;
use tracing::debug;

use crate::error::{ExportError, Result};
use crate::layout::sheet_name;
use crate::template::Template;
use crate::xlsx::Package;
use crate::xlsx::package::{rels_path_for, resolve_target};
use crate::xlsx::parts::{
    self, CALC_CHAIN_PART, CALC_CHAIN_REL_TYPE, CONTENT_TYPES_PART, DefinedName, Relationship,
    SHARED_STRINGS_PART, STYLES_PART, SheetEntry, WORKBOOK_PART, WORKSHEET_CONTENT_TYPE,
    WORKSHEET_REL_TYPE,
};

/// Accumulates cloned sheets and writes them as one workbook
#[derive(Debug, Default)]
pub struct WorkbookAssembler {
    base: Option<BaseWorkbook>,
    sheets: Vec<ClonedSheet>,
}

/// Package of the first template appended; provides the stylesheet,
/// shared strings, theme and document properties of the output
#[derive(Debug)]
struct BaseWorkbook {
    package: Package,
    template_sheet: String,
    /// Names scoped to the template sheet (print area, print titles)
    sheet_names: Vec<DefinedName>,
}

#[derive(Debug)]
struct ClonedSheet {
    name: String,
    xml: Vec<u8>,
    rels: Option<Vec<u8>>,
}

impl WorkbookAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|s| s.name.as_str())
    }

    /// Append a copy of the template's first worksheet under `display_name`
    /// and return the worksheet name actually used
    pub fn append_clone(&mut self, template: &Template, display_name: &str) -> Result<String> {
        let mut name = sheet_name(display_name);
        if name.trim().is_empty() {
            name = format!("Sheet{}", self.sheets.len() + 1);
        }
        let lowered = name.to_lowercase();
        if self.sheets.iter().any(|s| s.name.to_lowercase() == lowered) {
            return Err(ExportError::DuplicateSheetName(name));
        }

        match &self.base {
            None => self.base = Some(BaseWorkbook::from_template(template)?),
            Some(base) => {
                let same_styles = base.package.part(STYLES_PART) == template.package.part(STYLES_PART);
                let same_strings = base.package.part(SHARED_STRINGS_PART)
                    == template.package.part(SHARED_STRINGS_PART);
                if !same_styles || !same_strings {
                    return Err(ExportError::StylesheetMismatch);
                }
            }
        }

        let mut sheet = template.sheet.clone();
        sheet.set_right_to_left()?;
        sheet.set_tab_selected(self.sheets.is_empty())?;

        let rels = template
            .package
            .part(&rels_path_for(&template.part.path))
            .map(<[u8]>::to_vec);

        debug!(sheet = %name, "cloned template sheet");
        self.sheets.push(ClonedSheet {
            name: name.clone(),
            xml: sheet.to_xml()?,
            rels,
        });

        Ok(name)
    }

    /// Write the accumulated sheets as an XLSX file
    pub fn finish(self) -> Result<Vec<u8>> {
        let base = match self.base {
            Some(base) if !self.sheets.is_empty() => base,
            _ => return Err(ExportError::EmptyWorkbook),
        };
        let mut package = base.package;
        let workbook_rels_path = rels_path_for(WORKBOOK_PART);

        // Drop the template's own worksheets and calc chain
        let mut removed_ids = HashSet::new();
        let mut removed_parts = HashSet::new();
        for rel in parts::parse_relationships(package.part_str(&workbook_rels_path)?)? {
            if rel.rel_type == WORKSHEET_REL_TYPE || rel.rel_type == CALC_CHAIN_REL_TYPE {
                let path = resolve_target(WORKBOOK_PART, &rel.target);
                package.remove(&path);
                package.remove(&rels_path_for(&path));
                removed_parts.insert(path);
                removed_ids.insert(rel.id);
            }
        }
        package.remove(CALC_CHAIN_PART);
        removed_parts.insert(CALC_CHAIN_PART.to_string());

        let mut entries = Vec::with_capacity(self.sheets.len());
        let mut new_rels = Vec::with_capacity(self.sheets.len());
        let mut overrides = Vec::with_capacity(self.sheets.len());
        let mut defined_names = Vec::new();

        for (idx, sheet) in self.sheets.into_iter().enumerate() {
            let number = idx as u32 + 1;
            let target = format!("worksheets/sheet{number}.xml");
            let path = format!("xl/{target}");
            let rel_id = format!("rIdSheet{number}");

            for template_name in &base.sheet_names {
                defined_names.push(DefinedName {
                    local_sheet_id: Some(idx as u32),
                    formula: retarget_formula(
                        &template_name.formula,
                        &base.template_sheet,
                        &sheet.name,
                    ),
                    ..template_name.clone()
                });
            }

            entries.push(SheetEntry {
                name: sheet.name,
                sheet_id: number,
                rel_id: rel_id.clone(),
            });
            new_rels.push(Relationship {
                id: rel_id,
                rel_type: WORKSHEET_REL_TYPE.to_string(),
                target,
            });

            if let Some(rels) = sheet.rels {
                package.put(rels_path_for(&path), rels);
            }
            package.put(path.as_str(), sheet.xml);
            overrides.push((path, WORKSHEET_CONTENT_TYPE));
        }

        let workbook_xml = parts::rewrite_workbook(
            package.part_str(WORKBOOK_PART)?,
            &entries,
            &defined_names,
        )?;
        package.put(WORKBOOK_PART, workbook_xml.into_bytes());

        let rels_xml = parts::rewrite_relationships(
            package.part_str(&workbook_rels_path)?,
            &removed_ids,
            &new_rels,
        )?;
        package.put(workbook_rels_path, rels_xml.into_bytes());

        let content_types = parts::rewrite_content_types(
            package.part_str(CONTENT_TYPES_PART)?,
            &removed_parts,
            &overrides,
        )?;
        package.put(CONTENT_TYPES_PART, content_types.into_bytes());

        package.to_bytes()
    }
}

impl BaseWorkbook {
    fn from_template(template: &Template) -> Result<Self> {
        let workbook_xml = template.package.part_str(WORKBOOK_PART)?;
        let position = parts::parse_sheet_entries(workbook_xml)?
            .iter()
            .position(|entry| *entry == template.part.entry)
            .unwrap_or(0) as u32;
        let sheet_names = parts::parse_defined_names(workbook_xml)?
            .into_iter()
            .filter(|name| name.local_sheet_id == Some(position))
            .collect();

        Ok(Self {
            package: template.package.clone(),
            template_sheet: template.sheet_name().to_string(),
            sheet_names,
        })
    }
}

/// Quote a worksheet name for use in a formula reference
fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Point references to sheet `from` at sheet `to`
fn retarget_formula(formula: &str, from: &str, to: &str) -> String {
    let replacement = format!("{}!", quote_sheet_name(to));
    let quoted = format!("{}!", quote_sheet_name(from));
    if formula.contains(&quoted) {
        formula.replace(&quoted, &replacement)
    } else {
        formula.replace(&format!("{from}!"), &replacement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retarget_formula() {
        assert_eq!(
            retarget_formula("Template!$A$1:$I$8", "Template", "Ali"),
            "'Ali'!$A$1:$I$8"
        );
        assert_eq!(
            retarget_formula("'My Sheet'!$1:$3", "My Sheet", "O'Neil"),
            "'O''Neil'!$1:$3"
        );
        assert_eq!(
            retarget_formula("Template!$A$1,Template!$C$1", "Template", "10-1"),
            "'10-1'!$A$1,'10-1'!$C$1"
        );
    }

    #[test]
    fn test_finish_without_sheets() {
        assert!(matches!(
            WorkbookAssembler::new().finish(),
            Err(ExportError::EmptyWorkbook)
        ));
    }
}
