//! Workbook-level parts: `workbook.xml`, relationships and content types

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashSet;
use std::io::Cursor;

use super::package::{Package, rels_path_for, resolve_target};
use super::sheet::remove_attribute;
use crate::error::{ExportError, Result};

pub const WORKBOOK_PART: &str = "xl/workbook.xml";
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const STYLES_PART: &str = "xl/styles.xml";
pub const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
pub const CALC_CHAIN_PART: &str = "xl/calcChain.xml";

pub const WORKSHEET_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
pub const CALC_CHAIN_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain";
pub const WORKSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";

/// `<sheet>` entry of `workbook.xml`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    pub name: String,
    pub sheet_id: u32,
    pub rel_id: String,
}

/// `<Relationship>` entry of a `.rels` part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

/// `<definedName>` entry of `workbook.xml`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinedName {
    pub name: String,
    /// 0-based sheet position the name is scoped to
    pub local_sheet_id: Option<u32>,
    /// Remaining attributes (`hidden`, `comment`, ...)
    pub extra_attributes: Vec<(String, String)>,
    pub formula: String,
}

/// A worksheet of the package resolved to its part path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorksheetPart {
    pub entry: SheetEntry,
    pub path: String,
}

fn attr_string(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Parse the `<sheet>` entries of `workbook.xml`, in tab order
pub fn parse_sheet_entries(workbook_xml: &str) -> Result<Vec<SheetEntry>> {
    let mut reader = Reader::from_str(workbook_xml);
    let mut sheets = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr_string(&e, b"name")?.unwrap_or_default();
                let sheet_id = attr_string(&e, b"sheetId")?
                    .and_then(|id| id.parse().ok())
                    .unwrap_or(0);
                let rel_id = attr_string(&e, b"r:id")?.unwrap_or_default();
                sheets.push(SheetEntry {
                    name,
                    sheet_id,
                    rel_id,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(sheets)
}

/// Parse the `<definedName>` entries of `workbook.xml`
pub fn parse_defined_names(workbook_xml: &str) -> Result<Vec<DefinedName>> {
    let mut reader = Reader::from_str(workbook_xml);
    let mut names = Vec::new();
    let mut current: Option<DefinedName> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"definedName" => {
                let mut defined = DefinedName {
                    name: String::new(),
                    local_sheet_id: None,
                    extra_attributes: Vec::new(),
                    formula: String::new(),
                };
                for attr in e.attributes() {
                    let attr = attr?;
                    let value = attr.unescape_value()?.into_owned();
                    match attr.key.as_ref() {
                        b"name" => defined.name = value,
                        b"localSheetId" => defined.local_sheet_id = value.parse().ok(),
                        key => defined
                            .extra_attributes
                            .push((String::from_utf8_lossy(key).into_owned(), value)),
                    }
                }
                current = Some(defined);
            }
            Event::Text(e) => {
                if let Some(defined) = current.as_mut() {
                    defined.formula.push_str(&e.unescape()?);
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"definedName" => {
                if let Some(defined) = current.take() {
                    names.push(defined);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(names)
}

/// Parse a relationships part
pub fn parse_relationships(rels_xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(rels_xml);
    let mut rels = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                rels.push(Relationship {
                    id: attr_string(&e, b"Id")?.unwrap_or_default(),
                    rel_type: attr_string(&e, b"Type")?.unwrap_or_default(),
                    target: attr_string(&e, b"Target")?.unwrap_or_default(),
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rels)
}

/// Resolve every worksheet listed in `workbook.xml` to its part path.
/// Sheets whose relationship or part is missing are skipped.
pub fn worksheet_parts(package: &Package) -> Result<Vec<WorksheetPart>> {
    let entries = parse_sheet_entries(package.part_str(WORKBOOK_PART)?)?;
    let rels = parse_relationships(package.part_str(&rels_path_for(WORKBOOK_PART))?)?;

    let parts = entries
        .into_iter()
        .filter_map(|entry| {
            let rel = rels
                .iter()
                .find(|r| r.id == entry.rel_id && r.rel_type == WORKSHEET_REL_TYPE)?;
            let path = resolve_target(WORKBOOK_PART, &rel.target);
            package
                .contains(&path)
                .then_some(WorksheetPart { entry, path })
        })
        .collect();

    Ok(parts)
}

/// Replace the `<sheets>` list of `workbook.xml` and its `<definedNames>`
/// block. The active tab is reset to the first sheet.
pub fn rewrite_workbook(
    workbook_xml: &str,
    sheets: &[SheetEntry],
    defined_names: &[DefinedName],
) -> Result<String> {
    let mut reader = Reader::from_str(workbook_xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut skip_depth = 0usize;
    let mut names_written = false;

    loop {
        let event = reader.read_event()?;
        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(e) if e.local_name().as_ref() == b"sheets" => {
                write_sheets(&mut writer, sheets)?;
                skip_depth = 1;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"sheets" => {
                write_sheets(&mut writer, sheets)?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"definedNames" => {
                if !names_written {
                    write_defined_names(&mut writer, defined_names)?;
                    names_written = true;
                }
                skip_depth = 1;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"definedNames" => {
                if !names_written {
                    write_defined_names(&mut writer, defined_names)?;
                    names_written = true;
                }
            }
            Event::Empty(e) if e.local_name().as_ref() == b"workbookView" => {
                let view = remove_attribute(&remove_attribute(&e, "activeTab")?, "firstSheet")?;
                writer.write_event(Event::Empty(view))?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"workbookView" => {
                let view = remove_attribute(&remove_attribute(&e, "activeTab")?, "firstSheet")?;
                writer.write_event(Event::Start(view))?;
            }
            Event::Eof => break,
            e => writer.write_event(e)?,
        }
    }

    into_string(writer)
}

fn write_sheets(writer: &mut Writer<Cursor<Vec<u8>>>, sheets: &[SheetEntry]) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("sheets")))?;
    for sheet in sheets {
        let mut e = BytesStart::new("sheet");
        e.push_attribute(("name", sheet.name.as_str()));
        e.push_attribute(("sheetId", sheet.sheet_id.to_string().as_str()));
        e.push_attribute(("r:id", sheet.rel_id.as_str()));
        writer.write_event(Event::Empty(e))?;
    }
    writer.write_event(Event::End(BytesEnd::new("sheets")))?;
    Ok(())
}

fn write_defined_names(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    defined_names: &[DefinedName],
) -> Result<()> {
    if defined_names.is_empty() {
        return Ok(());
    }

    writer.write_event(Event::Start(BytesStart::new("definedNames")))?;
    for defined in defined_names {
        let mut e = BytesStart::new("definedName");
        e.push_attribute(("name", defined.name.as_str()));
        if let Some(local) = defined.local_sheet_id {
            e.push_attribute(("localSheetId", local.to_string().as_str()));
        }
        for (key, value) in &defined.extra_attributes {
            e.push_attribute((key.as_str(), value.as_str()));
        }
        writer.write_event(Event::Start(e))?;
        writer.write_event(Event::Text(BytesText::new(&defined.formula)))?;
        writer.write_event(Event::End(BytesEnd::new("definedName")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("definedNames")))?;
    Ok(())
}

/// Drop the relationships whose id is in `remove_ids` and append `add`
pub fn rewrite_relationships(
    rels_xml: &str,
    remove_ids: &HashSet<String>,
    add: &[Relationship],
) -> Result<String> {
    let mut reader = Reader::from_str(rels_xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    loop {
        match reader.read_event()? {
            Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = attr_string(&e, b"Id")?.unwrap_or_default();
                if !remove_ids.contains(&id) {
                    writer.write_event(Event::Empty(e))?;
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"Relationships" => {
                for rel in add {
                    let mut new_rel = BytesStart::new("Relationship");
                    new_rel.push_attribute(("Id", rel.id.as_str()));
                    new_rel.push_attribute(("Type", rel.rel_type.as_str()));
                    new_rel.push_attribute(("Target", rel.target.as_str()));
                    writer.write_event(Event::Empty(new_rel))?;
                }
                writer.write_event(Event::End(e))?;
            }
            Event::Eof => break,
            e => writer.write_event(e)?,
        }
    }

    into_string(writer)
}

/// Drop `<Override>` entries for `remove_parts` and append overrides for `add`
/// (`(part path, content type)`)
pub fn rewrite_content_types(
    content_types_xml: &str,
    remove_parts: &HashSet<String>,
    add: &[(String, &str)],
) -> Result<String> {
    let mut reader = Reader::from_str(content_types_xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    loop {
        match reader.read_event()? {
            Event::Empty(e) if e.local_name().as_ref() == b"Override" => {
                let part_name = attr_string(&e, b"PartName")?.unwrap_or_default();
                if !remove_parts.contains(part_name.trim_start_matches('/')) {
                    writer.write_event(Event::Empty(e))?;
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"Types" => {
                for (part, content_type) in add {
                    let mut over = BytesStart::new("Override");
                    over.push_attribute(("PartName", format!("/{part}").as_str()));
                    over.push_attribute(("ContentType", *content_type));
                    writer.write_event(Event::Empty(over))?;
                }
                writer.write_event(Event::End(e))?;
            }
            Event::Eof => break,
            e => writer.write_event(e)?,
        }
    }

    into_string(writer)
}

fn into_string(writer: Writer<Cursor<Vec<u8>>>) -> Result<String> {
    let result = writer.into_inner().into_inner();
    String::from_utf8(result).map_err(|_| ExportError::Encoding("rewritten part".to_string()))
}
