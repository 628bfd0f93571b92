#![allow(dead_code)]

use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use sheetsched::config::TemplatePaths;
use sheetsched::{Calendar, MemorySource, ScheduleSlot, Teacher};
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const TEMPLATE_SHEET: &str = "Template";
pub const DEFAULT_CELL: &str = "فراغ";

pub const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="14"/><name val="Calibri"/></font></fonts><fills count="1"><fill><patternFill patternType="none"/></fill></fills><borders count="2"><border><left/><right/><top/><bottom/><diagonal/></border><border><left style="thin"/><right style="thin"/><top style="thin"/><bottom style="thin"/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/><xf numFmtId="0" fontId="0" fillId="0" borderId="1" xfId="0" applyBorder="1"/></cellXfs></styleSheet>"#;

const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="1" uniqueCount="1"><si><t>الحصة</t></si></sst>"#;

const SHEET_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><dimension ref="A1:I8"/><sheetViews><sheetView tabSelected="1" workbookViewId="0"/></sheetViews><sheetFormatPr defaultRowHeight="15"/><cols><col min="1" max="2" width="12.5" customWidth="1"/><col min="3" max="9" width="9.75" customWidth="1"/></cols>"#;

const SHEET_TAIL: &str = r#"<mergeCells count="1"><mergeCell ref="D1:G1"/></mergeCells><pageMargins left="0.25" right="0.25" top="0.75" bottom="0.75" header="0.3" footer="0.3"/><pageSetup paperSize="9" orientation="landscape"/></worksheet>"#;

/// Week grid template: title at D1, header at C3, styled empty grid at
/// C4:I8 with a default value at D5
pub fn schedule_sheet_xml() -> String {
    let mut xml = String::from(SHEET_HEAD);
    xml.push_str("<sheetData>");
    xml.push_str(r#"<row r="1" spans="1:9" ht="30" customHeight="1"><c r="D1" s="1" t="inlineStr"><is><t>العنوان</t></is></c></row>"#);
    xml.push_str(r#"<row r="3"><c r="C3" s="2" t="s"><v>0</v></c></row>"#);
    for row in 4..=8 {
        xml.push_str(&format!(r#"<row r="{row}" spans="3:9" ht="24" customHeight="1">"#));
        for col in ['C', 'D', 'E', 'F', 'G', 'H', 'I'] {
            if row == 5 && col == 'D' {
                xml.push_str(&format!(
                    r#"<c r="{col}{row}" s="2" t="inlineStr"><is><t>{DEFAULT_CELL}</t></is></c>"#
                ));
            } else {
                xml.push_str(&format!(r#"<c r="{col}{row}" s="2"/>"#));
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");
    xml.push_str(SHEET_TAIL);
    xml
}

/// Master template: a few styled cells in the first teacher row
pub fn master_sheet_xml() -> String {
    let mut xml = String::from(SHEET_HEAD);
    xml.push_str(r#"<sheetData><row r="4"><c r="A4" s="1" t="inlineStr"><is><t>ملاحظات</t></is></c></row><row r="5"><c r="A5" s="2"/><c r="C5" s="2"/><c r="D5" s="2"/></row></sheetData>"#);
    xml.push_str(SHEET_TAIL);
    xml
}

/// Build an XLSX file in memory with one worksheet (or none)
pub fn build_xlsx(sheet_xml: Option<&str>, styles: &str) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    let sheet_override = if sheet_xml.is_some() {
        r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
    } else {
        ""
    };
    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>{sheet_override}<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/></Types>"#
    ).as_bytes()).unwrap();

    zip.start_file("_rels/.rels", options).unwrap();
    zip.write_all(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.as_bytes()).unwrap();

    let (sheets, names) = if sheet_xml.is_some() {
        (
            format!(r#"<sheets><sheet name="{TEMPLATE_SHEET}" sheetId="1" r:id="rId1"/></sheets>"#),
            format!(r#"<definedNames><definedName name="_xlnm.Print_Area" localSheetId="0">{TEMPLATE_SHEET}!$A$1:$I$8</definedName></definedNames>"#),
        )
    } else {
        ("<sheets/>".to_string(), String::new())
    };
    zip.start_file("xl/workbook.xml", options).unwrap();
    zip.write_all(format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><bookViews><workbookView activeTab="0"/></bookViews>{sheets}{names}</workbook>"#
    ).as_bytes()).unwrap();

    let sheet_rel = if sheet_xml.is_some() {
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#
    } else {
        ""
    };
    zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
    zip.write_all(format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{sheet_rel}<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#
    ).as_bytes()).unwrap();

    zip.start_file("xl/styles.xml", options).unwrap();
    zip.write_all(styles.as_bytes()).unwrap();

    zip.start_file("xl/sharedStrings.xml", options).unwrap();
    zip.write_all(SHARED_STRINGS.as_bytes()).unwrap();

    if let Some(sheet) = sheet_xml {
        zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
        zip.write_all(sheet.as_bytes()).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

pub fn schedule_template() -> Vec<u8> {
    build_xlsx(Some(&schedule_sheet_xml()), STYLES)
}

pub fn master_template() -> Vec<u8> {
    build_xlsx(Some(&master_sheet_xml()), STYLES)
}

/// Source serving both templates at their default locations
pub fn source() -> MemorySource {
    let paths = TemplatePaths::default();
    MemorySource::new()
        .with_template(paths.master, master_template())
        .with_template(paths.schedule, schedule_template())
}

pub fn day(idx: usize) -> String {
    Calendar::default().days[idx].clone()
}

pub fn teacher(id: &str, name: &str, subject: &str) -> Teacher {
    Teacher {
        id: id.to_string(),
        name: name.to_string(),
        subject: subject.to_string(),
    }
}

pub fn slot(teacher_id: &str, day_idx: usize, period: u32, grade: u32, section: u32) -> ScheduleSlot {
    ScheduleSlot {
        teacher_id: teacher_id.to_string(),
        day: day(day_idx),
        period,
        grade,
        section,
    }
}

pub fn open(bytes: &[u8]) -> Xlsx<Cursor<Vec<u8>>> {
    open_workbook_from_rs(Cursor::new(bytes.to_vec())).unwrap()
}

/// Read a cell back with calamine; `row` and `col` are 1-based
pub fn read_cell(bytes: &[u8], sheet: &str, row: u32, col: u32) -> Option<Data> {
    let range = open(bytes).worksheet_range(sheet).unwrap();
    range.get_value((row - 1, col - 1)).cloned()
}

pub fn text(value: &str) -> Option<Data> {
    Some(Data::String(value.to_string()))
}

/// True for a cell that holds no value
pub fn is_blank(cell: &Option<Data>) -> bool {
    matches!(cell, None | Some(Data::Empty))
}
