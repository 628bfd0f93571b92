mod common;

use calamine::Reader;
use common::*;
use pretty_assertions::assert_eq;
use sheetsched::layout::CellPos;
use sheetsched::xlsx::parts::{self, WORKBOOK_PART};
use sheetsched::xlsx::{Package, read_worksheets};
use sheetsched::{ExportError, Template, WorkbookAssembler};

fn template() -> Template {
    Template::decode(&schedule_template()).unwrap()
}

fn assemble(names: &[&str]) -> Vec<u8> {
    let mut assembler = WorkbookAssembler::new();
    for name in names {
        assembler.append_clone(&template(), name).unwrap();
    }
    assembler.finish().unwrap()
}

#[test]
fn test_clone_keeps_sheet_formatting() {
    let original = template().sheet;
    let bytes = assemble(&["Ali", "Sara"]);

    let sheets = read_worksheets(&bytes).unwrap();
    assert_eq!(sheets.len(), 2);
    for (name, sheet) in &sheets {
        assert_eq!(sheet.merged_ranges(), vec!["D1:G1".to_string()], "{name}");
        assert_eq!(sheet.column_widths(), original.column_widths(), "{name}");
        assert_eq!(sheet.row_heights(), original.row_heights(), "{name}");
        assert_eq!(sheet.page_setup(), original.page_setup(), "{name}");
        assert_eq!(sheet.cell_positions(), original.cell_positions(), "{name}");
        for pos in original.cell_positions() {
            assert_eq!(sheet.style_index(pos), original.style_index(pos), "{name} {pos}");
        }
        assert!(sheet.is_right_to_left(), "{name}");
    }
}

#[test]
fn test_clone_keeps_edited_values() {
    let mut assembler = WorkbookAssembler::new();
    for (name, label) in [("Ali", "10/2"), ("Sara", "11/4")] {
        let mut template = template();
        template.sheet.set_text(CellPos::new(4, 3), label);
        assembler.append_clone(&template, name).unwrap();
    }
    let bytes = assembler.finish().unwrap();

    assert_eq!(read_cell(&bytes, "Ali", 4, 3), text("10/2"));
    assert_eq!(read_cell(&bytes, "Sara", 4, 3), text("11/4"));
    assert_eq!(read_cell(&bytes, "Sara", 5, 4), text(DEFAULT_CELL));
    assert_eq!(read_cell(&bytes, "Sara", 3, 3), text("الحصة"));
}

#[test]
fn test_only_first_clone_is_selected() {
    let bytes = assemble(&["Ali", "Sara", "Omar"]);
    let package = Package::from_bytes(&bytes).unwrap();

    let selected: Vec<bool> = parts::worksheet_parts(&package)
        .unwrap()
        .iter()
        .map(|part| package.part_str(&part.path).unwrap().contains("tabSelected"))
        .collect();
    assert_eq!(selected, vec![true, false, false]);

    let workbook = package.part_str(WORKBOOK_PART).unwrap();
    assert!(!workbook.contains("activeTab"));
}

#[test]
fn test_print_area_replicated_per_clone() {
    let bytes = assemble(&["Ali", "O'Neil"]);
    let package = Package::from_bytes(&bytes).unwrap();

    let names = parts::parse_defined_names(package.part_str(WORKBOOK_PART).unwrap()).unwrap();
    let scoped: Vec<(Option<u32>, String)> = names
        .into_iter()
        .map(|name| (name.local_sheet_id, name.formula))
        .collect();
    assert_eq!(
        scoped,
        vec![
            (Some(0), "'Ali'!$A$1:$I$8".to_string()),
            (Some(1), "'O''Neil'!$A$1:$I$8".to_string()),
        ]
    );
}

#[test]
fn test_template_sheet_is_replaced() {
    let bytes = assemble(&["Ali"]);
    let mut workbook = open(&bytes);

    assert_eq!(workbook.sheet_names(), vec!["Ali"]);
    assert!(workbook.worksheet_range(TEMPLATE_SHEET).is_err());

    let package = Package::from_bytes(&bytes).unwrap();
    let content_types = package.part_str("[Content_Types].xml").unwrap();
    assert_eq!(content_types.matches("worksheet+xml").count(), 1);
}

#[test]
fn test_sheet_names_are_sanitized() {
    let mut assembler = WorkbookAssembler::new();
    let used = assembler.append_clone(&template(), "A/B: [x]?").unwrap();
    let fallback = assembler.append_clone(&template(), "  ").unwrap();

    assert_eq!(used, "A_B_ _x__");
    assert_eq!(fallback, "Sheet2");
    assert_eq!(assembler.sheet_names().collect::<Vec<_>>(), vec!["A_B_ _x__", "Sheet2"]);
}

#[test]
fn test_duplicate_sheet_name() {
    let mut assembler = WorkbookAssembler::new();
    assembler.append_clone(&template(), "10-1").unwrap();

    assert!(matches!(
        assembler.append_clone(&template(), "10-1"),
        Err(ExportError::DuplicateSheetName(_))
    ));
    assert_eq!(assembler.len(), 1);
}

#[test]
fn test_stylesheet_mismatch() {
    let other = Template::decode(&build_xlsx(
        Some(&schedule_sheet_xml()),
        &STYLES.replace("Calibri", "Arial"),
    ))
    .unwrap();
    let mut assembler = WorkbookAssembler::new();
    assembler.append_clone(&template(), "Ali").unwrap();

    assert!(matches!(
        assembler.append_clone(&other, "Sara"),
        Err(ExportError::StylesheetMismatch)
    ));
}
