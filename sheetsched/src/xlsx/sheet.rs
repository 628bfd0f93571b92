//! Editable worksheet part
//!
//! The worksheet XML is split into three pieces: everything before
//! `<sheetData>` (sheet views, column widths, ...), the rows of
//! `<sheetData>` keyed by row and column number, and everything after it
//! (merged cells, page margins, page setup, ...). Events outside the rows
//! are kept untouched so serialization preserves all template formatting.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use std::io::Cursor;

use crate::error::{ExportError, Result};
use crate::layout::CellPos;

#[derive(Debug, Clone)]
pub struct SheetXml {
    head: Vec<Event<'static>>,
    rows: BTreeMap<u32, RowXml>,
    tail: Vec<Event<'static>>,
}

#[derive(Debug, Clone)]
struct RowXml {
    start: BytesStart<'static>,
    cells: BTreeMap<u32, CellXml>,
}

#[derive(Debug, Clone)]
struct CellXml {
    start: BytesStart<'static>,
    /// Child events (`<v>`, `<f>`, `<is>`); empty for a self-closing cell
    body: Vec<Event<'static>>,
}

/// Column width entry of `<cols>`
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnWidth {
    pub min: u32,
    pub max: u32,
    pub width: f64,
}

enum Section {
    Head,
    Rows,
    Tail,
}

impl SheetXml {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut head = Vec::new();
        let mut rows = BTreeMap::new();
        let mut tail = Vec::new();

        let mut section = Section::Head;
        let mut row: Option<RowXml> = None;
        let mut cell: Option<CellXml> = None;
        let mut last_row = 0u32;
        let mut last_col = 0u32;

        loop {
            let event = reader.read_event()?;
            if matches!(event, Event::Eof) {
                break;
            }

            match section {
                Section::Head => match event {
                    Event::Start(e) if e.local_name().as_ref() == b"sheetData" => {
                        section = Section::Rows;
                    }
                    Event::Empty(e) if e.local_name().as_ref() == b"sheetData" => {
                        section = Section::Tail;
                    }
                    e => head.push(e.into_owned()),
                },
                Section::Rows => {
                    if cell.is_some() {
                        match event {
                            Event::End(e) if e.local_name().as_ref() == b"c" => {
                                if let (Some(done), Some(r)) = (cell.take(), row.as_mut()) {
                                    r.cells.insert(last_col, done);
                                }
                            }
                            e => {
                                if let Some(current) = cell.as_mut() {
                                    current.body.push(e.into_owned());
                                }
                            }
                        }
                        continue;
                    }

                    let self_closing = matches!(event, Event::Empty(_));
                    match event {
                        Event::Start(e) | Event::Empty(e)
                            if e.local_name().as_ref() == b"c" && row.is_some() =>
                        {
                            let pos = attr_value(&e, b"r")?
                                .and_then(|r| CellPos::parse(&r))
                                .unwrap_or(CellPos::new(last_row, last_col + 1));
                            last_col = pos.col;
                            let parsed = CellXml {
                                start: set_attribute(&e, "r", &pos.to_string())?,
                                body: Vec::new(),
                            };
                            if !self_closing {
                                cell = Some(parsed);
                            } else if let Some(r) = row.as_mut() {
                                r.cells.insert(last_col, parsed);
                            }
                        }
                        Event::Start(e) if e.local_name().as_ref() == b"row" => {
                            let (number, start) = row_start(&e, last_row)?;
                            last_row = number;
                            last_col = 0;
                            row = Some(RowXml {
                                start,
                                cells: BTreeMap::new(),
                            });
                        }
                        Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                            let (number, start) = row_start(&e, last_row)?;
                            last_row = number;
                            rows.insert(
                                number,
                                RowXml {
                                    start,
                                    cells: BTreeMap::new(),
                                },
                            );
                        }
                        Event::End(e) if e.local_name().as_ref() == b"row" => {
                            if let Some(done) = row.take() {
                                rows.insert(last_row, done);
                            }
                        }
                        Event::End(e) if e.local_name().as_ref() == b"sheetData" => {
                            section = Section::Tail;
                        }
                        _ => {}
                    }
                }
                Section::Tail => tail.push(event.into_owned()),
            }
        }

        if matches!(section, Section::Head) {
            return Err(ExportError::TemplateMalformed(
                "worksheet has no <sheetData> element".to_string(),
            ));
        }

        Ok(Self { head, rows, tail })
    }

    /// Write a text value, keeping the cell's style
    pub fn set_text(&mut self, pos: CellPos, value: &str) {
        let mut start = BytesStart::new("c");
        start.push_attribute(("r", pos.to_string().as_str()));
        if let Some(style) = self.style_index(pos) {
            start.push_attribute(("s", style.to_string().as_str()));
        }
        start.push_attribute(("t", "inlineStr"));

        let mut text = BytesStart::new("t");
        if value.trim() != value {
            text.push_attribute(("xml:space", "preserve"));
        }
        let body = vec![
            Event::Start(BytesStart::new("is")),
            Event::Start(text),
            Event::Text(BytesText::new(value).into_owned()),
            Event::End(BytesEnd::new("t")),
            Event::End(BytesEnd::new("is")),
        ];

        self.row_mut(pos.row)
            .cells
            .insert(pos.col, CellXml { start, body });
    }

    /// Remove the cell value, keeping the cell's style
    pub fn clear(&mut self, pos: CellPos) {
        let mut start = BytesStart::new("c");
        start.push_attribute(("r", pos.to_string().as_str()));
        if let Some(style) = self.style_index(pos) {
            start.push_attribute(("s", style.to_string().as_str()));
        }

        self.row_mut(pos.row).cells.insert(
            pos.col,
            CellXml {
                start,
                body: Vec::new(),
            },
        );
    }

    fn row_mut(&mut self, row: u32) -> &mut RowXml {
        let entry = self.rows.entry(row).or_insert_with(|| {
            let mut start = BytesStart::new("row");
            start.push_attribute(("r", row.to_string().as_str()));
            RowXml {
                start,
                cells: BTreeMap::new(),
            }
        });
        // Span hints go stale once cells are added
        if let Ok(start) = remove_attribute(&entry.start, "spans") {
            entry.start = start;
        }
        entry
    }

    /// Inline string or raw `<v>` content of a cell
    pub fn cell_text(&self, pos: CellPos) -> Option<String> {
        let cell = self.rows.get(&pos.row)?.cells.get(&pos.col)?;
        let mut text = String::new();
        let mut in_text = false;
        let mut found = false;

        for event in &cell.body {
            match event {
                Event::Start(e) if matches!(e.local_name().as_ref(), b"t" | b"v") => {
                    in_text = true;
                    found = true;
                }
                Event::End(e) if matches!(e.local_name().as_ref(), b"t" | b"v") => {
                    in_text = false;
                }
                Event::Text(e) if in_text => {
                    text.push_str(&e.unescape().ok()?);
                }
                _ => {}
            }
        }

        found.then_some(text)
    }

    /// Style index (`s` attribute) of a cell
    pub fn style_index(&self, pos: CellPos) -> Option<u32> {
        let cell = self.rows.get(&pos.row)?.cells.get(&pos.col)?;
        attr_value(&cell.start, b"s").ok()??.parse().ok()
    }

    /// Positions of every cell element, including styled empty cells
    pub fn cell_positions(&self) -> Vec<CellPos> {
        self.rows
            .iter()
            .flat_map(|(row, r)| r.cells.keys().map(move |col| CellPos::new(*row, *col)))
            .collect()
    }

    /// Custom row heights keyed by row number
    pub fn row_heights(&self) -> BTreeMap<u32, f64> {
        self.rows
            .iter()
            .filter_map(|(row, r)| {
                let height = attr_value(&r.start, b"ht").ok()??.parse().ok()?;
                Some((*row, height))
            })
            .collect()
    }

    /// Column widths declared in `<cols>`; columns without a width are skipped
    pub fn column_widths(&self) -> Vec<ColumnWidth> {
        self.elements_named(b"col")
            .filter_map(|e| {
                Some(ColumnWidth {
                    min: attr_value(e, b"min").ok()??.parse().ok()?,
                    max: attr_value(e, b"max").ok()??.parse().ok()?,
                    width: attr_value(e, b"width").ok()??.parse().ok()?,
                })
            })
            .collect()
    }

    /// Merged regions, e.g. `D1:G1`
    pub fn merged_ranges(&self) -> Vec<String> {
        self.elements_named(b"mergeCell")
            .filter_map(|e| attr_value(e, b"ref").ok()?)
            .collect()
    }

    /// Attributes of `<pageSetup>`, if present
    pub fn page_setup(&self) -> Option<Vec<(String, String)>> {
        let e = self.elements_named(b"pageSetup").next()?;
        e.attributes()
            .map(|attr| {
                let attr = attr.ok()?;
                Some((
                    String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                    attr.unescape_value().ok()?.into_owned(),
                ))
            })
            .collect()
    }

    pub fn is_right_to_left(&self) -> bool {
        self.elements_named(b"sheetView")
            .any(|e| matches!(attr_value(e, b"rightToLeft"), Ok(Some(v)) if v == "1" || v == "true"))
    }

    /// Display the sheet right-to-left, adding a sheet view when the
    /// template has none
    pub fn set_right_to_left(&mut self) -> Result<()> {
        let mut found = false;
        for event in self.head.iter_mut() {
            match event {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheetView" => {
                    *e = set_attribute(e, "rightToLeft", "1")?;
                    found = true;
                }
                _ => {}
            }
        }
        if found {
            return Ok(());
        }

        let insert_at = self
            .head
            .iter()
            .position(|event| match event {
                Event::Start(e) | Event::Empty(e) => {
                    matches!(e.local_name().as_ref(), b"sheetFormatPr" | b"cols")
                }
                _ => false,
            })
            .unwrap_or(self.head.len());

        let mut view = BytesStart::new("sheetView");
        view.push_attribute(("rightToLeft", "1"));
        view.push_attribute(("workbookViewId", "0"));
        let views = [
            Event::Start(BytesStart::new("sheetViews")),
            Event::Empty(view),
            Event::End(BytesEnd::new("sheetViews")),
        ];
        self.head.splice(insert_at..insert_at, views);
        Ok(())
    }

    /// Mark or unmark the sheet as the selected tab
    pub fn set_tab_selected(&mut self, selected: bool) -> Result<()> {
        for event in self.head.iter_mut() {
            match event {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheetView" => {
                    *e = if selected {
                        set_attribute(e, "tabSelected", "1")?
                    } else {
                        remove_attribute(e, "tabSelected")?
                    };
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Bounding range of all cell elements, e.g. `A1:I8`
    pub fn used_range(&self) -> Option<String> {
        let first_row = *self.rows.iter().find(|(_, r)| !r.cells.is_empty())?.0;
        let last_row = *self.rows.iter().rev().find(|(_, r)| !r.cells.is_empty())?.0;
        let first_col = self.rows.values().filter_map(|r| r.cells.keys().next()).min()?;
        let last_col = self.rows.values().filter_map(|r| r.cells.keys().next_back()).max()?;

        let start = CellPos::new(first_row, *first_col);
        let end = CellPos::new(last_row, *last_col);
        if start == end {
            Some(start.to_string())
        } else {
            Some(format!("{start}:{end}"))
        }
    }

    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        let used_range = self.used_range();

        for event in &self.head {
            match (event, &used_range) {
                (Event::Empty(e), Some(range)) if e.local_name().as_ref() == b"dimension" => {
                    writer.write_event(Event::Empty(set_attribute(e, "ref", range)?))?;
                }
                _ => writer.write_event(event.borrow())?,
            }
        }

        writer.write_event(Event::Start(BytesStart::new("sheetData")))?;
        for row in self.rows.values() {
            if row.cells.is_empty() {
                writer.write_event(Event::Empty(row.start.borrow()))?;
                continue;
            }
            writer.write_event(Event::Start(row.start.borrow()))?;
            for cell in row.cells.values() {
                if cell.body.is_empty() {
                    writer.write_event(Event::Empty(cell.start.borrow()))?;
                } else {
                    writer.write_event(Event::Start(cell.start.borrow()))?;
                    for event in &cell.body {
                        writer.write_event(event.borrow())?;
                    }
                    writer.write_event(Event::End(BytesEnd::new("c")))?;
                }
            }
            writer.write_event(Event::End(BytesEnd::new("row")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("sheetData")))?;

        for event in &self.tail {
            writer.write_event(event.borrow())?;
        }

        Ok(writer.into_inner().into_inner())
    }

    fn elements_named<'a>(&'a self, name: &'a [u8]) -> impl Iterator<Item = &'a BytesStart<'static>> + 'a {
        self.head
            .iter()
            .chain(self.tail.iter())
            .filter_map(move |event| match event {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == name => Some(e),
                _ => None,
            })
    }
}

fn row_start(e: &BytesStart<'_>, last_row: u32) -> Result<(u32, BytesStart<'static>)> {
    let number = match attr_value(e, b"r")?.and_then(|r| r.parse().ok()) {
        Some(number) => number,
        None => last_row + 1,
    };
    Ok((number, set_attribute(e, "r", &number.to_string())?))
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Copy of `e` with `key` set to `value`, keeping attribute order
pub(crate) fn set_attribute(e: &BytesStart<'_>, key: &str, value: &str) -> Result<BytesStart<'static>> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut updated = BytesStart::new(name);
    let mut replaced = false;

    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key.as_bytes() {
            updated.push_attribute((key, value));
            replaced = true;
        } else {
            updated.push_attribute(attr);
        }
    }
    if !replaced {
        updated.push_attribute((key, value));
    }

    Ok(updated)
}

/// Copy of `e` without `key`
pub(crate) fn remove_attribute(e: &BytesStart<'_>, key: &str) -> Result<BytesStart<'static>> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut updated = BytesStart::new(name);

    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() != key.as_bytes() {
            updated.push_attribute(attr);
        }
    }

    Ok(updated)
}
