//! Writing looked-up slot values into a template grid

use crate::layout::GridCell;
use crate::xlsx::SheetXml;

/// What to do with one grid cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellWrite {
    Text(String),
    /// Empty the cell but keep its formatting
    Clear,
}

/// Visit `cells` in order and apply whatever `lookup` returns for each.
/// Cells the lookup skips keep the template content. Returns the number of
/// cells changed.
pub fn fill_grid<'a, F>(sheet: &mut SheetXml, cells: &[GridCell<'a>], mut lookup: F) -> usize
where
    F: FnMut(&GridCell<'a>) -> Option<CellWrite>,
{
    let mut written = 0;
    for cell in cells {
        match lookup(cell) {
            Some(CellWrite::Text(value)) => sheet.set_text(cell.pos, &value),
            Some(CellWrite::Clear) => sheet.clear(cell.pos),
            None => continue,
        }
        written += 1;
    }
    written
}
