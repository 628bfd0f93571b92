//! Cell positions agreed with the template files
//!
//! The templates reserve fixed cells for titles and a data grid. These
//! offsets are a contract with the template layout and are never derived
//! from the template content.

use std::fmt;

use crate::model::Calendar;

/// First teacher row of the master schedule
pub const MASTER_ROW_BASE: u32 = 5;
/// Column of the (last day, last period) slot in the master schedule
pub const MASTER_COLUMN_BASE: u32 = 3;
/// Master schedule column holding the teacher note
pub const MASTER_NOTES_COLUMN: u32 = 1;

/// Row of the first day in per-teacher and per-class schedules
pub const WEEK_ROW_BASE: u32 = 4;
/// Column of the first period in per-teacher and per-class schedules
pub const WEEK_COLUMN_BASE: u32 = 3;

/// Title cell of per-teacher and per-class schedules
pub const TITLE_CELL: CellPos = CellPos { row: 1, col: 4 };

/// Worksheet names longer than this are truncated
pub const MAX_SHEET_NAME_CHARS: usize = 30;

/// 1-based worksheet coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellPos {
    pub row: u32,
    pub col: u32,
}

impl CellPos {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse an A1 reference such as `C4`
    pub fn parse(cell_ref: &str) -> Option<Self> {
        let mut col = 0u32;
        let mut row_str = String::new();

        for ch in cell_ref.chars() {
            if ch == '$' {
                continue;
            }
            if ch.is_ascii_alphabetic() {
                if !row_str.is_empty() {
                    return None;
                }
                col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            } else if ch.is_ascii_digit() {
                row_str.push(ch);
            } else {
                return None;
            }
        }

        let row = row_str.parse::<u32>().ok()?;
        if row == 0 || col == 0 {
            return None;
        }
        Some(Self { row, col })
    }
}

impl fmt::Display for CellPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

/// Convert a 1-based column index to letters (`1` -> `A`, `27` -> `AA`)
pub fn column_letters(col: u32) -> String {
    let mut letters = Vec::new();
    let mut n = col;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A grid cell together with the (day, period) it represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell<'a> {
    pub pos: CellPos,
    pub day: &'a str,
    pub period: u32,
}

/// Days as rows, periods as columns
pub fn week_grid(calendar: &Calendar) -> Vec<GridCell<'_>> {
    calendar
        .days
        .iter()
        .enumerate()
        .flat_map(|(day_idx, day)| {
            calendar
                .periods
                .iter()
                .enumerate()
                .map(move |(period_idx, period)| GridCell {
                    pos: CellPos::new(
                        WEEK_ROW_BASE + day_idx as u32,
                        WEEK_COLUMN_BASE + period_idx as u32,
                    ),
                    day: day.as_str(),
                    period: *period,
                })
        })
        .collect()
}

/// One master schedule row: days and periods both run in reverse, so the
/// last period of the last day lands in the first data column (right-to-left
/// sheet layout)
pub fn master_row(calendar: &Calendar, teacher_idx: usize) -> Vec<GridCell<'_>> {
    let row = MASTER_ROW_BASE + teacher_idx as u32;
    calendar
        .days
        .iter()
        .rev()
        .flat_map(|day| {
            calendar
                .periods
                .iter()
                .rev()
                .map(move |period| (day.as_str(), *period))
        })
        .enumerate()
        .map(|(offset, (day, period))| GridCell {
            pos: CellPos::new(row, MASTER_COLUMN_BASE + offset as u32),
            day,
            period,
        })
        .collect()
}

/// Characters Excel rejects in worksheet names
const FORBIDDEN_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Worksheet name derived from a display name: forbidden characters become
/// `_` and the result keeps at most [`MAX_SHEET_NAME_CHARS`] characters
pub fn sheet_name(display: &str) -> String {
    display
        .chars()
        .map(|ch| {
            if FORBIDDEN_SHEET_CHARS.contains(&ch) {
                '_'
            } else {
                ch
            }
        })
        .take(MAX_SHEET_NAME_CHARS)
        .collect()
}
