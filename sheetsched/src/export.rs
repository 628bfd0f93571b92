//! The five export operations
//!
//! Every export fetches its template, decodes it, fills the grid and
//! serializes the result. Multi-sheet exports decode a fresh template per
//! output sheet from the bytes fetched once, then clone each filled sheet
//! into one workbook. Any failure aborts the export with no output.

use std::collections::HashMap;
use tracing::{debug, error, info};

use crate::clone::WorkbookAssembler;
use crate::config::ExportConfig;
use crate::error::Result;
use crate::fill::{CellWrite, fill_grid};
use crate::layout::{self, CellPos, MASTER_NOTES_COLUMN, TITLE_CELL};
use crate::model::{GradeSections, ScheduleSlot, Teacher, TeacherNotes};
use crate::template::{Template, TemplateSource};

pub const MASTER_FILENAME: &str = "الجدول_الرئيسي.xlsx";
pub const ALL_TEACHERS_FILENAME: &str = "جداول_جميع_المعلمين.xlsx";
pub const ALL_CLASSES_FILENAME: &str = "جداول_جميع_الصفوف.xlsx";

pub fn teacher_filename(teacher: &Teacher) -> String {
    format!("جدول_{}.xlsx", teacher.name)
}

pub fn class_filename(grade: u32, section: u32) -> String {
    format!("جدول_الصف_{grade}_{section}.xlsx")
}

pub fn teacher_title(teacher: &Teacher) -> String {
    format!("جدول المعلم: {}", teacher.name)
}

pub fn class_title(grade: u32, section: u32) -> String {
    format!("جدول الصف: {grade}/{section}")
}

/// A finished workbook, ready to be handed to the user as a download
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    pub const CONTENT_TYPE: &'static str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
}

/// Runs exports against templates from one source
#[derive(Debug, Clone)]
pub struct ScheduleExporter<S> {
    source: S,
    config: ExportConfig,
}

impl<S: TemplateSource> ScheduleExporter<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, ExportConfig::default())
    }

    pub fn with_config(source: S, config: ExportConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// One row per teacher, one column per (day, period)
    pub fn export_master_schedule(
        &self,
        teachers: &[Teacher],
        slots: &[ScheduleSlot],
        notes: &TeacherNotes,
    ) -> Result<ExportedFile> {
        self.master_schedule(teachers, slots, notes)
            .inspect_err(|err| error!(error = %err, "failed to export master schedule"))
    }

    /// Week grid of one teacher
    pub fn export_teacher_schedule(
        &self,
        teacher: &Teacher,
        slots: &[ScheduleSlot],
    ) -> Result<ExportedFile> {
        self.teacher_schedule(teacher, slots)
            .inspect_err(|err| error!(error = %err, teacher = %teacher.id, "failed to export teacher schedule"))
    }

    /// One cloned sheet per teacher
    pub fn export_all_teachers(
        &self,
        teachers: &[Teacher],
        slots: &[ScheduleSlot],
    ) -> Result<ExportedFile> {
        self.all_teachers(teachers, slots)
            .inspect_err(|err| error!(error = %err, "failed to export all teacher schedules"))
    }

    /// Week grid of one class, showing the subject taught in each slot
    pub fn export_class_schedule(
        &self,
        grade: u32,
        section: u32,
        slots: &[ScheduleSlot],
        teachers: &[Teacher],
    ) -> Result<ExportedFile> {
        self.class_schedule(grade, section, slots, teachers)
            .inspect_err(|err| error!(error = %err, grade, section, "failed to export class schedule"))
    }

    /// One cloned sheet per (grade, section). `grade_sections` replaces the
    /// configured sections when given.
    pub fn export_all_classes(
        &self,
        slots: &[ScheduleSlot],
        teachers: &[Teacher],
        grade_sections: Option<&GradeSections>,
    ) -> Result<ExportedFile> {
        self.all_classes(slots, teachers, grade_sections)
            .inspect_err(|err| error!(error = %err, "failed to export all class schedules"))
    }

    fn master_schedule(
        &self,
        teachers: &[Teacher],
        slots: &[ScheduleSlot],
        notes: &TeacherNotes,
    ) -> Result<ExportedFile> {
        let mut template = self.source.fetch(&self.config.templates.master)?.decode()?;
        let calendar = &self.config.calendar;

        for (idx, teacher) in teachers.iter().enumerate() {
            let row = layout::master_row(calendar, idx);
            fill_grid(&mut template.sheet, &row, |cell| {
                slots
                    .iter()
                    .find(|s| s.teacher_id == teacher.id && s.is_at(cell.day, cell.period))
                    .map(|s| CellWrite::Text(s.class_label()))
            });

            if let Some(note) = notes.get(&teacher.id).filter(|n| !n.is_empty()) {
                let pos = CellPos::new(layout::MASTER_ROW_BASE + idx as u32, MASTER_NOTES_COLUMN);
                template.sheet.set_text(pos, note);
            }
        }

        finish_single(MASTER_FILENAME.to_string(), template)
    }

    fn teacher_schedule(&self, teacher: &Teacher, slots: &[ScheduleSlot]) -> Result<ExportedFile> {
        let mut template = self.source.fetch(&self.config.templates.schedule)?.decode()?;
        self.fill_teacher(&mut template, teacher, slots);
        finish_single(teacher_filename(teacher), template)
    }

    fn all_teachers(&self, teachers: &[Teacher], slots: &[ScheduleSlot]) -> Result<ExportedFile> {
        let bytes = self.source.fetch(&self.config.templates.schedule)?;
        let mut assembler = WorkbookAssembler::new();

        for teacher in teachers {
            let mut template = bytes.decode()?;
            let teacher_slots: Vec<ScheduleSlot> = slots
                .iter()
                .filter(|s| s.teacher_id == teacher.id)
                .cloned()
                .collect();
            self.fill_teacher(&mut template, teacher, &teacher_slots);
            assembler.append_clone(&template, &teacher.name)?;
        }

        finish_multi(ALL_TEACHERS_FILENAME.to_string(), assembler)
    }

    fn class_schedule(
        &self,
        grade: u32,
        section: u32,
        slots: &[ScheduleSlot],
        teachers: &[Teacher],
    ) -> Result<ExportedFile> {
        let mut template = self.source.fetch(&self.config.templates.schedule)?.decode()?;
        let subjects = subjects_by_teacher(teachers);
        self.fill_class(&mut template, grade, section, slots, &subjects);
        finish_single(class_filename(grade, section), template)
    }

    fn all_classes(
        &self,
        slots: &[ScheduleSlot],
        teachers: &[Teacher],
        grade_sections: Option<&GradeSections>,
    ) -> Result<ExportedFile> {
        let bytes = self.source.fetch(&self.config.templates.schedule)?;
        let subjects = subjects_by_teacher(teachers);
        let mut assembler = WorkbookAssembler::new();

        for (grade, section) in self.config.classes.classes(grade_sections) {
            let mut template = bytes.decode()?;
            self.fill_class(&mut template, grade, section, slots, &subjects);
            assembler.append_clone(&template, &format!("{grade}-{section}"))?;
        }

        finish_multi(ALL_CLASSES_FILENAME.to_string(), assembler)
    }

    fn fill_teacher(&self, template: &mut Template, teacher: &Teacher, slots: &[ScheduleSlot]) {
        template.sheet.set_text(TITLE_CELL, &teacher_title(teacher));

        let grid = layout::week_grid(&self.config.calendar);
        let written = fill_grid(&mut template.sheet, &grid, |cell| {
            slots
                .iter()
                .find(|s| s.teacher_id == teacher.id && s.is_at(cell.day, cell.period))
                .map(|s| CellWrite::Text(s.class_label()))
        });
        debug!(teacher = %teacher.id, written, "filled teacher grid");
    }

    /// A slot whose teacher is unknown clears its cell
    fn fill_class(
        &self,
        template: &mut Template,
        grade: u32,
        section: u32,
        slots: &[ScheduleSlot],
        subjects: &HashMap<&str, &str>,
    ) {
        template
            .sheet
            .set_text(TITLE_CELL, &class_title(grade, section));

        let grid = layout::week_grid(&self.config.calendar);
        let written = fill_grid(&mut template.sheet, &grid, |cell| {
            let slot = slots
                .iter()
                .find(|s| s.belongs_to_class(grade, section) && s.is_at(cell.day, cell.period))?;
            Some(match subjects.get(slot.teacher_id.as_str()) {
                Some(subject) if !subject.is_empty() => CellWrite::Text(subject.to_string()),
                _ => CellWrite::Clear,
            })
        });
        debug!(grade, section, written, "filled class grid");
    }
}

fn subjects_by_teacher(teachers: &[Teacher]) -> HashMap<&str, &str> {
    teachers
        .iter()
        .map(|t| (t.id.as_str(), t.subject.as_str()))
        .collect()
}

fn finish_single(filename: String, template: Template) -> Result<ExportedFile> {
    let bytes = template.into_bytes()?;
    info!(file = %filename, size = bytes.len(), "exported workbook");
    Ok(ExportedFile { filename, bytes })
}

fn finish_multi(filename: String, assembler: WorkbookAssembler) -> Result<ExportedFile> {
    let sheets = assembler.len();
    let bytes = assembler.finish()?;
    info!(file = %filename, sheets, size = bytes.len(), "exported workbook");
    Ok(ExportedFile { filename, bytes })
}
