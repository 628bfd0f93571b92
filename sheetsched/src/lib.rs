//! sheetsched: School timetable export into spreadsheet templates
//!
//! Fills pre-authored `.xlsx` templates with schedule data and produces
//! workbooks for the master schedule, single teachers and classes, and
//! multi-sheet bundles of all teachers or all classes.

pub mod clone;
pub mod config;
pub mod deliver;
pub mod error;
pub mod export;
pub mod fill;
pub mod layout;
pub mod model;
pub mod template;
pub mod xlsx;

pub use clone::WorkbookAssembler;
pub use config::ExportConfig;
pub use deliver::{Delivery, DirectoryDelivery};
pub use error::{ExportError, Result};
pub use export::{ExportedFile, ScheduleExporter};
pub use model::{Calendar, GradeSections, ScheduleData, ScheduleSlot, Teacher, TeacherNotes};
#[cfg(feature = "remote-templates")]
pub use template::HttpSource;
pub use template::{DirectorySource, MemorySource, Template, TemplateBytes, TemplateSource};
