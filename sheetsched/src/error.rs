//! Error type shared by the export pipeline

use thiserror::Error;

/// Errors raised while loading templates, editing workbook parts or
/// assembling the output workbook
#[derive(Debug, Error)]
pub enum ExportError {
    /// The template resource could not be retrieved
    #[error("template '{location}' is unavailable: {reason}")]
    TemplateUnavailable { location: String, reason: String },

    /// The template decoded but has no usable first worksheet
    #[error("template is malformed: {0}")]
    TemplateMalformed(String),

    #[error("sheet name '{0}' is already used in this workbook")]
    DuplicateSheetName(String),

    /// Cloned sheets reference style indices, so every clone must come from
    /// a template with the same stylesheet and shared strings
    #[error("cloned sheets must come from templates sharing one stylesheet")]
    StylesheetMismatch,

    #[error("workbook has no sheets to write")]
    EmptyWorkbook,

    #[error("package part '{0}' is missing")]
    MissingPart(String),

    #[error("package part '{0}' is not valid UTF-8")]
    Encoding(String),

    #[error(transparent)]
    Package(#[from] zip::result::ZipError),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = ExportError> = std::result::Result<T, E>;
