//! Template retrieval and decoding

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::error::{ExportError, Result};
use crate::xlsx::parts::{self, WorksheetPart};
use crate::xlsx::{Package, SheetXml};

/// Where template files come from
pub trait TemplateSource {
    /// Fetch the raw bytes of the template at `location`
    fn fetch(&self, location: &str) -> Result<TemplateBytes>;
}

/// Templates stored in a directory
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TemplateSource for DirectorySource {
    fn fetch(&self, location: &str) -> Result<TemplateBytes> {
        let path = self.root.join(location.trim_start_matches('/'));
        debug!(path = %path.display(), "reading template");
        fs::read(&path)
            .map(TemplateBytes)
            .map_err(|err| ExportError::TemplateUnavailable {
                location: location.to_string(),
                reason: err.to_string(),
            })
    }
}

/// Templates held in memory, keyed by location
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    templates: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, location: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.templates.insert(location.into(), bytes);
        self
    }
}

impl TemplateSource for MemorySource {
    fn fetch(&self, location: &str) -> Result<TemplateBytes> {
        self.templates
            .get(location)
            .cloned()
            .map(TemplateBytes)
            .ok_or_else(|| ExportError::TemplateUnavailable {
                location: location.to_string(),
                reason: "no such template".to_string(),
            })
    }
}

/// Templates served over HTTP, relative to a base URL
#[cfg(feature = "remote-templates")]
#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

#[cfg(feature = "remote-templates")]
impl HttpSource {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let base_url = base_url.into();
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| ExportError::TemplateUnavailable {
                location: base_url.clone(),
                reason: err.to_string(),
            })?;
        Ok(Self { base_url, client })
    }
}

#[cfg(feature = "remote-templates")]
impl TemplateSource for HttpSource {
    fn fetch(&self, location: &str) -> Result<TemplateBytes> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            location.trim_start_matches('/')
        );
        debug!(%url, "fetching template");

        let unavailable = |reason: String| ExportError::TemplateUnavailable {
            location: location.to_string(),
            reason,
        };
        let response = self
            .client
            .get(&url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|err| unavailable(err.to_string()))?;
        let bytes = response.bytes().map_err(|err| unavailable(err.to_string()))?;
        Ok(TemplateBytes(bytes.to_vec()))
    }
}

/// Raw template file, decoded on demand. Every decode yields an independent
/// workbook, so one fetch can feed any number of output sheets.
#[derive(Debug, Clone)]
pub struct TemplateBytes(pub Vec<u8>);

impl TemplateBytes {
    pub fn decode(&self) -> Result<Template> {
        Template::decode(&self.0)
    }
}

/// A decoded template: the whole package plus its first worksheet
#[derive(Debug, Clone)]
pub struct Template {
    pub(crate) package: Package,
    pub(crate) part: WorksheetPart,
    pub sheet: SheetXml,
}

impl Template {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let package = Package::from_bytes(bytes)?;
        let part = parts::worksheet_parts(&package)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ExportError::TemplateMalformed("template has no first worksheet".to_string())
            })?;
        let sheet = SheetXml::parse(package.part_str(&part.path)?)?;

        Ok(Self {
            package,
            part,
            sheet,
        })
    }

    /// Name of the template worksheet
    pub fn sheet_name(&self) -> &str {
        &self.part.entry.name
    }

    /// Serialize the template, with its edited first worksheet, as an XLSX file
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        let xml = self.sheet.to_xml()?;
        self.package.put(self.part.path.as_str(), xml);
        self.package.to_bytes()
    }
}
