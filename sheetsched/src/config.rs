//! Configuration for template locations, calendar and class listing

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::model::{Calendar, DEFAULT_GRADES, DEFAULT_SECTIONS, GradeSections};

/// Main export configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub templates: TemplatePaths,
    #[serde(default)]
    pub calendar: Calendar,
    #[serde(default)]
    pub classes: ClassConfig,
}

impl ExportConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ExportConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Reject calendars and grade ranges the templates cannot represent
    pub fn validate(&self) -> Result<()> {
        if self.calendar.days.is_empty() {
            anyhow::bail!("Configuration error: calendar.days must not be empty");
        }
        if self.calendar.periods.is_empty() {
            anyhow::bail!("Configuration error: calendar.periods must not be empty");
        }

        let mut seen = HashSet::new();
        for day in &self.calendar.days {
            if !seen.insert(day.as_str()) {
                anyhow::bail!("Configuration error: day '{}' is listed twice", day);
            }
        }

        let mut seen = HashSet::new();
        for period in &self.calendar.periods {
            if !seen.insert(*period) {
                anyhow::bail!("Configuration error: period {} is listed twice", period);
            }
        }

        if self.classes.first_grade > self.classes.last_grade {
            anyhow::bail!(
                "Configuration error: first_grade {} is after last_grade {}",
                self.classes.first_grade,
                self.classes.last_grade
            );
        }

        Ok(())
    }
}

/// Template resource locations, relative to the template source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatePaths {
    /// Template for the master schedule (one row per teacher)
    #[serde(default = "default_master_template")]
    pub master: String,
    /// Template shared by per-teacher and per-class schedules
    #[serde(default = "default_schedule_template")]
    pub schedule: String,
}

impl Default for TemplatePaths {
    fn default() -> Self {
        Self {
            master: default_master_template(),
            schedule: default_schedule_template(),
        }
    }
}

fn default_master_template() -> String {
    "جدول_رئيسي_template.xlsx".to_string()
}

fn default_schedule_template() -> String {
    "جداول_template_new.xlsx".to_string()
}

/// Grades and sections enumerated by the all-classes export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassConfig {
    #[serde(default = "default_first_grade")]
    pub first_grade: u32,
    #[serde(default = "default_last_grade")]
    pub last_grade: u32,
    #[serde(default = "default_sections")]
    pub default_sections: Vec<u32>,
    /// Per-grade overrides, used when the caller passes none
    #[serde(default)]
    pub sections: GradeSections,
}

impl ClassConfig {
    /// (grade, section) pairs in export order
    pub fn classes(&self, overrides: Option<&GradeSections>) -> Vec<(u32, u32)> {
        let sections = overrides.unwrap_or(&self.sections);
        (self.first_grade..=self.last_grade)
            .flat_map(|grade| {
                sections
                    .sections_for(grade, &self.default_sections)
                    .into_iter()
                    .map(move |section| (grade, section))
            })
            .collect()
    }
}

impl Default for ClassConfig {
    fn default() -> Self {
        Self {
            first_grade: default_first_grade(),
            last_grade: default_last_grade(),
            default_sections: default_sections(),
            sections: GradeSections::default(),
        }
    }
}

fn default_first_grade() -> u32 {
    *DEFAULT_GRADES.start()
}

fn default_last_grade() -> u32 {
    *DEFAULT_GRADES.end()
}

fn default_sections() -> Vec<u32> {
    DEFAULT_SECTIONS.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExportConfig::default();
        assert_eq!(config.templates.master, "جدول_رئيسي_template.xlsx");
        assert_eq!(config.templates.schedule, "جداول_template_new.xlsx");
        assert!(config.validate().is_ok());

        let classes = config.classes.classes(None);
        assert_eq!(classes.len(), 21);
        assert_eq!(classes.first(), Some(&(10, 1)));
        assert_eq!(classes.last(), Some(&(12, 7)));
    }

    #[test]
    fn test_partial_toml() {
        let config = ExportConfig::from_toml(
            r#"
[templates]
master = "master.xlsx"

[calendar]
days = ["Sun", "Mon", "Tue"]
periods = [1, 2, 3, 4]

[classes.sections]
"11" = [1, 2]
"#,
        )
        .unwrap();

        assert_eq!(config.templates.master, "master.xlsx");
        assert_eq!(config.templates.schedule, "جداول_template_new.xlsx");
        assert_eq!(config.calendar.days, vec!["Sun", "Mon", "Tue"]);

        let classes = config.classes.classes(None);
        assert_eq!(classes.iter().filter(|(g, _)| *g == 11).count(), 2);
        assert_eq!(classes.len(), 7 + 2 + 7);
    }

    #[test]
    fn test_overrides_replace_configured_sections() {
        let config = ExportConfig::default();
        let mut overrides = GradeSections::default();
        overrides.0.insert("12".to_string(), vec![3]);

        let classes = config.classes.classes(Some(&overrides));
        assert_eq!(classes.iter().filter(|(g, _)| *g == 12).count(), 1);
        assert!(classes.contains(&(12, 3)));
    }

    #[test]
    fn test_validation() {
        let mut config = ExportConfig::default();
        config.calendar.days.clear();
        assert!(config.validate().is_err());

        let mut config = ExportConfig::default();
        config.calendar.periods = vec![1, 2, 2];
        assert!(config.validate().is_err());

        let mut config = ExportConfig::default();
        config.calendar.days.push("الأحد".to_string());
        assert!(config.validate().is_err());

        let mut config = ExportConfig::default();
        config.classes.first_grade = 13;
        assert!(config.validate().is_err());
    }
}
