//! Schedule data consumed by the exporters

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Teacher notes keyed by teacher id
pub type TeacherNotes = HashMap<String, String>;

/// Grades exported when no class configuration is given
pub const DEFAULT_GRADES: std::ops::RangeInclusive<u32> = 10..=12;

/// Sections used for a grade missing from [`GradeSections`]
pub const DEFAULT_SECTIONS: [u32; 7] = [1, 2, 3, 4, 5, 6, 7];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: String,
    pub name: String,
    pub subject: String,
}

/// One scheduled lesson
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    pub teacher_id: String,
    pub day: String,
    pub period: u32,
    pub grade: u32,
    pub section: u32,
}

impl ScheduleSlot {
    /// Class label written into teacher grids, e.g. `10/2`
    pub fn class_label(&self) -> String {
        format!("{}/{}", self.grade, self.section)
    }

    pub fn is_at(&self, day: &str, period: u32) -> bool {
        self.day == day && self.period == period
    }

    pub fn belongs_to_class(&self, grade: u32, section: u32) -> bool {
        self.grade == grade && self.section == section
    }
}

/// Ordered days and periods shared with the templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calendar {
    pub days: Vec<String>,
    pub periods: Vec<u32>,
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            days: ["الأحد", "الاثنين", "الثلاثاء", "الأربعاء", "الخميس"]
                .into_iter()
                .map(String::from)
                .collect(),
            periods: (1..=7).collect(),
        }
    }
}

/// Valid sections per grade, keyed by the grade as text (`"10"`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeSections(pub BTreeMap<String, Vec<u32>>);

impl GradeSections {
    /// Sections for `grade`, falling back to `default` when the grade is not listed
    pub fn sections_for(&self, grade: u32, default: &[u32]) -> Vec<u32> {
        self.0
            .get(&grade.to_string())
            .cloned()
            .unwrap_or_else(|| default.to_vec())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Full schedule document, as produced by the scheduling application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleData {
    #[serde(default)]
    pub teachers: Vec<Teacher>,
    #[serde(default)]
    pub slots: Vec<ScheduleSlot>,
    #[serde(default)]
    pub notes: TeacherNotes,
    #[serde(default)]
    pub grade_sections: Option<GradeSections>,
}

impl ScheduleData {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn teacher(&self, id: &str) -> Option<&Teacher> {
        self.teachers.iter().find(|t| t.id == id)
    }
}
