// src/types/resume.rs
//! Structured-resume and template types.
//!
//! The editor works on raw `serde_json::Value` so server-side shape
//! changes never break it; this typed view is only a narrowing for
//! display purposes and keeps every field optional.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Resume,
    CoverLetter,
}

impl TemplateKind {
    pub fn endpoint(&self) -> &'static str {
        match self {
            TemplateKind::Resume => "/templates/resume",
            TemplateKind::CoverLetter => "/templates/cover-letter",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredResume {
    pub contact: Option<Contact>,
    pub experience: Option<Vec<ExperienceEntry>>,
    pub education: Option<Vec<EducationEntry>>,
    pub skills: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub title: Option<String>,
    pub company: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub highlights: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EducationEntry {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub year: Option<String>,
}

impl StructuredResume {
    /// Narrow a raw server payload into the typed view. Fields the
    /// server renamed or dropped simply come back as `None`.
    pub fn from_value(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}
