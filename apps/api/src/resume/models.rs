use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Named presentation styles a resume can render with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Modern,
    Minimal,
    Elegant,
    Corporate,
    Sidebar,
    Classic,
    Creative,
    Mono,
}

impl Template {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "modern" => Some(Template::Modern),
            "minimal" => Some(Template::Minimal),
            "elegant" => Some(Template::Elegant),
            "corporate" => Some(Template::Corporate),
            "sidebar" => Some(Template::Sidebar),
            "classic" => Some(Template::Classic),
            "creative" => Some(Template::Creative),
            "mono" => Some(Template::Mono),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Template::Modern => "modern",
            Template::Minimal => "minimal",
            Template::Elegant => "elegant",
            Template::Corporate => "corporate",
            Template::Sidebar => "sidebar",
            Template::Classic => "classic",
            Template::Creative => "creative",
            Template::Mono => "mono",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    pub company: Option<String>,
    pub role: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    #[serde(deserialize_with = "bool_or_null")]
    pub current: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub percent: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    pub course: Option<String>,
    pub institution: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Language {
    pub name: Option<String>,
    pub level: Option<String>,
    pub percent: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdditionalInfo {
    pub label: Option<String>,
    pub value: Option<String>,
}

/// Tolerates `null` where clients send an unset checkbox.
fn bool_or_null<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: Option<String>,
    pub headline: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin: Option<String>,
    pub summary: Option<String>,
    pub template: String,
    /// Bare filename of the attached photo. Rows written by the legacy
    /// scheme may still hold a full public path; see `resume::photo`.
    pub photo_file_name: Option<String>,
    pub experiences: Json<Vec<Experience>>,
    pub skills: Json<Vec<Skill>>,
    pub education: Json<Vec<Education>>,
    pub languages: Json<Vec<Language>>,
    pub additional_info: Json<Vec<AdditionalInfo>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing row for the index screen.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeSummaryRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub headline: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// User-writable fields, produced only by the validation pipeline.
///
/// `photo_file_name` is deliberately absent: it is system-derived and written
/// through its own store path, so user input can never reach that column.
#[derive(Debug, Clone)]
pub struct ResumeUpdate {
    pub name: String,
    pub headline: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin: Option<String>,
    pub summary: Option<String>,
    pub template: Template,
    pub experiences: Vec<Experience>,
    pub skills: Vec<Skill>,
    pub education: Vec<Education>,
    pub languages: Vec<Language>,
    pub additional_info: Vec<AdditionalInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_round_trip() {
        for name in [
            "modern",
            "minimal",
            "elegant",
            "corporate",
            "sidebar",
            "classic",
            "creative",
            "mono",
        ] {
            let template = Template::parse(name).expect(name);
            assert_eq!(template.as_str(), name);
        }
    }

    #[test]
    fn test_unknown_template_rejected() {
        assert_eq!(Template::parse("brutalist"), None);
        assert_eq!(Template::parse("Modern"), None);
    }

    #[test]
    fn test_experience_tolerates_null_current() {
        let exp: Experience =
            serde_json::from_value(serde_json::json!({"company": "Acme", "current": null}))
                .unwrap();
        assert!(!exp.current);
        assert_eq!(exp.company.as_deref(), Some("Acme"));
    }
}
