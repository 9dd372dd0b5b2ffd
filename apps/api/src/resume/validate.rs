use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{AppError, FieldErrors};
use crate::resume::models::{
    AdditionalInfo, Education, Experience, Language, ResumeUpdate, Template,
};
use crate::resume::skills::normalize_skills;

pub const MAX_EXPERIENCES: usize = 50;
pub const MAX_EDUCATION: usize = 20;
pub const MAX_LANGUAGES: usize = 20;
pub const MAX_ADDITIONAL_INFO: usize = 30;

/// Validates a raw update payload into the user-writable field set.
///
/// Skills are normalized before validation, so the loosely-typed client
/// shapes never reach the field checks. Section lists are truncated at their
/// caps (excess entries silently dropped, order preserved) before per-entry
/// checks run. All failures are collected into one response; nothing is
/// mutated on failure.
pub fn validate_update(raw: &Value) -> Result<ResumeUpdate, AppError> {
    let mut errors = FieldErrors::default();

    let name = required_string(raw, "name", 255, &mut errors);
    let headline = optional_string(raw, "headline", 255, &mut errors);
    let email = optional_string(raw, "email", 255, &mut errors);
    if let Some(email) = email.as_deref() {
        if !looks_like_email(email) {
            errors.push("email", "must be a valid email address");
        }
    }
    let phone = optional_string(raw, "phone", 50, &mut errors);
    let location = optional_string(raw, "location", 255, &mut errors);
    let linkedin = optional_string(raw, "linkedin", 255, &mut errors);
    let summary = optional_string(raw, "summary", 5000, &mut errors);
    let template = parse_template(raw, &mut errors);

    let skills = normalize_skills(raw.get("skills").unwrap_or(&Value::Null));

    let experiences: Vec<Experience> =
        parse_section(raw, "experiences", MAX_EXPERIENCES, &mut errors);
    for (i, exp) in experiences.iter().enumerate() {
        check_len(&mut errors, "experiences", i, "company", exp.company.as_deref(), 255);
        check_len(&mut errors, "experiences", i, "role", exp.role.as_deref(), 255);
        check_len(&mut errors, "experiences", i, "start", exp.start.as_deref(), 50);
        check_len(&mut errors, "experiences", i, "end", exp.end.as_deref(), 50);
        check_len(
            &mut errors,
            "experiences",
            i,
            "description",
            exp.description.as_deref(),
            2000,
        );
    }

    let education: Vec<Education> = parse_section(raw, "education", MAX_EDUCATION, &mut errors);
    for (i, edu) in education.iter().enumerate() {
        check_len(&mut errors, "education", i, "course", edu.course.as_deref(), 255);
        check_len(
            &mut errors,
            "education",
            i,
            "institution",
            edu.institution.as_deref(),
            255,
        );
        check_len(&mut errors, "education", i, "start", edu.start.as_deref(), 50);
        check_len(&mut errors, "education", i, "end", edu.end.as_deref(), 50);
        check_len(&mut errors, "education", i, "status", edu.status.as_deref(), 100);
    }

    let languages: Vec<Language> = parse_section(raw, "languages", MAX_LANGUAGES, &mut errors);
    for (i, lang) in languages.iter().enumerate() {
        check_len(&mut errors, "languages", i, "name", lang.name.as_deref(), 100);
        check_len(&mut errors, "languages", i, "level", lang.level.as_deref(), 100);
        if let Some(percent) = lang.percent {
            if !(0..=100).contains(&percent) {
                errors.push(format!("languages.{i}.percent"), "must be between 0 and 100");
            }
        }
    }

    let additional_info: Vec<AdditionalInfo> =
        parse_section(raw, "additional_info", MAX_ADDITIONAL_INFO, &mut errors);
    for (i, info) in additional_info.iter().enumerate() {
        check_len(&mut errors, "additional_info", i, "label", info.label.as_deref(), 100);
        check_len(&mut errors, "additional_info", i, "value", info.value.as_deref(), 255);
    }

    errors.into_result()?;

    Ok(ResumeUpdate {
        name,
        headline,
        email,
        phone,
        location,
        linkedin,
        summary,
        template,
        experiences,
        skills,
        education,
        languages,
        additional_info,
    })
}

fn required_string(raw: &Value, field: &str, max: usize, errors: &mut FieldErrors) -> String {
    match raw.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => {
            if s.chars().count() > max {
                errors.push(field, format!("may not be greater than {max} characters"));
            }
            s.clone()
        }
        Some(Value::String(_)) | Some(Value::Null) | None => {
            errors.push(field, "is required");
            String::new()
        }
        Some(_) => {
            errors.push(field, "must be a string");
            String::new()
        }
    }
}

fn optional_string(
    raw: &Value,
    field: &str,
    max: usize,
    errors: &mut FieldErrors,
) -> Option<String> {
    match raw.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            if s.chars().count() > max {
                errors.push(field, format!("may not be greater than {max} characters"));
            }
            Some(s.clone())
        }
        Some(_) => {
            errors.push(field, "must be a string");
            None
        }
    }
}

fn parse_template(raw: &Value, errors: &mut FieldErrors) -> Template {
    match raw.get("template") {
        Some(Value::String(s)) => Template::parse(s).unwrap_or_else(|| {
            errors.push("template", "must be a known template");
            Template::default()
        }),
        None | Some(Value::Null) => {
            errors.push("template", "is required");
            Template::default()
        }
        Some(_) => {
            errors.push("template", "must be a string");
            Template::default()
        }
    }
}

/// Deserializes a section list, truncating at `cap` first. Malformed entries
/// report their index and fail the whole update.
fn parse_section<T: DeserializeOwned>(
    raw: &Value,
    field: &str,
    cap: usize,
    errors: &mut FieldErrors,
) -> Vec<T> {
    let items = match raw.get(field) {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.push(field, "must be an array");
            return Vec::new();
        }
    };

    items
        .iter()
        .take(cap)
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value(item.clone()) {
            Ok(entry) => Some(entry),
            Err(e) => {
                errors.push(format!("{field}.{i}"), e.to_string());
                None
            }
        })
        .collect()
}

fn check_len(
    errors: &mut FieldErrors,
    section: &str,
    index: usize,
    field: &str,
    value: Option<&str>,
    max: usize,
) {
    if let Some(value) = value {
        if value.chars().count() > max {
            errors.push(
                format!("{section}.{index}.{field}"),
                format!("may not be greater than {max} characters"),
            );
        }
    }
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_update() -> Value {
        json!({
            "name": "Ada Lovelace",
            "template": "modern",
        })
    }

    fn validation_message(err: AppError) -> String {
        match err {
            AppError::Validation(errors) => errors.to_string(),
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_minimal_payload_passes() {
        let update = validate_update(&minimal_update()).unwrap();
        assert_eq!(update.name, "Ada Lovelace");
        assert_eq!(update.template, Template::Modern);
        assert!(update.experiences.is_empty());
        assert!(update.skills.is_empty());
    }

    #[test]
    fn test_name_is_required() {
        let err = validate_update(&json!({"template": "modern"})).unwrap_err();
        assert!(validation_message(err).contains("name: is required"));
    }

    #[test]
    fn test_blank_name_is_required() {
        let mut raw = minimal_update();
        raw["name"] = json!("   ");
        let err = validate_update(&raw).unwrap_err();
        assert!(validation_message(err).contains("name: is required"));
    }

    #[test]
    fn test_invalid_email_rejected() {
        let mut raw = minimal_update();
        raw["email"] = json!("not-an-email");
        let err = validate_update(&raw).unwrap_err();
        assert!(validation_message(err).contains("email: must be a valid email address"));
    }

    #[test]
    fn test_valid_email_accepted() {
        let mut raw = minimal_update();
        raw["email"] = json!("ada@example.com");
        let update = validate_update(&raw).unwrap();
        assert_eq!(update.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_unknown_template_rejected() {
        let mut raw = minimal_update();
        raw["template"] = json!("brutalist");
        let err = validate_update(&raw).unwrap_err();
        assert!(validation_message(err).contains("template: must be a known template"));
    }

    #[test]
    fn test_summary_cap() {
        let mut raw = minimal_update();
        raw["summary"] = json!("x".repeat(5001));
        let err = validate_update(&raw).unwrap_err();
        assert!(
            validation_message(err).contains("summary: may not be greater than 5000 characters")
        );
    }

    #[test]
    fn test_experiences_truncated_at_cap_in_order() {
        let mut raw = minimal_update();
        let entries: Vec<Value> = (0..60).map(|i| json!({"company": format!("co-{i}")})).collect();
        raw["experiences"] = Value::Array(entries);

        let update = validate_update(&raw).unwrap();
        assert_eq!(update.experiences.len(), MAX_EXPERIENCES);
        assert_eq!(update.experiences[0].company.as_deref(), Some("co-0"));
        assert_eq!(update.experiences[49].company.as_deref(), Some("co-49"));
    }

    #[test]
    fn test_entry_field_cap_reports_path() {
        let mut raw = minimal_update();
        raw["experiences"] = json!([
            {"company": "ok"},
            {"description": "x".repeat(2001)},
        ]);
        let err = validate_update(&raw).unwrap_err();
        assert!(validation_message(err)
            .contains("experiences.1.description: may not be greater than 2000 characters"));
    }

    #[test]
    fn test_entries_beyond_cap_are_not_validated() {
        let mut raw = minimal_update();
        let mut entries: Vec<Value> = (0..MAX_EXPERIENCES).map(|_| json!({})).collect();
        entries.push(json!({"description": "x".repeat(9000)}));
        raw["experiences"] = Value::Array(entries);
        assert!(validate_update(&raw).is_ok());
    }

    #[test]
    fn test_language_percent_out_of_range() {
        let mut raw = minimal_update();
        raw["languages"] = json!([{"name": "French", "percent": 120}]);
        let err = validate_update(&raw).unwrap_err();
        assert!(validation_message(err).contains("languages.0.percent"));
    }

    #[test]
    fn test_skills_are_normalized_not_rejected() {
        let mut raw = minimal_update();
        raw["skills"] = json!(["Go", {"name": "Rust", "percent": 150}, {"name": "  "}, 42]);
        let update = validate_update(&raw).unwrap();
        assert_eq!(update.skills.len(), 2);
        assert_eq!(update.skills[0].name, "Go");
        assert_eq!(update.skills[0].percent, 70);
        assert_eq!(update.skills[1].name, "Rust");
        assert_eq!(update.skills[1].percent, 100);
    }

    #[test]
    fn test_non_array_section_rejected() {
        let mut raw = minimal_update();
        raw["education"] = json!("none");
        let err = validate_update(&raw).unwrap_err();
        assert!(validation_message(err).contains("education: must be an array"));
    }

    #[test]
    fn test_multiple_failures_collected() {
        let raw = json!({
            "email": "nope",
            "template": "brutalist",
        });
        let err = validate_update(&raw).unwrap_err();
        let message = validation_message(err);
        assert!(message.contains("name: is required"));
        assert!(message.contains("email:"));
        assert!(message.contains("template:"));
    }
}
