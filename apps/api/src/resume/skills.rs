use serde_json::Value;

use crate::resume::models::Skill;

/// Proficiency assigned when the client omits a usable percent.
pub const DEFAULT_PERCENT: i32 = 70;

/// Maximum number of skills kept on a resume.
pub const MAX_SKILLS: usize = 50;

/// Normalizes loosely-typed client input into a bounded list of skills.
///
/// Accepts anything. Non-array input yields an empty list. String elements
/// become `{name, 70}` after trimming; object elements read `name` and
/// `percent` with clamping to `[0, 100]`; every other shape is dropped.
/// Order is preserved among survivors and the result is truncated to
/// [`MAX_SKILLS`]. Never fails.
pub fn normalize_skills(raw: &Value) -> Vec<Skill> {
    let Some(items) = raw.as_array() else {
        return Vec::new();
    };

    let mut normalized = Vec::new();
    for item in items {
        if normalized.len() == MAX_SKILLS {
            break;
        }
        match item {
            Value::String(s) => {
                let name = s.trim();
                if name.is_empty() {
                    continue;
                }
                normalized.push(Skill {
                    name: name.to_string(),
                    percent: DEFAULT_PERCENT,
                });
            }
            Value::Object(map) => {
                let name = match map.get("name") {
                    Some(Value::String(s)) => s.trim().to_string(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => String::new(),
                };
                if name.is_empty() {
                    continue;
                }
                let percent = map
                    .get("percent")
                    .and_then(coerce_percent)
                    .unwrap_or(DEFAULT_PERCENT);
                normalized.push(Skill { name, percent });
            }
            _ => {}
        }
    }

    normalized
}

/// Numeric values and numeric strings count; anything else means "absent".
/// Fractions truncate toward zero before clamping.
fn coerce_percent(value: &Value) -> Option<i32> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Some((n as i32).clamp(0, 100))
}
