use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domains::tasks::TaskPriority;

/// Ephemeral task candidate produced by the text-generation provider.
///
/// Fields arrive as free-form strings and are normalized at the fan-out
/// boundary; the descriptor itself is never persisted. Serde defaults keep
/// a descriptor with missing fields usable instead of failing the batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskDescriptor {
    pub title: String,
    pub description: String,
    pub priority: String,
    pub due_date: Option<String>,
}

impl TaskDescriptor {
    /// Title with the source system's fallback for untitled extractions.
    pub fn title_or_default(&self) -> String {
        if self.title.trim().is_empty() {
            "Extracted Task".to_string()
        } else {
            self.title.clone()
        }
    }

    /// Map the free-form priority string to the closed enum.
    /// Unrecognized values default to Medium.
    pub fn normalized_priority(&self) -> TaskPriority {
        match self.priority.trim().to_lowercase().as_str() {
            "high" => TaskPriority::High,
            "low" => TaskPriority::Low,
            _ => TaskPriority::Medium,
        }
    }

    /// Parse the due date permissively; unparsable values become None
    /// rather than failing the descriptor.
    pub fn normalized_due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date.as_deref().and_then(parse_due_date)
    }
}

/// Accepts RFC 3339, bare date-times, and bare dates (midnight UTC).
fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn priority_normalization_defaults_to_medium() {
        let descriptor = |p: &str| TaskDescriptor {
            priority: p.to_string(),
            ..Default::default()
        };

        assert_eq!(descriptor("high").normalized_priority(), TaskPriority::High);
        assert_eq!(descriptor("HIGH").normalized_priority(), TaskPriority::High);
        assert_eq!(descriptor("low").normalized_priority(), TaskPriority::Low);
        assert_eq!(descriptor("medium").normalized_priority(), TaskPriority::Medium);
        assert_eq!(descriptor("urgent!!").normalized_priority(), TaskPriority::Medium);
        assert_eq!(descriptor("").normalized_priority(), TaskPriority::Medium);
    }

    #[test]
    fn due_date_accepts_rfc3339() {
        let parsed = parse_due_date("2026-09-15T10:30:00Z").expect("should parse");
        assert_eq!(parsed.hour(), 10);
    }

    #[test]
    fn due_date_accepts_bare_date_as_midnight() {
        let parsed = parse_due_date("2026-09-15").expect("should parse");
        assert_eq!(parsed.hour(), 0);
        assert_eq!(parsed.minute(), 0);
    }

    #[test]
    fn due_date_accepts_naive_datetime() {
        assert!(parse_due_date("2026-09-15T10:30:00").is_some());
        assert!(parse_due_date("2026-09-15 10:30:00").is_some());
    }

    #[test]
    fn unparsable_due_date_becomes_none() {
        assert!(parse_due_date("next Tuesday").is_none());
        assert!(parse_due_date("null").is_none());
        assert!(parse_due_date("").is_none());
    }

    #[test]
    fn missing_fields_deserialize_with_defaults() {
        let descriptor: TaskDescriptor =
            serde_json::from_str(r#"{"description":"just a description"}"#).expect("should parse");
        assert_eq!(descriptor.title_or_default(), "Extracted Task");
        assert_eq!(descriptor.normalized_priority(), TaskPriority::Medium);
        assert!(descriptor.normalized_due_date().is_none());
    }
}
