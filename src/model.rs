use anyhow::Context;
use chrono::NaiveDate;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parse a wire date. The backend sends `YYYY-MM-DD`; a trailing time
/// component (`2023-01-05T09:30:00Z`) is tolerated and ignored.
pub fn parse_wire_date(s: &str) -> Option<NaiveDate> {
    let date_part = s
        .split(|c| c == 'T' || c == ' ')
        .next()
        .unwrap_or(s)
        .trim();
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

pub fn format_wire_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Serde adapter for optional wire dates. A missing, null, empty or
/// malformed value decodes as `None`; decoding never fails on a bad date.
mod wire_date {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_wire_date))
    }
}

/// The persisted student status. Only these two values are ever written
/// back by the dashboard; every other displayed status is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum StoredStatus {
    Dropped,
    #[default]
    Active,
}

impl<'de> Deserialize<'de> for StoredStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Anything the backend sends that is not "Dropped" counts as Active.
        let s: Option<String> = Option::deserialize(deserializer)?;
        Ok(match s.as_deref() {
            Some("Dropped") => StoredStatus::Dropped,
            _ => StoredStatus::Active,
        })
    }
}

impl StoredStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoredStatus::Dropped => "Dropped",
            StoredStatus::Active => "Active",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Course {
    #[serde(default, alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub fee: f64,
    #[serde(default)]
    pub description: Option<String>,
}

impl Course {
    /// Duration in months, parsed as the first embedded unsigned integer in
    /// the free-text duration field ("6 months" -> 6, "1 year" -> 1).
    /// Unparseable or absent text yields 0, meaning duration unknown.
    pub fn duration_months(&self) -> u32 {
        first_uint(&self.duration)
    }
}

fn first_uint(s: &str) -> u32 {
    let mut digits = String::new();
    for ch in s.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else if !digits.is_empty() {
            break;
        }
    }
    if digits.is_empty() {
        return 0;
    }
    digits.parse::<u32>().unwrap_or(0)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Student {
    #[serde(default, alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub father: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, with = "wire_date")]
    pub dob: Option<NaiveDate>,
    /// Foreign key by course *name*, not id. No referential integrity: an
    /// orphaned reference behaves as an unknown duration.
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default, with = "wire_date")]
    pub enrollment_date: Option<NaiveDate>,
    #[serde(default)]
    pub total_fee: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub paid_amount: f64,
    #[serde(default)]
    pub status: StoredStatus,
    #[serde(default, with = "wire_date")]
    pub created_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    #[serde(default, alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub fee_type: Option<String>,
    #[serde(default)]
    pub receipt_number: String,
    #[serde(default, with = "wire_date")]
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One full-replace load of the backend's collections. The daemon owns
/// exactly one of these at a time; `snapshot.load` swaps it wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub students: Vec<Student>,
    pub courses: Vec<Course>,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityWarning {
    pub code: String,
    pub message: String,
}

impl Snapshot {
    pub fn from_value(value: serde_json::Value) -> Result<Snapshot, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn load_from_path(path: &Path) -> anyhow::Result<Snapshot> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot file {}", path.to_string_lossy()))?;
        let snapshot: Snapshot = serde_json::from_str(&text)
            .with_context(|| format!("snapshot file {} is not valid", path.to_string_lossy()))?;
        Ok(snapshot)
    }

    /// Data-quality problems that degrade silently during derivation but are
    /// worth surfacing once at load time: students referencing a course that
    /// is not in the snapshot, and courses whose duration text carries no
    /// parseable month count.
    pub fn quality_warnings(&self) -> Vec<QualityWarning> {
        let mut warnings = Vec::new();
        for s in &self.students {
            if !s.course.is_empty() && !self.courses.iter().any(|c| c.name == s.course) {
                warnings.push(QualityWarning {
                    code: "orphan_course_ref".to_string(),
                    message: format!(
                        "student {} references unknown course '{}'",
                        s.id, s.course
                    ),
                });
            }
        }
        for c in &self.courses {
            if !c.duration.trim().is_empty() && c.duration_months() == 0 {
                warnings.push(QualityWarning {
                    code: "unparseable_duration".to_string(),
                    message: format!(
                        "course '{}' duration '{}' has no parseable month count",
                        c.name, c.duration
                    ),
                });
            }
        }
        warnings
    }
}
