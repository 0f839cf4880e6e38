//! Status derivation, filtering and report aggregation.
//!
//! Every caller that needs a student's effective status (listing, filter
//! predicate, CSV export, report aggregator) goes through [`derive_status`];
//! the status is computed fresh from the snapshot and an explicit as-of
//! date, never persisted.

use chrono::{Months, NaiveDate};
use serde::Serialize;

use crate::model::{Course, Payment, StoredStatus, Student};

/// Effective student status. Only `Active` and `Dropped` ever exist in the
/// stored record; `Completed` and `Inactive` are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Active,
    Completed,
    Inactive,
    Dropped,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "Active",
            Status::Completed => "Completed",
            Status::Inactive => "Inactive",
            Status::Dropped => "Dropped",
        }
    }

    pub fn parse(s: &str) -> Option<Status> {
        match s {
            "Active" => Some(Status::Active),
            "Completed" => Some(Status::Completed),
            "Inactive" => Some(Status::Inactive),
            "Dropped" => Some(Status::Dropped),
            _ => None,
        }
    }
}

pub fn find_course<'a>(courses: &'a [Course], name: &str) -> Option<&'a Course> {
    courses.iter().find(|c| c.name == name)
}

/// Course end date: enrollment plus the duration in calendar months.
/// Month-increment rule: the month field advances and the day-of-month is
/// clamped to the last valid day of the target month (Jan 31 + 1 month =
/// Feb 28/29). `None` when the duration is unknown (0) or out of range.
pub fn end_date(enrolled: NaiveDate, duration_months: u32) -> Option<NaiveDate> {
    if duration_months == 0 {
        return None;
    }
    enrolled.checked_add_months(Months::new(duration_months))
}

/// Outstanding balance. Not clamped: an overpaid student has a negative
/// balance.
pub fn balance(student: &Student) -> f64 {
    student.total_fee - student.paid_amount
}

/// Derive the effective status. Precedence, first match wins:
///
/// 1. stored `Dropped` is sticky and beats everything, full payment included;
/// 2. `paid_amount >= total_fee` is `Completed` (zero-fee and overpaid
///    students complete, even past their end date);
/// 3. past the course end date is `Inactive`, only when the enrollment
///    date is known and the matched course has a parseable duration;
/// 4. everything else is `Active`.
///
/// A missing course (orphaned reference) means the end-date rule never
/// fires, so such students settle on `Active` or `Completed`.
pub fn derive_status(student: &Student, course: Option<&Course>, today: NaiveDate) -> Status {
    if student.status == StoredStatus::Dropped {
        return Status::Dropped;
    }
    if student.paid_amount >= student.total_fee {
        return Status::Completed;
    }
    let duration = course.map(|c| c.duration_months()).unwrap_or(0);
    if let Some(enrolled) = student.enrollment_date {
        if let Some(end) = end_date(enrolled, duration) {
            if today > end {
                return Status::Inactive;
            }
        }
    }
    Status::Active
}

/// [`derive_status`] with the course lookup folded in.
pub fn derive_status_in(student: &Student, courses: &[Course], today: NaiveDate) -> Status {
    derive_status(student, find_course(courses, &student.course), today)
}

/// Filter criteria for student listings and exports. Every field is
/// optional and an absent field matches everything.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub search: Option<String>,
    pub branch: Option<String>,
    pub status: Option<Status>,
    pub course: Option<String>,
}

/// Case-insensitive substring search over name, phone and father's name;
/// an absent field never matches. Branch and course are exact equality.
/// The status criterion compares the *derived* status, not the stored one.
pub fn matches(
    student: &Student,
    courses: &[Course],
    criteria: &FilterCriteria,
    today: NaiveDate,
) -> bool {
    if let Some(term) = criteria.search.as_deref() {
        let term = term.to_lowercase();
        let field_hit =
            |f: Option<&str>| f.map(|v| v.to_lowercase().contains(&term)).unwrap_or(false);
        let hit = student.name.to_lowercase().contains(&term)
            || field_hit(student.phone.as_deref())
            || field_hit(student.father.as_deref());
        if !hit {
            return false;
        }
    }
    if let Some(branch) = criteria.branch.as_deref() {
        if student.branch.as_deref() != Some(branch) {
            return false;
        }
    }
    if let Some(course) = criteria.course.as_deref() {
        if student.course != course {
            return false;
        }
    }
    if let Some(want) = criteria.status {
        if derive_status_in(student, courses, today) != want {
            return false;
        }
    }
    true
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub expected_revenue: f64,
    pub collected_revenue: f64,
    /// May be negative when overpayment exists; not clamped.
    pub outstanding: f64,
    /// Percent, rounded to one decimal. 0 when expected revenue is 0.
    pub collection_rate: f64,
    pub dropped_fees: f64,
    pub total_students: usize,
    pub active_students: usize,
    pub total_payments: usize,
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Report aggregates over the full snapshot. Dropped students are excluded
/// from the revenue pools and accounted separately in `dropped_fees`.
pub fn compute_stats(
    students: &[Student],
    courses: &[Course],
    payments: &[Payment],
    today: NaiveDate,
) -> StatsSummary {
    let mut expected = 0.0_f64;
    let mut collected = 0.0_f64;
    let mut dropped_fees = 0.0_f64;
    let mut active_students = 0_usize;

    for s in students {
        match derive_status_in(s, courses, today) {
            Status::Dropped => dropped_fees += s.total_fee,
            st => {
                expected += s.total_fee;
                collected += s.paid_amount;
                if st == Status::Active {
                    active_students += 1;
                }
            }
        }
    }

    let collection_rate = if expected > 0.0 {
        round1(collected / expected * 100.0)
    } else {
        0.0
    };

    StatsSummary {
        expected_revenue: expected,
        collected_revenue: collected,
        outstanding: expected - collected,
        collection_rate,
        dropped_fees,
        total_students: students.len(),
        active_students,
        total_payments: payments.len(),
    }
}
