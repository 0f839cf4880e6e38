use chrono::NaiveDate;
use serde_json::json;
use tracing::info;

use crate::calc::{self, FilterCriteria, Status};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{as_of, filter_param, page_params, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{format_wire_date, Course, Student, StoredStatus};

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_list(state, req)),
        "students.recent" => Some(handle_recent(state, req)),
        "students.setStatus" => Some(handle_set_status(state, req)),
        _ => None,
    }
}

fn student_row(s: &Student, courses: &[Course], today: NaiveDate) -> serde_json::Value {
    let course = calc::find_course(courses, &s.course);
    let derived = calc::derive_status(s, course, today);
    let end = s.enrollment_date.and_then(|enrolled| {
        calc::end_date(enrolled, course.map(|c| c.duration_months()).unwrap_or(0))
    });
    json!({
        "id": s.id,
        "name": s.name,
        "father": s.father,
        "phone": s.phone,
        "dob": s.dob.map(format_wire_date),
        "course": s.course,
        "branch": s.branch,
        "enrollmentDate": s.enrollment_date.map(format_wire_date),
        "endDate": end.map(format_wire_date),
        "totalFee": s.total_fee,
        "discount": s.discount,
        "paidAmount": s.paid_amount,
        "balance": calc::balance(s),
        "storedStatus": s.status.as_str(),
        "status": derived.as_str(),
    })
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(snapshot) = state.snapshot.as_ref() else {
        return err(&req.id, "no_snapshot", "load a snapshot first", None);
    };
    let today = match as_of(req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    let status = match filter_param(req, "status") {
        None => None,
        Some(raw) => match Status::parse(&raw) {
            Some(s) => Some(s),
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "status must be Active, Completed, Inactive or Dropped",
                    None,
                )
            }
        },
    };
    let criteria = FilterCriteria {
        search: filter_param(req, "search"),
        branch: filter_param(req, "branch"),
        status,
        course: filter_param(req, "course"),
    };

    let filtered: Vec<&Student> = snapshot
        .students
        .iter()
        .filter(|s| calc::matches(s, &snapshot.courses, &criteria, today))
        .collect();
    let total = filtered.len();

    let (page, page_size) = page_params(req, 25);
    let rows: Vec<serde_json::Value> = filtered
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .map(|s| student_row(s, &snapshot.courses, today))
        .collect();

    ok(
        &req.id,
        json!({
            "students": rows,
            "total": total,
            "page": page,
            "pageSize": page_size,
        }),
    )
}

/// Dashboard recency listing: newest enrollments first, with the record
/// creation date as a fallback sort key for rows without one.
fn handle_recent(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(snapshot) = state.snapshot.as_ref() else {
        return err(&req.id, "no_snapshot", "load a snapshot first", None);
    };
    let today = match as_of(req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    let mut sorted: Vec<&Student> = snapshot.students.iter().collect();
    sorted.sort_by(|a, b| {
        let key = |s: &Student| s.enrollment_date.or(s.created_at);
        key(b).cmp(&key(a))
    });
    let total = sorted.len();

    let (page, page_size) = page_params(req, 5);
    let rows: Vec<serde_json::Value> = sorted
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .map(|s| student_row(s, &snapshot.courses, today))
        .collect();

    ok(
        &req.id,
        json!({
            "students": rows,
            "total": total,
            "page": page,
            "pageSize": page_size,
        }),
    )
}

/// Writes the stored status. `Active` and `Dropped` are the only values
/// ever persisted; everything else stays derived.
fn handle_set_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(snapshot) = state.snapshot.as_mut() else {
        return err(&req.id, "no_snapshot", "load a snapshot first", None);
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let stored = match req.params.get("status").and_then(|v| v.as_str()) {
        Some("Active") => StoredStatus::Active,
        Some("Dropped") => StoredStatus::Dropped,
        _ => {
            return err(
                &req.id,
                "bad_params",
                "status must be Active or Dropped",
                None,
            )
        }
    };

    let Some(student) = snapshot.students.iter_mut().find(|s| s.id == student_id) else {
        return err(
            &req.id,
            "not_found",
            format!("unknown student: {}", student_id),
            None,
        );
    };
    student.status = stored;
    info!(student = %student_id, status = stored.as_str(), "stored status updated");

    ok(
        &req.id,
        json!({ "studentId": student_id, "status": stored.as_str() }),
    )
}
