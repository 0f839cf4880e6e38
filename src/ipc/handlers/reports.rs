use serde_json::json;

use crate::calc;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::as_of;
use crate::ipc::types::{AppState, Request};

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.summary" => Some(handle_summary(state, req)),
        "reports.dashboard" => Some(handle_dashboard(state, req)),
        _ => None,
    }
}

/// Fee-collection report. Aggregates over the entire snapshot, never a
/// capped page of it.
fn handle_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(snapshot) = state.snapshot.as_ref() else {
        return err(&req.id, "no_snapshot", "load a snapshot first", None);
    };
    let today = match as_of(req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    let stats = calc::compute_stats(
        &snapshot.students,
        &snapshot.courses,
        &snapshot.payments,
        today,
    );
    match serde_json::to_value(&stats) {
        Ok(v) => ok(&req.id, v),
        Err(e) => err(&req.id, "internal", e.to_string(), None),
    }
}

/// Headline numbers for the dashboard cards.
fn handle_dashboard(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(snapshot) = state.snapshot.as_ref() else {
        return err(&req.id, "no_snapshot", "load a snapshot first", None);
    };
    let today = match as_of(req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    let stats = calc::compute_stats(
        &snapshot.students,
        &snapshot.courses,
        &snapshot.payments,
        today,
    );
    ok(
        &req.id,
        json!({
            "totalStudents": stats.total_students,
            "totalCourses": snapshot.courses.len(),
            "totalRevenue": stats.collected_revenue,
            "totalPending": stats.outstanding,
        }),
    )
}
