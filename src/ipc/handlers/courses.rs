use serde_json::json;

use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.list" => Some(handle_list(state, req)),
        _ => None,
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(snapshot) = state.snapshot.as_ref() else {
        return ok(&req.id, json!({ "courses": [] }));
    };

    let rows: Vec<serde_json::Value> = snapshot
        .courses
        .iter()
        .map(|c| {
            let enrolled = snapshot
                .students
                .iter()
                .filter(|s| s.course == c.name)
                .count();
            json!({
                "id": c.id,
                "name": c.name,
                "duration": c.duration,
                "durationMonths": c.duration_months(),
                "fee": c.fee,
                "description": c.description,
                "enrolledCount": enrolled,
            })
        })
        .collect();

    ok(&req.id, json!({ "courses": rows }))
}
