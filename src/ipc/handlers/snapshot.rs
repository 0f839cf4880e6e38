use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use crate::model::Snapshot;

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "snapshot.load" => Some(handle_load(state, req)),
        "snapshot.loadFile" => Some(handle_load_file(state, req)),
        "snapshot.info" => Some(handle_info(state, req)),
        _ => None,
    }
}

/// Full-replace load: the previous snapshot, if any, is discarded wholesale.
fn handle_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let snapshot = match Snapshot::from_value(req.params.clone()) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "bad_snapshot", e.to_string(), None),
    };
    install(state, req, snapshot)
}

fn handle_load_file(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_str(req, "path") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };
    let snapshot = match Snapshot::load_from_path(&path) {
        Ok(s) => s,
        Err(e) => {
            return err(
                &req.id,
                "bad_snapshot",
                format!("{:#}", e),
                Some(json!({ "path": path.to_string_lossy() })),
            )
        }
    };
    install(state, req, snapshot)
}

fn install(state: &mut AppState, req: &Request, snapshot: Snapshot) -> serde_json::Value {
    let warnings = snapshot.quality_warnings();
    for w in &warnings {
        warn!(code = %w.code, "{}", w.message);
    }
    info!(
        students = snapshot.students.len(),
        courses = snapshot.courses.len(),
        payments = snapshot.payments.len(),
        "snapshot replaced"
    );

    let result = json!({
        "students": snapshot.students.len(),
        "courses": snapshot.courses.len(),
        "payments": snapshot.payments.len(),
        "warnings": warnings,
    });
    state.snapshot = Some(snapshot);
    ok(&req.id, result)
}

fn handle_info(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.snapshot.as_ref() {
        Some(s) => ok(
            &req.id,
            json!({
                "loaded": true,
                "students": s.students.len(),
                "courses": s.courses.len(),
                "payments": s.payments.len(),
            }),
        ),
        None => ok(
            &req.id,
            json!({ "loaded": false, "students": 0, "courses": 0, "payments": 0 }),
        ),
    }
}
