use serde_json::json;
use std::path::PathBuf;
use tracing::info;

use crate::calc::Status;
use crate::export;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{as_of, filter_param, required_str};
use crate::ipc::types::{AppState, Request};

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "export.studentsCsv" => Some(handle_students_csv(state, req)),
        _ => None,
    }
}

fn handle_students_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(snapshot) = state.snapshot.as_ref() else {
        return err(&req.id, "no_snapshot", "load a snapshot first", None);
    };
    let out_path = match required_str(req, "outPath") {
        Ok(v) => PathBuf::from(v),
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
    let today = match as_of(req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    let (csv, rows_exported) =
        export::students_csv(&snapshot.students, &snapshot.courses, status, today);

    if let Some(parent) = out_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            return err(
                &req.id,
                "io_failed",
                e.to_string(),
                Some(json!({ "path": out_path.to_string_lossy() })),
            );
        }
    }
    if let Err(e) = std::fs::write(&out_path, csv) {
        return err(
            &req.id,
            "io_failed",
            e.to_string(),
            Some(json!({ "path": out_path.to_string_lossy() })),
        );
    }
    info!(rows = rows_exported, path = %out_path.to_string_lossy(), "roster exported");

    ok(
        &req.id,
        json!({
            "rowsExported": rows_exported,
            "path": out_path.to_string_lossy(),
        }),
    )
}
