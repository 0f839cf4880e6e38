use chrono::{Local, NaiveDate};

use crate::ipc::error::err;
use crate::ipc::types::Request;
use crate::model;

/// Optional `asOf` param (`YYYY-MM-DD`). Every operation that consults the
/// clock takes it so callers and tests can pin the evaluation date; the
/// default is the local calendar date.
pub fn as_of(req: &Request) -> Result<NaiveDate, serde_json::Value> {
    match req.params.get("asOf") {
        None => Ok(Local::now().date_naive()),
        Some(v) => match v.as_str().and_then(model::parse_wire_date) {
            Some(d) => Ok(d),
            None => Err(err(
                &req.id,
                "bad_params",
                "asOf must be a YYYY-MM-DD date",
                None,
            )),
        },
    }
}

/// `page` (1-based) and `pageSize` params with a per-listing default size.
pub fn page_params(req: &Request, default_size: usize) -> (usize, usize) {
    let page = req
        .params
        .get("page")
        .and_then(|v| v.as_u64())
        .filter(|v| *v >= 1)
        .unwrap_or(1) as usize;
    let page_size = req
        .params
        .get("pageSize")
        .and_then(|v| v.as_u64())
        .filter(|v| *v >= 1)
        .unwrap_or(default_size as u64) as usize;
    (page, page_size)
}

/// String param that treats missing, empty and the UI's "all" sentinel as
/// no filter.
pub fn filter_param(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && *v != "all")
        .map(|v| v.to_string())
}

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}
