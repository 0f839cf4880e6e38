use serde::Deserialize;

use crate::model::Snapshot;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    /// The current full-replace snapshot; `None` until the UI loads one.
    pub snapshot: Option<Snapshot>,
}
