use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::models::{OracleIdentity, INDEXES_PER_ORACLE};
use crate::registry::AccountRegistry;

#[derive(Debug, Serialize)]
pub struct OracleEntry {
    pub address: OracleIdentity,
    pub indexes: [u8; INDEXES_PER_ORACLE],
}

pub async fn root() -> &'static str {
    "Flight Oracle Server"
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn api_info() -> Json<Value> {
    Json(json!({
        "message": "An API for use with your Dapp!"
    }))
}

/// Registered oracles and their indexes, ordered by address.
pub async fn list_oracles(State(registry): State<Arc<AccountRegistry>>) -> Json<Vec<OracleEntry>> {
    let mut entries: Vec<OracleEntry> = registry
        .iter()
        .map(|(oracle, assignment)| OracleEntry {
            address: oracle.clone(),
            indexes: assignment.indexes(),
        })
        .collect();
    entries.sort_by(|a, b| a.address.cmp(&b.address));
    Json(entries)
}
