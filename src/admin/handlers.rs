use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub backends_total: usize,
    pub backends_alive: usize,
}

#[derive(Debug, Serialize)]
pub struct BackendStatus {
    pub name: String,
    pub address: String,
    pub alive: bool,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let alive = state.pool.alive_count();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if alive > 0 { "operational" } else { "unavailable" },
        backends_total: state.pool.len(),
        backends_alive: alive,
    })
}

pub async fn get_backends(State(state): State<AdminState>) -> Json<Vec<BackendStatus>> {
    let statuses = state
        .pool
        .backends()
        .iter()
        .map(|b| BackendStatus {
            name: b.name().to_string(),
            address: b.address().to_string(),
            alive: b.is_alive(),
        })
        .collect();

    Json(statuses)
}
