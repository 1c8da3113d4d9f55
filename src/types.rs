use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::{
    db::{Database, DatabaseHealth},
    errors::AppError,
};

// Result type for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Serialize, Deserialize)]
pub struct ResponsePayload {
    pub status: i32,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub db_health: Option<DatabaseHealth>,
    pub uptime_seconds: u64,
}

// Shared application state
pub struct AppState {
    pub start_time: Instant,
    pub db: Database,
    pub version: String,
}
