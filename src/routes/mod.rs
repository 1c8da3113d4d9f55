use actix_web::{web, HttpResponse, Responder};
use log::warn;

use crate::types::{AppState, HealthStatus, ResponsePayload};

pub mod url_mapping;

// Handler function for the root route "/"
async fn index() -> impl Responder {
    let welcome_message = ResponsePayload {
        status: 200,
        message: String::from("Welcome! POST a long_url to /api/urls to shorten it."),
    };

    HttpResponse::Ok().json(welcome_message)
}

// Handler function for the health check endpoint
async fn health_check(data: web::Data<AppState>) -> impl Responder {
    let uptime = data.start_time.elapsed().as_secs();

    let db_health = match data.db.health_check().await {
        Ok(health) => Some(health),
        Err(e) => {
            warn!("Database health check failed: {}", e);
            None
        }
    };

    let status = HealthStatus {
        status: String::from("OK"),
        version: data.version.clone(),
        db_health,
        uptime_seconds: uptime,
    };

    HttpResponse::Ok().json(status)
}

// Configure service-level routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index));
    cfg.route("/health", web::get().to(health_check));
}
