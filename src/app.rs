use std::{sync::Arc, time::Instant};

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{debug, info};

use crate::{
    config::{Config, Environment},
    db::Database,
    errors::AppError,
    middleware::{RateLimiter, RequestLogger},
    rate_limit::BucketRegistry,
    routes,
    services::{self, ShortenerServiceType},
    types::AppState,
};

// Custom result type for the application
pub type AppResult<T> = Result<T, AppError>;

// Setup logging with custom format and configuration
fn setup_logging(config: &Config) -> AppResult<()> {
    let log_level = match config.app.environment {
        Environment::Development => config.app.log_level.clone(),
        Environment::Testing => "debug,actix_web=info".to_string(),
        Environment::Production => "info,actix_web=warn".to_string(),
    };

    let env = Env::default()
        .filter_or("RUST_LOG", log_level)
        .write_style_or("RUST_LOG_STYLE", "always");

    env_logger::try_init_from_env(env)
        .map_err(|e| AppError::Logger(format!("Failed to initialize logger: {}", e)))
}

pub async fn server() -> AppResult<()> {
    let config = Config::load()?;

    setup_logging(&config)?;

    // Capture start time for uptime calculation
    let start_time = Instant::now();

    info!("Starting {} v{}", config.app.name, config.app.version);
    info!("Environment: {:?}", config.app.environment);
    info!(
        "Binding to {}:{} with {} workers",
        config.server.host, config.server.port, config.server.workers
    );

    if config.app.environment == Environment::Development {
        debug!("Full configuration: {:?}", config);
    }

    let db = Database::connect(&config.db).await?;

    // One registry for the whole server, shared by every worker
    let limit = config.rate_limit.bucket_limit()?;
    let registry = Arc::new(BucketRegistry::new());
    info!(
        "Rate limiting clients to {} requests per {:?}",
        limit.capacity(),
        limit.refill_period()
    );

    let shortener: web::Data<ShortenerServiceType> =
        web::Data::new(services::build(&db, &config.shortener));

    let enable_debug_logging = config.app.environment != Environment::Production;

    let log_format = if enable_debug_logging {
        "%a \"%r\" %s %b %T \"%{Referer}i\" \"%{User-Agent}i\" %{X-Request-ID}o"
    } else {
        "%a \"%r\" %s %b %T"
    };

    let version = config.app.version.clone();
    let server_db = db.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(AppState {
                start_time,
                db: server_db.clone(),
                version: version.clone(),
            }))
            .app_data(shortener.clone())
            .wrap(RateLimiter::new(Arc::clone(&registry), limit))
            .wrap(RequestLogger::new(enable_debug_logging))
            .wrap(Cors::permissive())
            .wrap(Logger::new(log_format))
            .configure(routes::configure_routes)
            .configure(routes::url_mapping::configure_routes::<ShortenerServiceType>)
    })
    .workers(config.server.workers)
    .bind((config.server.host.to_string(), config.server.port))?
    .run()
    .await?;

    db.shutdown().await;

    Ok(())
}
