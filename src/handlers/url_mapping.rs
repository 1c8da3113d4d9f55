use actix_web::{http::header::LOCATION, web, HttpResponse, Responder};
use log::{debug, info};

use crate::{
    errors::AppError, models::ShortenUrlRequest, services::ShortenerServiceTrait, types::Result,
};

/// Create short URL route handler
pub async fn create_handler<S: ShortenerServiceTrait + 'static>(
    request: web::Json<ShortenUrlRequest>,
    service: web::Data<S>,
) -> Result<impl Responder> {
    let response = service
        .shorten(request.into_inner())
        .await
        .map_err(AppError::from_creation_failure)?;
    Ok(HttpResponse::Ok().json(response))
}

/// Short URL metadata route handler
pub async fn metadata_handler<S: ShortenerServiceTrait + 'static>(
    code: web::Path<String>,
    service: web::Data<S>,
) -> Result<impl Responder> {
    let metadata = service.metadata(&code).await?;
    Ok(HttpResponse::Ok().json(metadata))
}

/// Redirect route handler
pub async fn redirect_handler<S: ShortenerServiceTrait + 'static>(
    code: web::Path<String>,
    service: web::Data<S>,
) -> Result<impl Responder> {
    let code = code.into_inner();
    debug!("Redirect requested for code: {}", code);

    let target = service.resolve_redirect(&code).await?;

    info!("Redirecting '{}' to '{}'", code, target);
    Ok(HttpResponse::Found()
        .insert_header((LOCATION, target))
        .finish())
}
