use actix_web::web;

use crate::{
    handlers::{create_handler, metadata_handler, redirect_handler},
    services::ShortenerServiceTrait,
};

// Configure short URL routes for the given service type
pub fn configure_routes<S: ShortenerServiceTrait + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/urls")
            .route("", web::post().to(create_handler::<S>))
            .route("/{code}", web::get().to(metadata_handler::<S>)),
    )
    .route("/r/{code}", web::get().to(redirect_handler::<S>));
}
