use std::rc::Rc;
use std::sync::Arc;

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpRequest};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use log::{debug, error, warn};

use crate::errors::AppError;
use crate::rate_limit::{BucketLimit, BucketRegistry, Clock, SystemClock};

const FORWARDED_FOR: &str = "X-Forwarded-For";

/// Identifies the client a request is charged to.
///
/// The `X-Forwarded-For` value wins unless it is empty or the `unknown`
/// placeholder some proxies send; otherwise the peer address is used.
pub fn client_key(req: &HttpRequest) -> String {
    let forwarded = req
        .headers()
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("unknown"));

    match forwarded {
        Some(value) => value.to_string(),
        None => req
            .peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    }
}

/// Admission control middleware: one token per request from the client's bucket.
///
/// Requests that find their bucket empty are answered with 429 and never
/// reach the wrapped service.
pub struct RateLimiter<C: Clock + Clone = SystemClock> {
    registry: Arc<BucketRegistry<C>>,
    limit: BucketLimit,
}

impl<C: Clock + Clone> RateLimiter<C> {
    pub fn new(registry: Arc<BucketRegistry<C>>, limit: BucketLimit) -> Self {
        Self { registry, limit }
    }
}

impl<S, B, C> Transform<S, ServiceRequest> for RateLimiter<C>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
    C: Clock + Clone + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S, C>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RateLimiterMiddleware {
            service: Rc::new(service),
            registry: Arc::clone(&self.registry),
            limit: self.limit,
        })
    }
}

pub struct RateLimiterMiddleware<S, C: Clock + Clone> {
    service: Rc<S>,
    registry: Arc<BucketRegistry<C>>,
    limit: BucketLimit,
}

impl<S, B, C> Service<ServiceRequest> for RateLimiterMiddleware<S, C>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
    C: Clock + Clone + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let key = client_key(req.request());
        let decision = self
            .registry
            .resolve(&key, self.limit.capacity(), self.limit.refill_period())
            .and_then(|bucket| Ok((bucket.try_consume(1)?, bucket)));

        match decision {
            Ok((true, bucket)) => {
                debug!(
                    "Admitted client '{}' ({} of {} tokens left)",
                    key,
                    bucket.available_tokens(),
                    bucket.capacity()
                );
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(|res| res.map_into_left_body()) })
            }
            Ok((false, bucket)) => {
                warn!(
                    "Rate limit exceeded for client '{}': {} {} (limit {} per {:?})",
                    key,
                    req.method(),
                    req.path(),
                    bucket.capacity(),
                    bucket.refill_period()
                );
                let res = req.error_response(AppError::TooManyRequests);
                Box::pin(ok(res.map_into_right_body()))
            }
            Err(e) => {
                error!("Admission check failed for client '{}': {}", key, e);
                let res = req.error_response(AppError::from(e));
                Box::pin(ok(res.map_into_right_body()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use actix_web::{http::StatusCode, test, web, App, HttpResponse};
    use serde_json::Value;

    use super::*;
    use crate::rate_limit::ManualClock;

    fn limit(capacity: u64) -> BucketLimit {
        BucketLimit::new(capacity, Duration::from_secs(60)).unwrap()
    }

    fn from(ip: &str) -> test::TestRequest {
        test::TestRequest::get()
            .uri("/")
            .insert_header((FORWARDED_FOR, ip))
    }

    #[actix_web::test]
    async fn test_requests_over_capacity_get_429() {
        let registry = Arc::new(BucketRegistry::new());
        let app = test::init_service(
            App::new()
                .wrap(RateLimiter::new(registry.clone(), limit(3)))
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        for _ in 0..3 {
            let res = test::call_service(&app, from("203.0.113.7").to_request()).await;
            assert_eq!(res.status(), StatusCode::OK);
        }

        let res = test::call_service(&app, from("203.0.113.7").to_request()).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["status_code"], 429);
        assert_eq!(body["message"], "Rate limit exceeded. Try again later.");
        assert_eq!(registry.len(), 1);
    }

    #[actix_web::test]
    async fn test_clients_are_limited_separately() {
        let registry = Arc::new(BucketRegistry::new());
        let app = test::init_service(
            App::new()
                .wrap(RateLimiter::new(registry.clone(), limit(1)))
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let res = test::call_service(&app, from("10.0.0.1").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
        let res = test::call_service(&app, from("10.0.0.1").to_request()).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

        let res = test::call_service(&app, from("10.0.0.2").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(registry.len(), 2);
    }

    #[actix_web::test]
    async fn test_bucket_refills_after_period() {
        let clock = ManualClock::new();
        let registry = Arc::new(BucketRegistry::with_clock(clock.clone()));
        let app = test::init_service(
            App::new()
                .wrap(RateLimiter::new(registry, limit(1)))
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let res = test::call_service(&app, from("ip-A").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
        let res = test::call_service(&app, from("ip-A").to_request()).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

        clock.advance(Duration::from_secs(60));
        let res = test::call_service(&app, from("ip-A").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_client_key_prefers_forwarded_header() {
        let peer: SocketAddr = "192.0.2.10:54321".parse().unwrap();

        let req = test::TestRequest::default()
            .insert_header((FORWARDED_FOR, "198.51.100.4"))
            .peer_addr(peer)
            .to_http_request();
        assert_eq!(client_key(&req), "198.51.100.4");

        let req = test::TestRequest::default()
            .insert_header((FORWARDED_FOR, "Unknown"))
            .peer_addr(peer)
            .to_http_request();
        assert_eq!(client_key(&req), "192.0.2.10");

        let req = test::TestRequest::default()
            .insert_header((FORWARDED_FOR, " "))
            .peer_addr(peer)
            .to_http_request();
        assert_eq!(client_key(&req), "192.0.2.10");

        let req = test::TestRequest::default().to_http_request();
        assert_eq!(client_key(&req), "unknown");
    }
}
