use std::rc::Rc;
use std::time::Instant;

use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::Error;
use futures_util::future::{ok, LocalBoxFuture, Ready};
use log::debug;
use uuid::Uuid;

use super::rate_limit::client_key;

const REQUEST_ID: &str = "x-request-id";

/// Tags every response with an `X-Request-ID` and, when enabled, logs the
/// request/response pair at debug level with the rate-limit client key.
///
/// An inbound `X-Request-ID` is echoed back; otherwise a fresh v4 UUID is
/// generated for the request.
pub struct RequestLogger {
    enabled: bool,
}

impl RequestLogger {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestLoggerMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RequestLoggerMiddleware {
            service: Rc::new(service),
            enabled: self.enabled,
        })
    }
}

pub struct RequestLoggerMiddleware<S> {
    service: Rc<S>,
    enabled: bool,
}

fn request_id(req: &ServiceRequest) -> HeaderValue {
    req.headers()
        .get(REQUEST_ID)
        .filter(|value| !value.is_empty())
        .cloned()
        .unwrap_or_else(|| {
            HeaderValue::from_str(&Uuid::new_v4().to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
        })
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let id = request_id(&req);
        let enabled = self.enabled;
        let shown = id.to_str().unwrap_or("-").to_owned();

        let started = Instant::now();
        let client = client_key(req.request());
        let method = req.method().clone();
        let path = req.path().to_owned();
        if enabled {
            debug!("-> [{}] {} {} from {}", shown, method, path, client);
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let mut res = fut.await?;
            if enabled {
                debug!(
                    "<- [{}] {} {} from {}: {} in {:?}",
                    shown,
                    method,
                    path,
                    client,
                    res.status(),
                    started.elapsed()
                );
            }
            res.headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID), id);
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{test, web, App, HttpResponse};

    use super::*;

    async fn ids_for(requests: Vec<test::TestRequest>) -> Vec<String> {
        let app = test::init_service(
            App::new()
                .wrap(RequestLogger::new(false))
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let mut ids = Vec::new();
        for req in requests {
            let res = test::call_service(&app, req.uri("/").to_request()).await;
            let id = res
                .headers()
                .get(REQUEST_ID)
                .expect("response carries a request id")
                .to_str()
                .unwrap()
                .to_string();
            ids.push(id);
        }
        ids
    }

    #[actix_web::test]
    async fn test_each_request_gets_its_own_id() {
        let ids = ids_for(vec![test::TestRequest::get(), test::TestRequest::get()]).await;

        assert_ne!(ids[0], ids[1]);
        for id in &ids {
            assert!(Uuid::parse_str(id).is_ok(), "{} is not a uuid", id);
        }
    }

    #[actix_web::test]
    async fn test_inbound_request_id_is_echoed() {
        let ids = ids_for(vec![
            test::TestRequest::get().insert_header((REQUEST_ID, "trace-42")),
            test::TestRequest::get().insert_header((REQUEST_ID, "")),
        ])
        .await;

        assert_eq!(ids[0], "trace-42");
        assert!(Uuid::parse_str(&ids[1]).is_ok());
    }
}
