//! Rate-limit middleware keyed by client IP.

use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, ResponseError};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::error::AppError;
use crate::services::rate_limit::{RateLimitDecision, RateLimitStore};

/// Middleware factory.
#[derive(Clone)]
pub struct RateLimit {
    store: Arc<dyn RateLimitStore>,
}

impl RateLimit {
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        Self { store }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
            store: self.store.clone(),
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    store: Arc<dyn RateLimitStore>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let store = self.store.clone();
        // Socket peer only; forwarding headers are client-controlled.
        let client = req
            .peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Box::pin(async move {
            match store.hit(&client, Instant::now()).await {
                RateLimitDecision::Allowed { .. } => {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                RateLimitDecision::Limited { retry_after_secs } => {
                    warn!(
                        target: "api",
                        client = %client,
                        path = %req.path(),
                        retry_after_secs,
                        "Rate limit exceeded"
                    );
                    let response = AppError::TooManyRequests(retry_after_secs).error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::rate_limit::InMemoryRateLimitStore;
    use actix_web::{test, web, App, HttpResponse};
    use std::time::Duration;

    #[actix_web::test]
    async fn test_second_request_is_limited() {
        let store = Arc::new(InMemoryRateLimitStore::new(1, Duration::from_secs(60)));
        let app = test::init_service(
            App::new()
                .wrap(RateLimit::new(store))
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let first = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(first.status().is_success());

        let second = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(second.status().as_u16(), 429);
        assert!(second.headers().contains_key("retry-after"));
    }

    #[actix_web::test]
    async fn test_forwarded_headers_do_not_change_the_client_key() {
        let store = Arc::new(InMemoryRateLimitStore::new(1, Duration::from_secs(60)));
        let app = test::init_service(
            App::new()
                .wrap(RateLimit::new(store))
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let peer: std::net::SocketAddr = "10.0.0.1:40000".parse().unwrap();
        let mut statuses = Vec::new();
        for i in 0..5 {
            let req = test::TestRequest::get()
                .uri("/")
                .peer_addr(peer)
                .insert_header(("X-Forwarded-For", format!("1.2.3.{}", i)))
                .insert_header(("Forwarded", format!("for=5.6.7.{}", i)))
                .to_request();
            statuses.push(test::call_service(&app, req).await.status().as_u16());
        }

        assert_eq!(statuses, vec![200, 429, 429, 429, 429]);
    }

    #[actix_web::test]
    async fn test_distinct_peers_have_separate_windows() {
        let store = Arc::new(InMemoryRateLimitStore::new(1, Duration::from_secs(60)));
        let app = test::init_service(
            App::new()
                .wrap(RateLimit::new(store))
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        for peer in ["10.0.0.1:40000", "10.0.0.2:40000"] {
            let req = test::TestRequest::get()
                .uri("/")
                .peer_addr(peer.parse().unwrap())
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status().as_u16(), 200);
        }
    }
}
