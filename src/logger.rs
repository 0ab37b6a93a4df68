use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::{info, warn};
use std::rc::Rc;
use std::time::Instant;

use crate::error::{AppError, ErrorHandler};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id of the current request.
///
/// Minted once by [`LoggerMiddleware`] and stored in the request extensions;
/// handlers take it as `web::ReqData<RequestId>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Request logging middleware
///
/// Logs every request's outcome and latency and tags the response with an
/// `x-request-id` header unless a handler already set one. Errors carried by
/// the response are logged here, under the same id.
/// Query strings are never logged; they may carry credentials.
pub struct LoggerMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggerMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(LoggerMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Rc<S>,
}

fn log_response_error(error: &Error, request_id: &str) {
    match error.as_error::<AppError>() {
        Some(app_error) => app_error.log_error(request_id),
        None => tracing::warn!(request_id = request_id, error = %error, "Request failed"),
    }
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
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
        let start_time = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let request_id = RequestId::new();
        req.extensions_mut().insert(request_id.clone());
        let http_req = req.request().clone();

        let service = self.service.clone();

        Box::pin(async move {
            // Errors raised by inner middleware are rendered here so they get
            // the header and the log line too
            let mut res = match service.call(req).await {
                Ok(res) => res.map_into_left_body(),
                Err(err) => ServiceResponse::from_err(err, http_req).map_into_right_body(),
            };

            let elapsed = start_time.elapsed().as_millis();
            let status = res.status();

            if let Some(error) = res.response().error() {
                log_response_error(error, request_id.as_str());
            }

            let header = HeaderName::from_static(REQUEST_ID_HEADER);
            if !res.headers().contains_key(&header) {
                if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
                    res.headers_mut().insert(header, value);
                }
            }

            if status.is_server_error() {
                warn!("{} {} -> {} ({}ms) [{}]", method, path, status.as_u16(), elapsed, request_id.as_str());
            } else {
                info!("{} {} -> {} ({}ms) [{}]", method, path, status.as_u16(), elapsed, request_id.as_str());
            }

            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use actix_web::{test, web, App, HttpResponse};

    async fn echo_request_id(request_id: web::ReqData<RequestId>) -> HttpResponse {
        HttpResponse::Ok().body(request_id.as_str().to_string())
    }

    async fn always_fails() -> Result<HttpResponse, AppError> {
        Err(AuthError::InvalidCredentials.into())
    }

    fn header_of<B>(res: &ServiceResponse<B>) -> String {
        res.headers()
            .get(REQUEST_ID_HEADER)
            .expect("x-request-id header is set")
            .to_str()
            .unwrap()
            .to_string()
    }

    #[actix_web::test]
    async fn test_handler_sees_the_id_returned_in_the_header() {
        let app = test::init_service(
            App::new()
                .wrap(LoggerMiddleware)
                .route("/echo", web::get().to(echo_request_id)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/echo").to_request()).await;
        let header = header_of(&res);
        let body = test::read_body(res).await;

        assert_eq!(body, header.as_bytes());
    }

    #[actix_web::test]
    async fn test_each_request_gets_its_own_id() {
        let app = test::init_service(
            App::new()
                .wrap(LoggerMiddleware)
                .route("/echo", web::get().to(echo_request_id)),
        )
        .await;

        let first = test::call_service(&app, test::TestRequest::get().uri("/echo").to_request()).await;
        let second = test::call_service(&app, test::TestRequest::get().uri("/echo").to_request()).await;

        assert_ne!(header_of(&first), header_of(&second));
    }

    #[actix_web::test]
    async fn test_error_responses_carry_the_id() {
        let app = test::init_service(
            App::new()
                .wrap(LoggerMiddleware)
                .route("/fail", web::get().to(always_fails)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/fail").to_request()).await;

        assert_eq!(res.status().as_u16(), 400);
        assert!(uuid::Uuid::parse_str(&header_of(&res)).is_ok());
    }
}
