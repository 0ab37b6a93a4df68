use actix_web::HttpResponse;

/// GET /health_check
///
/// Answers 200 with an empty body as long as the server accepts requests.
/// Storage is not probed.
pub async fn health_check() -> HttpResponse {
    tracing::debug!("Liveness probe");
    HttpResponse::Ok().finish()
}
