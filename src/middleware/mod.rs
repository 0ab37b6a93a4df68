/// Middleware module
///
/// Bearer-token guard for the protected account routes.

mod jwt_middleware;

pub use jwt_middleware::JwtMiddleware;
