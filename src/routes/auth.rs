/// Authentication Routes
///
/// Registration, login, token refresh, and bearer-protected account routes.
/// Every response body is an `AuthResult` envelope except `/me`.

use actix_web::{web, HttpResponse, ResponseError};
use serde::Serialize;

use crate::auth::{issue_token_pair, rotate_tokens, Claims};
use crate::domain::{AuthResult, LoginRequest, RegisterRequest, RevokeRequest, TokenRequest};
use crate::error::{AppError, AuthError, ErrorContext, RefreshError};
use crate::logger::RequestId;
use crate::state::AppState;
use crate::store::NewUser;
use crate::validators::{is_valid_email, is_valid_name, require};

/// Current user information
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// POST /api/authentication/register
///
/// # Errors
/// - 400: missing fields, invalid email, password policy, "Email already exists."
/// - 500: storage failure
pub async fn register(
    form: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
    request_id: web::ReqData<RequestId>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new(&request_id, "user_registration");

    let name = is_valid_name(&form.name)?;
    let email = is_valid_email(&form.email)?;
    require("password", &form.password)?;

    let user = state
        .credentials
        .register(NewUser {
            name,
            email,
            password: form.password.clone(),
        })
        .await?;

    let pair = issue_token_pair(&user, state.ledger.as_ref(), &state.jwt).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User registered successfully"
    );

    Ok(HttpResponse::Ok().json(AuthResult::success(pair)))
}

/// POST /api/authentication/login
///
/// Unknown email and wrong password produce the same "Invalid credentials"
/// answer so accounts cannot be enumerated.
pub async fn login(
    form: web::Json<LoginRequest>,
    state: web::Data<AppState>,
    request_id: web::ReqData<RequestId>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new(&request_id, "user_login");

    let email = is_valid_email(&form.email).map_err(|_| AuthError::InvalidPayload)?;
    require("password", &form.password).map_err(|_| AuthError::InvalidPayload)?;

    let user = state
        .credentials
        .authenticate(&email, &form.password)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let pair = issue_token_pair(&user, state.ledger.as_ref(), &state.jwt).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(AuthResult::success(pair)))
}

/// POST /api/authentication/refreshtoken
///
/// Exchanges `{token, refreshToken}` for a new pair. The access token may be
/// expired. Rejections are answered here and never escape as faults:
/// "invalid token", "invalid tokens", "expired tokens" or "Server error".
pub async fn refresh_token(
    form: web::Json<TokenRequest>,
    state: web::Data<AppState>,
    request_id: web::ReqData<RequestId>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new(&request_id, "token_refresh");

    require("token", &form.token).map_err(|_| AuthError::InvalidPayload)?;
    require("refreshToken", &form.refresh_token).map_err(|_| AuthError::InvalidPayload)?;

    match rotate_tokens(
        &form,
        state.credentials.as_ref(),
        state.ledger.as_ref(),
        &state.jwt,
    )
    .await
    {
        Ok(pair) => {
            tracing::info!(request_id = %context.request_id, "Token refreshed successfully");
            Ok(HttpResponse::Ok().json(AuthResult::success(pair)))
        }
        Err(rejection) => {
            let error = AppError::Refresh(rejection);
            context.log_error(&error);
            Ok(HttpResponse::build(error.status_code())
                .json(AuthResult::failure(vec![error.public_message()])))
        }
    }
}

/// GET /api/authentication/me
///
/// Requires `Authorization: Bearer <access_token>`; claims are injected by
/// the JWT middleware.
pub async fn get_current_user(
    claims: web::ReqData<Claims>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = state
        .credentials
        .find_by_id(user_id)
        .await?
        .ok_or(AuthError::TokenInvalid)?;

    Ok(HttpResponse::Ok().json(UserResponse {
        id: user.id.to_string(),
        name: user.name,
        email: user.email,
    }))
}

/// POST /api/authentication/revoke
///
/// Revokes one of the caller's refresh tokens.
pub async fn revoke(
    claims: web::ReqData<Claims>,
    form: web::Json<RevokeRequest>,
    state: web::Data<AppState>,
    request_id: web::ReqData<RequestId>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let context = ErrorContext::new(&request_id, "refresh_token_revoke").with_user_id(user_id.to_string());

    require("refreshToken", &form.refresh_token).map_err(|_| AuthError::InvalidPayload)?;

    let record = state
        .ledger
        .find_by_token(&form.refresh_token)
        .await?
        .filter(|record| record.user_id == user_id)
        .ok_or(RefreshError::InvalidTokens)?;

    state.ledger.revoke(&form.refresh_token).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        refresh_token_id = record.id,
        "Refresh token revoked"
    );

    Ok(HttpResponse::Ok().json(AuthResult::acknowledged()))
}

/// POST /api/authentication/revoke-all
///
/// Revokes every refresh token of the caller.
pub async fn revoke_all(
    claims: web::ReqData<Claims>,
    state: web::Data<AppState>,
    request_id: web::ReqData<RequestId>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let revoked = state.ledger.revoke_all_for_user(user_id).await?;

    tracing::info!(
        request_id = %request_id.as_str(),
        user_id = %user_id,
        revoked,
        "All refresh tokens revoked for user"
    );

    Ok(HttpResponse::Ok().json(AuthResult::acknowledged()))
}
