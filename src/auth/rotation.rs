/// Refresh token rotation
///
/// Exchanges an access token (expired or not) and its refresh secret for a
/// new pair. Checks run in a fixed order and the first failure decides the
/// outcome:
///
/// 1. access token signature and algorithm, `exp` present  -> `invalid token`
/// 2. refresh record exists                                -> `invalid tokens`
/// 3. record `jwt_id` and owner match the token            -> `invalid tokens`
/// 4. record not past its expiry date                      -> `expired tokens`
/// 5. record not used, not revoked                         -> `invalid tokens`
/// 6. owner still exists; new pair built; old record marked used and the new
///    one stored in a single compare-and-set               -> `invalid tokens` on a lost race
///
/// Backend and signing failures become `Server error`.

use chrono::Utc;

use crate::auth::issuance::prepare_token_pair;
use crate::auth::jwt::{validate_access_token, Lifetime};
use crate::configuration::JwtSettings;
use crate::domain::{TokenPair, TokenRequest};
use crate::error::{AppError, RefreshError};
use crate::store::{CredentialStore, Redemption, RefreshTokenLedger};

pub async fn rotate_tokens(
    request: &TokenRequest,
    credentials: &dyn CredentialStore,
    ledger: &dyn RefreshTokenLedger,
    config: &JwtSettings,
) -> Result<TokenPair, RefreshError> {
    let claims = validate_access_token(&request.token, config, Lifetime::Skip).map_err(|e| {
        tracing::warn!(error = %e, "Access token failed verification");
        RefreshError::InvalidToken
    })?;
    let token_user_id = claims.user_id().map_err(|_| RefreshError::InvalidToken)?;

    let record = ledger
        .find_by_token(&request.refresh_token)
        .await
        .map_err(server_error)?
        .ok_or_else(|| {
            tracing::warn!(jwt_id = %claims.jti, "Refresh token not found");
            RefreshError::InvalidTokens
        })?;

    if record.jwt_id != claims.jti || record.user_id != token_user_id {
        tracing::warn!(
            refresh_token_id = record.id,
            jwt_id = %claims.jti,
            "Refresh token presented with a foreign access token"
        );
        return Err(RefreshError::InvalidTokens);
    }

    if record.is_expired_at(Utc::now()) {
        tracing::info!(refresh_token_id = record.id, "Refresh token expired");
        return Err(RefreshError::ExpiredTokens);
    }

    if record.is_used {
        tracing::warn!(
            refresh_token_id = record.id,
            user_id = %record.user_id,
            "Replay of a used refresh token"
        );
        return Err(RefreshError::InvalidTokens);
    }

    if record.is_revoked {
        tracing::warn!(refresh_token_id = record.id, "Attempt to use revoked refresh token");
        return Err(RefreshError::InvalidTokens);
    }

    let user = credentials
        .find_by_id(record.user_id)
        .await
        .map_err(server_error)?
        .ok_or(RefreshError::InvalidTokens)?;

    let prepared = prepare_token_pair(&user, config).map_err(server_error)?;

    match ledger
        .redeem(&request.refresh_token, prepared.record)
        .await
        .map_err(server_error)?
    {
        Redemption::Redeemed(stored) => {
            tracing::info!(
                user_id = %user.id,
                redeemed_id = record.id,
                refresh_token_id = stored.id,
                "Token pair rotated"
            );
            Ok(prepared.pair)
        }
        Redemption::Conflict => {
            tracing::warn!(refresh_token_id = record.id, "Lost redemption race");
            Err(RefreshError::InvalidTokens)
        }
    }
}

fn server_error(err: AppError) -> RefreshError {
    tracing::error!(error = %err, "Token rotation failed");
    RefreshError::ServerError
}
