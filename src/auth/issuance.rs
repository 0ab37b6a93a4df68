/// Token pair issuance
///
/// A pair is only handed out after its refresh record is in the ledger.

use chrono::Utc;

use crate::auth::jwt::generate_access_token;
use crate::auth::refresh_token::{generate_refresh_token, NewRefreshToken};
use crate::configuration::JwtSettings;
use crate::domain::TokenPair;
use crate::error::AppError;
use crate::store::{RefreshTokenLedger, UserRecord};

/// A signed pair and the ledger record that will back it
#[derive(Debug)]
pub struct PreparedPair {
    pub pair: TokenPair,
    pub record: NewRefreshToken,
}

/// Sign an access token and mint a refresh secret bound to its `jti`.
///
/// Nothing is persisted.
pub fn prepare_token_pair(user: &UserRecord, config: &JwtSettings) -> Result<PreparedPair, AppError> {
    let (token, claims) = generate_access_token(&user.id, &user.email, config)?;
    let refresh_token = generate_refresh_token();
    let record = NewRefreshToken::new(user.id, &refresh_token, &claims.jti, Utc::now())?;

    Ok(PreparedPair {
        pair: TokenPair {
            token,
            refresh_token,
            jwt_id: claims.jti,
        },
        record,
    })
}

/// Issue a new pair for an authenticated user.
///
/// # Errors
/// Fails, returning no tokens, if signing or the ledger insert fails
pub async fn issue_token_pair(
    user: &UserRecord,
    ledger: &dyn RefreshTokenLedger,
    config: &JwtSettings,
) -> Result<TokenPair, AppError> {
    let prepared = prepare_token_pair(user, config)?;
    let stored = ledger.insert(prepared.record).await?;

    tracing::info!(
        user_id = %user.id,
        jwt_id = %stored.jwt_id,
        refresh_token_id = stored.id,
        "Token pair issued"
    );

    Ok(prepared.pair)
}
