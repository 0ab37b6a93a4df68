/// JWT Token Generation and Validation
///
/// Access tokens are HS256-signed. Validation can run with or without the
/// lifetime check: the refresh flow must accept a token that has just expired.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::AppError;

/// The only algorithm this service signs with or accepts
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Whether `exp` is enforced during validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    Enforce,
    Skip,
}

/// Generate a new access token for a user
///
/// Returns the compact token together with its claims so the caller can bind
/// the `jti` to a refresh record.
///
/// # Errors
/// Returns error if token generation fails
pub fn generate_access_token(
    user_id: &Uuid,
    email: &str,
    config: &JwtSettings,
) -> Result<(String, Claims), AppError> {
    let claims = Claims::new(*user_id, email, config);
    let token = sign_claims(&claims, config)?;
    Ok((token, claims))
}

/// Sign arbitrary claims with the configured secret
pub fn sign_claims(claims: &Claims, config: &JwtSettings) -> Result<String, AppError> {
    encode(
        &Header::new(SIGNING_ALGORITHM),
        claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate and extract claims from an access token
///
/// Signature, algorithm and the presence of `exp` are always checked.
/// Issuer and audience are checked only when configured.
///
/// # Errors
/// Returns error if the token is malformed, tampered with, signed with another
/// key or algorithm, or (with [`Lifetime::Enforce`]) expired
pub fn validate_access_token(
    token: &str,
    config: &JwtSettings,
    lifetime: Lifetime,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(SIGNING_ALGORITHM);
    validation.validate_exp = lifetime == Lifetime::Enforce;
    validation.leeway = 0;

    let mut required = vec!["exp"];
    validation.validate_aud = config.audience.is_some();
    if let Some(issuer) = &config.issuer {
        validation.set_issuer(&[issuer]);
        required.push("iss");
    }
    if let Some(audience) = &config.audience {
        validation.set_audience(&[audience]);
        required.push("aud");
    }
    validation.set_required_spec_claims(&required);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;

    if data.header.alg != SIGNING_ALGORITHM {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidAlgorithm.into());
    }

    Ok(data.claims)
}
