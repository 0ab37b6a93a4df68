/// Request and response bodies of the authentication API
///
/// All JSON field names are camelCase on the wire.

use serde::{Deserialize, Serialize};

/// POST /api/authentication/register
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// POST /api/authentication/login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/authentication/refreshtoken
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub token: String,
    pub refresh_token: String,
}

/// POST /api/authentication/revoke
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeRequest {
    pub refresh_token: String,
}

/// A freshly issued access token and its refresh secret
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
    /// `jti` of `token`, also stored on the refresh record
    pub jwt_id: String,
}

/// Response envelope shared by every authentication endpoint
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    pub result: bool,
    pub token: String,
    pub refresh_token: String,
    pub errors: Option<Vec<String>>,
}

impl AuthResult {
    pub fn success(pair: TokenPair) -> Self {
        Self {
            result: true,
            token: pair.token,
            refresh_token: pair.refresh_token,
            errors: None,
        }
    }

    pub fn failure(errors: Vec<String>) -> Self {
        Self {
            result: false,
            token: String::new(),
            refresh_token: String::new(),
            errors: Some(errors),
        }
    }

    /// Success without a token pair, e.g. after a revocation
    pub fn acknowledged() -> Self {
        Self {
            result: true,
            token: String::new(),
            refresh_token: String::new(),
            errors: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_result_serializes_camel_case() {
        let body = AuthResult::success(TokenPair {
            token: "a.b.c".to_string(),
            refresh_token: "secret".to_string(),
            jwt_id: "jti".to_string(),
        });
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["result"], true);
        assert_eq!(json["token"], "a.b.c");
        assert_eq!(json["refreshToken"], "secret");
        assert!(json["errors"].is_null());
        assert!(json.get("jwtId").is_none());
    }

    #[test]
    fn test_failure_carries_errors() {
        let json = serde_json::to_value(AuthResult::failure(vec!["invalid tokens".to_string()]))
            .unwrap();

        assert_eq!(json["result"], false);
        assert_eq!(json["errors"][0], "invalid tokens");
        assert_eq!(json["token"], "");
    }

    #[test]
    fn test_token_request_reads_camel_case() {
        let request: TokenRequest =
            serde_json::from_str(r#"{"token":"t","refreshToken":"r"}"#).unwrap();
        assert_eq!(request.token, "t");
        assert_eq!(request.refresh_token, "r");

        let missing = serde_json::from_str::<TokenRequest>(r#"{"token":"t"}"#);
        assert!(missing.is_err());
    }
}
