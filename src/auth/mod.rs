/// Authentication module
///
/// Access token signing and verification, refresh secrets and records,
/// pair issuance and the rotation engine.

mod claims;
mod issuance;
mod jwt;
mod password;
mod refresh_token;
mod rotation;

pub use claims::Claims;
pub use issuance::{issue_token_pair, prepare_token_pair, PreparedPair};
pub use jwt::{generate_access_token, sign_claims, validate_access_token, Lifetime, SIGNING_ALGORITHM};
pub use password::{hash_password, hash_password_with_cost, verify_password, DummyHash};
pub use refresh_token::{generate_refresh_token, hash_token, NewRefreshToken, RefreshTokenRecord};
pub use rotation::rotate_tokens;
