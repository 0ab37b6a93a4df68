/// Password Hashing and Verification
///
/// bcrypt does the hashing; this module only enforces the password policy
/// reported back to registering users.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 72;

/// Hash a password using bcrypt at the default cost
///
/// # Errors
/// Returns error if the password violates the policy or hashing fails
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash_password_with_cost(password, DEFAULT_COST)
}

/// Hash a password using bcrypt at an explicit cost
pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, AppError> {
    validate_password_strength(password)?;

    hash(password, cost).map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
///
/// # Errors
/// Returns error if the stored hash is malformed
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

const DUMMY_PASSWORD: &str = "Unknown-Account-0";

/// Stand-in for the stored hash of an account that does not exist.
///
/// Verifying against it costs one bcrypt run at the store's cost, so a login
/// for an unknown email takes as long as one with a wrong password.
#[derive(Clone)]
pub struct DummyHash(Option<String>);

impl DummyHash {
    pub fn with_cost(cost: u32) -> Self {
        let hash = hash(DUMMY_PASSWORD, cost)
            .map_err(|e| tracing::warn!(error = %e, "Dummy password hash unavailable"))
            .ok();
        Self(hash)
    }

    /// Burn a verification. Never matches.
    pub fn verify(&self, password: &str) -> bool {
        if let Some(hash) = &self.0 {
            let _ = verify(password, hash);
        }
        false
    }
}

/// Requirements:
/// - 8 to 72 bytes (bcrypt truncates beyond 72)
/// - At least one digit, one lowercase and one uppercase letter
/// - At least one non-alphanumeric character
fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        ));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        ));
    }

    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());
    let has_symbol = password.chars().any(|c| !c.is_alphanumeric());

    if !has_digit {
        return Err(ValidationError::Rejected(
            "Passwords must have at least one digit ('0'-'9').".to_string(),
        ));
    }
    if !has_lowercase {
        return Err(ValidationError::Rejected(
            "Passwords must have at least one lowercase ('a'-'z').".to_string(),
        ));
    }
    if !has_uppercase {
        return Err(ValidationError::Rejected(
            "Passwords must have at least one uppercase ('A'-'Z').".to_string(),
        ));
    }
    if !has_symbol {
        return Err(ValidationError::Rejected(
            "Passwords must have at least one non alphanumeric character.".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_password() {
        let password = "P@ssw0rd1";
        let hash = hash_password_with_cost(password, TEST_COST).expect("Failed to hash password");

        assert_ne!(password, hash);
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password_with_cost("P@ssw0rd1", TEST_COST).unwrap();

        assert!(verify_password("P@ssw0rd1", &hash).unwrap());
        assert!(!verify_password("P@ssw0rd2", &hash).unwrap());
    }

    #[test]
    fn test_too_short_password() {
        assert!(hash_password_with_cost("P@ss1", TEST_COST).is_err());
    }

    #[test]
    fn test_too_long_password() {
        let long_password = "a".repeat(MAX_PASSWORD_LENGTH) + "A1!";
        assert!(hash_password_with_cost(&long_password, TEST_COST).is_err());
    }

    #[test]
    fn test_policy_messages() {
        let cases = [
            ("NoDigits!!", "digit"),
            ("NOLOWER1!", "lowercase"),
            ("noupper1!", "uppercase"),
            ("NoSymbol123", "non alphanumeric"),
        ];

        for (password, fragment) in cases {
            let err = validate_password_strength(password).unwrap_err();
            assert!(
                err.to_string().contains(fragment),
                "{} should fail on {}",
                password,
                fragment
            );
        }
    }

    #[test]
    fn test_dummy_hash_uses_requested_cost_and_never_matches() {
        let dummy = DummyHash::with_cost(TEST_COST);

        assert!(dummy.0.as_deref().unwrap().starts_with("$2b$04$"));
        assert!(!dummy.verify("P@ssw0rd1"));
        assert!(!dummy.verify(DUMMY_PASSWORD));
    }

    #[test]
    fn test_malformed_hash() {
        assert!(verify_password("P@ssw0rd1", "not-a-bcrypt-hash").is_err());
    }
}
