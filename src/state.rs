use std::sync::Arc;

use crate::configuration::JwtSettings;
use crate::error::ConfigError;
use crate::store::{CredentialStore, RefreshTokenLedger};

/// Shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<dyn CredentialStore>,
    pub ledger: Arc<dyn RefreshTokenLedger>,
    pub jwt: JwtSettings,
}

impl AppState {
    /// Fails if the JWT settings could ever produce a weakly signed token,
    /// so no server can be built around them.
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        ledger: Arc<dyn RefreshTokenLedger>,
        jwt: JwtSettings,
    ) -> Result<Self, ConfigError> {
        jwt.validate()?;
        Ok(Self {
            credentials,
            ledger,
            jwt,
        })
    }
}
