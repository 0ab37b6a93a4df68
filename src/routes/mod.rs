mod auth;
mod health_check;

pub use auth::{get_current_user, login, refresh_token, register, revoke, revoke_all, UserResponse};
pub use health_check::health_check;
