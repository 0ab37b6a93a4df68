use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use crate::configuration::{DatabaseSettings, Settings, StorageBackend};
use crate::error::{AppError, AuthError};
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{get_current_user, health_check, login, refresh_token, register, revoke, revoke_all};
use crate::state::AppState;
use crate::store::{
    InMemoryCredentialStore, InMemoryRefreshTokenLedger, PgCredentialStore, PgRefreshTokenLedger,
};

/// Build the HTTP server around already-validated state
pub fn run(listener: TcpListener, state: AppState) -> Result<Server, std::io::Error> {
    let jwt_config = state.jwt.clone();
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(state.clone())
            .app_data(json_config())

            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/authentication")
                    // Public routes
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refreshtoken", web::post().to(refresh_token))

                    // Protected routes (require a live access token)
                    .service(
                        web::resource("/me")
                            .wrap(JwtMiddleware::new(jwt_config.clone()))
                            .route(web::get().to(get_current_user)),
                    )
                    .service(
                        web::resource("/revoke")
                            .wrap(JwtMiddleware::new(jwt_config.clone()))
                            .route(web::post().to(revoke)),
                    )
                    .service(
                        web::resource("/revoke-all")
                            .wrap(JwtMiddleware::new(jwt_config.clone()))
                            .route(web::post().to(revoke_all)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}

/// Malformed or incomplete JSON bodies are answered with "Invalid payload"
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(16 * 1024)
        .error_handler(|err, _req| {
            tracing::warn!(error = %err, "Rejected request payload");
            AppError::Auth(AuthError::InvalidPayload).into()
        })
}

/// Wire the configured storage backend into application state
pub async fn build_state(settings: &Settings) -> Result<AppState, AppError> {
    let state = match settings.application.storage {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; users and refresh tokens are lost on restart");
            AppState::new(
                Arc::new(InMemoryCredentialStore::new()),
                Arc::new(InMemoryRefreshTokenLedger::new()),
                settings.jwt.clone(),
            )?
        }
        StorageBackend::Postgres => {
            let pool = get_connection_pool(&settings.database).await?;
            tracing::info!("Database connection pool created successfully");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;

            AppState::new(
                Arc::new(PgCredentialStore::new(pool.clone())),
                Arc::new(PgRefreshTokenLedger::new(pool)),
                settings.jwt.clone(),
            )?
        }
    };
    Ok(state)
}

pub async fn get_connection_pool(config: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.username)
        .password(&config.password)
        .database(&config.database_name);

    if config.sensitive_data_logging {
        options.log_statements(log::LevelFilter::Info);
    } else {
        options.disable_statement_logging();
    }

    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(config.timeout_seconds))
        .connect_with(options)
        .await
}
