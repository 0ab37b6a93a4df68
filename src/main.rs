use std::net::TcpListener;
use secure_api::configuration::get_configuration;
use secure_api::startup::{build_state, run};
use secure_api::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    // Invalid settings (e.g. a short signing secret) stop the process here
    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!(storage = ?config.application.storage, "Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error"
            ));
        }
    };

    let state = build_state(&configuration).await.map_err(|e| {
        tracing::error!("Failed to initialise storage: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, "Storage initialisation error")
    })?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, state)?.await
}
