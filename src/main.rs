use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use camix::{ChatServer, Config, ServiceRegistry, SessionSettings};

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = camix::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        camix::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Camix chat server");

    let registry = match ServiceRegistry::new(config.chat.default_channel.clone()) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            error!("Failed to create the channel registry: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let server = match ChatServer::bind(&config.server).await {
        Ok(server) => server,
        Err(e) => {
            error!(
                "Failed to bind {}:{}: {}",
                config.server.host, config.server.port, e
            );
            return ExitCode::FAILURE;
        }
    };

    let settings = SessionSettings::from(&config.chat);
    tokio::select! {
        result = server.serve(registry, settings) => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return ExitCode::FAILURE;
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    ExitCode::SUCCESS
}
