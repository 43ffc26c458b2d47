use std::process::ExitCode;

use tracing::{error, info};

use account_directory::app_system::{setup_tracing, DirectorySystem, SystemOptions};
use account_directory::config::DirectoryConfig;
use account_directory::routes::router;
use account_directory::state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match DirectoryConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    setup_tracing(config.log_format);

    match run(config).await {
        Ok(()) => {
            info!("Application completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Directory service failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: DirectoryConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        data_dir = ?config.data_dir,
        allowed_origins = ?config.allowed_origins,
        timeout_ms = config.request_timeout.as_millis() as u64,
        "Starting account directory"
    );

    let system = DirectorySystem::start(SystemOptions::from(&config))?;
    let state = AppState::new(
        system.accounts.clone(),
        system.settings.clone(),
        config.allowed_origins.clone(),
        config.request_timeout,
    );
    let app = router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("directory listening on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // stop the actors even if the server failed
    system.shutdown().await?;
    served?;
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
