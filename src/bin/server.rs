use std::process::ExitCode;

use bookmark_service::VERSION;
use bookmark_service::config::{Args, ServerConfig};
use bookmark_service::error::StartupError;
use bookmark_service::logging::init_logging;
use bookmark_service::server::{BookmarkServer, shutdown_signal};
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The logger may be the thing that failed, so stderr always gets the message.
            error!(error = %e, "Server exited with error.");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), StartupError> {
    let config = ServerConfig::load(&args)?;
    config.port()?;

    init_logging(config.log_level, config.log_dir.as_deref())?;
    info!(version = VERSION, "Starting bookmark server.");
    info!(database = %config.database_file().display(), "Started the service with db.");

    let server = BookmarkServer::initialize(&config).await?;
    server.serve_with_shutdown(shutdown_signal()).await
}
