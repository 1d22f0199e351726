use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::StartupError;

/// Maps the numeric log level (Debug(-1) through Fatal(5)) onto a tracing level.
/// Everything at or above Error collapses into `error`.
pub fn level_directive(log_level: i8) -> Result<&'static str, StartupError> {
    match log_level {
        -1 => Ok("debug"),
        0 => Ok("info"),
        1 => Ok("warn"),
        2..=5 => Ok("error"),
        other => Err(StartupError::Logger(format!(
            "log level {other} is outside the supported range -1..=5"
        ))),
    }
}

pub fn init_logging(log_level: i8, log_dir: Option<&str>) -> Result<(), StartupError> {
    let level = level_directive(log_level)?;

    // Log to a file: JSON format, daily rotation
    let file_layer = match log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("server")
                .filename_suffix("log")
                .build(dir)
                .map_err(|e| StartupError::Logger(format!("cannot write logs to {dir}: {e}")))?;
            Some(fmt::layer().with_writer(appender).with_ansi(false).json())
        }
        None => None,
    };

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // RUST_LOG takes precedence over the configured level.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},sqlx::query=warn")));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| StartupError::Logger(e.to_string()))
}
