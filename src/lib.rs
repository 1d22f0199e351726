pub mod bookmark_v1 {
    tonic::include_proto!("bookmark_v1");
}

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod server;

/// Build version, overridable through `APP_VERSION` at compile time.
pub const VERSION: &str = match option_env!("APP_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};
