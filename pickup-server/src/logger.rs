//! Logging Infrastructure
//!
//! `RUST_LOG` wins when set; otherwise `LOG_LEVEL` applies to this service's
//! crates. Output is plain text or JSON, to stdout or a daily rolling file.

use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Default filter directives for a level
fn default_directives(level: &str) -> String {
    format!("pickup_server={level},shared={level},http_access={level},tower_http=warn")
}

/// Initialize the global subscriber
pub fn init_logger(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true);

    let file_appender = config.dir.as_deref().and_then(|dir| {
        let log_path = Path::new(dir);
        if log_path.is_dir() {
            Some(tracing_appender::rolling::daily(log_path, "pickup-server"))
        } else {
            eprintln!("LOG_DIR {dir} is not a directory, logging to stdout");
            None
        }
    });

    match (config.json, file_appender) {
        (true, Some(writer)) => builder.json().with_writer(writer).init(),
        (true, None) => builder.json().init(),
        (false, Some(writer)) => builder.with_ansi(false).with_writer(writer).init(),
        (false, None) => builder.init(),
    }
}
