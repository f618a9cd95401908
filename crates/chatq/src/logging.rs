use chrono::Local;
use std::io;
use std::path::PathBuf;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "info,chatq=debug";

/// Initialize tracing with a file logger writing to a timestamp-named file in
/// the user data directory. Stdout stays reserved for the conversation.
///
/// The filter comes from RUST_LOG, falling back to `info,chatq=debug`;
/// `debug` forces debug level everywhere. Returns the log file path.
pub fn init_tracing(debug: bool) -> io::Result<PathBuf> {
    let log_dir = dirs::data_dir()
        .ok_or_else(|| io::Error::other("could not determine data directory"))?
        .join("chatq")
        .join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_name = format!("{}.log", Local::now().format("%Y%m%d_%H%M%S"));
    let file_appender = rolling::never(&log_dir, &file_name);

    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::Layer::new()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter);

    tracing::subscriber::set_global_default(subscriber).map_err(io::Error::other)?;

    let path = log_dir.join(file_name);
    tracing::debug!(
        target: "chatq::logging",
        path = %path.display(),
        "Tracing initialized with file output"
    );
    Ok(path)
}
