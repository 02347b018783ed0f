use std::fs::{self, File, OpenOptions};
use std::io::{self, Error, ErrorKind};
use std::path::Path;
use std::str::FromStr;

use slog::Drain;
use slog::Level;
use slog::Logger;

use super::log_format::LineFormat;

/// init_logger builds a root logger that appends to the file at `path`, dropping records
/// below `level` ("trace", "debug", "info", "warn", ...).
pub fn init_logger<P: AsRef<Path>>(path: P, level: &str) -> io::Result<Logger> {
    let level = parse_level(level)?;
    let file = open_log_file(path)?;

    let decorator = slog_term::PlainDecorator::new(file);
    let drain = LineFormat::new(decorator).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = drain.filter_level(level).fuse();

    let logger = Logger::root(drain, slog::o!());

    slog::info!(logger, "logger ready"; "level" => level.as_str());
    Ok(logger)
}

fn parse_level(level: &str) -> io::Result<Level> {
    Level::from_str(level).map_err(|_| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("unknown log level: {}", level),
        )
    })
}

/// Opens log file with append mode. Creates a new log file if it doesn't exist.
fn open_log_file<P: AsRef<Path>>(path: P) -> io::Result<File> {
    let path = path.as_ref();
    let parent = path.parent().ok_or_else(|| {
        Error::new(
            ErrorKind::Other,
            "Unable to get parent directory of log file",
        )
    })?;
    if !parent.as_os_str().is_empty() && !parent.is_dir() {
        fs::create_dir_all(parent)?
    }
    OpenOptions::new().append(true).create(true).open(path)
}
