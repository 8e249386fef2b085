// core/src/utils/logging.rs
use log::LevelFilter;
use std::path::Path;

/// Maps the `bug-level` config strings onto a level filter.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

/// Installs the global logger. Lines go to `log_file` when given (appending,
/// parent directories created on demand) and to stderr otherwise.
pub fn init(log_file: Option<&Path>, level: LevelFilter) -> Result<(), fern::InitError> {
    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                message
            ))
        })
        .level(level);

    let dispatch = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            dispatch.chain(fern::log_file(path)?)
        }
        None => dispatch.chain(std::io::stderr()),
    };

    dispatch.apply()?;
    Ok(())
}
