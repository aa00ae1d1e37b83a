//! log4rs setup for embedding processes and tests.
//!
//! Three rolling files are written under the chosen directory: `query.log`
//! (root), `cursor.log` (target `nexusquery::cursor`) and, when enabled,
//! `dev6.log` (target `nexusquery::dev6`).

use std::path::{Path, PathBuf};

use log::LevelFilter;
use log4rs::Handle;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use parking_lot::Mutex;

use crate::errors::DbError;

pub const CURSOR_TARGET: &str = "nexusquery::cursor";

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_RETENTION: u32 = 7;

// log4rs can only be installed once per process; later calls swap the config.
static HANDLE: Mutex<Option<Handle>> = Mutex::new(None);

fn parse_level(level: Option<&str>) -> LevelFilter {
    match level.unwrap_or("info").to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn rolling(base: &Path, stem: &str, keep: u32) -> Result<RollingFileAppender, DbError> {
    let pattern = base.join(format!("{stem}.{{}}.log"));
    let roller = FixedWindowRoller::builder()
        .build(&pattern.display().to_string(), keep)
        .map_err(|e| DbError::Config(format!("log roller for {stem}: {e}")))?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    Ok(RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(base.join(format!("{stem}.log")), Box::new(policy))?)
}

/// Installs (or replaces) the process logger.
///
/// - `dir`: directory for log files, created if missing; defaults to the working directory.
/// - `level`: `off|error|warn|info|debug|trace`, default `info`.
/// - `retention`: number of rolled files kept per log, default 7.
///
/// # Errors
/// Returns `Io` if the directory cannot be created and `Config` if log4rs rejects the setup.
pub fn configure_logging(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<u32>,
) -> Result<(), DbError> {
    configure_logging_with_dev(dir, level, retention, false)
}

/// Like [`configure_logging`], additionally persisting `dev6!` lines to `dev6.log`
/// when `enable_dev6` is set.
///
/// # Errors
/// See [`configure_logging`].
pub fn configure_logging_with_dev(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<u32>,
    enable_dev6: bool,
) -> Result<(), DbError> {
    let base = match dir {
        Some(d) => d.to_path_buf(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    std::fs::create_dir_all(&base)?;
    let keep = retention.unwrap_or(DEFAULT_RETENTION).max(1);
    let lvl = parse_level(level);

    let mut builder = Config::builder()
        .appender(Appender::builder().build("query", Box::new(rolling(&base, "query", keep)?)))
        .appender(Appender::builder().build("cursor", Box::new(rolling(&base, "cursor", keep)?)))
        .logger(Logger::builder().appender("cursor").additive(false).build(CURSOR_TARGET, lvl));

    builder = if enable_dev6 {
        builder
            .appender(Appender::builder().build("dev6", Box::new(rolling(&base, "dev6", keep)?)))
            .logger(
                Logger::builder()
                    .appender("dev6")
                    .additive(false)
                    .build(super::devlog::DEV6_TARGET, LevelFilter::Trace),
            )
    } else {
        builder.logger(Logger::builder().additive(false).build(super::devlog::DEV6_TARGET, LevelFilter::Off))
    };

    let config = builder
        .build(Root::builder().appender("query").build(lvl))
        .map_err(|e| DbError::Config(format!("log config: {e}")))?;

    let mut handle = HANDLE.lock();
    match handle.as_ref() {
        Some(h) => h.set_config(config),
        None => {
            let h = log4rs::init_config(config).map_err(|e| DbError::Config(format!("logger already set: {e}")))?;
            *handle = Some(h);
        }
    }
    Ok(())
}

/// Configures logging from `NEXUSQUERY_LOG_DIR`, `NEXUSQUERY_LOG_LEVEL`,
/// `NEXUSQUERY_LOG_RETENTION` and `NEXUSQUERY_DEV6` (`1|true|yes`).
///
/// # Errors
/// See [`configure_logging`].
pub fn configure_from_env() -> Result<(), DbError> {
    let dir = std::env::var("NEXUSQUERY_LOG_DIR").ok().map(PathBuf::from);
    let level = std::env::var("NEXUSQUERY_LOG_LEVEL").ok();
    let retention = std::env::var("NEXUSQUERY_LOG_RETENTION").ok().and_then(|s| s.parse::<u32>().ok());
    let dev6 = std::env::var("NEXUSQUERY_DEV6")
        .is_ok_and(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));
    configure_logging_with_dev(dir.as_deref(), level.as_deref(), retention, dev6)
}
