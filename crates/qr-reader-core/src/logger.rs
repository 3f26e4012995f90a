//! Minimal logger.
//!
//! Prints `[elapsed LEVEL thread target] message` to stderr. The recognition
//! loop runs on its own named thread, so the thread column is what tells loop
//! diagnostics apart from caller output. Per-target levels let a caller turn
//! on pipeline diagnostics without drowning in everything else.
//!
//! Use [`init_with_level`] or [`init`] to install it once at startup.

use std::fmt;
use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::EnvFilter;

/// Level settings for the stderr logger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LevelFilter,
    /// Per-target overrides. The longest matching module prefix wins.
    pub targets: Vec<(String, LevelFilter)>,
}

impl LogConfig {
    pub fn new(level: LevelFilter) -> Self {
        Self {
            level,
            targets: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>, level: LevelFilter) -> Self {
        self.targets.push((target.into(), level));
        self
    }

    /// Effective level for a record target such as `qr_reader_pipeline::mailbox`.
    pub fn level_for(&self, target: &str) -> LevelFilter {
        self.targets
            .iter()
            .filter(|(prefix, _)| covers(prefix, target))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(self.level, |(_, level)| *level)
    }

    fn max_level(&self) -> LevelFilter {
        self.targets
            .iter()
            .map(|(_, level)| *level)
            .fold(self.level, Ord::max)
    }
}

fn covers(prefix: &str, target: &str) -> bool {
    match target.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with("::"),
        None => false,
    }
}

fn format_line(
    elapsed: f64,
    level: Level,
    thread: Option<&str>,
    target: &str,
    args: &fmt::Arguments<'_>,
) -> String {
    format!(
        "[{:8.3}s {:>5} {} {}] {}",
        elapsed,
        level,
        thread.unwrap_or("-"),
        target,
        args
    )
}

struct StderrLogger {
    config: LogConfig,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.config.level_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let current = std::thread::current();
        let line = format_line(
            self.started.elapsed().as_secs_f64(),
            record.level(),
            current.name(),
            record.target(),
            record.args(),
        );
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger with a single level for every target.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    init(LogConfig::new(level))
}

/// Install the stderr logger.
///
/// Calling this more than once is a no-op after the first successful
/// initialization.
pub fn init(config: LogConfig) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let max_level = config.max_level();
        let logger = LOGGER.get_or_init(|| StderrLogger {
            config,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(max_level);
    }
    Ok(())
}

/// Install a `tracing-subscriber` fmt subscriber driven by `RUST_LOG`.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_thread_names(true)
            .json()
            .flatten_event(true)
            .finish()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(filter)
            .with_thread_names(true)
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_target_prefix_wins() {
        let config = LogConfig::new(LevelFilter::Warn)
            .with_target("qr_reader_pipeline", LevelFilter::Debug)
            .with_target("qr_reader_pipeline::mailbox", LevelFilter::Error);

        assert_eq!(config.level_for("image::codecs"), LevelFilter::Warn);
        assert_eq!(
            config.level_for("qr_reader_pipeline::decoder_state"),
            LevelFilter::Debug
        );
        assert_eq!(
            config.level_for("qr_reader_pipeline::mailbox"),
            LevelFilter::Error
        );
        assert_eq!(config.max_level(), LevelFilter::Debug);
    }

    #[test]
    fn prefix_must_end_at_a_module_boundary() {
        let config = LogConfig::new(LevelFilter::Warn).with_target("qr_reader", LevelFilter::Trace);
        assert_eq!(config.level_for("qr_reader"), LevelFilter::Trace);
        assert_eq!(config.level_for("qr_reader::still"), LevelFilter::Trace);
        assert_eq!(config.level_for("qr_reader_engine"), LevelFilter::Warn);
    }

    #[test]
    fn line_names_the_thread_and_target() {
        let line = format_line(
            1.5,
            Level::Debug,
            Some("qrCodeDetectTask"),
            "qr_reader_pipeline::recognition_loop",
            &format_args!("frame #{} {}x{}", 3, 800, 600),
        );
        assert_eq!(
            line,
            "[   1.500s DEBUG qrCodeDetectTask qr_reader_pipeline::recognition_loop] frame #3 800x600"
        );

        let unnamed = format_line(0.0, Level::Warn, None, "t", &format_args!("x"));
        assert!(unnamed.contains(" WARN - t] x"));
    }

    struct Discard;

    impl Log for Discard {
        fn enabled(&self, _: &Metadata) -> bool {
            false
        }
        fn log(&self, _: &Record) {}
        fn flush(&self) {}
    }

    #[test]
    fn install_error_converts_into_a_boxed_error() {
        static DISCARD: Discard = Discard;
        let _ = log::set_logger(&DISCARD);

        let err = init_with_level(LevelFilter::Info).unwrap_err();
        let boxed: Box<dyn std::error::Error> = err.into();
        assert!(!boxed.to_string().is_empty());
    }
}
