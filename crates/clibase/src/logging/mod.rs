//! Process log output.
//!
//! Logging is configured from a [`LoggingConfig`] through an explicit
//! [`Logging`] object. At DEBUG every record uses the detailed template. At
//! INFO and above, INFO records print as the bare message, so informational
//! output reads like program output while warnings and errors stay marked.

mod format;
mod level;
pub mod template;

pub use format::{TemplateFormat, CRITICAL_FIELD};
pub use level::LogLevel;
pub use template::{Style, Template, TemplateError};

use serde::{Deserialize, Serialize};
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Detailed template used when none is configured.
pub const DEFAULT_FORMAT: &str = "[%(asctime)s %(levelname)-6.6s] %(module)-4s: %(message)s";

pub const DEFAULT_DATEFMT: &str = "%Y-%m-%d %H:%M:%S";

/// Log a CRITICAL record.
///
/// `tracing` stops at ERROR, so this emits an ERROR event flagged
/// `critical = true`, which the template formatter prints as `CRITICAL`.
#[macro_export]
macro_rules! critical {
    ($($arg:tt)+) => {
        $crate::__tracing::error!(critical = true, $($arg)+)
    };
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log format: {0}")]
    Template(#[from] TemplateError),

    #[error("invalid log filter directives: {0}")]
    Directives(#[from] tracing_subscriber::filter::ParseError),

    #[error("logging is already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level to emit
    pub level: LogLevel,
    /// Detailed record template
    pub format: String,
    /// strftime format for `asctime`
    pub datefmt: String,
    /// Placeholder syntax of `format`
    pub style: Style,
    /// Extra `EnvFilter` directives, e.g. `clibase=debug`
    pub directives: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: DEFAULT_FORMAT.to_string(),
            datefmt: DEFAULT_DATEFMT.to_string(),
            style: Style::Percent,
            directives: None,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: impl Into<String>, style: Style) -> Self {
        self.format = format.into();
        self.style = style;
        self
    }

    pub fn with_datefmt(mut self, datefmt: impl Into<String>) -> Self {
        self.datefmt = datefmt.into();
        self
    }
}

/// Validated logging setup, built once at startup.
#[derive(Debug, Clone)]
pub struct Logging {
    level: LogLevel,
    directives: String,
    format: TemplateFormat,
}

impl Logging {
    pub fn new(config: &LoggingConfig) -> Result<Self, LoggingError> {
        let template = Template::parse(&config.format, config.style)?;
        template::validate_datefmt(&config.datefmt)?;

        let mut directives = config.level.level_filter().to_string();
        if let Some(extra) = config.directives.as_deref().filter(|d| !d.trim().is_empty()) {
            directives.push(',');
            directives.push_str(extra.trim());
        }
        EnvFilter::builder().parse(&directives)?;

        Ok(Self {
            level: config.level,
            directives,
            format: TemplateFormat::new(template, config.datefmt.clone(), config.level),
        })
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Whether INFO records are printed as the bare message.
    pub fn plain_info(&self) -> bool {
        self.level > LogLevel::Debug
    }

    /// Build a subscriber writing to `writer`.
    ///
    /// Use with `tracing::subscriber::with_default` to scope it, or
    /// [`Logging::init`] to install it for the whole process.
    pub fn subscriber<W>(&self, writer: W) -> impl Subscriber + Send + Sync + 'static
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::builder().parse_lossy(&self.directives))
            .with_writer(writer)
            .event_format(self.format.clone())
            .finish()
    }

    /// Install the stderr subscriber process-wide. Fails if a global
    /// subscriber is already set.
    pub fn init(&self) -> Result<(), LoggingError> {
        self.init_with_writer(std::io::stderr)
    }

    /// Like [`Logging::init`], writing to `writer` instead of stderr.
    pub fn init_with_writer<W>(&self, writer: W) -> Result<(), LoggingError>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        tracing::subscriber::set_global_default(self.subscriber(writer))
            .map_err(|_| LoggingError::AlreadyInitialized)
    }
}

/// Build [`Logging`] from `config` and install it.
pub fn setup_logging(config: &LoggingConfig) -> Result<Logging, LoggingError> {
    let logging = Logging::new(config)?;
    logging.init()?;
    Ok(logging)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CaptureWriter;

    const SHORT_FORMAT: &str = "%(levelname)-8s: %(message)s";

    fn capture(config: &LoggingConfig, emit: impl FnOnce()) -> String {
        let logging = Logging::new(config).unwrap();
        let writer = CaptureWriter::new();
        tracing::subscriber::with_default(logging.subscriber(writer.clone()), emit);
        writer.contents()
    }

    #[test]
    fn info_is_plain_above_debug() {
        let config = LoggingConfig::default().with_format(SHORT_FORMAT, Style::Percent);
        let out = capture(&config, || {
            tracing::info!("hello");
            tracing::warn!("careful");
        });
        assert_eq!(out, "hello\nWARNING : careful\n");
    }

    #[test]
    fn debug_level_uses_detailed_format_for_info() {
        let config = LoggingConfig::default()
            .with_level(LogLevel::Debug)
            .with_format(SHORT_FORMAT, Style::Percent);
        let out = capture(&config, || {
            tracing::debug!("looking");
            tracing::info!("hello");
        });
        assert_eq!(out, "DEBUG   : looking\nINFO    : hello\n");
    }

    #[test]
    fn records_below_level_are_dropped() {
        let config = LoggingConfig::default()
            .with_level(LogLevel::Warning)
            .with_format(SHORT_FORMAT, Style::Percent);
        let out = capture(&config, || {
            tracing::debug!("hidden");
            tracing::info!("hidden too");
            tracing::error!("shown");
        });
        assert_eq!(out, "ERROR   : shown\n");
    }

    #[test]
    fn critical_level_drops_plain_errors() {
        let config = LoggingConfig::default()
            .with_level(LogLevel::Critical)
            .with_format("%(levelname)s: %(message)s", Style::Percent);
        let out = capture(&config, || {
            tracing::warn!("ignored");
            tracing::error!("plain error");
            crate::critical!("real critical");
        });
        assert_eq!(out, "CRITICAL: real critical\n");
    }

    #[test]
    fn error_level_keeps_errors_and_criticals() {
        let config = LoggingConfig::default()
            .with_level(LogLevel::Error)
            .with_format("%(levelname)s: %(message)s", Style::Percent);
        let out = capture(&config, || {
            tracing::warn!("ignored");
            tracing::error!("plain error");
            crate::critical!("real critical");
        });
        assert_eq!(out, "ERROR: plain error\nCRITICAL: real critical\n");
    }

    #[test]
    fn critical_macro_renders_critical() {
        let config = LoggingConfig::default().with_format(SHORT_FORMAT, Style::Percent);
        let out = capture(&config, || {
            crate::critical!("disk on fire: {}", "/dev/sda");
        });
        assert_eq!(out, "CRITICAL: disk on fire: /dev/sda\n");
    }

    #[test]
    fn extra_fields_are_appended() {
        let config = LoggingConfig::default().with_format(SHORT_FORMAT, Style::Percent);
        let out = capture(&config, || {
            tracing::info!(path = "a.txt", lines = 3, "opened");
        });
        assert_eq!(out, "opened path=a.txt lines=3\n");
    }

    #[test]
    fn default_format_has_timestamp_and_module() {
        let out = capture(&LoggingConfig::default(), || {
            tracing::warn!("careful");
        });
        assert!(out.starts_with('['), "got {out:?}");
        assert!(out.ends_with("WARNIN] tests: careful\n"), "got {out:?}");
    }

    #[test]
    fn brace_style_config() {
        let config = LoggingConfig::default().with_format("{levelname:>7}|{message}", Style::Brace);
        let out = capture(&config, || tracing::error!("bad"));
        assert_eq!(out, "  ERROR|bad\n");
    }

    #[test]
    fn extra_directives_lower_level_for_target() {
        let mut config = LoggingConfig::default()
            .with_level(LogLevel::Warning)
            .with_format(SHORT_FORMAT, Style::Percent);
        config.directives = Some("chatty=debug".to_string());
        let out = capture(&config, || {
            tracing::debug!(target: "chatty", "noise");
            tracing::debug!("dropped");
        });
        assert_eq!(out, "DEBUG   : noise\n");
    }

    #[test]
    fn rejects_bad_format() {
        let config = LoggingConfig::default().with_format("%(nope)s", Style::Percent);
        assert!(matches!(
            Logging::new(&config),
            Err(LoggingError::Template(TemplateError::UnknownField(_)))
        ));
    }

    #[test]
    fn rejects_bad_datefmt() {
        let config = LoggingConfig::default().with_datefmt("%Q");
        assert!(matches!(
            Logging::new(&config),
            Err(LoggingError::Template(TemplateError::DateFormat(_)))
        ));
    }

    #[test]
    fn rejects_bad_directives() {
        let mut config = LoggingConfig::default();
        config.directives = Some("clibase=notalevel".to_string());
        assert!(matches!(
            Logging::new(&config),
            Err(LoggingError::Directives(_))
        ));
    }

    #[test]
    fn plain_info_follows_level() {
        let debug = Logging::new(&LoggingConfig::default().with_level(LogLevel::Debug)).unwrap();
        let info = Logging::new(&LoggingConfig::default()).unwrap();
        assert!(!debug.plain_info());
        assert!(info.plain_info());
        assert_eq!(info.level(), LogLevel::Info);
    }
}
