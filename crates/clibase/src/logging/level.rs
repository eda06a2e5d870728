use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Severity of a log record, ordered from most to least verbose.
///
/// The discriminants are the conventional numeric level codes, so
/// `LogLevel::Warning as u8 == 30`.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug = 10,
    #[default]
    Info = 20,
    #[serde(alias = "warn")]
    Warning = 30,
    Error = 40,
    Critical = 50,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Critical,
    ];

    /// Numeric level code.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.code() == code)
    }

    /// Upper-case name as printed in log records.
    pub fn name(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Title-cased name for help text and messages.
    pub fn pretty(self) -> &'static str {
        match self {
            LogLevel::Debug => "Debug",
            LogLevel::Info => "Info",
            LogLevel::Warning => "Warning",
            LogLevel::Error => "Error",
            LogLevel::Critical => "Critical",
        }
    }

    /// The most verbose `tracing` filter that lets this level through.
    ///
    /// `tracing` has no CRITICAL; critical records are ERROR events carrying
    /// a `critical` flag, so both map to the ERROR filter.
    pub fn level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }

    pub(crate) fn from_tracing(level: &tracing::Level, critical: bool) -> Self {
        match *level {
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warning,
            tracing::Level::ERROR if critical => LogLevel::Critical,
            tracing::Level::ERROR => LogLevel::Error,
            _ => LogLevel::Debug,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.trim().parse::<u8>() {
            return Self::from_code(code)
                .ok_or_else(|| anyhow::anyhow!("Invalid log level code: {}", s));
        }
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" | "fatal" => Ok(LogLevel::Critical),
            _ => Err(anyhow::anyhow!("Invalid log level: {}", s)),
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        level.level_filter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Critical);
    }

    #[test]
    fn codes_follow_convention() {
        assert_eq!(LogLevel::Debug.code(), 10);
        assert_eq!(LogLevel::Info.code(), 20);
        assert_eq!(LogLevel::Warning.code(), 30);
        assert_eq!(LogLevel::Error.code(), 40);
        assert_eq!(LogLevel::Critical.code(), 50);
        assert_eq!(LogLevel::from_code(30), Some(LogLevel::Warning));
        assert_eq!(LogLevel::from_code(25), None);
    }

    #[test]
    fn parses_names_and_codes() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("Warning".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("40".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("loud".parse::<LogLevel>().is_err());
        assert!("15".parse::<LogLevel>().is_err());
    }

    #[test]
    fn critical_maps_to_error_filter() {
        assert_eq!(LogLevel::Critical.level_filter(), LevelFilter::ERROR);
        assert_eq!(LogLevel::Debug.level_filter(), LevelFilter::DEBUG);
    }

    #[test]
    fn tracing_error_with_flag_is_critical() {
        assert_eq!(
            LogLevel::from_tracing(&tracing::Level::ERROR, true),
            LogLevel::Critical
        );
        assert_eq!(
            LogLevel::from_tracing(&tracing::Level::ERROR, false),
            LogLevel::Error
        );
        assert_eq!(
            LogLevel::from_tracing(&tracing::Level::TRACE, false),
            LogLevel::Debug
        );
    }

    #[test]
    fn display_is_upper_case() {
        assert_eq!(LogLevel::Warning.to_string(), "WARNING");
        assert_eq!(LogLevel::Critical.pretty(), "Critical");
    }
}
