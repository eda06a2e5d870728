use crate::logging::LogLevel;
use clap::ArgMatches;
use std::collections::BTreeMap;

/// A single parsed option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    List(Vec<String>),
    Bool(bool),
    Count(u8),
    Level(LogLevel),
    Missing,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_level(&self) -> Option<LogLevel> {
        match self {
            Value::Level(level) => Some(*level),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Str(s) => write!(f, "'{}'", s),
            Value::List(values) => {
                let items: Vec<String> = values.iter().map(|v| format!("'{}'", v)).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Bool(b) => write!(f, "{}", b),
            Value::Count(n) => write!(f, "{}", n),
            Value::Level(level) => write!(f, "{}", level.code()),
            Value::Missing => write!(f, "None"),
        }
    }
}

/// Result of parsing a command line: option name to value.
///
/// Built once by [`ArgumentParser`](super::ArgumentParser) and read-only
/// afterwards. The clap matches are kept for typed access to values with
/// custom value parsers.
#[derive(Debug, Clone)]
pub struct ParsedArgs {
    values: BTreeMap<String, Value>,
    loglevel_option: Option<String>,
    matches: ArgMatches,
}

impl ParsedArgs {
    pub(crate) fn new(
        values: BTreeMap<String, Value>,
        loglevel_option: Option<String>,
        matches: ArgMatches,
    ) -> Self {
        Self {
            values,
            loglevel_option,
            matches,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Values of a multi-valued option; empty when absent.
    pub fn get_list(&self, name: &str) -> &[String] {
        self.get(name).and_then(Value::as_list).unwrap_or(&[])
    }

    /// Boolean option; false when absent.
    pub fn get_flag(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Level chosen with `-q`/`-v`, INFO when the pair is disabled.
    pub fn loglevel(&self) -> LogLevel {
        self.loglevel_option
            .as_deref()
            .and_then(|name| self.get(name))
            .and_then(Value::as_level)
            .unwrap_or_default()
    }

    /// True exactly when the level resolved to DEBUG.
    pub fn debug(&self) -> bool {
        self.loglevel() == LogLevel::Debug
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn matches(&self) -> &ArgMatches {
        &self.matches
    }
}

impl std::fmt::Display for ParsedArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<String> = self
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        write!(f, "ParsedArgs({})", fields.join(", "))
    }
}
