//! Named functions callable from the command line.
//!
//! A [`CommandRegistry`] maps names to handlers taking loosely typed
//! [`ArgValue`]s, so a test harness can run `program FUNCTION ARGS...`.

use std::fmt;
use std::ops::Deref;

/// A command-line argument converted to the closest scalar type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Int(i64),
    Str(String),
    List(Vec<ArgValue>),
}

impl ArgValue {
    /// Integer if `raw` parses as one, string otherwise.
    pub fn parse(raw: &str) -> Self {
        raw.parse::<i64>()
            .map(ArgValue::Int)
            .unwrap_or_else(|_| ArgValue::Str(raw.to_string()))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ArgValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for ArgValue {
    fn from(n: i64) -> Self {
        ArgValue::Int(n)
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::Str(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::Str(s)
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Int(n) => write!(f, "{}", n),
            ArgValue::Str(s) => write!(f, "'{}'", s),
            ArgValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Function '{name}' does not exist! Try one of:\n\t{}", available.join("\n\t"))]
    UnknownCommand { name: String, available: Vec<String> },
}

/// Arguments of one call: converted values plus the strings they came from.
///
/// Derefs to the converted values. Handlers that take paths or other
/// text where `007` and `7` differ should read [`CallArgs::raw`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallArgs {
    values: Vec<ArgValue>,
    raw: Vec<String>,
}

impl CallArgs {
    pub fn new<S: AsRef<str>>(raw: &[S]) -> Self {
        let raw: Vec<String> = raw.iter().map(|a| a.as_ref().to_string()).collect();
        let values = raw.iter().map(|a| ArgValue::parse(a)).collect();
        Self { values, raw }
    }

    pub fn values(&self) -> &[ArgValue] {
        &self.values
    }

    pub fn raw(&self) -> &[String] {
        &self.raw
    }
}

impl Deref for CallArgs {
    type Target = [ArgValue];

    fn deref(&self) -> &[ArgValue] {
        &self.values
    }
}

pub type Handler = Box<dyn Fn(&CallArgs) -> anyhow::Result<Option<ArgValue>> + Send + Sync>;

struct Entry {
    name: String,
    description: String,
    handler: Handler,
}

/// Ordered name to handler table.
#[derive(Default)]
pub struct CommandRegistry {
    entries: Vec<Entry>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any earlier handler of the
    /// same name in its original position.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(&CallArgs) -> anyhow::Result<Option<ArgValue>> + Send + Sync + 'static,
    {
        let entry = Entry {
            name: name.into(),
            description: description.into(),
            handler: Box::new(handler),
        };
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn description(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.description.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `Available functions:` followed by one tab-indented line per entry.
    pub fn listing(&self) -> String {
        let mut listing = String::from("Available functions:");
        for entry in &self.entries {
            listing.push_str("\n\t");
            listing.push_str(&entry.name);
            if !entry.description.is_empty() {
                listing.push_str(" - ");
                listing.push_str(&entry.description);
            }
        }
        listing
    }

    pub fn usage(&self, program: &str) -> String {
        format!(
            "Usage: {} [-v] FUNCTION [ARGS...]\n{}",
            program,
            self.listing()
        )
    }

    /// Call `name` with `raw_args` converted by [`ArgValue::parse`].
    pub fn dispatch<S: AsRef<str>>(
        &self,
        name: &str,
        raw_args: &[S],
    ) -> anyhow::Result<Option<ArgValue>> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| RegistryError::UnknownCommand {
                name: name.to_string(),
                available: self.names().into_iter().map(String::from).collect(),
            })?;

        let args = CallArgs::new(raw_args);
        tracing::debug!("Calling {}({})", name, ArgValue::List(args.values().to_vec()));
        (entry.handler)(&args)
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("names", &self.names())
            .finish()
    }
}
