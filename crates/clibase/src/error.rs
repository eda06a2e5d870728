//! The business error raised by programs built on this crate.
//!
//! Usage errors belong to clap, I/O plumbing errors to the module that hit
//! them. Anything a program raises on purpose (bad input, a failed lookup, a
//! refused operation) is a [`ProjectError`], which the top-level runner logs
//! at CRITICAL and turns into exit status 1.

use crate::stdio::StdioError;
use std::error::Error as StdError;
use std::io;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Error with a message, a numeric code and an optional owned cause.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ProjectError {
    message: String,
    errno: i32,
    #[source]
    source: Option<BoxError>,
}

impl ProjectError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errno: 0,
            source: None,
        }
    }

    /// Attach a numeric code, in the spirit of `errno`.
    pub fn with_errno(mut self, errno: i32) -> Self {
        self.errno = errno;
        self
    }

    /// Wrap the error that caused this one.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        self.source = Some(source.into());
        self
    }

    /// Wrap an I/O error, taking its OS error code when there is one.
    pub fn from_io(context: impl std::fmt::Display, err: io::Error) -> Self {
        let errno = err.raw_os_error().unwrap_or(0);
        Self::new(format!("{}: {}", context, err))
            .with_errno(errno)
            .with_source(err)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn errno(&self) -> i32 {
        self.errno
    }

    /// The wrapped cause, if any.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }
}

impl From<String> for ProjectError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProjectError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<io::Error> for ProjectError {
    fn from(err: io::Error) -> Self {
        Self::from_io("I/O error", err)
    }
}

impl From<StdioError> for ProjectError {
    fn from(err: StdioError) -> Self {
        let errno = match &err {
            StdioError::Open { source, .. } => source.raw_os_error().unwrap_or(0),
            StdioError::InvalidMode { .. } => 0,
        };
        Self::new(err.to_string()).with_errno(errno).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_message() {
        let err = ProjectError::new("disk full");
        assert_eq!(err.to_string(), "disk full");
        assert_eq!(err.errno(), 0);
        assert!(err.source().is_none());
    }

    #[test]
    fn with_errno_sets_code() {
        let err = ProjectError::new("nope").with_errno(42);
        assert_eq!(err.errno(), 42);
    }

    #[test]
    fn source_is_exposed_through_error_trait() {
        let cause = io::Error::new(io::ErrorKind::Other, "low level");
        let err = ProjectError::new("high level").with_source(cause);

        let source = err.source().expect("source should be set");
        assert_eq!(source.to_string(), "low level");
        assert_eq!(err.cause().unwrap().to_string(), "low level");
    }

    #[test]
    fn from_io_takes_os_error_code() {
        let cause = io::Error::from_raw_os_error(2);
        let err = ProjectError::from_io("cannot open 'missing.txt'", cause);

        assert_eq!(err.errno(), 2);
        assert!(err.message().starts_with("cannot open 'missing.txt': "));
        assert!(err.source().is_some());
    }

    #[test]
    fn from_io_without_os_code_defaults_to_zero() {
        let cause = io::Error::new(io::ErrorKind::InvalidData, "garbage");
        let err = ProjectError::from_io("parse", cause);
        assert_eq!(err.errno(), 0);
        assert_eq!(err.to_string(), "parse: garbage");
    }

    #[test]
    fn converts_into_anyhow_and_back() {
        let err: anyhow::Error = ProjectError::new("wrapped").with_errno(7).into();
        let back = err.downcast_ref::<ProjectError>().unwrap();
        assert_eq!(back.errno(), 7);
    }

    #[test]
    fn from_stdio_open_failure() {
        let err: ProjectError = crate::stdio::openstd(
            Some(std::path::Path::new("/nonexistent/clibase/input.txt")),
            "r",
        )
        .unwrap_err()
        .into();

        assert_eq!(err.errno(), 2);
        assert_eq!(
            err.to_string(),
            format!(
                "cannot open '/nonexistent/clibase/input.txt': {}",
                io::Error::from_raw_os_error(2)
            )
        );
        let io_cause = err
            .source()
            .and_then(|stdio| stdio.source())
            .and_then(|cause| cause.downcast_ref::<io::Error>());
        assert_eq!(io_cause.map(io::Error::kind), Some(io::ErrorKind::NotFound));
    }

    #[test]
    fn from_invalid_mode() {
        let err: ProjectError = crate::stdio::openstd(None, "rw").unwrap_err().into();
        assert_eq!(err.errno(), 0);
        assert_eq!(err.to_string(), "invalid mode \"rw\" for '-'");
    }
}
