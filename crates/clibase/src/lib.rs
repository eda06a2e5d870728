//! Bootstrap kit for command-line programs.
//!
//! Argument parsing with `-q`/`-v` conventions, logging that keeps INFO
//! output plain, a business error type, `-` aware stream opening and a
//! top-level runner mapping failures to exit codes.

pub mod args;
pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod runner;
pub mod stdio;

pub use args::{ArgumentParser, ParsedArgs, ParserConfig, Value, COPYRIGHT};
pub use config::{AppConfig, ConfigService};
pub use error::ProjectError;
pub use logging::{setup_logging, LogLevel, Logging, LoggingConfig, LoggingError, Style};
pub use registry::{ArgValue, CallArgs, CommandRegistry, RegistryError};
pub use runner::{run_until_interrupted, Failure};
pub use stdio::{openstd, with_openstd, OpenMode, PipeSafe, StdStream, StdioError};

#[doc(hidden)]
pub use tracing as __tracing;

/// Test utilities for unit and integration testing.
/// Only available with cfg(test) or feature "testing".
#[cfg(any(test, feature = "testing"))]
pub mod testing;
