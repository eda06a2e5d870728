//! Command-line parser with conventional defaults.
//!
//! [`ArgumentParser`] wraps a [`clap::Command`] and adds, on top of whatever
//! arguments the program registers:
//!
//! - `-q/--quiet` and `-v/--verbose`, mutually exclusive, resolving to a
//!   [`LogLevel`] stored under `loglevel` (WARNING, DEBUG, default INFO);
//! - a `debug` boolean, true exactly when that level is DEBUG;
//! - `-V/--version` when a version string is configured;
//! - a description cut to its first non-blank line, and a copyright epilog.

mod parsed;

pub use parsed::{ParsedArgs, Value};

use crate::logging::LogLevel;
use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use std::collections::BTreeMap;
use std::ffi::OsString;

/// Epilog used when none is configured.
pub const COPYRIGHT: &str = "\
Copyright (C) 2026 clibase contributors
License: MIT, see <https://opensource.org/licenses/MIT>";

const QUIET: &str = "quiet";
const VERBOSE: &str = "verbose";

#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Program name shown in usage and version output
    pub name: String,
    pub description: Option<String>,
    /// `None` selects [`COPYRIGHT`], an empty string disables the epilog
    pub epilog: Option<String>,
    /// Keep the whole description instead of its first non-blank line
    pub multiline: bool,
    /// Name of the level field set by `-q`/`-v`; empty disables the pair
    pub loglevel_options: String,
    /// Name of the derived debug flag; empty disables it
    pub debug_option: String,
    pub version: Option<String>,
}

impl ParserConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            epilog: None,
            multiline: false,
            loglevel_options: "loglevel".to_string(),
            debug_option: "debug".to_string(),
            version: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn epilog(mut self, epilog: impl Into<String>) -> Self {
        self.epilog = Some(epilog.into());
        self
    }

    pub fn multiline(mut self, multiline: bool) -> Self {
        self.multiline = multiline;
        self
    }

    pub fn loglevel_options(mut self, name: impl Into<String>) -> Self {
        self.loglevel_options = name.into();
        self
    }

    pub fn debug_option(mut self, name: impl Into<String>) -> Self {
        self.debug_option = name.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// First non-blank line of `text`.
fn first_line(text: &str) -> &str {
    text.trim().lines().next().unwrap_or("").trim_end()
}

/// `-q`/`--quiet` style names an argument answers to.
fn option_strings(arg: &Arg) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(short) = arg.get_short() {
        names.push(format!("-{}", short));
    }
    if let Some(long) = arg.get_long() {
        names.push(format!("--{}", long));
    }
    names
}

fn takes_many(arg: &Arg) -> bool {
    matches!(arg.get_action(), ArgAction::Append)
        || arg
            .get_num_args()
            .map_or(false, |range| range.max_values() > 1)
}

fn raw_value(matches: &ArgMatches, id: &str, many: bool) -> Value {
    let raw: Vec<String> = matches
        .get_raw(id)
        .map(|values| {
            values
                .map(|v| v.to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    if many {
        Value::List(raw)
    } else {
        raw.into_iter().next().map_or(Value::Missing, Value::Str)
    }
}

#[derive(Debug, Clone)]
pub struct ArgumentParser {
    command: Command,
    loglevel_option: Option<String>,
    debug_option: Option<String>,
}

impl ArgumentParser {
    pub fn new(config: ParserConfig) -> Self {
        let mut command = Command::new(config.name);

        if let Some(description) = config.description.as_deref() {
            let about = if config.multiline {
                description.trim()
            } else {
                first_line(description)
            };
            command = command.about(about.to_string());
        }

        command = match config.epilog.as_deref() {
            None => command.after_help(COPYRIGHT),
            Some("") => command,
            Some(epilog) => command.after_help(epilog.to_string()),
        };

        command = match config.version {
            Some(version) => command.version(version),
            None => command.disable_version_flag(true),
        };

        let loglevel_option = Some(config.loglevel_options).filter(|name| !name.is_empty());
        if let Some(group) = &loglevel_option {
            command = command
                .arg(
                    Arg::new(QUIET)
                        .short('q')
                        .long("quiet")
                        .action(ArgAction::SetTrue)
                        .help("Suppress informative messages."),
                )
                .arg(
                    Arg::new(VERBOSE)
                        .short('v')
                        .long("verbose")
                        .action(ArgAction::SetTrue)
                        .help("Verbose mode, output extra info."),
                )
                .group(
                    ArgGroup::new(group.clone())
                        .args([QUIET, VERBOSE])
                        .multiple(false),
                );
        }

        let debug_option = loglevel_option
            .as_ref()
            .and(Some(config.debug_option))
            .filter(|name| !name.is_empty());

        Self {
            command,
            loglevel_option,
            debug_option,
        }
    }

    /// Register an argument, builder style.
    pub fn arg(mut self, arg: Arg) -> Self {
        self.command = self.command.arg(arg);
        self
    }

    /// Register an argument in place.
    pub fn add_argument(&mut self, arg: Arg) -> &mut Self {
        self.command = std::mem::take(&mut self.command).arg(arg);
        self
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn name(&self) -> &str {
        self.command.get_name()
    }

    pub fn render_help(&self) -> String {
        self.command.clone().render_help().to_string()
    }

    /// Parse the process arguments, exiting with a usage message on error.
    pub fn parse(&self) -> ParsedArgs {
        self.parse_from(std::env::args_os())
    }

    /// Parse `argv` (program name first), exiting with a usage message on
    /// error.
    pub fn parse_from<I, T>(&self, argv: I) -> ParsedArgs
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        self.try_parse_from(argv).unwrap_or_else(|err| err.exit())
    }

    /// Parse `argv` where the first item is the program name.
    pub fn try_parse_from<I, T>(&self, argv: I) -> Result<ParsedArgs, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut command = self.command.clone();
        let matches = command.try_get_matches_from_mut(argv)?;
        Ok(self.collect(&command, matches))
    }

    /// Parse `args` without the program name.
    pub fn try_parse_args<I, T>(&self, args: I) -> Result<ParsedArgs, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let program = OsString::from(self.command.get_name());
        let argv = std::iter::once(program).chain(args.into_iter().map(Into::into));
        self.try_parse_from(argv)
    }

    fn collect(&self, command: &Command, matches: ArgMatches) -> ParsedArgs {
        let mut values = BTreeMap::new();

        for arg in command.get_arguments() {
            let id = arg.get_id().as_str();
            if self.loglevel_option.is_some() && (id == QUIET || id == VERBOSE) {
                continue;
            }
            let value = match arg.get_action() {
                ArgAction::SetTrue | ArgAction::SetFalse => Value::Bool(matches.get_flag(id)),
                ArgAction::Count => Value::Count(matches.get_count(id)),
                ArgAction::Help
                | ArgAction::HelpShort
                | ArgAction::HelpLong
                | ArgAction::Version => continue,
                _ => raw_value(&matches, id, takes_many(arg)),
            };
            values.insert(id.to_string(), value);
        }

        if let Some(name) = &self.loglevel_option {
            let level = if matches.get_flag(QUIET) {
                LogLevel::Warning
            } else if matches.get_flag(VERBOSE) {
                LogLevel::Debug
            } else {
                LogLevel::Info
            };
            values.insert(name.clone(), Value::Level(level));

            if let Some(debug) = &self.debug_option {
                values.insert(debug.clone(), Value::Bool(level == LogLevel::Debug));
            }
        }

        ParsedArgs::new(values, self.loglevel_option.clone(), matches)
    }

    /// Build a usage error.
    ///
    /// With `option` (e.g. `"-q"` or `"--quiet"`), the message is prefixed
    /// with every name of that option.
    ///
    /// # Panics
    ///
    /// Panics if `option` is not registered on this parser.
    pub fn error(&self, message: impl std::fmt::Display, option: Option<&str>) -> clap::Error {
        let mut command = self.command.clone();
        command.build();

        let message = match option.filter(|o| !o.is_empty()) {
            None => message.to_string(),
            Some(option) => {
                let arg = command
                    .get_arguments()
                    .find(|arg| option_strings(arg).iter().any(|name| name == option))
                    .unwrap_or_else(|| panic!("No such command line option: {}", option));
                format!("argument {}: {}", option_strings(arg).join("/"), message)
            }
        };
        command.error(ErrorKind::ValueValidation, message)
    }

    /// Print a usage error and exit.
    pub fn exit_with_error(&self, message: impl std::fmt::Display, option: Option<&str>) -> ! {
        self.error(message, option).exit()
    }
}
