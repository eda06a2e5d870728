//! Call a registered function from the command line.
//!
//! `clibase-tester [-q|-v] FUNCTION [ARGS...]` converts each argument to an
//! integer when it looks like one and prints the function's result.

use anyhow::Result;
use clap::{Arg, ArgAction};
use clibase::runner::{self, EXIT_FAILURE, EXIT_INTERRUPTED};
use clibase::{
    with_openstd, ArgValue, ArgumentParser, CallArgs, CommandRegistry, Logging, LoggingConfig,
    ParserConfig, PipeSafe, ProjectError, Style,
};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::process::ExitCode;

const PROGRAM: &str = "clibase-tester";
const LOG_FORMAT: &str = "%(levelname)-5.5s: %(message)s";

fn functions() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry
        .register("echo", "Return the arguments as a list", |args| {
            Ok(Some(ArgValue::List(args.to_vec())))
        })
        .register("sum", "Add integer arguments", sum)
        .register("count", "Count lines of a file, or stdin with '-'", count);
    registry
}

fn parser(registry: &CommandRegistry) -> ArgumentParser {
    let config = ParserConfig::new(PROGRAM)
        .description("Call a registered function and print its result.")
        .epilog(registry.listing());
    ArgumentParser::new(config)
        .arg(
            Arg::new("function")
                .value_name("FUNCTION")
                .help("Name of the function to call"),
        )
        // Negative numbers are values, other dashed words stay options
        .arg(
            Arg::new("args")
                .value_name("ARGS")
                .num_args(1..)
                .action(ArgAction::Append)
                .allow_negative_numbers(true)
                .help("Arguments, converted to integers where possible"),
        )
}

fn sum(args: &CallArgs) -> Result<Option<ArgValue>> {
    let mut total: i64 = 0;
    for arg in args.iter() {
        let n = arg
            .as_int()
            .ok_or_else(|| ProjectError::new(format!("sum: {} is not an integer", arg)))?;
        total = total
            .checked_add(n)
            .ok_or_else(|| ProjectError::new("sum: integer overflow"))?;
    }
    Ok(Some(ArgValue::Int(total)))
}

fn count(args: &CallArgs) -> Result<Option<ArgValue>> {
    let path = match args.raw() {
        [] => "-",
        [path] => path.as_str(),
        _ => return Err(ProjectError::new("count: expected at most one file").into()),
    };
    let lines = with_openstd(Some(Path::new(path)), "r", |input| {
        let mut lines: i64 = 0;
        for line in BufReader::new(input).split(b'\n') {
            line?;
            lines += 1;
        }
        Ok::<_, ProjectError>(lines)
    })?;
    Ok(Some(ArgValue::Int(lines)))
}

fn run(registry: &CommandRegistry, name: &str, args: &[String]) -> Result<()> {
    if let Some(result) = registry.dispatch(name, args)? {
        let mut out = PipeSafe::new(io::stdout().lock());
        writeln!(out, "{}", result)?;
        out.flush()?;
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let registry = functions();
    let parser = parser(&registry);
    // Usage errors exit here with status 2
    let args = parser.parse();

    let Some(name) = args.get_str("function").map(str::to_string) else {
        println!("{}", parser.render_help().trim_end());
        return ExitCode::SUCCESS;
    };
    let call_args = args.get_list("args").to_vec();

    let config = LoggingConfig::default()
        .with_level(args.loglevel())
        .with_format(LOG_FORMAT, Style::Percent);
    if let Err(err) = Logging::new(&config).and_then(|logging| logging.init()) {
        eprintln!("{}: {}", PROGRAM, err);
        return ExitCode::from(EXIT_FAILURE);
    }

    runner::run_until_interrupted(move || run(&registry, &name, &call_args), EXIT_INTERRUPTED)
        .await
}
