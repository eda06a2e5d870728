use anyhow::Result;
use clap::{Arg, ArgAction};
use clibase::{with_openstd, ArgumentParser, ParsedArgs, ParserConfig, PipeSafe, ProjectError};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

const DESCRIPTION: &str = "
    Copy an input file to standard output.

    Template for command-line programs: reads INPUT_FILE (or stdin) line by
    line, echoes it, and reports how many lines were processed.
";

pub fn parser() -> ArgumentParser {
    ArgumentParser::new(
        ParserConfig::new("clibase")
            .description(DESCRIPTION)
            .version(env!("CARGO_PKG_VERSION")),
    )
    .arg(
        Arg::new("infile")
            .value_name("INPUT_FILE")
            .default_value("-")
            .help("Input file to import from. [Default: stdin]"),
    )
    .arg(
        Arg::new("option")
            .short('o')
            .long("option")
            .action(ArgAction::SetTrue)
            .help("Some boolean option."),
    )
    .arg(
        Arg::new("argument")
            .short('a')
            .long("argument")
            .value_name("ARG")
            .default_value("somearg")
            .help("A string argument with a default value."),
    )
}

/// Execute the program body
pub fn execute(args: &ParsedArgs) -> Result<()> {
    tracing::debug!("{}", args);

    let infile = args.get_str("infile").unwrap_or("-");
    let (lines, name) = with_openstd(Some(Path::new(infile)), "r", |input| {
        let name = input.name().to_string();
        let stdout = io::stdout();
        let mut out = PipeSafe::new(stdout.lock());
        let lines = copy_lines(BufReader::new(input), &mut out)?;
        out.flush()?;
        Ok::<_, ProjectError>((lines, name))
    })?;

    tracing::info!("Processed {} lines from {}", lines, name);
    Ok(())
}

/// Copy `input` to `out` unchanged and count its lines.
fn copy_lines<R: BufRead, W: Write>(mut input: R, out: &mut W) -> io::Result<usize> {
    let mut line = Vec::new();
    let mut count = 0;
    while input.read_until(b'\n', &mut line)? > 0 {
        out.write_all(&line)?;
        count += 1;
        line.clear();
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_keeps_bytes_and_counts_lines() {
        let mut out = Vec::new();
        let count = copy_lines(&b"one\ntwo\nthree"[..], &mut out).unwrap();
        assert_eq!(count, 3);
        assert_eq!(out, b"one\ntwo\nthree");
    }

    #[test]
    fn copy_empty_input() {
        let mut out = Vec::new();
        assert_eq!(copy_lines(&b""[..], &mut out).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn parser_defaults() {
        let args = parser().try_parse_args(Vec::<String>::new()).unwrap();
        assert_eq!(args.get_str("infile"), Some("-"));
        assert_eq!(args.get_str("argument"), Some("somearg"));
        assert!(!args.get_flag("option"));
        assert!(!args.debug());
    }

    #[test]
    fn missing_input_is_a_project_error() {
        let args = parser()
            .try_parse_args(["/nonexistent/clibase/input.txt"])
            .unwrap();
        let err = execute(&args).unwrap_err();
        let project = err.downcast_ref::<ProjectError>().unwrap();
        assert_eq!(project.errno(), 2);
        assert!(project.message().starts_with("cannot open"));
    }
}
