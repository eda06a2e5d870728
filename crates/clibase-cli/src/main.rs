mod cli;

use clibase::runner::{self, EXIT_FAILURE};
use clibase::{ConfigService, Logging};
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Before the config, so --help and --version never read it.
    // Usage errors exit here with status 2
    let args = cli::parser().parse();

    let config = match ConfigService::from_env().load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("clibase: {:#}", err);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    // -q/-v decide the level; format and filters come from the config
    let logging = match Logging::new(&config.logging.clone().with_level(args.loglevel())) {
        Ok(logging) => logging,
        Err(err) => {
            eprintln!("clibase: {}", err);
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    if let Err(err) = logging.init() {
        eprintln!("clibase: {}", err);
        return ExitCode::from(EXIT_FAILURE);
    }

    runner::run_until_interrupted(move || cli::execute(&args), config.interrupt_exit_code).await
}
