//! Top-level execution: turn a program's result into an exit status.

use crate::critical;
use crate::error::ProjectError;
use std::io;
use std::process::ExitCode;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_INTERRUPTED: u8 = 2;
/// Status a shell reports for a process killed by SIGINT.
pub const EXIT_INTERRUPTED_SHELL: u8 = 130;

/// How a failed run is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// The output pipe was closed by the reader
    BrokenPipe,
    /// A [`ProjectError`] raised on purpose
    Project,
    Unexpected,
}

impl Failure {
    pub fn status(self) -> u8 {
        match self {
            Failure::BrokenPipe => EXIT_SUCCESS,
            Failure::Project | Failure::Unexpected => EXIT_FAILURE,
        }
    }
}

pub fn classify(err: &anyhow::Error) -> Failure {
    let broken_pipe = err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .map_or(false, |e| e.kind() == io::ErrorKind::BrokenPipe)
    });
    if broken_pipe {
        Failure::BrokenPipe
    } else if err.downcast_ref::<ProjectError>().is_some()
        || err.chain().any(|cause| cause.is::<ProjectError>())
    {
        Failure::Project
    } else {
        Failure::Unexpected
    }
}

/// Log `err` the way its [`Failure`] kind calls for and return the status.
pub fn report(err: &anyhow::Error) -> u8 {
    let failure = classify(err);
    match failure {
        Failure::BrokenPipe => {}
        Failure::Project => critical!("{}", err),
        Failure::Unexpected => tracing::error!("{:?}", err),
    }
    failure.status()
}

pub fn exit_status(result: anyhow::Result<()>) -> u8 {
    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(err) => report(&err),
    }
}

pub fn exit_code(result: anyhow::Result<()>) -> ExitCode {
    ExitCode::from(exit_status(result))
}

/// Run a blocking `task` until it finishes or the user hits Ctrl-C.
///
/// On interrupt, logs `Aborting` and exits the process right away with
/// `interrupt_exit_code`; the task thread is not joined.
pub async fn run_until_interrupted<F>(task: F, interrupt_exit_code: u8) -> ExitCode
where
    F: FnOnce() -> anyhow::Result<()> + Send + 'static,
{
    tokio::select! {
        status = run_task(task) => ExitCode::from(status),
        _ = interrupted() => {
            tracing::info!("Aborting");
            std::process::exit(i32::from(interrupt_exit_code));
        }
    }
}

async fn run_task<F>(task: F) -> u8
where
    F: FnOnce() -> anyhow::Result<()> + Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(result) => exit_status(result),
        Err(join) => report(&anyhow::Error::new(join).context("task panicked")),
    }
}

async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No handler could be installed: never fire.
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{Logging, LoggingConfig, Style};
    use crate::testing::{CaptureWriter, ClosedPipe};
    use anyhow::Context;
    use std::io::Write;

    fn captured(emit: impl FnOnce() -> u8) -> (u8, String) {
        let config =
            LoggingConfig::default().with_format("%(levelname)s: %(message)s", Style::Percent);
        let logging = Logging::new(&config).unwrap();
        let writer = CaptureWriter::new();
        let status = tracing::subscriber::with_default(logging.subscriber(writer.clone()), emit);
        (status, writer.contents())
    }

    #[test]
    fn broken_pipe_anywhere_in_chain() {
        let err = anyhow::Error::new(io::Error::from(io::ErrorKind::BrokenPipe))
            .context("writing report");
        assert_eq!(classify(&err), Failure::BrokenPipe);
    }

    #[test]
    fn project_error_is_business_failure() {
        let err = anyhow::Error::new(ProjectError::new("no such user")).context("lookup");
        assert_eq!(classify(&err), Failure::Project);
    }

    #[test]
    fn other_errors_are_unexpected() {
        let err = anyhow::anyhow!("boom");
        assert_eq!(classify(&err), Failure::Unexpected);

        let err = anyhow::Error::new(io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(classify(&err), Failure::Unexpected);
    }

    #[test]
    fn broken_pipe_wins_over_project_error() {
        let err = anyhow::Error::new(
            ProjectError::new("flush failed")
                .with_source(io::Error::from(io::ErrorKind::BrokenPipe)),
        );
        assert_eq!(classify(&err), Failure::BrokenPipe);

        let err = anyhow::Error::new(io::Error::from(io::ErrorKind::BrokenPipe))
            .context(ProjectError::new("flush failed"));
        assert_eq!(classify(&err), Failure::BrokenPipe);
    }

    #[test]
    fn report_project_error_at_critical() {
        let (status, out) = captured(|| report(&ProjectError::new("bad input").into()));
        assert_eq!(status, EXIT_FAILURE);
        assert_eq!(out, "CRITICAL: bad input\n");
    }

    #[test]
    fn report_unexpected_with_causes() {
        let err = anyhow::anyhow!("root cause").context("outer");
        let (status, out) = captured(|| report(&err));
        assert_eq!(status, EXIT_FAILURE);
        assert!(out.starts_with("ERROR: outer"), "got {out:?}");
        assert!(out.contains("root cause"), "got {out:?}");
    }

    #[test]
    fn report_broken_pipe_silently() {
        let (status, out) = captured(|| {
            let result = ClosedPipe::after(0)
                .write_all(b"data")
                .context("writing output");
            exit_status(result)
        });
        assert_eq!(status, EXIT_SUCCESS);
        assert_eq!(out, "");
    }

    #[test]
    fn success_is_zero() {
        assert_eq!(exit_status(Ok(())), EXIT_SUCCESS);
    }

    #[tokio::test]
    async fn task_result_becomes_status() {
        assert_eq!(run_task(|| Ok(())).await, EXIT_SUCCESS);
        assert_eq!(
            run_task(|| Err(ProjectError::new("nope").into())).await,
            EXIT_FAILURE
        );
    }

    #[tokio::test]
    async fn panicking_task_is_a_failure() {
        let status = run_task(|| panic!("worker blew up")).await;
        assert_eq!(status, EXIT_FAILURE);
    }
}
