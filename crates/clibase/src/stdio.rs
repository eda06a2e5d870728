//! Standard stream helpers.
//!
//! [`openstd`] opens a path like `File::open` would, except that `-` (or no
//! path at all) selects stdin or stdout depending on the mode. The standard
//! streams are never closed by this module: dropping a [`StdStream`] closes
//! a file it opened and leaves stdin/stdout alone.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Stdin, Stdout, Write};
use std::path::Path;

#[cfg(unix)]
use std::os::unix::io::{AsRawFd, RawFd};

#[derive(Debug, thiserror::Error)]
pub enum StdioError {
    #[error("invalid mode {mode:?} for '{path}'")]
    InvalidMode { path: String, mode: String },

    #[error("cannot open '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Mode string in the conventional `open()` encoding.
///
/// Exactly one of `r` (read), `w` (write, create, truncate), `a` (append,
/// create) or `x` (write, must not exist), optionally followed by `+` (read
/// and write) and `b`/`t` (binary/text marker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenMode {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub create_new: bool,
    pub truncate: bool,
    pub update: bool,
    pub binary: bool,
}

impl OpenMode {
    pub fn parse(mode: &str) -> Option<Self> {
        let mut parsed = OpenMode::default();
        let mut primary = 0;
        for c in mode.chars() {
            match c {
                'r' => {
                    parsed.read = true;
                    primary += 1;
                }
                'w' => {
                    parsed.write = true;
                    parsed.truncate = true;
                    primary += 1;
                }
                'a' => {
                    parsed.append = true;
                    primary += 1;
                }
                'x' => {
                    parsed.write = true;
                    parsed.create_new = true;
                    primary += 1;
                }
                '+' if !parsed.update => parsed.update = true,
                'b' | 't' => parsed.binary = c == 'b',
                _ => return None,
            }
        }
        (primary == 1).then_some(parsed)
    }

    /// Opened for reading, so `-` means stdin.
    pub fn is_read(&self) -> bool {
        self.read
    }

    /// Opened for writing, so `-` means stdout.
    pub fn is_write(&self) -> bool {
        self.write || self.append
    }

    fn options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options
            .read(self.read || self.update)
            .write(self.write || self.update)
            .append(self.append)
            .truncate(self.truncate)
            .create(self.truncate || self.append)
            .create_new(self.create_new);
        options
    }
}

enum Inner {
    Stdin(Stdin),
    Stdout(Stdout),
    File(File),
}

/// A stream from [`openstd`]: stdin, stdout or an opened file.
pub struct StdStream {
    inner: Inner,
    name: String,
    mode: OpenMode,
}

impl StdStream {
    /// Display name: `<stdin>`, `<stdout>` or the quoted path.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Whether this is the process's stdin or stdout.
    pub fn is_std(&self) -> bool {
        !matches!(self.inner, Inner::File(_))
    }
}

fn unsupported(name: &str, what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, format!("{} is not {}", name, what))
}

impl std::fmt::Debug for StdStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdStream")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Read for StdStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::Stdin(stdin) => stdin.read(buf),
            Inner::File(file) => file.read(buf),
            Inner::Stdout(_) => Err(unsupported(&self.name, "readable")),
        }
    }
}

impl Write for StdStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::Stdout(stdout) => stdout.write(buf),
            Inner::File(file) => file.write(buf),
            Inner::Stdin(_) => Err(unsupported(&self.name, "writable")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            Inner::Stdout(stdout) => stdout.flush(),
            Inner::File(file) => file.flush(),
            Inner::Stdin(_) => Ok(()),
        }
    }
}

#[cfg(unix)]
impl AsRawFd for StdStream {
    fn as_raw_fd(&self) -> RawFd {
        match &self.inner {
            Inner::Stdin(stdin) => stdin.as_raw_fd(),
            Inner::Stdout(stdout) => stdout.as_raw_fd(),
            Inner::File(file) => file.as_raw_fd(),
        }
    }
}

fn is_sentinel(path: Option<&Path>) -> bool {
    match path {
        None => true,
        Some(path) => path.as_os_str().is_empty() || path.as_os_str() == "-",
    }
}

/// Open `path` with `mode`, mapping `-` or no path to stdin/stdout.
pub fn openstd(path: Option<&Path>, mode: &str) -> Result<StdStream, StdioError> {
    let display = path.map_or_else(|| "-".to_string(), |p| p.display().to_string());
    let invalid = || StdioError::InvalidMode {
        path: display.clone(),
        mode: mode.to_string(),
    };
    let parsed = OpenMode::parse(mode).ok_or_else(invalid)?;

    let stream = match path {
        Some(path) if !is_sentinel(Some(path)) => {
            let file = parsed
                .options()
                .open(path)
                .map_err(|source| StdioError::Open {
                    path: display.clone(),
                    source,
                })?;
            StdStream {
                inner: Inner::File(file),
                name: format!("'{}'", display),
                mode: parsed,
            }
        }
        _ if parsed.is_read() => StdStream {
            inner: Inner::Stdin(io::stdin()),
            name: "<stdin>".to_string(),
            mode: parsed,
        },
        _ if parsed.is_write() => StdStream {
            inner: Inner::Stdout(io::stdout()),
            name: "<stdout>".to_string(),
            mode: parsed,
        },
        _ => return Err(invalid()),
    };

    tracing::trace!("opened {} with mode {:?}", stream.name, mode);
    Ok(stream)
}

/// Run `f` on the stream for `path`, releasing it on every exit path.
///
/// Writable streams are flushed after `f` returns. A file opened here is
/// closed when the scope ends; stdin and stdout stay open.
pub fn with_openstd<T, E, F>(path: Option<&Path>, mode: &str, f: F) -> Result<T, E>
where
    F: FnOnce(&mut StdStream) -> Result<T, E>,
    E: From<StdioError> + From<io::Error>,
{
    let mut stream = openstd(path, mode)?;
    let result = f(&mut stream);
    if stream.mode.is_write() || stream.mode.update {
        match &result {
            Ok(_) => stream.flush()?,
            Err(_) => {
                let _ = stream.flush();
            }
        }
    }
    result
}

/// Writer that turns a broken pipe into a null sink.
///
/// The first `BrokenPipe` error from the inner writer is swallowed and every
/// later write is discarded, so a program piped into `head` finishes quietly.
#[derive(Debug)]
pub struct PipeSafe<W> {
    inner: W,
    broken: bool,
}

impl<W: Write> PipeSafe<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            broken: false,
        }
    }

    /// Whether the reader has gone away.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn swallow<T>(&mut self, result: io::Result<T>, discarded: T) -> io::Result<T> {
        match result {
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!("output pipe closed, discarding further output");
                self.broken = true;
                Ok(discarded)
            }
            other => other,
        }
    }
}

impl<W: Write> Write for PipeSafe<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.broken {
            return Ok(buf.len());
        }
        let result = self.inner.write(buf);
        self.swallow(result, buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.broken {
            return Ok(());
        }
        let result = self.inner.flush();
        self.swallow(result, ())
    }
}
