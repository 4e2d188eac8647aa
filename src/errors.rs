//! Error taxonomy for the storage engine and its REPL shell.
//!
//! Three layers: parse errors and execute errors are reported to the user
//! and the REPL keeps going; fatal errors terminate the process immediately
//! via [`fatal`].

use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Filesystem failure.
    Io(std::io::Error),
    /// Rejected statement text (`PREPARE_*`).
    Parse(String),
    /// Rejected operation that leaves the tree untouched (`EXECUTE_*`).
    Execute(String),
    /// Invariant violation or unrecoverable I/O condition. Reaching this
    /// variant should be followed by a call to [`fatal`], not by returning
    /// up the call stack.
    Fatal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "{}", e),
            Error::Parse(msg) => write!(f, "{}", msg),
            Error::Execute(msg) => write!(f, "{}", msg),
            Error::Fatal(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

/// Logs `msg` at error level and terminates the process with status 1.
///
/// Used for invariant violations the design treats as unrecoverable: an
/// out-of-range page number, flushing an empty slot, a corrupt file length,
/// an internal node whose right child is dereferenced while still the
/// invalid sentinel.
pub fn fatal(msg: impl AsRef<str>) -> ! {
    let msg = msg.as_ref();
    tracing::error!("{}", msg);
    eprintln!("{}", msg);
    std::process::exit(1);
}
