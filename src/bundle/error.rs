//! Error taxonomy for the bundle assembly pipeline.
//!
//! Every failure mode of the pipeline is fatal: the run either produces a
//! complete, signed bundle archive or aborts with one of these errors.
//! Non-fatal conditions are reported through `log::warn!` instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal pipeline errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed delimiter grouping of the flat argument list
    #[error("bad invocation: {reason}")]
    BadInvocation {
        /// Reason for the error
        reason: String,
    },

    /// No `.plist` / `.partial_plist` input was supplied
    #[error("no manifest artifacts found; a bundle needs at least one .plist or .partial_plist")]
    MissingManifest,

    /// More than one entitlements descriptor was supplied
    #[error("too many signing descriptors: found {count} .xcent files, at most one is allowed")]
    TooManySigningDescriptors {
        /// Number of `.xcent` inputs found
        count: usize,
    },

    /// An override source was not a flat JSON object
    #[error("malformed override source {path}: {reason}")]
    MalformedOverride {
        /// Path of the offending `.plist_json` input
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// An archive member would extract outside the destination directory
    #[error("path traversal in archive: entry {entry:?} escapes {dest:?}")]
    PathTraversal {
        /// Offending member name as stored in the archive
        entry: PathBuf,
        /// Extraction destination the member tried to escape
        dest: PathBuf,
    },

    /// An external tool exited non-zero (or could not be launched)
    #[error("{tool} failed (exit code {code:?}): {stderr}")]
    ExternalTool {
        /// Tool name as invoked
        tool: String,
        /// Exit code, if the process terminated normally
        code: Option<i32>,
        /// Captured stderr
        stderr: String,
    },

    /// IO error annotated with the action that was being performed
    #[error("{action} ({path}): {source}")]
    Fs {
        /// What the pipeline was doing
        action: String,
        /// Path involved
        path: PathBuf,
        /// Underlying IO error
        source: io::Error,
    },

    /// Bare IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Property-list parse/serialize errors
    #[error("plist error: {0}")]
    Plist(#[from] plist::Error),

    /// Generic errors (used by [`bail!`])
    #[error("{0}")]
    Generic(String),
}

/// Adds filesystem context to raw `io::Error` results.
pub trait ErrorExt<T> {
    /// Wrap an IO failure with the action being performed and the path involved.
    fn fs_context(self, action: &str, path: &std::path::Path) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, io::Error> {
    fn fs_context(self, action: &str, path: &std::path::Path) -> Result<T> {
        self.map_err(|source| Error::Fs {
            action: action.to_string(),
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Adds string context to pipeline results.
pub trait Context<T> {
    /// Prefix the error with a static description.
    fn context(self, msg: &str) -> Result<T>;

    /// Prefix the error with a lazily built description.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T> Context<T> for Result<T> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| Error::Generic(format!("{msg}: {e}")))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| Error::Generic(format!("{}: {e}", f())))
    }
}

/// Early-return with a formatted [`Error::Generic`].
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::bundle::Error::Generic(format!($($arg)*)))
    };
}
