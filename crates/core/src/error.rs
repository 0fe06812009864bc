use std::path::PathBuf;
use std::process::ExitStatus;

/// Errors that can occur when using warden.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("already destroyed")]
    AlreadyDestroyed,

    #[error("command arguments are empty")]
    EmptyArguments,

    #[error("piped execution requires at least two commands")]
    NotMultipleCommands,

    #[error("path is not relative: {}", .0.display())]
    NotRelativePath(PathBuf),

    #[error("path is not absolute: {}", .0.display())]
    NotAbsolutePath(PathBuf),

    #[error("path escapes its directory context: {}", .0.display())]
    PathOutOfContext(PathBuf),

    #[error("file does not exist: {}", .0.display())]
    FileDoesNotExist(PathBuf),

    #[error("file already exists: {}", .0.display())]
    FileAlreadyExists(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("unknown exec type: {0}")]
    UnknownExecType(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("program not found: {0}")]
    ProgramNotFound(String),

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited unsuccessfully: {status}")]
    ExitStatus { program: String, status: ExitStatus },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if this is [`Error::AlreadyDestroyed`].
    pub fn is_already_destroyed(&self) -> bool {
        matches!(self, Error::AlreadyDestroyed)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_already_destroyed() {
        assert_eq!(Error::AlreadyDestroyed.to_string(), "already destroyed");
    }

    #[test]
    fn error_display_not_relative_path() {
        let err = Error::NotRelativePath(PathBuf::from("/etc/passwd"));
        assert_eq!(err.to_string(), "path is not relative: /etc/passwd");
    }

    #[test]
    fn error_display_unknown_exec_type() {
        let err = Error::UnknownExecType("docker".to_string());
        assert_eq!(err.to_string(), "unknown exec type: docker");
    }

    #[test]
    fn error_display_invalid_pattern() {
        let err = Error::InvalidPattern {
            pattern: "[".to_string(),
            reason: "unclosed character class".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid pattern '[': unclosed character class"
        );
    }

    #[test]
    fn is_already_destroyed_only_matches_that_kind() {
        assert!(Error::AlreadyDestroyed.is_already_destroyed());
        assert!(!Error::EmptyArguments.is_already_destroyed());
    }

    #[test]
    fn error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }
}
