use std::path::PathBuf;
use thiserror::Error;

/// Failures an applet reports before or instead of an I/O error.
#[derive(Debug, Error)]
pub enum AppletError {
    #[error("no argument(s) provided for {0}")]
    MissingOperand(&'static str),

    #[error("{applet} requires exactly 2 arguments: {operands}")]
    OperandCount {
        applet: &'static str,
        operands: &'static str,
    },

    #[error("no file(s) specified")]
    NoFiles,

    #[error("No such file: '{}'", .0.display())]
    NoSuchFile(PathBuf),

    #[error("'{}' does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("'{}' is a directory", .0.display())]
    IsADirectory(PathBuf),

    #[error("'{}' is a directory (use -r or --recursive to copy directories)", .0.display())]
    DirectoryNeedsRecursive(PathBuf),

    #[error("'{}' and '{}' are the same file", .0.display(), .1.display())]
    SameFile(PathBuf, PathBuf),

    #[error("cannot move '{}': No such file or directory", .0.display())]
    NothingToMove(PathBuf),

    #[error("refusing to remove '.' or '..' directory: skipping '{}'", .0.display())]
    DotOperand(PathBuf),

    #[error("unsupported argument '{}'", .0.display())]
    UnsupportedArgument(PathBuf),

    #[error("invalid permission mode: {0}. Use octal like 570, 755, etc.")]
    InvalidMode(String),

    #[error("invalid date format '{0}'")]
    InvalidDate(String),
}
