use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::model::Applet;

/// Minimal Unix file utilities behind a single binary.
#[derive(Debug, Parser)]
#[command(name = "minibox", version, about, long_about = None, disable_help_subcommand = true)]
pub struct Cli {
    /// Log filesystem calls to stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the current working directory.
    Pwd,
    /// Print arguments separated by spaces.
    #[command(disable_help_flag = true)]
    Echo(EchoArgs),
    /// Concatenate files to standard output.
    Cat(CatArgs),
    /// Create directories.
    Mkdir(MkdirArgs),
    /// Move or rename a file or directory.
    Mv(MvArgs),
    /// Create a hard or symbolic link.
    Ln(LnArgs),
    /// Remove empty directories.
    Rmdir(RmdirArgs),
    /// Remove files or directories.
    Rm(RmArgs),
    /// List directory contents.
    #[command(disable_help_flag = true)]
    Ls(LsArgs),
    /// Copy a file or directory.
    Cp(CpArgs),
    /// Update timestamps, creating files as needed.
    Touch(TouchArgs),
    /// Change permission bits.
    Chmod(ChmodArgs),
    #[command(external_subcommand)]
    Unsupported(Vec<String>),
}

impl Command {
    /// The applet this command runs, `None` for unknown command names.
    pub fn applet(&self) -> Option<Applet> {
        Some(match self {
            Command::Pwd => Applet::Pwd,
            Command::Echo(_) => Applet::Echo,
            Command::Cat(_) => Applet::Cat,
            Command::Mkdir(_) => Applet::Mkdir,
            Command::Mv(_) => Applet::Mv,
            Command::Ln(_) => Applet::Ln,
            Command::Rmdir(_) => Applet::Rmdir,
            Command::Rm(_) => Applet::Rm,
            Command::Ls(_) => Applet::Ls,
            Command::Cp(_) => Applet::Cp,
            Command::Touch(_) => Applet::Touch,
            Command::Chmod(_) => Applet::Chmod,
            Command::Unsupported(_) => return None,
        })
    }
}

#[derive(Debug, Args)]
pub struct EchoArgs {
    /// Do not output the trailing newline.
    #[arg(short = 'n')]
    pub no_newline: bool,

    /// Interpret backslash escapes.
    #[arg(short = 'e', overrides_with = "no_escapes")]
    pub escapes: bool,

    /// Do not interpret backslash escapes (default).
    #[arg(short = 'E', overrides_with = "escapes")]
    pub no_escapes: bool,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub words: Vec<String>,
}

impl EchoArgs {
    /// True when `echo` was run with no arguments at all.
    pub fn is_empty(&self) -> bool {
        !self.no_newline && !self.escapes && !self.no_escapes && self.words.is_empty()
    }
}

#[derive(Debug, Args)]
pub struct CatArgs {
    /// Number all output lines.
    #[arg(short = 'n', long)]
    pub number: bool,

    /// Files to print; `-` reads standard input.
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct MkdirArgs {
    /// Create parent directories as needed, no error if existing.
    #[arg(short, long)]
    pub parents: bool,

    /// Permission bits for created directories (octal or symbolic).
    #[arg(short, long)]
    pub mode: Option<String>,

    pub dirs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct MvArgs {
    /// Source and destination.
    pub operands: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct LnArgs {
    /// Make a symbolic link instead of a hard link.
    #[arg(short, long)]
    pub symbolic: bool,

    /// Remove an existing destination first.
    #[arg(short, long)]
    pub force: bool,

    /// Target and link name.
    pub operands: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RmdirArgs {
    /// Also remove each empty ancestor named in the operand.
    #[arg(short, long)]
    pub parents: bool,

    pub dirs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RmArgs {
    /// Remove directories and their contents.
    #[arg(short = 'r', visible_short_alias = 'R', long)]
    pub recursive: bool,

    /// Remove empty directories.
    #[arg(short = 'd', long)]
    pub dir: bool,

    /// Ignore missing operands.
    #[arg(short, long)]
    pub force: bool,

    pub targets: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct LsArgs {
    /// Include entries starting with `.`, plus `.` and `..`.
    #[arg(short, long)]
    pub all: bool,

    /// Long listing format.
    #[arg(short = 'l')]
    pub long: bool,

    /// Print sizes in binary units with `-l`.
    #[arg(short = 'h', long)]
    pub human_readable: bool,

    /// Print help.
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,

    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CpArgs {
    /// Copy directories recursively.
    #[arg(short = 'r', visible_short_alias = 'R', long)]
    pub recursive: bool,

    /// Source and destination.
    pub operands: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct TouchArgs {
    /// Change only the access time.
    #[arg(short = 'a')]
    pub access: bool,

    /// Change only the modification time.
    #[arg(short = 'm')]
    pub modification: bool,

    /// Do not create missing files.
    #[arg(short = 'c', long)]
    pub no_create: bool,

    /// Use this RFC 3339 time instead of now.
    #[arg(short, long, conflicts_with = "reference")]
    pub date: Option<String>,

    /// Use this file's times instead of now.
    #[arg(short, long)]
    pub reference: Option<PathBuf>,

    pub files: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ChmodArgs {
    /// Change files and directories recursively.
    #[arg(short = 'R', long)]
    pub recursive: bool,

    /// Mode and target. Modes may start with `-`, as in `-w`.
    #[arg(allow_hyphen_values = true)]
    pub operands: Vec<String>,
}
