use anyhow::{Context, Result, anyhow};
use clap::Parser;
use clap::error::ErrorKind;
use filetime::FileTime;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::info;

use crate::cli::{
    CatArgs, ChmodArgs, Cli, Command, CpArgs, EchoArgs, LnArgs, LsArgs, MkdirArgs, MvArgs,
    RmArgs, RmdirArgs, TouchArgs,
};
use crate::error::AppletError;
use crate::exit_codes::exit;
use crate::fsops::{self, RemoveMode, TimeUpdate};
use crate::listing::{self, ListOptions};
use crate::mode::Mode;
use crate::model::Applet;
use crate::reporter::Reporter;
use crate::text::{self, Concatenator};

const NO_COMMAND: &str = "No command provided. Please, type a Linux command.";

/// Parse `argv` (program name first) and run the command it names.
pub fn execute<I, T, W>(argv: I, out: W) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
    W: Write,
{
    let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
    match Cli::try_parse_from(&argv) {
        Ok(cli) => run(cli.command, out),
        Err(err) => report_parse_error(&argv, &err, out),
    }
}

/// Run a parsed command and return the process exit code.
pub fn run<W: Write>(command: Option<Command>, out: W) -> i32 {
    let mut reporter = Reporter::new(out);
    let code = match command {
        None => {
            reporter.line(NO_COMMAND);
            exit::SUCCESS
        }
        Some(command) => {
            let applet = command.applet();
            if let Some(applet) = applet {
                info!(%applet, "running");
            }
            match dispatch(command, reporter.out()) {
                Ok(()) => exit::SUCCESS,
                Err(err) => reporter.failure(applet, &err),
            }
        }
    };
    reporter.finish();
    code
}

/// Report an argument error. Help and version requests are not failures.
pub fn report_parse_error<W: Write>(argv: &[OsString], err: &clap::Error, out: W) -> i32 {
    let mut reporter = Reporter::new(out);
    let code = match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            let _ = write!(reporter.out(), "{}", err.render());
            exit::SUCCESS
        }
        _ => {
            let rendered = err.render().to_string();
            let first = rendered.lines().next().unwrap_or_default();
            let message = first.strip_prefix("error: ").unwrap_or(first);
            reporter.failure(applet_from_argv(argv), &anyhow!(message.to_string()))
        }
    };
    reporter.finish();
    code
}

/// The applet named by the first non-option argument, if any.
fn applet_from_argv(argv: &[OsString]) -> Option<Applet> {
    argv.iter()
        .skip(1)
        .map(|arg| arg.to_string_lossy())
        .find(|arg| !arg.starts_with('-'))
        .and_then(|name| Applet::from_name(&name))
}

fn dispatch(command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Pwd => pwd(out),
        Command::Echo(args) => echo(args, out),
        Command::Cat(args) => cat(args, out),
        Command::Mkdir(args) => mkdir(args),
        Command::Mv(args) => mv(args),
        Command::Ln(args) => ln(args),
        Command::Rmdir(args) => rmdir(args),
        Command::Rm(args) => rm(args),
        Command::Ls(args) => ls(args, out),
        Command::Cp(args) => cp(args),
        Command::Touch(args) => touch(args),
        Command::Chmod(args) => chmod(args, out),
        Command::Unsupported(words) => {
            let name = words.first().map(String::as_str).unwrap_or_default();
            writeln!(
                out,
                "Unsupported command: {name}. Please, make sure you have typed the command correctly!"
            )?;
            Ok(())
        }
    }
}

fn two_operands<'a, T>(
    operands: &'a [T],
    applet: &'static str,
    names: &'static str,
) -> Result<(&'a T, &'a T)> {
    match operands {
        [] => Err(AppletError::MissingOperand(applet).into()),
        [first, second] => Ok((first, second)),
        _ => Err(AppletError::OperandCount {
            applet,
            operands: names,
        }
        .into()),
    }
}

pub fn pwd(out: &mut impl Write) -> Result<()> {
    let cwd = std::env::current_dir().context("cannot determine the current directory")?;
    writeln!(out, "{}", cwd.display())?;
    Ok(())
}

pub fn echo(args: EchoArgs, out: &mut impl Write) -> Result<()> {
    if args.is_empty() {
        return Err(AppletError::MissingOperand("echo").into());
    }
    let joined = args.words.join(" ");
    let (output, stopped) = if args.escapes {
        text::unescape(&joined)
    } else {
        (joined, false)
    };
    out.write_all(output.as_bytes())?;
    if !args.no_newline && !stopped {
        writeln!(out)?;
    }
    Ok(())
}

pub fn cat(args: CatArgs, out: &mut impl Write) -> Result<()> {
    if args.files.is_empty() {
        return Err(AppletError::MissingOperand("cat").into());
    }
    let mut concatenator = Concatenator::new(args.number);
    for file in &args.files {
        let content = if file.as_os_str() == "-" {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("cannot read standard input")?;
            buf
        } else {
            fs::read(file).map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => AppletError::NoSuchFile(file.clone()).into(),
                _ => anyhow::Error::new(err).context(format!("cannot read '{}'", file.display())),
            })?
        };
        concatenator.write(&content, out)?;
    }
    Ok(())
}

pub fn mkdir(args: MkdirArgs) -> Result<()> {
    if args.dirs.is_empty() {
        return Err(AppletError::MissingOperand("mkdir").into());
    }
    let mode = args.mode.as_deref().map(Mode::parse).transpose()?;
    for dir in &args.dirs {
        fsops::mkdir(dir, args.parents, mode.as_ref())
            .with_context(|| format!("cannot create the directory '{}'", dir.display()))?;
    }
    Ok(())
}

pub fn mv(args: MvArgs) -> Result<()> {
    let (src, dst) = two_operands(&args.operands, "mv", "source and destination")?;
    if fs::symlink_metadata(src).is_err() {
        return Err(AppletError::NothingToMove(src.clone()).into());
    }
    let moved = fsops::mv(src, dst)
        .with_context(|| format!("cannot move '{}' to '{}'", src.display(), dst.display()))?;
    info!(src = %src.display(), dst = %moved.final_dst.display(), bytes = moved.bytes_copied, "moved");
    Ok(())
}

pub fn ln(args: LnArgs) -> Result<()> {
    let (target, link_name) = two_operands(&args.operands, "ln", "source and destination")?;
    let created = fsops::link(target, link_name, args.symbolic, args.force).with_context(|| {
        format!(
            "cannot create the link from '{}' to '{}'",
            target.display(),
            link_name.display()
        )
    })?;
    info!(target = %target.display(), link = %created.display(), "linked");
    Ok(())
}

pub fn rmdir(args: RmdirArgs) -> Result<()> {
    if args.dirs.is_empty() {
        return Err(AppletError::MissingOperand("rmdir").into());
    }
    for dir in &args.dirs {
        fsops::rmdir(dir, args.parents)
            .with_context(|| format!("cannot remove the directory '{}'", dir.display()))?;
    }
    Ok(())
}

pub fn rm(args: RmArgs) -> Result<()> {
    if args.targets.is_empty() {
        if args.force {
            return Ok(());
        }
        return Err(AppletError::MissingOperand("rm").into());
    }
    let mode = if args.recursive {
        RemoveMode::Recursive
    } else if args.dir {
        RemoveMode::EmptyDir
    } else {
        RemoveMode::File
    };
    for target in &args.targets {
        fsops::refuse_dot_operand(target)?;
    }
    for target in &args.targets {
        if args.force && fs::symlink_metadata(target).is_err() {
            continue;
        }
        fsops::remove(target, mode)
            .with_context(|| format!("cannot remove '{}'", target.display()))?;
    }
    Ok(())
}

pub fn ls(args: LsArgs, out: &mut impl Write) -> Result<()> {
    let options = ListOptions {
        all: args.all,
        long: args.long,
        human_readable: args.human_readable,
    };
    listing::list(&args.paths, options, out)
}

pub fn cp(args: CpArgs) -> Result<()> {
    let (src, dst) = two_operands(&args.operands, "cp", "the target and the destination")?;
    let copied = fsops::cp(src, dst, args.recursive)
        .with_context(|| format!("cannot copy '{}' to '{}'", src.display(), dst.display()))?;
    info!(src = %src.display(), dst = %copied.final_dst.display(), bytes = copied.bytes_copied, "copied");
    Ok(())
}

pub fn touch(args: TouchArgs) -> Result<()> {
    if args.files.is_empty() {
        return Err(AppletError::NoFiles.into());
    }
    let (atime, mtime) = requested_times(&args)?;
    let update = TimeUpdate {
        access: (args.access || !args.modification).then_some(atime),
        modification: (args.modification || !args.access).then_some(mtime),
    };
    for file in &args.files {
        let touched = fsops::touch(file, update, !args.no_create)
            .with_context(|| format!("cannot update timestamps for '{}'", file.display()))?;
        if !touched {
            info!(path = %file.display(), "skipped missing file");
        }
    }
    Ok(())
}

fn requested_times(args: &TouchArgs) -> Result<(FileTime, FileTime)> {
    if let Some(reference) = &args.reference {
        let metadata = fs::metadata(reference)
            .with_context(|| format!("cannot stat reference file '{}'", reference.display()))?;
        return Ok((
            FileTime::from_last_access_time(&metadata),
            FileTime::from_last_modification_time(&metadata),
        ));
    }
    if let Some(date) = &args.date {
        let time = humantime::parse_rfc3339_weak(date)
            .map_err(|_| AppletError::InvalidDate(date.clone()))?;
        let time = FileTime::from_system_time(time);
        return Ok((time, time));
    }
    let now = FileTime::now();
    Ok((now, now))
}

pub fn chmod(args: ChmodArgs, out: &mut impl Write) -> Result<()> {
    let (mode, target) = two_operands(&args.operands, "chmod", "the rights and the target")?;
    let target = Path::new(target);
    if !target.exists() {
        return Err(AppletError::NotFound(target.to_path_buf()).into());
    }
    let mode = Mode::parse(mode)?;
    fsops::chmod(target, &mode, args.recursive)
        .with_context(|| format!("cannot change permissions of '{}'", target.display()))?;
    writeln!(out, "chmod applied successfully")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn exec(args: &[&str]) -> (i32, String) {
        let mut out = Vec::new();
        let argv = std::iter::once("minibox").chain(args.iter().copied());
        let code = execute(argv, &mut out);
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_no_command() {
        assert_eq!(exec(&[]), (0, format!("{NO_COMMAND}\n")));
    }

    #[test]
    fn test_unsupported_command_is_not_a_failure() {
        let (code, output) = exec(&["grep", "x"]);
        assert_eq!(code, 0);
        assert!(output.starts_with("Unsupported command: grep."));
    }

    #[test]
    fn test_echo() {
        assert_eq!(exec(&["echo", "hello", "world"]), (0, "hello world\n".to_string()));
        assert_eq!(exec(&["echo", "-n", "a", "b"]), (0, "a b".to_string()));
        assert_eq!(exec(&["echo", "-e", r"a\tb\c", "gone"]), (0, "a\tb".to_string()));
        assert_eq!(exec(&["echo", "-n"]), (0, String::new()));
    }

    #[test]
    fn test_echo_without_arguments_fails() {
        let (code, output) = exec(&["echo"]);
        assert_eq!(code, -10);
        assert_eq!(output, "ERROR: no argument(s) provided for echo\n");
    }

    #[test]
    fn test_cat_files_in_order() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, "alpha").unwrap();
        fs::write(&b, "beta\n").unwrap();
        let (code, output) = exec(&["cat", a.to_str().unwrap(), b.to_str().unwrap()]);
        assert_eq!(code, 0);
        assert_eq!(output, "alpha\nbeta\n");
    }

    #[test]
    fn test_cat_missing_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");
        let (code, output) = exec(&["cat", missing.to_str().unwrap()]);
        assert_eq!(code, -20);
        assert_eq!(output, format!("ERROR: No such file: '{}'\n", missing.display()));
    }

    #[test]
    fn test_operand_count_messages() {
        let (code, output) = exec(&["mv", "only-one"]);
        assert_eq!(code, -40);
        assert_eq!(
            output,
            "ERROR: mv requires exactly 2 arguments: source and destination\n"
        );

        let (code, _) = exec(&["cp", "a", "b", "c"]);
        assert_eq!(code, -90);

        let (code, output) = exec(&["chmod"]);
        assert_eq!(code, -25);
        assert_eq!(output, "ERROR: no argument(s) provided for chmod\n");
    }

    #[test]
    fn test_unknown_flag_uses_applet_code() {
        let (code, output) = exec(&["touch", "-z", "file"]);
        assert_eq!(code, -100);
        assert!(output.starts_with("ERROR: "), "{output}");

        let (code, _) = exec(&["--bogus"]);
        assert_eq!(code, exit::USAGE);
    }

    #[test]
    fn test_help_is_not_an_error() {
        let (code, output) = exec(&["cp", "--help"]);
        assert_eq!(code, 0);
        assert!(output.contains("Usage"));
    }

    #[test]
    fn test_touch_modification_only() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("t");
        fs::write(&file, "").unwrap();
        let old = FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_times(&file, old, old).unwrap();

        let (code, _) = exec(&["touch", "-m", "-d", "2020-02-03T04:05:06Z", file.to_str().unwrap()]);
        assert_eq!(code, 0);
        let metadata = fs::metadata(&file).unwrap();
        assert_eq!(FileTime::from_last_access_time(&metadata), old);
        assert_eq!(
            FileTime::from_last_modification_time(&metadata),
            FileTime::from_unix_time(1_580_702_706, 0)
        );
    }

    #[test]
    fn test_touch_invalid_date() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("t");
        let (code, output) = exec(&["touch", "-d", "yesterday", file.to_str().unwrap()]);
        assert_eq!(code, -100);
        assert_eq!(output, "ERROR: invalid date format 'yesterday'\n");
        assert!(!file.exists());
    }

    #[test]
    fn test_mv_missing_source_message() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let (code, output) = exec(&["mv", missing.to_str().unwrap(), "x"]);
        assert_eq!(code, -40);
        assert_eq!(
            output,
            format!("ERROR: cannot move '{}': No such file or directory\n", missing.display())
        );
    }

    #[test]
    fn test_rm_refuses_dot_before_removing_anything() {
        let dir = tempdir().unwrap();
        let victim = dir.path().join("victim");
        fs::write(&victim, "").unwrap();
        let dot = dir.path().join(".");
        let (code, output) = exec(&["rm", "-r", victim.to_str().unwrap(), dot.to_str().unwrap()]);
        assert_eq!(code, -70);
        assert!(output.starts_with("ERROR: refusing to remove '.' or '..'"), "{output}");
        assert!(victim.exists());
    }

    #[test]
    fn test_rm_force_ignores_missing() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert_eq!(exec(&["rm", "-f", missing.to_str().unwrap()]).0, 0);
        assert_eq!(exec(&["rm", missing.to_str().unwrap()]).0, -70);
    }

    #[cfg(unix)]
    #[test]
    fn test_chmod_reports_success() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, "").unwrap();

        let (code, output) = exec(&["chmod", "570", file.to_str().unwrap()]);
        assert_eq!((code, output.as_str()), (0, "chmod applied successfully\n"));
        assert_eq!(fs::metadata(&file).unwrap().permissions().mode() & 0o7777, 0o570);

        let (code, output) = exec(&["chmod", "99", file.to_str().unwrap()]);
        assert_eq!(code, -25);
        assert_eq!(
            output,
            "ERROR: invalid permission mode: 99. Use octal like 570, 755, etc.\n"
        );
    }
}
