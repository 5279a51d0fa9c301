use anyhow::{Context, Result};
use bytesize::ByteSize;
use chrono::{DateTime, Local};
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::AppletError;
use crate::mode::permission_string;

/// Options for `ls`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    pub all: bool,
    pub long: bool,
    pub human_readable: bool,
}

struct Entry {
    name: OsString,
    path: PathBuf,
}

/// List each operand. Directories are expanded, files are printed as given.
pub fn list(paths: &[PathBuf], options: ListOptions, out: &mut impl Write) -> Result<()> {
    let default = [PathBuf::from(".")];
    let paths = if paths.is_empty() { &default[..] } else { paths };
    let with_headers = paths.len() > 1;
    let mut printed = false;

    for path in paths {
        let is_dir = match fs::metadata(path) {
            Ok(metadata) => metadata.is_dir(),
            // Dangling symlinks are listed like files.
            Err(_) if fs::symlink_metadata(path).is_ok() => false,
            Err(_) => return Err(AppletError::UnsupportedArgument(path.clone()).into()),
        };

        if !is_dir {
            write_entry(path.as_os_str(), path, options, out)?;
            printed = true;
            continue;
        }

        if with_headers {
            if printed {
                writeln!(out)?;
            }
            writeln!(out, "{}:", path.display())?;
        }
        for entry in read_entries(path, options.all)? {
            write_entry(&entry.name, &entry.path, options, out)?;
        }
        printed = true;
    }
    Ok(())
}

fn read_entries(dir: &Path, all: bool) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    if all {
        for special in [".", ".."] {
            entries.push(Entry {
                name: special.into(),
                path: dir.join(special),
            });
        }
    }
    let read_dir =
        fs::read_dir(dir).with_context(|| format!("cannot open directory '{}'", dir.display()))?;
    for entry in read_dir {
        let entry = entry?;
        let name = entry.file_name();
        if !all && name.as_encoded_bytes().starts_with(b".") {
            continue;
        }
        entries.push(Entry {
            name,
            path: entry.path(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(path = %dir.display(), count = entries.len(), "read directory");
    Ok(entries)
}

fn write_entry(
    name: &std::ffi::OsStr,
    path: &Path,
    options: ListOptions,
    out: &mut impl Write,
) -> Result<()> {
    let name = name.to_string_lossy();
    if !options.long {
        writeln!(out, "  {name}")?;
        return Ok(());
    }

    let metadata = fs::symlink_metadata(path)
        .with_context(|| format!("cannot access '{}'", path.display()))?;
    let size = if options.human_readable {
        ByteSize::b(metadata.len()).to_string()
    } else {
        metadata.len().to_string()
    };
    let modified = metadata
        .modified()
        .map(|time| DateTime::<Local>::from(time).format("%b %e %H:%M").to_string())
        .unwrap_or_else(|_| "?".repeat(12));
    write!(
        out,
        "  {}{} {:>3} {:>9} {} {}",
        type_char(&metadata),
        permission_string(mode_bits(&metadata)),
        link_count(&metadata),
        size,
        modified,
        name
    )?;
    if metadata.file_type().is_symlink()
        && let Ok(target) = fs::read_link(path)
    {
        write!(out, " -> {}", target.display())?;
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(unix)]
fn type_char(metadata: &fs::Metadata) -> char {
    use std::os::unix::fs::FileTypeExt;
    let file_type = metadata.file_type();
    if file_type.is_dir() {
        'd'
    } else if file_type.is_symlink() {
        'l'
    } else if file_type.is_block_device() {
        'b'
    } else if file_type.is_char_device() {
        'c'
    } else if file_type.is_fifo() {
        'p'
    } else if file_type.is_socket() {
        's'
    } else {
        '-'
    }
}

#[cfg(not(unix))]
fn type_char(metadata: &fs::Metadata) -> char {
    if metadata.is_dir() {
        'd'
    } else if metadata.file_type().is_symlink() {
        'l'
    } else {
        '-'
    }
}

#[cfg(unix)]
fn mode_bits(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn mode_bits(metadata: &fs::Metadata) -> u32 {
    if metadata.permissions().readonly() { 0o555 } else { 0o777 }
}

#[cfg(unix)]
fn link_count(metadata: &fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.nlink()
}

#[cfg(not(unix))]
fn link_count(_metadata: &fs::Metadata) -> u64 {
    1
}
