use anyhow::{Context, Result, bail};
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::error::AppletError;
use crate::mode::Mode;

/// Result of a copy or move.
#[derive(Debug)]
pub struct OpResult {
    pub bytes_copied: u64,
    pub final_dst: PathBuf,
}

/// How `remove` treats directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveMode {
    /// Files and symlinks only.
    File,
    /// Files, symlinks and empty directories.
    EmptyDir,
    /// Anything, directories with their contents.
    Recursive,
}

/// Timestamps `touch` writes. `None` keeps the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUpdate {
    pub access: Option<FileTime>,
    pub modification: Option<FileTime>,
}

/// If `dst` is an existing directory, the path of `src` inside it.
pub fn destination_in(src: &Path, dst: &Path) -> Result<PathBuf> {
    if !dst.is_dir() {
        return Ok(dst.to_path_buf());
    }
    let name = src
        .file_name()
        .with_context(|| format!("cannot derive a file name from '{}'", src.display()))?;
    Ok(dst.join(name))
}

fn exists_no_follow(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

#[cfg(unix)]
fn file_id(metadata: &fs::Metadata) -> (u64, u64) {
    use std::os::unix::fs::MetadataExt;
    (metadata.dev(), metadata.ino())
}

/// True when `a` and `b` name the same file. `a` is always followed; `b` is
/// followed only when `follow_b` is set, so a symlink `b` pointing at `a` is
/// a different file when it is the thing about to be replaced.
#[cfg(unix)]
fn same_file(a: &Path, b: &Path, follow_b: bool) -> bool {
    let b_meta = if follow_b {
        fs::metadata(b)
    } else {
        fs::symlink_metadata(b)
    };
    match (fs::metadata(a), b_meta) {
        (Ok(a_meta), Ok(b_meta)) => file_id(&a_meta) == file_id(&b_meta),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_file(a: &Path, b: &Path, _follow_b: bool) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Reject operands whose last component is `.` or `..`.
pub fn refuse_dot_operand(path: &Path) -> Result<()> {
    let bytes = path.as_os_str().as_encoded_bytes();
    let trimmed = bytes
        .iter()
        .rposition(|b| *b != b'/')
        .map_or(&bytes[..0], |end| &bytes[..=end]);
    let last = trimmed
        .iter()
        .rposition(|b| *b == b'/')
        .map_or(trimmed, |slash| &trimmed[slash + 1..]);
    if last == b"." || last == b".." {
        return Err(AppletError::DotOperand(path.to_path_buf()).into());
    }
    Ok(())
}

/// Create a directory.
pub fn mkdir(dst: &Path, parents: bool, mode: Option<&Mode>) -> Result<()> {
    let existed = dst.is_dir();
    if parents {
        fs::create_dir_all(dst)?;
    } else {
        fs::create_dir(dst)?;
    }
    debug!(path = %dst.display(), parents, "created directory");
    if let Some(mode) = mode
        && !existed
    {
        set_mode(dst, mode.apply(0o777, true))?;
    }
    Ok(())
}

/// Check if two paths are on the same filesystem.
#[cfg(unix)]
fn same_filesystem(src: &Path, dst: &Path) -> Result<bool> {
    use std::os::unix::fs::MetadataExt;
    let src_meta = fs::symlink_metadata(src).context("failed to stat source")?;
    let dst_parent = dst
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let dst_parent_meta = fs::metadata(dst_parent).context("failed to stat destination parent")?;
    Ok(src_meta.dev() == dst_parent_meta.dev())
}

#[cfg(not(unix))]
fn same_filesystem(_src: &Path, _dst: &Path) -> Result<bool> {
    Ok(true)
}

/// Move a file or directory. An existing directory destination receives the
/// source under its own name.
pub fn mv(src: &Path, dst: &Path) -> Result<OpResult> {
    if !exists_no_follow(src) {
        return Err(AppletError::NotFound(src.to_path_buf()).into());
    }
    let dst = destination_in(src, dst)?;
    if same_filesystem(src, &dst)? {
        fs::rename(src, &dst)?;
        debug!(src = %src.display(), dst = %dst.display(), "renamed");
        return Ok(OpResult {
            bytes_copied: 0,
            final_dst: dst,
        });
    }

    // Cross-device: copy then delete.
    let metadata = fs::symlink_metadata(src)?;
    let bytes = if metadata.is_dir() {
        let mut options = fs_extra::dir::CopyOptions::new();
        options.copy_inside = true;
        fs_extra::dir::move_dir(src, &dst, &options)?
    } else {
        let mut options = fs_extra::file::CopyOptions::new();
        options.overwrite = true;
        fs_extra::file::move_file(src, &dst, &options)?
    };
    debug!(src = %src.display(), dst = %dst.display(), bytes, "moved across devices");
    Ok(OpResult {
        bytes_copied: bytes,
        final_dst: dst,
    })
}

/// Copy a file or directory.
pub fn cp(src: &Path, dst: &Path, recursive: bool) -> Result<OpResult> {
    let metadata =
        fs::metadata(src).map_err(|_| AppletError::NotFound(src.to_path_buf()))?;
    if metadata.is_dir() && !recursive {
        return Err(AppletError::DirectoryNeedsRecursive(src.to_path_buf()).into());
    }
    let dst = destination_in(src, dst)?;
    if same_file(src, &dst, true) {
        return Err(AppletError::SameFile(src.to_path_buf(), dst).into());
    }

    if metadata.is_file() {
        let bytes = fs::copy(src, &dst)?;
        debug!(src = %src.display(), dst = %dst.display(), bytes, "copied file");
        return Ok(OpResult {
            bytes_copied: bytes,
            final_dst: dst,
        });
    }
    if !metadata.is_dir() {
        bail!("unsupported file type: {:?}", metadata.file_type());
    }

    refuse_copy_into_itself(src, &dst)?;
    let mut bytes = 0;
    let mut dir_permissions = Vec::new();
    for entry in walkdir::WalkDir::new(src) {
        let entry = entry?;
        let rel_path = entry.path().strip_prefix(src)?;
        let target_path = dst.join(rel_path);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target_path)?;
            dir_permissions.push((target_path.clone(), entry.metadata()?.permissions()));
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target_path)?;
        } else {
            bytes += fs::copy(entry.path(), &target_path)?;
        }
        trace!(path = %target_path.display(), "copied entry");
    }
    // Applied last so read-only source directories can still be filled.
    for (path, permissions) in dir_permissions.into_iter().rev() {
        fs::set_permissions(&path, permissions)?;
    }
    debug!(src = %src.display(), dst = %dst.display(), bytes, "copied tree");

    Ok(OpResult {
        bytes_copied: bytes,
        final_dst: dst,
    })
}

fn refuse_copy_into_itself(src: &Path, dst: &Path) -> Result<()> {
    let dst_parent = dst
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let (Ok(src), Ok(parent)) = (src.canonicalize(), dst_parent.canonicalize()) else {
        return Ok(());
    };
    if parent.starts_with(&src) {
        bail!(
            "cannot copy directory '{}' into itself '{}'",
            src.display(),
            dst.display()
        );
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let target = fs::read_link(src)?;
    std::os::unix::fs::symlink(target, dst)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    fs::copy(src, dst)?;
    Ok(())
}

/// Create a link at `link_name` pointing to `target`.
pub fn link(target: &Path, link_name: &Path, symbolic: bool, force: bool) -> Result<PathBuf> {
    if !symbolic && !exists_no_follow(target) {
        return Err(AppletError::NotFound(target.to_path_buf()).into());
    }
    let link_path = destination_in(target, link_name)?;

    if force && let Ok(existing) = fs::symlink_metadata(&link_path) {
        if same_file(target, &link_path, false) {
            return Err(AppletError::SameFile(target.to_path_buf(), link_path).into());
        }
        if existing.is_dir() {
            return Err(AppletError::IsADirectory(link_path).into());
        }
        fs::remove_file(&link_path)?;
        debug!(path = %link_path.display(), "removed existing destination");
    }

    if symbolic {
        make_symlink(target, &link_path)?;
    } else {
        fs::hard_link(target, &link_path)?;
    }
    debug!(target = %target.display(), link = %link_path.display(), symbolic, "linked");
    Ok(link_path)
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

/// Remove an empty directory, then each empty ancestor if `parents` is set.
pub fn rmdir(dir: &Path, parents: bool) -> Result<()> {
    fs::remove_dir(dir)?;
    debug!(path = %dir.display(), "removed directory");
    if parents {
        for ancestor in dir.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            fs::remove_dir(ancestor)
                .with_context(|| format!("cannot remove '{}'", ancestor.display()))?;
            debug!(path = %ancestor.display(), "removed directory");
        }
    }
    Ok(())
}

/// Remove a path without following symlinks.
pub fn remove(path: &Path, mode: RemoveMode) -> Result<()> {
    refuse_dot_operand(path)?;
    let metadata =
        fs::symlink_metadata(path).map_err(|_| AppletError::NotFound(path.to_path_buf()))?;
    if metadata.is_dir() {
        match mode {
            RemoveMode::File => return Err(AppletError::IsADirectory(path.to_path_buf()).into()),
            RemoveMode::EmptyDir => fs::remove_dir(path)?,
            RemoveMode::Recursive => fs::remove_dir_all(path)?,
        }
    } else {
        fs::remove_file(path)?;
    }
    debug!(path = %path.display(), ?mode, "removed");
    Ok(())
}

/// Apply `mode` to `path`, and to everything below it when `recursive`.
pub fn chmod(path: &Path, mode: &Mode, recursive: bool) -> Result<()> {
    if !path.exists() {
        return Err(AppletError::NotFound(path.to_path_buf()).into());
    }
    let walker = walkdir::WalkDir::new(path).max_depth(if recursive { usize::MAX } else { 0 });
    for entry in walker {
        let entry = entry?;
        // Links themselves carry no mode of their own.
        if entry.depth() > 0 && entry.path_is_symlink() {
            continue;
        }
        let metadata = fs::metadata(entry.path())?;
        let new_mode = mode.apply(current_mode(&metadata), metadata.is_dir());
        set_mode(entry.path(), new_mode)?;
        debug!(path = %entry.path().display(), mode = format_args!("{:o}", new_mode), "changed mode");
    }
    Ok(())
}

#[cfg(unix)]
fn current_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn current_mode(metadata: &fs::Metadata) -> u32 {
    if metadata.permissions().readonly() { 0o555 } else { 0o777 }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(mode & 0o222 == 0);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

/// Update timestamps on `path`. Returns false when the file is missing and
/// `create` is off.
pub fn touch(path: &Path, update: TimeUpdate, create: bool) -> Result<bool> {
    if !path.exists() {
        if !create {
            return Ok(false);
        }
        fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        debug!(path = %path.display(), "created file");
    }
    match (update.access, update.modification) {
        (Some(atime), Some(mtime)) => filetime::set_file_times(path, atime, mtime)?,
        (Some(atime), None) => filetime::set_file_atime(path, atime)?,
        (None, Some(mtime)) => filetime::set_file_mtime(path, mtime)?,
        (None, None) => {}
    }
    debug!(path = %path.display(), "updated timestamps");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_mkdir_without_parents_fails() {
        let dir = tempdir().unwrap();
        assert!(mkdir(&dir.path().join("a/b"), false, None).is_err());
        mkdir(&dir.path().join("a/b"), true, None).unwrap();
        assert!(dir.path().join("a/b").is_dir());
        // -p tolerates an existing directory
        mkdir(&dir.path().join("a/b"), true, None).unwrap();
    }

    #[test]
    fn test_mv_into_directory() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.txt");
        fs::write(&src, "content").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let result = mv(&src, &dir.path().join("sub")).unwrap();
        assert_eq!(result.final_dst, dir.path().join("sub/a.txt"));
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(dir.path().join("sub/a.txt")).unwrap(), "content");
    }

    #[test]
    fn test_mv_missing_source() {
        let dir = tempdir().unwrap();
        let err = mv(&dir.path().join("nope"), &dir.path().join("x")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppletError>(),
            Some(AppletError::NotFound(_))
        ));
    }

    #[test]
    fn test_cp_directory_requires_recursive() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("d")).unwrap();
        let err = cp(&dir.path().join("d"), &dir.path().join("e"), false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppletError>(),
            Some(AppletError::DirectoryNeedsRecursive(_))
        ));
    }

    #[test]
    fn test_cp_tree() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("one.txt"), "1").unwrap();
        fs::write(src.join("nested/two.txt"), "22").unwrap();

        let result = cp(&src, &dir.path().join("dst"), true).unwrap();
        assert_eq!(result.bytes_copied, 3);
        assert_eq!(fs::read_to_string(dir.path().join("dst/nested/two.txt")).unwrap(), "22");
        assert!(src.join("one.txt").exists());
    }

    #[test]
    fn test_cp_refuses_copy_into_itself() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir(&src).unwrap();
        assert!(cp(&src, &src.join("inner"), true).is_err());
    }

    #[test]
    fn test_cp_same_file_keeps_content() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a");
        fs::write(&file, "precious").unwrap();

        let err = cp(&file, &file, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppletError>(),
            Some(AppletError::SameFile(..))
        ));
        // copying a file into its own directory targets the file itself
        assert!(cp(&file, dir.path(), false).is_err());
        assert_eq!(fs::read_to_string(&file).unwrap(), "precious");
    }

    #[test]
    fn test_force_link_onto_itself_keeps_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a");
        fs::write(&file, "precious").unwrap();

        let err = link(&file, &file, false, true).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppletError>(),
            Some(AppletError::SameFile(..))
        ));
        assert_eq!(fs::read_to_string(&file).unwrap(), "precious");
    }

    #[cfg(unix)]
    #[test]
    fn test_force_symlink_replaces_link_to_same_target() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a");
        let soft = dir.path().join("soft");
        fs::write(&file, "").unwrap();
        std::os::unix::fs::symlink(&file, &soft).unwrap();

        link(&file, &soft, true, true).unwrap();
        assert_eq!(fs::read_link(&soft).unwrap(), file);
    }

    #[test]
    fn test_refuse_dot_operand() {
        for bad in [".", "..", "./", "a/..", "a/./", "/tmp/x/."] {
            assert!(refuse_dot_operand(Path::new(bad)).is_err(), "{bad}");
        }
        for good in ["a", ".hidden", "..dots", "a/b", "/"] {
            assert!(refuse_dot_operand(Path::new(good)).is_ok(), "{good}");
        }
    }

    #[test]
    fn test_remove_modes() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("f"), "").unwrap();

        assert!(remove(&sub, RemoveMode::File).is_err());
        assert!(remove(&sub, RemoveMode::EmptyDir).is_err());
        remove(&sub.join("f"), RemoveMode::File).unwrap();
        remove(&sub, RemoveMode::EmptyDir).unwrap();
        assert!(!sub.exists());
    }

    #[test]
    fn test_rmdir_refuses_non_empty() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("a");
        fs::create_dir_all(sub.join("b")).unwrap();
        assert!(rmdir(&sub, false).is_err());
        rmdir(&sub.join("b"), false).unwrap();
        assert!(sub.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_chmod_recursive_and_link_rules() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let root = dir.path().join("tree");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("f"), "").unwrap();
        fs::set_permissions(root.join("f"), fs::Permissions::from_mode(0o600)).unwrap();

        chmod(&root, &Mode::parse("go+rX").unwrap(), true).unwrap();
        let file_mode = fs::metadata(root.join("f")).unwrap().permissions().mode() & 0o777;
        let dir_mode = fs::metadata(&root).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o644);
        assert_eq!(dir_mode & 0o055, 0o055);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_may_dangle_but_hard_link_may_not() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(link(&missing, &dir.path().join("hard"), false, false).is_err());
        link(&missing, &dir.path().join("soft"), true, false).unwrap();
        assert!(fs::symlink_metadata(dir.path().join("soft")).unwrap().file_type().is_symlink());
    }

    #[test]
    fn test_touch_sets_requested_times_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t");
        let then = FileTime::from_unix_time(1_000_000_000, 0);
        let later = FileTime::from_unix_time(1_500_000_000, 0);

        let both = TimeUpdate {
            access: Some(then),
            modification: Some(then),
        };
        assert!(touch(&path, both, true).unwrap());

        let only_mtime = TimeUpdate {
            access: None,
            modification: Some(later),
        };
        touch(&path, only_mtime, true).unwrap();
        let metadata = fs::metadata(&path).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&metadata), later);
        assert_eq!(FileTime::from_last_access_time(&metadata), then);
    }

    #[test]
    fn test_touch_no_create() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ghost");
        let now = FileTime::now();
        let update = TimeUpdate {
            access: Some(now),
            modification: Some(now),
        };
        assert!(!touch(&path, update, false).unwrap());
        assert!(!path.exists());
    }
}
