//! Filesystem primitives used by the backup and copy engines.
//!
//! Files land via a temp sibling plus rename, directories via a staging
//! sibling, so an interrupted copy never leaves a half-written live item.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use filetime::FileTime;
use walkdir::WalkDir;

const TEMP_SUFFIX: &str = ".multibox-tmp";
const STAGING_SUFFIX: &str = ".multibox-staging";
const TRASH_SUFFIX: &str = ".multibox-trash";

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(suffix);
    path.with_file_name(name)
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Copy file contents and carry over access/modification times.
fn copy_with_times(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst)?;
    let meta = fs::metadata(src)?;
    filetime::set_file_times(
        dst,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )
}

/// Rename with retries; files on Windows can stay locked for a short while
/// by the game client, indexers and virus scanners. Errors that cannot
/// clear by waiting are returned at once.
pub fn robust_rename<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> io::Result<()> {
    let mut attempt = 0u32;
    let max_attempts = 8u32;
    let mut backoff = Duration::from_millis(50);

    loop {
        match fs::rename(&from, &to) {
            Ok(()) => return Ok(()),
            Err(e) => {
                attempt += 1;
                if attempt >= max_attempts || !is_transient(&e) {
                    return Err(e);
                }
                std::thread::sleep(backoff);
                backoff = std::cmp::min(backoff * 2, Duration::from_millis(2000));
            }
        }
    }
}

/// Sharing and lock violations (and the access-denied they often surface
/// as) on Windows.
fn is_transient(e: &io::Error) -> bool {
    const ERROR_SHARING_VIOLATION: i32 = 32;
    const ERROR_LOCK_VIOLATION: i32 = 33;

    cfg!(windows)
        && (e.kind() == io::ErrorKind::PermissionDenied
            || matches!(
                e.raw_os_error(),
                Some(ERROR_SHARING_VIOLATION) | Some(ERROR_LOCK_VIOLATION)
            ))
}

/// Remove a file or a directory tree. A missing path is not an error.
pub fn remove_path(path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Copy one file to `dst`, creating parent directories and replacing
/// whatever file is there. Timestamps of `src` are preserved.
pub fn copy_file_preserving(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> io::Result<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    ensure_parent(dst)?;

    let tmp = sibling(dst, TEMP_SUFFIX);
    if let Err(e) = copy_with_times(src, &tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    if let Err(e) = robust_rename(&tmp, dst) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

/// Recursively copy `src` into `dst`, merging into anything already there.
/// Entries for which `skip` returns true (given the path relative to `src`)
/// are left alone at the destination.
pub fn copy_dir_filtered<F>(src: impl AsRef<Path>, dst: impl AsRef<Path>, skip: F) -> io::Result<()>
where
    F: Fn(&Path) -> bool,
{
    let (src, dst) = (src.as_ref(), dst.as_ref());
    if !src.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("source directory {} does not exist", src.display()),
        ));
    }
    fs::create_dir_all(dst)?;

    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        if skip(rel) {
            continue;
        }
        let out = dst.join(rel);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&out)?;
        } else if file_type.is_file() {
            if out.is_dir() {
                fs::remove_dir_all(&out)?;
            }
            ensure_parent(&out)?;
            copy_with_times(entry.path(), &out)?;
        } else {
            tracing::debug!("Skipping non-regular entry {}", entry.path().display());
        }
    }
    Ok(())
}

/// Recursively copy `src` into `dst`, merging into anything already there.
pub fn copy_dir_recursive(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> io::Result<()> {
    copy_dir_filtered(src, dst, |_| false)
}

/// Make `dst` an exact copy of the directory `src`.
///
/// The copy is built in a staging sibling first. The old `dst` is then
/// moved aside to a trash sibling and the staging copy renamed into place;
/// if that rename fails the old content is moved back. The trash is only
/// deleted once the new content is live.
pub fn replace_dir(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> io::Result<()> {
    replace_dir_with(src.as_ref(), dst.as_ref(), |from, to| robust_rename(from, to))
}

fn replace_dir_with<R>(src: &Path, dst: &Path, rename: R) -> io::Result<()>
where
    R: Fn(&Path, &Path) -> io::Result<()>,
{
    ensure_parent(dst)?;

    let staging = sibling(dst, STAGING_SUFFIX);
    let trash = sibling(dst, TRASH_SUFFIX);
    remove_path(&staging)?;
    if let Err(e) = remove_path(&trash) {
        tracing::warn!("Could not clear stale {}: {}", trash.display(), e);
    }

    if let Err(e) = copy_dir_recursive(src, &staging) {
        let _ = remove_path(&staging);
        return Err(e);
    }

    let had_old = fs::symlink_metadata(dst).is_ok();
    if had_old {
        if let Err(e) = rename(dst, trash.as_path()) {
            let _ = remove_path(&staging);
            return Err(e);
        }
    }

    if let Err(e) = rename(staging.as_path(), dst) {
        if had_old {
            if let Err(restore) = rename(trash.as_path(), dst) {
                tracing::error!(
                    "Could not restore {} from {}: {}",
                    dst.display(),
                    trash.display(),
                    restore
                );
            }
        }
        let _ = remove_path(&staging);
        return Err(e);
    }

    if had_old {
        if let Err(e) = remove_path(&trash) {
            tracing::warn!("Could not remove replaced {}: {}", trash.display(), e);
        }
    }
    Ok(())
}

/// True when both paths exist and resolve to the same directory entry.
pub fn same_location(a: impl AsRef<Path>, b: impl AsRef<Path>) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    #[test]
    fn file_copy_preserves_mtime_and_creates_parents() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.cfg");
        fs::write(&src, b"payload").unwrap();
        let old = SystemTime::now() - Duration::from_secs(3600 * 24);
        filetime::set_file_mtime(&src, FileTime::from_system_time(old)).unwrap();

        let dst = dir.path().join("x/y/a.cfg");
        copy_file_preserving(&src, &dst).unwrap();

        assert_eq!(fs::read(&dst).unwrap(), b"payload");
        let src_m = FileTime::from_last_modification_time(&fs::metadata(&src).unwrap());
        let dst_m = FileTime::from_last_modification_time(&fs::metadata(&dst).unwrap());
        assert_eq!(src_m.unix_seconds(), dst_m.unix_seconds());
        assert!(!dst.with_file_name(".a.cfg.multibox-tmp").exists());
    }

    #[test]
    fn replace_dir_drops_stale_entries() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("nested/keep.xml"), b"new").unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("stale.xml"), b"old").unwrap();

        replace_dir(&src, &dst).unwrap();

        assert_eq!(fs::read(dst.join("nested/keep.xml")).unwrap(), b"new");
        assert!(!dst.join("stale.xml").exists());
        assert!(!dir.path().join(".dst.multibox-staging").exists());
    }

    #[test]
    fn replace_dir_with_missing_source_keeps_destination() {
        let dir = tempdir().unwrap();
        let dst = dir.path().join("dst");
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("keep.xml"), b"old").unwrap();

        assert!(replace_dir(dir.path().join("nope"), &dst).is_err());
        assert_eq!(fs::read(dst.join("keep.xml")).unwrap(), b"old");
    }

    #[test]
    fn failed_swap_puts_the_old_directory_back() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("new.xml"), b"new").unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("keep.xml"), b"old").unwrap();

        let refuse_staging = |from: &Path, to: &Path| {
            if from.to_string_lossy().ends_with(STAGING_SUFFIX) {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "in use"))
            } else {
                fs::rename(from, to)
            }
        };
        let err = replace_dir_with(&src, &dst, refuse_staging).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(fs::read(dst.join("keep.xml")).unwrap(), b"old");
        assert!(!dst.join("new.xml").exists());
        assert!(!dir.path().join(".dst.multibox-staging").exists());
        assert!(!dir.path().join(".dst.multibox-trash").exists());
    }

    #[test]
    fn failed_move_aside_leaves_destination_and_no_staging() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("keep.xml"), b"old").unwrap();

        let refuse_all =
            |_: &Path, _: &Path| Err(io::Error::new(io::ErrorKind::PermissionDenied, "in use"));
        assert!(replace_dir_with(&src, &dst, refuse_all).is_err());

        assert_eq!(fs::read(dst.join("keep.xml")).unwrap(), b"old");
        assert!(!dir.path().join(".dst.multibox-staging").exists());
    }

    #[test]
    fn replace_dir_clears_stale_trash_and_replaces_a_file() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.xml"), b"a").unwrap();
        fs::write(&dst, b"was a file").unwrap();
        fs::create_dir_all(dir.path().join(".dst.multibox-trash/leftover")).unwrap();

        replace_dir(&src, &dst).unwrap();

        assert_eq!(fs::read(dst.join("a.xml")).unwrap(), b"a");
        assert!(!dir.path().join(".dst.multibox-trash").exists());
    }

    #[test]
    fn permanent_rename_errors_are_not_retried() {
        let dir = tempdir().unwrap();
        let started = std::time::Instant::now();

        let err = robust_rename(dir.path().join("ghost"), dir.path().join("x")).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(started.elapsed() < Duration::from_millis(40));
    }

    #[test]
    fn filtered_copy_leaves_skipped_entries_untouched() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.xml"), b"a-new").unwrap();
        fs::write(src.join("b.xml"), b"b-new").unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("a.xml"), b"a-old").unwrap();

        copy_dir_filtered(&src, &dst, |rel| rel == Path::new("a.xml")).unwrap();

        assert_eq!(fs::read(dst.join("a.xml")).unwrap(), b"a-old");
        assert_eq!(fs::read(dst.join("b.xml")).unwrap(), b"b-new");
    }

    #[test]
    fn remove_path_ignores_missing() {
        let dir = tempdir().unwrap();
        remove_path(dir.path().join("ghost")).unwrap();
    }
}
