//! On-disk filesystem utilities used while staging and collecting outputs

use crate::error::{Error, Result};
use glob::Pattern;
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Remove a directory tree, clearing read-only bits that block deletion.
///
/// Git checkouts on some platforms leave pack files read-only; a plain
/// `remove_dir_all` fails on those. Missing directories are not an error.
pub fn remove_dir_all_force(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    match fs::remove_dir_all(path) {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            debug!("clearing read-only bits under {}", path.display());
        }
        Err(e) => return Err(e.into()),
    }

    for entry in WalkDir::new(path) {
        let entry = entry?;
        let metadata = entry.path().symlink_metadata()?;
        if metadata.file_type().is_symlink() {
            continue;
        }
        let mut permissions = metadata.permissions();
        if permissions.readonly() {
            make_writable(&mut permissions);
            fs::set_permissions(entry.path(), permissions)?;
        }
    }

    fs::remove_dir_all(path).map_err(|e| Error::Filesystem {
        message: format!("Failed to remove {}: {}", path.display(), e),
    })
}

#[cfg(unix)]
fn make_writable(permissions: &mut fs::Permissions) {
    use std::os::unix::fs::PermissionsExt;
    permissions.set_mode(permissions.mode() | 0o200);
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(permissions: &mut fs::Permissions) {
    permissions.set_readonly(false);
}

/// Recursively copy `src` into `dst`, overwriting files that already exist.
///
/// Entries whose file name matches any of `exclude` are skipped together
/// with everything beneath them. Symlinks are followed, so a linked
/// directory is copied as a real one. Returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path, exclude: &[Pattern]) -> Result<usize> {
    if !src.is_dir() {
        return Err(Error::Filesystem {
            message: format!("Source directory does not exist: {}", src.display()),
        });
    }

    fs::create_dir_all(dst)?;
    let mut copied = 0;

    let walker = WalkDir::new(src)
        .follow_links(true)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| !is_excluded(entry.file_name().to_str(), exclude));

    for entry in walker {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::Filesystem {
                message: format!("{}: {}", entry.path().display(), e),
            })?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    debug!(
        "copied {} files from {} to {}",
        copied,
        src.display(),
        dst.display()
    );
    Ok(copied)
}

/// Replace `dst` with a fresh copy of `src`.
pub fn replace_tree(src: &Path, dst: &Path, exclude: &[Pattern]) -> Result<usize> {
    remove_dir_all_force(dst)?;
    copy_tree(src, dst, exclude)
}

/// `path` with symlinks and `..` resolved for the part of it that exists.
///
/// Components past the deepest existing ancestor are appended unchanged, so
/// a workspace that has not been cloned yet still compares correctly.
pub fn resolve(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = existing
        .canonicalize()
        .unwrap_or_else(|_| existing.to_path_buf());
    resolved.extend(missing.iter().rev());
    resolved
}

fn is_excluded(name: Option<&str>, exclude: &[Pattern]) -> bool {
    match name {
        Some(name) => exclude.iter().any(|p| p.matches(name)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn build_glob() -> Vec<Pattern> {
        vec![Pattern::new("__build*__").unwrap()]
    }

    #[test]
    fn test_copy_tree_skips_build_dirs() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("include/boost")).unwrap();
        fs::write(src.path().join("include/boost/mysql.hpp"), "#pragma once").unwrap();
        fs::create_dir_all(src.path().join("__build_cmake__/CMakeFiles")).unwrap();
        fs::write(src.path().join("__build_cmake__/CMakeCache.txt"), "x").unwrap();

        let copied = copy_tree(src.path(), &dst.path().join("out"), &build_glob()).unwrap();

        assert_eq!(copied, 1);
        assert!(dst.path().join("out/include/boost/mysql.hpp").exists());
        assert!(!dst.path().join("out/__build_cmake__").exists());
    }

    #[test]
    fn test_copy_tree_overwrites_existing_files() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::write(src.path().join("a.txt"), "new").unwrap();
        fs::write(dst.path().join("a.txt"), "old").unwrap();
        fs::write(dst.path().join("stale.txt"), "stale").unwrap();

        copy_tree(src.path(), dst.path(), &[]).unwrap();

        assert_eq!(fs::read_to_string(dst.path().join("a.txt")).unwrap(), "new");
        // copy over does not prune
        assert!(dst.path().join("stale.txt").exists());
    }

    #[test]
    fn test_replace_tree_prunes_stale_files() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::write(src.path().join("a.txt"), "new").unwrap();
        fs::write(dst.path().join("stale.txt"), "stale").unwrap();

        replace_tree(src.path(), dst.path(), &[]).unwrap();

        assert!(dst.path().join("a.txt").exists());
        assert!(!dst.path().join("stale.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_tree_follows_directory_symlinks() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("include/boost")).unwrap();
        fs::write(src.path().join("include/boost/mysql.hpp"), "#pragma once").unwrap();
        std::os::unix::fs::symlink(src.path().join("include"), src.path().join("inc_link"))
            .unwrap();

        let copied = copy_tree(src.path(), dst.path(), &[]).unwrap();

        assert_eq!(copied, 2);
        let linked = dst.path().join("inc_link");
        assert!(linked.is_dir());
        assert!(!linked.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(
            fs::read_to_string(linked.join("boost/mysql.hpp")).unwrap(),
            "#pragma once"
        );
    }

    #[test]
    fn test_resolve_keeps_missing_components() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().canonicalize().unwrap();
        let resolved = resolve(&dir.path().join("boost-root/libs/mysql"));
        assert!(resolved.starts_with(&base));
        assert!(resolved.ends_with("boost-root/libs/mysql"));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_follows_symlinks() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real");
        fs::create_dir_all(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert_eq!(resolve(&link), real.canonicalize().unwrap());
        assert_eq!(resolve(&link.join("x")), real.canonicalize().unwrap().join("x"));
    }

    #[test]
    fn test_copy_tree_missing_source() {
        let dst = TempDir::new().unwrap();
        let result = copy_tree(&dst.path().join("missing"), dst.path(), &[]);
        assert!(matches!(result, Err(Error::Filesystem { .. })));
    }

    #[test]
    fn test_remove_dir_all_force_missing_is_ok() {
        let dir = TempDir::new().unwrap();
        assert!(remove_dir_all_force(&dir.path().join("nope")).is_ok());
    }

    #[test]
    fn test_remove_dir_all_force_readonly_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root");
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        let pack = root.join(".git/objects/pack.idx");
        fs::write(&pack, "data").unwrap();
        let mut permissions = fs::metadata(&pack).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&pack, permissions).unwrap();

        remove_dir_all_force(&root).unwrap();

        assert!(!root.exists());
    }
}
