//! Path helpers for rewriting image identifiers.
//!
//! All functions here are lexical: nothing touches the filesystem, so
//! identifiers of images that no longer exist can still be rewritten.
//! Relative paths are made absolute against a directory the caller passes in.

use std::path::{Component, Path, PathBuf};

/// Resolve `.` and `..` components without consulting the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last_is_normal = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if last_is_normal {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Make `path` absolute by joining it onto `cwd`, then resolve `.` and `..`.
pub fn absolute_lexically(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_lexically(path)
    } else {
        normalize_lexically(&cwd.join(path))
    }
}

/// Express `path` relative to `base`, walking up with `..` where needed.
///
/// Returns `None` when one path is absolute and the other is not, or when
/// they sit on different prefixes (drives) and no relative form exists.
pub fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    if path.is_absolute() != base.is_absolute() {
        return None;
    }

    let path = normalize_lexically(path);
    let base = normalize_lexically(base);

    let path_parts: Vec<Component<'_>> = path.components().collect();
    let base_parts: Vec<Component<'_>> = base.components().collect();

    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    // Different drive prefixes share nothing
    if path.is_absolute() && common == 0 {
        return None;
    }

    let mut out = PathBuf::new();
    for part in &base_parts[common..] {
        if matches!(part, Component::ParentDir) {
            // Cannot climb back out of an unresolved `..` in the base
            return None;
        }
        out.push("..");
    }
    for part in &path_parts[common..] {
        out.push(part.as_os_str());
    }

    if out.as_os_str().is_empty() {
        out.push(".");
    }
    Some(out)
}

/// The parent directory of an identifier, as an identifier string.
pub fn parent_key(identifier: &str) -> String {
    Path::new(identifier)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The basename of the directory containing an identifier.
pub fn parent_dir_name(identifier: &str) -> Option<String> {
    Path::new(identifier)
        .parent()
        .and_then(|p| p.file_name())
        .map(|name| name.to_string_lossy().into_owned())
}

/// Convert a path into the string form used as a map key.
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
