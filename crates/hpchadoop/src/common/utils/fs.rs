use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

pub fn absolute_path(path: PathBuf) -> crate::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Returns true if `path` lies strictly below `root` and contains no `..` components.
///
/// The check is purely lexical, nothing is resolved on the filesystem.
pub fn is_strictly_under(path: &Path, root: &Path) -> bool {
    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::CurDir))
    {
        return false;
    }
    path != root && path.starts_with(root)
}

/// Copies the directory tree at `source` into `target`, creating `target` if needed.
pub fn copy_tree(source: &Path, target: &Path) -> crate::Result<()> {
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| format!("Cannot relativize {}: {e}", entry.path().display()))?;
        let destination = target.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&destination)?;
        } else {
            std::fs::copy(entry.path(), &destination)?;
        }
    }
    Ok(())
}
