//! File reads confined to a root directory

use crate::error::DispatchError;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Join `requested` onto `root` without ever leaving `root`
///
/// The join is lexical: `.` is dropped, `..` pops a component but never above
/// the root, and a leading `/` is treated as relative to the root.
pub fn confine(root: &Path, requested: &str) -> PathBuf {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();

    for component in Path::new(requested.trim()).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::ParentDir => {
                parts.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    let mut path = root.to_path_buf();
    path.extend(parts);
    path
}

/// Read a file below `root`
pub async fn read_rooted(root: &Path, requested: &str) -> Result<String, DispatchError> {
    let path = confine(root, requested);

    if !fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false) {
        return Err(DispatchError::File(format!("not a file: {}", path.display())));
    }

    fs::read_to_string(&path)
        .await
        .map_err(|e| DispatchError::File(format!("reading {}: {}", path.display(), e)))
}
