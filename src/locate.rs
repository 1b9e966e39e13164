use crate::version::Version;
use std::fs;
use std::path::{Path, PathBuf};

/// Direct children of `root` whose names parse as versions, unordered.
/// Staging directories and stray files are invisible here.
pub fn scan(root: &Path) -> Vec<(Version, PathBuf)> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Install root {} is not readable: {}", root.display(), e);
            return Vec::new();
        }
    };

    let mut found = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(version) = name.to_str().and_then(Version::parse) else {
            continue;
        };
        found.push((version, path));
    }
    found
}

/// Installed versions under `root`, oldest first.
pub fn installed(root: &Path) -> Vec<(Version, PathBuf)> {
    let mut found = scan(root);
    found.sort_by(|a, b| a.0.cmp(&b.0));
    found
}

/// Path of the newest installed version, or `None` when the root is missing
/// or holds nothing. Equal version names keep the first one encountered.
pub fn latest_path(root: &Path) -> Option<PathBuf> {
    let mut best: Option<(Version, PathBuf)> = None;
    for (version, path) in scan(root) {
        match &best {
            Some((current, _)) if version <= *current => {}
            _ => best = Some((version, path)),
        }
    }
    best.map(|(_, path)| path)
}
