//! Sound-repository filename resolution shared by the file players

use std::path::{Component, Path, PathBuf};

use rand::seq::SliceRandom;
use tracing::error;
use walkdir::WalkDir;

/// Extensions the repository players know how to launch
pub const SOUND_EXTENSIONS: &[&str] = &["mp3", "wav"];

/// Resolve a requested name to a file under `root`.
///
/// A trailing separator selects a uniformly random file from that subtree
/// instead of an exact match. Anything that normalizes outside the
/// repository is rejected; missing files are logged and yield `None`.
pub fn resolve_sound(root: &Path, requested: &str) -> Option<PathBuf> {
    if requested.ends_with('/') {
        let prefix = normalize(&root.join(requested));
        if !prefix.starts_with(root) {
            error!("directory {:?} escapes the sound repository", requested);
            return None;
        }
        let candidates: Vec<PathBuf> = all_sound_files(root)
            .into_iter()
            .filter(|path| path.starts_with(&prefix))
            .collect();
        if candidates.is_empty() {
            error!("no files matching {:?}", requested);
            return None;
        }
        candidates.choose(&mut rand::thread_rng()).cloned()
    } else {
        let resolved = normalize(&root.join(requested));
        if !resolved.starts_with(root) {
            error!("file {:?} escapes the sound repository", requested);
            return None;
        }
        if resolved.is_file() {
            Some(resolved)
        } else {
            error!("file {:?} not found", requested);
            None
        }
    }
}

/// Every playable file under `path`, in walk order.
pub fn all_sound_files(path: &Path) -> Vec<PathBuf> {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| SOUND_EXTENSIONS.contains(&ext))
                .unwrap_or(false)
        })
        .collect()
}

/// Lexically normalize a path: fold `.` and `..` without touching the
/// filesystem, so traversal is caught even for names that do not exist.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}
