//! core/library.rs
//! Discover playable files under a set of roots.
//!
//! - Recursive walk, extension check only (no probing here)
//! - De-dupes across overlapping roots by full path
//! - Sorted once, so insertion order is stable between runs

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::Result;

pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg", "m4a", "aac"];

/// Expand `roots` into audio files. A root that is itself a file is kept if
/// it has a supported extension.
pub fn scan_paths(roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut seen: HashSet<PathBuf> = HashSet::with_capacity(1024);
    let mut out: Vec<PathBuf> = Vec::new();

    for root in roots {
        let paths = if root.is_dir() {
            scan_audio(root)?
        } else if is_audio(root) {
            vec![root.clone()]
        } else {
            debug!(path = %root.display(), "skipping non-audio path");
            Vec::new()
        };

        for path in paths {
            if seen.insert(path.clone()) {
                out.push(path);
            }
        }
    }

    out.sort();
    Ok(out)
}

pub fn scan_audio(root: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    walk_dir(root, &mut out)?;
    Ok(out)
}

fn walk_dir(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            walk_dir(&path, out)?;
        } else if is_audio(&path) {
            out.push(path);
        }
    }

    Ok(())
}

pub fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| AUDIO_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn walks_nested_dirs_and_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("a/one.MP3"), b"").unwrap();
        fs::write(root.join("a/b/two.flac"), b"").unwrap();
        fs::write(root.join("a/cover.jpg"), b"").unwrap();
        fs::write(root.join("three.ogg"), b"").unwrap();

        let found = scan_paths(&[root.to_path_buf(), root.join("a")]).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a/b/two.flac", "a/one.MP3", "three.ogg"]);
    }

    #[test]
    fn single_files_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let song = dir.path().join("song.wav");
        fs::write(&song, b"").unwrap();
        let notes = dir.path().join("notes.txt");
        fs::write(&notes, b"").unwrap();

        assert_eq!(scan_paths(&[song.clone(), notes]).unwrap(), vec![song]);
    }

    #[test]
    fn missing_root_is_io_error() {
        assert!(scan_audio(Path::new("/definitely/not/here")).is_err());
    }
}
