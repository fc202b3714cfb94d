// src/watch/hash.rs

//! Content fingerprints for config reload detection.

use std::path::Path;

use tracing::debug;

use crate::fs::FileSystem;

/// Fingerprint of a config file's bytes.
pub fn fingerprint(contents: &[u8]) -> blake3::Hash {
    blake3::hash(contents)
}

/// Fingerprint of the file at `path`, or `None` if it cannot be read.
pub fn file_fingerprint(fs: &dyn FileSystem, path: &Path) -> Option<blake3::Hash> {
    match fs.read_to_string(path) {
        Ok(contents) => Some(fingerprint(contents.as_bytes())),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "cannot fingerprint");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn fingerprint_tracks_content_only() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/pyproject.toml", "[tool.multirun]\n");
        let first = file_fingerprint(&fs, Path::new("/p/pyproject.toml")).unwrap();

        fs.add_file("/p/pyproject.toml", "[tool.multirun]\n");
        assert_eq!(file_fingerprint(&fs, Path::new("/p/pyproject.toml")), Some(first));

        fs.add_file("/p/pyproject.toml", "[tool.multirun]\ndefault = \"test\"\n");
        assert_ne!(file_fingerprint(&fs, Path::new("/p/pyproject.toml")), Some(first));
        assert_eq!(file_fingerprint(&fs, Path::new("/p/missing.toml")), None);
    }
}
