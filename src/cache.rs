// Copyright (c) 2019 Jason White
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::Error;
use crate::res::Digest;

/// Persistent map from root-relative artifact paths to their last recorded
/// digests.
///
/// The on-disk form is a JSON object of path to hex digest, with `""` for
/// directories and absent files. An artifact missing from the map has never
/// been seen. A `BTreeMap` keeps the serialized key order stable so the file
/// round-trips byte-for-byte.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DigestCache {
    entries: BTreeMap<PathBuf, Digest>,
}

impl DigestCache {
    pub fn new() -> DigestCache {
        DigestCache::default()
    }

    /// Loads the cache from a file.
    ///
    /// A missing, unreadable, or malformed file yields an empty cache so
    /// that an incremental build degrades to a full build instead of
    /// failing.
    pub fn from_path<P: AsRef<Path>>(path: P) -> DigestCache {
        let path = path.as_ref();

        match fs::File::open(path) {
            Ok(f) => match serde_json::from_reader(io::BufReader::new(f)) {
                Ok(cache) => cache,
                Err(err) => {
                    warn!(
                        "digest cache {:?} is malformed ({}); starting fresh",
                        path, err
                    );
                    DigestCache::new()
                }
            },
            Err(ref err) if err.kind() == io::ErrorKind::NotFound => {
                DigestCache::new()
            }
            Err(err) => {
                warn!(
                    "could not read digest cache {:?} ({}); starting fresh",
                    path, err
                );
                DigestCache::new()
            }
        }
    }

    /// The recorded digest for an artifact key. `None` means the artifact
    /// has never been recorded.
    pub fn get(&self, key: &Path) -> Option<&Digest> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: PathBuf, digest: Digest) {
        self.entries.insert(key, digest);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Digest)> {
        self.entries.iter().map(|(k, v)| (k.as_path(), v))
    }

    /// Atomically writes the whole cache as pretty-printed JSON.
    ///
    /// The file is written to a temporary sibling and renamed into place so
    /// that concurrent readers never observe a torn file. Parent directories
    /// are created as needed.
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut tempfile = NamedTempFile::new_in(dir)?;

        {
            let mut writer = io::BufWriter::new(&mut tempfile);
            serde_json::to_writer_pretty(&mut writer, self).map_err(
                |cause| Error::CacheWrite {
                    path: path.to_path_buf(),
                    cause,
                },
            )?;
            writer.flush()?;
        }

        tempfile.persist(path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::util::Sha256;

    fn digest(bytes: &[u8]) -> Digest {
        Digest::Sha256(Sha256::from_bytes(bytes))
    }

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digests.json");

        let mut cache = DigestCache::new();
        cache.insert(PathBuf::from("src/app.cpp"), digest(b"app"));
        cache.insert(PathBuf::from("build"), Digest::Empty);
        cache.write_to_path(&path).unwrap();

        let loaded = DigestCache::from_path(&path);
        assert_eq!(loaded.len(), 2);
        assert_eq!(
            loaded.get(Path::new("src/app.cpp")),
            Some(&digest(b"app"))
        );
        assert_eq!(loaded.get(Path::new("build")), Some(&Digest::Empty));
        assert_eq!(loaded.get(Path::new("missing")), None);
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build/state/digests.json");

        DigestCache::new().write_to_path(&path).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DigestCache::from_path(dir.path().join("nope.json"));
        assert!(cache.is_empty());
    }

    #[test]
    fn malformed_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digests.json");
        fs::write(&path, "{ this is not json").unwrap();

        let cache = DigestCache::from_path(&path);
        assert!(cache.is_empty());
    }

    #[test]
    fn human_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digests.json");

        let mut cache = DigestCache::new();
        cache.insert(PathBuf::from("src/app.cpp"), digest(b"app"));
        cache.write_to_path(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("src/app.cpp"));
        assert!(text.contains(&digest(b"app").to_string()));
    }

    #[test]
    fn stable_under_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digests.json");

        let mut cache = DigestCache::new();
        cache.insert(PathBuf::from("b"), digest(b"b"));
        cache.insert(PathBuf::from("a"), digest(b"a"));
        cache.write_to_path(&path).unwrap();
        let first = fs::read_to_string(&path).unwrap();

        DigestCache::from_path(&path).write_to_path(&path).unwrap();
        let second = fs::read_to_string(&path).unwrap();

        assert_eq!(first, second);
    }
}
