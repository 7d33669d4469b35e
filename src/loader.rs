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

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::warn;

use crate::cache::DigestCache;
use crate::error::Error;
use crate::res::{Digest, File, Status};
use crate::util::{PathExt, Sha256};

/// Loads file artifacts, stamping each with a change status computed from
/// the digest cache and the filesystem.
///
/// All artifact keys are paths relative to the loader's root directory. The
/// loader is shared across concurrent actions as `Arc<FileLoader>`; the
/// in-memory cache sits behind a mutex so that `save_cache` is atomic with
/// respect to its own readers.
pub struct FileLoader {
    cache_path: PathBuf,
    root: PathBuf,
    cache: Mutex<DigestCache>,
}

impl FileLoader {
    /// Creates a loader rooted at `root` (an absolute directory), reading
    /// the digest cache from `cache_path`. A relative cache path is resolved
    /// against the root. Cache read errors degrade to an empty cache.
    pub fn new<P, Q>(cache_path: P, root: Q) -> FileLoader
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let root = root.as_ref().normalize();

        let cache_path = cache_path.as_ref();
        let cache_path = if cache_path.is_absolute() {
            cache_path.normalize()
        } else {
            root.join(cache_path).normalize()
        };

        let cache = Mutex::new(DigestCache::from_path(&cache_path));

        FileLoader {
            cache_path,
            root,
            cache,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// The cache key for a path: its form relative to the root. Paths that
    /// cannot be relativized keep their absolute form.
    pub fn relativize(&self, path: &Path) -> PathBuf {
        path.relative_from(&self.root)
            .unwrap_or_else(|| path.to_path_buf())
    }

    /// Digest of the path's current content. Directories and nonexistent
    /// paths digest to the empty digest.
    pub fn compute_digest(&self, path: &Path) -> Result<Digest, Error> {
        match fs::metadata(path) {
            Ok(ref meta) if meta.is_dir() => Ok(Digest::Empty),
            Ok(_) => match Sha256::from_path(path) {
                Ok(sha) => Ok(Digest::Sha256(sha)),
                // The file vanished between stat and open.
                Err(ref err) if err.kind() == io::ErrorKind::NotFound => {
                    Ok(Digest::Empty)
                }
                Err(err) => Err(err.into()),
            },
            Err(ref err) if err.kind() == io::ErrorKind::NotFound => {
                Ok(Digest::Empty)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Loads a file artifact.
    ///
    /// The path is absolutized against the root, digested, and classified
    /// against the cached digest. As a side effect the in-memory cache is
    /// updated to the current digest, so a later `save_cache` records what
    /// was observed here.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<File, Error> {
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.normalize()
        } else {
            self.root.join(path).normalize()
        };

        let key = self.relativize(&path);
        let digest = self.compute_digest(&path)?;

        let meta = fs::metadata(&path).ok();
        let exists = meta.is_some();
        let timestamp = meta.and_then(|m| m.modified().ok());

        let status = {
            let mut cache = self.cache.lock().unwrap();
            let status =
                classify_loaded(&digest, cache.get(&key), exists);
            cache.insert(key, digest.clone());
            status
        };

        Ok(File::new(path, timestamp, digest, status))
    }

    /// Re-digests a file on disk and reclassifies its status against the
    /// recorded digest.
    ///
    /// `ran` selects the post-action rules. With `ran == false` -- the file
    /// belongs to a command that was skipped -- the rules never produce
    /// `Created`, and an unexpected change is logged: a file changing under
    /// a skipped command usually means a dependency is missing from the
    /// graph.
    pub fn refresh(&self, file: &File, ran: bool) -> Result<(), Error> {
        let digest = self.compute_digest(file.path())?;

        let meta = fs::metadata(file.path()).ok();
        let exists = meta.is_some();
        let timestamp = meta.and_then(|m| m.modified().ok());

        let key = self.relativize(file.path());
        let status = {
            let cache = self.cache.lock().unwrap();
            if ran {
                classify_loaded(&digest, cache.get(&key), exists)
            } else {
                classify_skipped(&digest, cache.get(&key), exists)
            }
        };

        if !ran && status == Status::Modified {
            warn!(
                "{:?} changed although its command was skipped; \
                 is a dependency undeclared?",
                file.path()
            );
        }

        file.update(digest, status, timestamp);

        Ok(())
    }

    /// Records the given artifact digests, then writes the whole in-memory
    /// cache to disk atomically.
    pub fn save_cache<I>(&self, entries: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (PathBuf, Digest)>,
    {
        let mut cache = self.cache.lock().unwrap();

        for (path, digest) in entries {
            let key = if path.is_absolute() {
                self.relativize(&path)
            } else {
                path
            };
            cache.insert(key, digest);
        }

        cache.write_to_path(&self.cache_path)
    }
}

/// Status rules at load time and after a command has run.
fn classify_loaded(
    current: &Digest,
    cached: Option<&Digest>,
    exists: bool,
) -> Status {
    if !exists {
        Status::Deleted
    } else if current.is_empty() {
        // Directories (and anything else without content): created on first
        // encounter, unchanged once recorded.
        match cached {
            None => Status::Created,
            Some(c) if c.is_empty() => Status::Unchanged,
            Some(_) => Status::Modified,
        }
    } else {
        match cached {
            None => Status::Created,
            Some(c) if c.is_empty() => Status::Created,
            Some(c) if c == current => Status::Unchanged,
            Some(_) => Status::Modified,
        }
    }
}

/// Status rules for the artifacts of a command that was skipped. A skipped
/// command must not invent `Created`.
fn classify_skipped(
    current: &Digest,
    cached: Option<&Digest>,
    exists: bool,
) -> Status {
    if !exists {
        Status::Deleted
    } else {
        match cached {
            Some(c) if c == current => Status::Unchanged,
            None if current.is_empty() => Status::Unchanged,
            _ => Status::Modified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    fn loader(dir: &TempDir) -> FileLoader {
        FileLoader::new("build/.digests.json", dir.path())
    }

    #[test]
    fn digest_of_missing_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader(&dir);

        assert!(loader
            .compute_digest(&dir.path().join("nope"))
            .unwrap()
            .is_empty());
        assert!(loader.compute_digest(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn digest_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader(&dir);

        let path = dir.path().join("a.txt");
        fs::write(&path, "hello").unwrap();

        let digest = loader.compute_digest(&path).unwrap();
        assert_eq!(digest.to_string().len(), 64);
    }

    #[test]
    fn load_statuses() {
        let dir = tempfile::tempdir().unwrap();

        let path = dir.path().join("a.txt");
        fs::write(&path, "one").unwrap();

        // Never seen before.
        {
            let loader = loader(&dir);
            let file = loader.load_file("a.txt").unwrap();
            assert_eq!(file.status(), Status::Created);
            assert!(file.timestamp().is_some());
            loader.save_cache(Vec::new()).unwrap();
        }

        // Recorded and untouched.
        {
            let loader = loader(&dir);
            let file = loader.load_file("a.txt").unwrap();
            assert_eq!(file.status(), Status::Unchanged);
            loader.save_cache(Vec::new()).unwrap();
        }

        // Recorded and rewritten.
        {
            fs::write(&path, "two").unwrap();
            let loader = loader(&dir);
            let file = loader.load_file("a.txt").unwrap();
            assert_eq!(file.status(), Status::Modified);
            loader.save_cache(Vec::new()).unwrap();
        }

        // Recorded and removed.
        {
            fs::remove_file(&path).unwrap();
            let loader = loader(&dir);
            let file = loader.load_file("a.txt").unwrap();
            assert_eq!(file.status(), Status::Deleted);
            assert!(file.digest().is_empty());
            assert!(file.timestamp().is_none());
        }
    }

    #[test]
    fn directory_statuses() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("out")).unwrap();

        {
            let loader = loader(&dir);
            let out = loader.load_file("out").unwrap();
            assert_eq!(out.status(), Status::Created);

            // Recorded by the load itself.
            let again = loader.load_file("out").unwrap();
            assert_eq!(again.status(), Status::Unchanged);

            loader.save_cache(Vec::new()).unwrap();
        }

        {
            let loader = loader(&dir);
            let out = loader.load_file("out").unwrap();
            assert_eq!(out.status(), Status::Unchanged);
        }
    }

    #[test]
    fn cache_keys_are_relative() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/x.txt"), "x").unwrap();

        let loader = loader(&dir);
        loader.load_file("sub/x.txt").unwrap();
        loader.save_cache(Vec::new()).unwrap();

        let text =
            fs::read_to_string(dir.path().join("build/.digests.json"))
                .unwrap();
        assert!(text.contains("sub/x.txt"));
        assert!(!text.contains(dir.path().to_str().unwrap()));
    }

    #[test]
    fn absolute_paths_accepted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let loader = loader(&dir);
        let file = loader.load_file(dir.path().join("a.txt")).unwrap();
        assert_eq!(file.status(), Status::Created);
        assert_eq!(loader.relativize(file.path()), Path::new("a.txt"));
    }

    #[test]
    fn refresh_after_run() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader(&dir);

        // An output that does not exist yet.
        let out = loader.load_file("out.txt").unwrap();
        assert_eq!(out.status(), Status::Deleted);

        // The "action" produces it.
        fs::write(dir.path().join("out.txt"), "payload").unwrap();
        loader.refresh(&out, true).unwrap();
        assert_eq!(out.status(), Status::Created);
        assert!(!out.digest().is_empty());
    }

    #[test]
    fn refresh_skipped_never_creates() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader(&dir);

        let out = loader.load_file("out.txt").unwrap();

        fs::write(dir.path().join("out.txt"), "payload").unwrap();
        loader.refresh(&out, false).unwrap();
        assert_eq!(out.status(), Status::Modified);
    }

    #[test]
    fn save_cache_overwrites_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "old").unwrap();

        {
            let loader = loader(&dir);
            loader.load_file("a.txt").unwrap();

            // Record a digest other than the one observed at load time.
            let digest = Digest::Sha256(Sha256::from_bytes(b"new"));
            loader
                .save_cache(vec![(PathBuf::from("a.txt"), digest)])
                .unwrap();
        }

        fs::write(dir.path().join("a.txt"), "new").unwrap();
        let loader = loader(&dir);
        let file = loader.load_file("a.txt").unwrap();
        assert_eq!(file.status(), Status::Unchanged);
    }
}
