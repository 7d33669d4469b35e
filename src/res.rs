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

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::util::Sha256;

/// How an artifact's content compares with the last recorded digest.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Status {
    Unchanged,
    Created,
    Modified,
    Deleted,
}

impl Status {
    /// A touched artifact obligates the commands downstream of it to run.
    pub fn is_touched(self) -> bool {
        self != Status::Unchanged
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Unchanged => write!(f, "unchanged"),
            Status::Created => write!(f, "created"),
            Status::Modified => write!(f, "modified"),
            Status::Deleted => write!(f, "deleted"),
        }
    }
}

/// Content digest of an artifact.
///
/// The empty digest stands for "no content": directories and paths that do
/// not exist. Everything else is a SHA-256 over the file's bytes. In the
/// cache file this serializes as `""` or 64 hex characters.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Digest {
    Empty,
    Sha256(Sha256),
}

impl Digest {
    pub fn is_empty(&self) -> bool {
        match self {
            Digest::Empty => true,
            Digest::Sha256(_) => false,
        }
    }
}

impl Default for Digest {
    fn default() -> Digest {
        Digest::Empty
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Digest::Empty => Ok(()),
            Digest::Sha256(sha) => write!(f, "{}", sha),
        }
    }
}

impl Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Digest::Empty => serializer.serialize_str(""),
            Digest::Sha256(sha) => sha.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DigestVisitor;

        impl<'de> Visitor<'de> for DigestVisitor {
            type Value = Digest;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "an empty string or a 64 character hex digest")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if v.is_empty() {
                    Ok(Digest::Empty)
                } else {
                    Sha256::from_hex(v).map(Digest::Sha256).map_err(|_| {
                        E::invalid_value(
                            de::Unexpected::Str(v),
                            &"a 64 character hex digest",
                        )
                    })
                }
            }
        }

        deserializer.deserialize_str(DigestVisitor)
    }
}

/// An artifact: a named, observable entity whose change status drives
/// incremental execution.
///
/// Artifact identity is the graph slot it occupies, so two artifacts with
/// equal content remain distinct nodes.
pub enum Artifact {
    /// A bare artifact with no on-disk representation. Useful as a grouping
    /// or synchronization point.
    Data(Data),

    /// A file or directory tracked by content digest.
    File(File),
}

impl Artifact {
    /// Shorthand for a bare data artifact with the given status.
    pub fn data(status: Status) -> Artifact {
        Artifact::Data(Data::new(status))
    }

    pub fn status(&self) -> Status {
        match self {
            Artifact::Data(data) => data.status(),
            Artifact::File(file) => file.status(),
        }
    }

    pub fn as_file(&self) -> Option<&File> {
        match self {
            Artifact::Data(_) => None,
            Artifact::File(file) => Some(file),
        }
    }
}

/// An artifact that only carries a change status.
pub struct Data {
    status: Mutex<Status>,
}

impl Data {
    pub fn new(status: Status) -> Data {
        Data {
            status: Mutex::new(status),
        }
    }

    pub fn status(&self) -> Status {
        *self.status.lock().unwrap()
    }
}

/// A file (or directory) artifact.
///
/// The path is absolute, normalized, and immutable. The tracked metadata --
/// status, digest, and last-known modification time -- sits behind a mutex
/// because it is updated from within action invocations while the graph is
/// shared across worker threads. At most one command produces a given file,
/// so writers never actually contend.
pub struct File {
    path: PathBuf,
    meta: Mutex<FileMeta>,
}

#[derive(Clone)]
struct FileMeta {
    timestamp: Option<SystemTime>,
    digest: Digest,
    status: Status,
}

impl File {
    /// File nodes are normally produced by `FileLoader::load_file`, which
    /// stamps them against the digest cache.
    pub fn new(
        path: PathBuf,
        timestamp: Option<SystemTime>,
        digest: Digest,
        status: Status,
    ) -> File {
        File {
            path,
            meta: Mutex::new(FileMeta {
                timestamp,
                digest,
                status,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> Status {
        self.meta.lock().unwrap().status
    }

    pub fn digest(&self) -> Digest {
        self.meta.lock().unwrap().digest.clone()
    }

    /// The file's modification time as of the last load or refresh. `None`
    /// if the file did not exist.
    pub fn timestamp(&self) -> Option<SystemTime> {
        self.meta.lock().unwrap().timestamp
    }

    /// True if the file name has the given extension.
    pub fn has_extension(&self, ext: &str) -> bool {
        self.path.extension() == Some(OsStr::new(ext))
    }

    /// Replaces the tracked metadata after the file has been re-digested.
    pub(crate) fn update(
        &self,
        digest: Digest,
        status: Status,
        timestamp: Option<SystemTime>,
    ) {
        let mut meta = self.meta.lock().unwrap();
        meta.digest = digest;
        meta.status = status;
        meta.timestamp = timestamp;
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = self.meta.lock().unwrap();
        f.debug_struct("File")
            .field("path", &self.path)
            .field("status", &meta.status)
            .field("digest", &meta.digest)
            .finish()
    }
}
