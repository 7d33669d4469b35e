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

use std::path::{Component, Path, PathBuf};

pub trait PathExt {
    /// Returns a lexically normalized path. Does not touch the file system.
    fn normalize(&self) -> PathBuf;

    /// Returns this path expressed relative to `base`, possibly via `..`
    /// components. Returns `None` if no such path can be computed (e.g., one
    /// path is absolute and the other is not).
    fn relative_from(&self, base: &Path) -> Option<PathBuf>;
}

impl PathExt for Path {
    fn normalize(&self) -> PathBuf {
        let mut out = PathBuf::new();

        for c in self.components() {
            match c {
                Component::CurDir => {}
                Component::ParentDir => {
                    // `..` cancels a preceding normal component. Popping the
                    // root is a no-op, so `/..` stays at the root.
                    let pop = match out.components().next_back() {
                        Some(Component::Prefix(_))
                        | Some(Component::RootDir)
                        | Some(Component::Normal(_)) => true,
                        _ => false,
                    };

                    if pop {
                        out.pop();
                    } else {
                        out.push("..");
                    }
                }
                _ => out.push(c.as_os_str()),
            }
        }

        if out.as_os_str().is_empty() {
            out.push(".");
        }

        out
    }

    fn relative_from(&self, base: &Path) -> Option<PathBuf> {
        if self.is_absolute() != base.is_absolute() {
            return if self.is_absolute() {
                Some(self.to_path_buf())
            } else {
                None
            };
        }

        let mut a = self.components();
        let mut b = base.components();
        let mut out: Vec<Component<'_>> = Vec::new();

        loop {
            match (a.next(), b.next()) {
                (None, None) => break,
                (Some(x), None) => {
                    out.push(x);
                    out.extend(a.by_ref());
                    break;
                }
                (None, Some(_)) => out.push(Component::ParentDir),
                (Some(x), Some(y)) if out.is_empty() && x == y => {}
                (Some(x), Some(y)) if y == Component::CurDir => out.push(x),
                (Some(_), Some(y)) if y == Component::ParentDir => {
                    return None;
                }
                (Some(x), Some(_)) => {
                    out.push(Component::ParentDir);
                    out.extend(b.by_ref().map(|_| Component::ParentDir));
                    out.push(x);
                    out.extend(a.by_ref());
                    break;
                }
            }
        }

        Some(out.iter().map(|c| c.as_os_str()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize() {
        assert_eq!(Path::new("foo").normalize(), Path::new("foo"));
        assert_eq!(Path::new("./foo").normalize(), Path::new("foo"));
        assert_eq!(Path::new("foo/./bar").normalize(), Path::new("foo/bar"));
        assert_eq!(Path::new("foo//bar///").normalize(), Path::new("foo/bar"));
        assert_eq!(Path::new("foo/../bar").normalize(), Path::new("bar"));
        assert_eq!(Path::new(".").normalize(), Path::new("."));
        assert_eq!(Path::new("").normalize(), Path::new("."));
        assert_eq!(Path::new("..").normalize(), Path::new(".."));
        assert_eq!(Path::new("../..").normalize(), Path::new("../.."));
    }

    #[test]
    #[cfg(unix)]
    fn normalize_absolute() {
        assert_eq!(Path::new("/foo/../bar").normalize(), Path::new("/bar"));
        assert_eq!(Path::new("/../bar").normalize(), Path::new("/bar"));
        assert_eq!(Path::new("/../../bar").normalize(), Path::new("/bar"));
    }

    #[test]
    #[cfg(unix)]
    fn relative_from() {
        assert_eq!(
            Path::new("/bar/foo").relative_from(Path::new("/bar")),
            Some(PathBuf::from("foo"))
        );
        assert_eq!(
            Path::new("/foo").relative_from(Path::new("/bar")),
            Some(PathBuf::from("../foo"))
        );
        assert_eq!(
            Path::new("/foo/bar").relative_from(Path::new("/foo/bar")),
            Some(PathBuf::from(""))
        );
        assert_eq!(
            Path::new("/foo/bar").relative_from(Path::new("rel")),
            Some(PathBuf::from("/foo/bar"))
        );
        assert_eq!(Path::new("rel").relative_from(Path::new("/abs")), None);
    }
}
