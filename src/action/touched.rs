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

use std::fmt;
use std::sync::Arc;

use log::debug;

use super::Action;
use crate::error::Error;
use crate::graph::{Graph, NodeId};
use crate::loader::FileLoader;

/// Wraps an action, running it only when some predecessor artifact was
/// touched (created, modified, or deleted).
///
/// This wrapper is what makes a build incremental: identical inputs mean the
/// inner action is skipped and the surrounding files are merely verified
/// against the digest cache. Whether the inner action ran or not, every file
/// among the command's predecessors and successors is re-digested,
/// reclassified, and recorded in the cache, which is then saved.
pub struct ExecuteOnTouched<A> {
    inner: A,
    loader: Arc<FileLoader>,
}

impl<A: Action> ExecuteOnTouched<A> {
    pub fn new(inner: A, loader: Arc<FileLoader>) -> ExecuteOnTouched<A> {
        ExecuteOnTouched { inner, loader }
    }
}

impl<A: Action> fmt::Display for ExecuteOnTouched<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl<A: Action> Action for ExecuteOnTouched<A> {
    fn execute(&self, command: NodeId, graph: &Graph) -> Result<(), Error> {
        let touched = graph
            .predecessors(command)
            .iter()
            .filter_map(|&node| graph.artifact(node))
            .any(|artifact| artifact.status().is_touched());

        if touched {
            // A failed action leaves the cache untouched so the command runs
            // again next time.
            self.inner.execute(command, graph)?;
        } else {
            debug!("inputs unchanged; skipping {}", self.inner);
        }

        let files = graph
            .predecessors(command)
            .iter()
            .chain(graph.successors(command))
            .filter_map(|&node| graph.file(node));

        let mut entries = Vec::new();
        for file in files {
            self.loader.refresh(file, touched)?;
            entries.push((file.path().to_path_buf(), file.digest()));
        }

        self.loader.save_cache(entries)
    }
}
