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
use std::fs;

use log::info;

use super::Action;
use crate::error::Error;
use crate::graph::{Graph, NodeId};

/// Creates the directory named by the command's file successor. Parent
/// directories are created as needed and an existing directory is fine.
#[derive(Default)]
pub struct MakeDir;

impl MakeDir {
    pub fn new() -> MakeDir {
        MakeDir
    }
}

impl fmt::Display for MakeDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mkdir")
    }
}

impl Action for MakeDir {
    fn execute(&self, command: NodeId, graph: &Graph) -> Result<(), Error> {
        let dir = graph
            .successors(command)
            .iter()
            .find_map(|&node| graph.file(node))
            .ok_or(Error::MissingOutput { what: "directory" })?;

        info!("mkdir {}", dir.path().display());
        fs::create_dir_all(dir.path())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::loader::FileLoader;

    #[test]
    fn creates_directory_tree() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FileLoader::new(".digests.json", dir.path());

        let mut graph = Graph::new();
        let mkdir = graph.add_command(MakeDir::new());
        let out = graph.add_file(loader.load_file("build/obj").unwrap());
        graph.add_predecessors(out, &[mkdir]);

        graph.action(mkdir).unwrap().execute(mkdir, &graph).unwrap();

        assert!(dir.path().join("build/obj").is_dir());

        // Running again is fine.
        graph.action(mkdir).unwrap().execute(mkdir, &graph).unwrap();
    }

    #[test]
    fn missing_successor_is_an_error() {
        let mut graph = Graph::new();
        let mkdir = graph.add_command(MakeDir::new());

        match graph.action(mkdir).unwrap().execute(mkdir, &graph) {
            Err(Error::MissingOutput { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
