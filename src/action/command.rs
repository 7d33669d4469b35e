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
use std::path::PathBuf;

use super::Action;
use crate::error::Error;
use crate::graph::{Graph, NodeId};
use crate::util::shell;

/// Runs a shell command line. Success is exit status 0.
pub struct CommandLine {
    command: String,
    cwd: Option<PathBuf>,
}

impl CommandLine {
    pub fn new<S: Into<String>>(command: S) -> CommandLine {
        CommandLine {
            command: command.into(),
            cwd: None,
        }
    }

    /// Sets the working directory the command is spawned in. Without this,
    /// the command inherits the build process's working directory.
    pub fn cwd<P: Into<PathBuf>>(mut self, dir: P) -> CommandLine {
        self.cwd = Some(dir.into());
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)
    }
}

impl Action for CommandLine {
    fn execute(&self, _command: NodeId, _graph: &Graph) -> Result<(), Error> {
        shell(&self.command, self.cwd.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn success_and_failure() {
        let mut graph = Graph::new();
        let ok = graph.add_command(CommandLine::new("true"));
        let bad = graph.add_command(CommandLine::new("false"));

        assert!(graph.action(ok).unwrap().execute(ok, &graph).is_ok());

        match graph.action(bad).unwrap().execute(bad, &graph) {
            Err(Error::CommandFailed { code, .. }) => assert_eq!(code, 1),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    #[cfg(unix)]
    fn runs_in_cwd() {
        let dir = tempfile::tempdir().unwrap();

        let mut graph = Graph::new();
        let touch = graph.add_command(
            CommandLine::new("echo out > here.txt").cwd(dir.path()),
        );

        graph.action(touch).unwrap().execute(touch, &graph).unwrap();

        assert!(dir.path().join("here.txt").exists());
    }
}
