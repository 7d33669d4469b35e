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

use crate::error::Error;
use crate::graph::{Graph, NodeId};

mod command;
mod cpp;
mod makedir;
mod touched;

pub use self::command::CommandLine;
pub use self::cpp::{CompileCpp, LinkCppApp, LinkCppShared};
pub use self::makedir::MakeDir;
pub use self::touched::ExecuteOnTouched;

/// A unit of work bound to a single command node.
///
/// The command's live predecessor and successor sets are reachable through
/// the graph handle: an action typically scans `graph.predecessors(command)`
/// for the artifacts it needs and fails with a missing-input error if a
/// required one is absent. Returning an error aborts the build.
///
/// Actions do not update artifact metadata or the digest cache; the
/// [`ExecuteOnTouched`] wrapper owns that, which is what lets it treat any
/// action uniformly.
pub trait Action: fmt::Display + Send + Sync {
    fn execute(&self, command: NodeId, graph: &Graph) -> Result<(), Error>;
}
