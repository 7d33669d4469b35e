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

//! A programmable incremental build engine.
//!
//! A build is described as a bipartite directed acyclic graph whose nodes
//! alternate between *artifacts* (files, directories, or bare grouping
//! markers) and *commands* (units of work with an attached [`Action`]).
//! [`execute`] walks the subgraph reachable from the requested targets in
//! dependency order with bounded parallelism, canceling cooperatively on
//! the first failure.
//!
//! Incrementality comes from content hashing: a [`FileLoader`] stamps each
//! file artifact with a status derived from a persistent digest cache, and
//! the [`ExecuteOnTouched`] wrapper skips any command whose inputs are all
//! unchanged, verifying the surrounding files against the cache instead of
//! rerunning the work.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mortar::{
//!     execute, CommandLine, ExecuteOnTouched, FileLoader, Graph,
//! };
//!
//! let loader =
//!     Arc::new(FileLoader::new("build/.digests.json", "/path/to/project"));
//!
//! let mut graph = Graph::new();
//! let source = graph.add_file(loader.load_file("src/main.cpp")?);
//! let object = graph.add_file(loader.load_file("build/main.o")?);
//! let compile = graph.add_command(ExecuteOnTouched::new(
//!     CommandLine::new("g++ -c src/main.cpp -o build/main.o")
//!         .cwd("/path/to/project"),
//!     loader.clone(),
//! ));
//! graph.add_predecessors(compile, &[source]);
//! graph.add_predecessors(object, &[compile]);
//!
//! execute(&graph, &[object], 4)?;
//! # Ok::<(), failure::Error>(())
//! ```

pub mod action;
mod build;
pub mod cache;
pub mod error;
pub mod graph;
pub mod loader;
pub mod res;
pub mod util;

pub use crate::action::{
    Action, CommandLine, CompileCpp, ExecuteOnTouched, LinkCppApp,
    LinkCppShared, MakeDir,
};
pub use crate::build::{execute, execute_default, BuildError, BuildFailure};
pub use crate::cache::DigestCache;
pub use crate::error::Error;
pub use crate::graph::{Graph, Node, NodeId};
pub use crate::loader::FileLoader;
pub use crate::res::{Artifact, Digest, File, Status};
