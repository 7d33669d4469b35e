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

//! C++ toolchain actions. Command lines are built from root-relative paths
//! and run through the shell with the loader's root as the working
//! directory.

use std::ffi::OsStr;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use super::Action;
use crate::error::Error;
use crate::graph::{Graph, NodeId};
use crate::loader::FileLoader;
use crate::res::File;
use crate::util::shell;

const DEFAULT_COMPILER: &str = "g++";

/// Extensions that mark a file as an intermediate build artifact rather than
/// a final executable.
const ARTIFACT_EXTENSIONS: &[&str] = &["o", "so", "cpp", "h"];

fn file_with_ext<'a>(
    graph: &'a Graph,
    nodes: &[NodeId],
    ext: &str,
) -> Option<&'a File> {
    nodes
        .iter()
        .filter_map(|&node| graph.file(node))
        .find(|file| file.has_extension(ext))
}

fn files_with_ext<'a>(
    graph: &'a Graph,
    nodes: &[NodeId],
    ext: &str,
) -> Vec<&'a File> {
    nodes
        .iter()
        .filter_map(|&node| graph.file(node))
        .filter(|file| file.has_extension(ext))
        .collect()
}

fn rel(loader: &FileLoader, path: &Path) -> String {
    loader.relativize(path).display().to_string()
}

fn join_rel(loader: &FileLoader, files: &[&File]) -> String {
    files
        .iter()
        .map(|file| rel(loader, file.path()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compiles a single C++ source into an object file: the one `.cpp`
/// predecessor into the one `.o` successor.
pub struct CompileCpp {
    loader: Arc<FileLoader>,
    compiler: String,
}

impl CompileCpp {
    pub fn new(loader: Arc<FileLoader>) -> CompileCpp {
        CompileCpp {
            loader,
            compiler: DEFAULT_COMPILER.into(),
        }
    }

    pub fn compiler<S: Into<String>>(mut self, compiler: S) -> CompileCpp {
        self.compiler = compiler.into();
        self
    }

    fn command_line(
        &self,
        command: NodeId,
        graph: &Graph,
    ) -> Result<String, Error> {
        let source =
            file_with_ext(graph, graph.predecessors(command), "cpp")
                .ok_or(Error::MissingInput {
                    what: ".cpp source",
                })?;

        let object = file_with_ext(graph, graph.successors(command), "o")
            .ok_or(Error::MissingOutput { what: ".o object" })?;

        Ok(format!(
            "{} -c {} -o {} -fPIC",
            self.compiler,
            rel(&self.loader, source.path()),
            rel(&self.loader, object.path()),
        ))
    }
}

impl fmt::Display for CompileCpp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -c", self.compiler)
    }
}

impl Action for CompileCpp {
    fn execute(&self, command: NodeId, graph: &Graph) -> Result<(), Error> {
        shell(
            &self.command_line(command, graph)?,
            Some(self.loader.root()),
        )
    }
}

/// Links object files into a shared library: all `.o` predecessors into the
/// one `.so` successor.
pub struct LinkCppShared {
    loader: Arc<FileLoader>,
    compiler: String,
}

impl LinkCppShared {
    pub fn new(loader: Arc<FileLoader>) -> LinkCppShared {
        LinkCppShared {
            loader,
            compiler: DEFAULT_COMPILER.into(),
        }
    }

    pub fn compiler<S: Into<String>>(mut self, compiler: S) -> LinkCppShared {
        self.compiler = compiler.into();
        self
    }

    fn command_line(
        &self,
        command: NodeId,
        graph: &Graph,
    ) -> Result<String, Error> {
        let objects =
            files_with_ext(graph, graph.predecessors(command), "o");
        if objects.is_empty() {
            return Err(Error::MissingInput {
                what: ".o objects",
            });
        }

        let library = file_with_ext(graph, graph.successors(command), "so")
            .ok_or(Error::MissingOutput {
                what: ".so library",
            })?;

        Ok(format!(
            "{} -shared {} -o {}",
            self.compiler,
            join_rel(&self.loader, &objects),
            rel(&self.loader, library.path()),
        ))
    }
}

impl fmt::Display for LinkCppShared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -shared", self.compiler)
    }
}

impl Action for LinkCppShared {
    fn execute(&self, command: NodeId, graph: &Graph) -> Result<(), Error> {
        shell(
            &self.command_line(command, graph)?,
            Some(self.loader.root()),
        )
    }
}

/// Links object files and shared libraries into an executable.
///
/// Inputs are the `.o` and `.so` predecessors; the output is the successor
/// with no build-artifact extension. Each shared library contributes a
/// `-L <dir> -l<name>` pair, with `<name>` the basename stripped of its
/// `lib` prefix and `.so` suffix.
pub struct LinkCppApp {
    loader: Arc<FileLoader>,
    compiler: String,
}

impl LinkCppApp {
    pub fn new(loader: Arc<FileLoader>) -> LinkCppApp {
        LinkCppApp {
            loader,
            compiler: DEFAULT_COMPILER.into(),
        }
    }

    pub fn compiler<S: Into<String>>(mut self, compiler: S) -> LinkCppApp {
        self.compiler = compiler.into();
        self
    }

    fn command_line(
        &self,
        command: NodeId,
        graph: &Graph,
    ) -> Result<String, Error> {
        let objects =
            files_with_ext(graph, graph.predecessors(command), "o");
        if objects.is_empty() {
            return Err(Error::MissingInput {
                what: ".o objects",
            });
        }

        let libraries =
            files_with_ext(graph, graph.predecessors(command), "so");

        let executable = graph
            .successors(command)
            .iter()
            .filter_map(|&node| graph.file(node))
            .find(|file| {
                match file.path().extension().and_then(OsStr::to_str) {
                    Some(ext) => !ARTIFACT_EXTENSIONS.contains(&ext),
                    None => true,
                }
            })
            .ok_or(Error::MissingOutput {
                what: "executable",
            })?;

        let mut line = format!(
            "{} {} -o {}",
            self.compiler,
            join_rel(&self.loader, &objects),
            rel(&self.loader, executable.path()),
        );

        for library in &libraries {
            let dir = library
                .path()
                .parent()
                .unwrap_or_else(|| Path::new("."));
            let stem = library
                .path()
                .file_stem()
                .and_then(OsStr::to_str)
                .unwrap_or("");
            let name = stem.strip_prefix("lib").unwrap_or(stem);

            line.push_str(&format!(
                " -L {} -l{}",
                rel(&self.loader, dir),
                name
            ));
        }

        Ok(line)
    }
}

impl fmt::Display for LinkCppApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (link app)", self.compiler)
    }
}

impl Action for LinkCppApp {
    fn execute(&self, command: NodeId, graph: &Graph) -> Result<(), Error> {
        shell(
            &self.command_line(command, graph)?,
            Some(self.loader.root()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    // Loading never-built outputs just stamps them Deleted; that is enough
    // to construct command lines from.
    fn fixture() -> (TempDir, Arc<FileLoader>, Graph) {
        let dir = tempfile::tempdir().unwrap();
        let loader =
            Arc::new(FileLoader::new("build/.digests.json", dir.path()));
        (dir, loader, Graph::new())
    }

    #[test]
    fn compile_command_line() {
        let (_dir, loader, mut graph) = fixture();

        let action = CompileCpp::new(loader.clone());

        let compile = graph.add_empty_command();
        let source =
            graph.add_file(loader.load_file("src/app.cpp").unwrap());
        let header = graph.add_file(loader.load_file("src/app.h").unwrap());
        let object =
            graph.add_file(loader.load_file("build/app.o").unwrap());
        graph.add_predecessors(compile, &[source, header]);
        graph.add_predecessors(object, &[compile]);

        assert_eq!(
            action.command_line(compile, &graph).unwrap(),
            "g++ -c src/app.cpp -o build/app.o -fPIC"
        );
    }

    #[test]
    fn compile_requires_source_and_object() {
        let (_dir, loader, mut graph) = fixture();

        let action = CompileCpp::new(loader.clone());
        let compile = graph.add_empty_command();

        match action.command_line(compile, &graph) {
            Err(Error::MissingInput { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }

        let source =
            graph.add_file(loader.load_file("src/app.cpp").unwrap());
        graph.add_predecessors(compile, &[source]);

        match action.command_line(compile, &graph) {
            Err(Error::MissingOutput { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn link_shared_command_line() {
        let (_dir, loader, mut graph) = fixture();

        let action = LinkCppShared::new(loader.clone());

        let link = graph.add_empty_command();
        let a = graph.add_file(loader.load_file("build/a.o").unwrap());
        let b = graph.add_file(loader.load_file("build/b.o").unwrap());
        let lib = graph
            .add_file(loader.load_file("build/libexample.so").unwrap());
        graph.add_predecessors(link, &[a, b]);
        graph.add_predecessors(lib, &[link]);

        assert_eq!(
            action.command_line(link, &graph).unwrap(),
            "g++ -shared build/a.o build/b.o -o build/libexample.so"
        );
    }

    #[test]
    fn link_shared_requires_objects() {
        let (_dir, loader, mut graph) = fixture();

        let action = LinkCppShared::new(loader.clone());
        let link = graph.add_empty_command();
        let lib = graph
            .add_file(loader.load_file("build/libexample.so").unwrap());
        graph.add_predecessors(lib, &[link]);

        match action.command_line(link, &graph) {
            Err(Error::MissingInput { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn link_app_command_line() {
        let (_dir, loader, mut graph) = fixture();

        let action = LinkCppApp::new(loader.clone());

        let link = graph.add_empty_command();
        let object =
            graph.add_file(loader.load_file("build/app.o").unwrap());
        let lib = graph
            .add_file(loader.load_file("build/libexample.so").unwrap());
        let exe = graph.add_file(loader.load_file("build/app").unwrap());
        graph.add_predecessors(link, &[object, lib]);
        graph.add_predecessors(exe, &[link]);

        assert_eq!(
            action.command_line(link, &graph).unwrap(),
            "g++ build/app.o -o build/app -L build -lexample"
        );
    }

    #[test]
    fn link_app_without_libraries_has_no_link_flags() {
        let (_dir, loader, mut graph) = fixture();

        let action = LinkCppApp::new(loader.clone());

        let link = graph.add_empty_command();
        let object =
            graph.add_file(loader.load_file("build/app.o").unwrap());
        let exe = graph.add_file(loader.load_file("build/app").unwrap());
        graph.add_predecessors(link, &[object]);
        graph.add_predecessors(exe, &[link]);

        assert_eq!(
            action.command_line(link, &graph).unwrap(),
            "g++ build/app.o -o build/app"
        );
    }

    #[test]
    fn alternate_compiler() {
        let (_dir, loader, mut graph) = fixture();

        let action = CompileCpp::new(loader.clone()).compiler("clang++");

        let compile = graph.add_empty_command();
        let source =
            graph.add_file(loader.load_file("src/app.cpp").unwrap());
        let object =
            graph.add_file(loader.load_file("build/app.o").unwrap());
        graph.add_predecessors(compile, &[source]);
        graph.add_predecessors(object, &[compile]);

        assert!(action
            .command_line(compile, &graph)
            .unwrap()
            .starts_with("clang++ -c"));
    }
}
