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

use crate::action::Action;
use crate::res::{Artifact, File};

/// Stable handle to a node in a [`Graph`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node is either an artifact or a command; edges must alternate between
/// the two kinds.
pub enum Node {
    Artifact(Artifact),
    Command(Command),
}

/// A unit of work, optionally bound to an action. A command without an
/// action completes trivially and serves as a grouping or synchronization
/// point.
pub struct Command {
    action: Option<Box<dyn Action>>,
}

impl Command {
    pub fn action(&self) -> Option<&dyn Action> {
        self.action.as_ref().map(|action| action.as_ref())
    }
}

#[derive(Default)]
struct Neighbors {
    predecessors: Vec<NodeId>,
    successors: Vec<NodeId>,
}

/// The bipartite dependency graph over artifacts and commands.
///
/// Nodes live in an arena and are addressed by [`NodeId`]. Identity is the
/// arena slot, so two nodes with equal content stay distinct. Edges are
/// symmetric and non-owning: adding a predecessor records the reverse
/// successor edge on the other node.
///
/// The graph is built single-threaded (`&mut self`) and then shared
/// immutably with the executor's worker threads; mutable file metadata lives
/// inside the artifact nodes behind their own locks.
#[derive(Default)]
pub struct Graph {
    nodes: Vec<Node>,
    neighbors: Vec<Neighbors>,
}

impl Graph {
    pub fn new() -> Graph {
        Graph::default()
    }

    fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.neighbors.push(Neighbors::default());
        id
    }

    pub fn add_artifact(&mut self, artifact: Artifact) -> NodeId {
        self.add_node(Node::Artifact(artifact))
    }

    pub fn add_file(&mut self, file: File) -> NodeId {
        self.add_artifact(Artifact::File(file))
    }

    pub fn add_command<A>(&mut self, action: A) -> NodeId
    where
        A: Action + 'static,
    {
        self.add_node(Node::Command(Command {
            action: Some(Box::new(action)),
        }))
    }

    /// A command with no action.
    pub fn add_empty_command(&mut self) -> NodeId {
        self.add_node(Node::Command(Command { action: None }))
    }

    /// Inserts each of `preds` into the node's predecessor set and the node
    /// into each predecessor's successor set. Duplicate insertions are
    /// no-ops.
    pub fn add_predecessors(&mut self, node: NodeId, preds: &[NodeId]) {
        for &pred in preds {
            if !self.neighbors[node.0].predecessors.contains(&pred) {
                self.neighbors[node.0].predecessors.push(pred);
                self.neighbors[pred.0].successors.push(node);
            }
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn predecessors(&self, id: NodeId) -> &[NodeId] {
        &self.neighbors[id.0].predecessors
    }

    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        &self.neighbors[id.0].successors
    }

    pub fn is_artifact(&self, id: NodeId) -> bool {
        match self.node(id) {
            Node::Artifact(_) => true,
            Node::Command(_) => false,
        }
    }

    pub fn artifact(&self, id: NodeId) -> Option<&Artifact> {
        match self.node(id) {
            Node::Artifact(artifact) => Some(artifact),
            Node::Command(_) => None,
        }
    }

    /// The node's file, if it is a file artifact.
    pub fn file(&self, id: NodeId) -> Option<&File> {
        self.artifact(id).and_then(Artifact::as_file)
    }

    /// The node's action, if it is a command carrying one.
    pub fn action(&self, id: NodeId) -> Option<&dyn Action> {
        match self.node(id) {
            Node::Command(command) => command.action(),
            Node::Artifact(_) => None,
        }
    }

    /// A human-readable rendering of a node for logs and error messages:
    /// artifacts in parentheses, commands in brackets.
    pub fn display(&self, id: NodeId) -> NodeDisplay<'_> {
        NodeDisplay { graph: self, id }
    }
}

pub struct NodeDisplay<'a> {
    graph: &'a Graph,
    id: NodeId,
}

impl<'a> fmt::Display for NodeDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.graph.node(self.id) {
            Node::Artifact(Artifact::File(file)) => {
                write!(f, "({})", file.path().display())
            }
            Node::Artifact(Artifact::Data(_)) => {
                write!(f, "(artifact {})", self.id)
            }
            Node::Command(command) => match command.action() {
                Some(action) => write!(f, "[{}]", action),
                None => write!(f, "[command {}]", self.id),
            },
        }
    }
}
