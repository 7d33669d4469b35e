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

use std::cmp;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use failure::Fail;
use log::debug;

use crate::error::Error;
use crate::graph::{Graph, NodeId};
use crate::util::WorkQueue;

/// A build failure. Contains each node whose action failed and the
/// associated error.
#[derive(Debug, Fail)]
pub struct BuildFailure {
    errors: Vec<(NodeId, Error)>,
}

impl BuildFailure {
    pub fn new(errors: Vec<(NodeId, Error)>) -> BuildFailure {
        BuildFailure { errors }
    }

    pub fn errors(&self) -> &[(NodeId, Error)] {
        &self.errors
    }
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.len() == 1 {
            write!(f, "build failed with 1 error")
        } else {
            write!(f, "build failed with {} errors", self.errors.len())
        }?;

        for (node, err) in &self.errors {
            write!(f, "\n - {}: {}", node, err)?;
        }

        Ok(())
    }
}

/// An error from the executor itself.
#[derive(Debug, Fail)]
pub enum BuildError {
    /// `execute` was called with an empty target list.
    NoTargets,

    /// A cycle is reachable from the targets.
    Cycle { node: String },

    /// Two nodes of the same kind share an edge.
    Structure { node: String, neighbor: String },

    /// One or more actions failed.
    Failure(#[cause] BuildFailure),

    /// After a quiescent run without failure, some collected nodes were
    /// never executed. This indicates a bug in graph construction or the
    /// executor, not in the user's actions.
    Incomplete { unprocessed: Vec<(String, usize)> },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::NoTargets => {
                write!(f, "at least one target must be provided")
            }
            BuildError::Cycle { node } => {
                write!(f, "cycle detected involving {}", node)
            }
            BuildError::Structure { node, neighbor } => write!(
                f,
                "edge between {} and {} violates artifact/command \
                 alternation",
                node, neighbor
            ),
            BuildError::Failure(err) => write!(f, "{}", err),
            BuildError::Incomplete { unprocessed } => {
                write!(
                    f,
                    "execution incomplete: {} node(s) left unprocessed",
                    unprocessed.len()
                )?;

                for (node, indeg) in unprocessed {
                    write!(
                        f,
                        "\n - {} ({} unfinished dependencies)",
                        node, indeg
                    )?;
                }

                Ok(())
            }
        }
    }
}

/// Scheduler bookkeeping shared by the worker threads. Everything sits
/// under one mutex; workers hold the lock only for bookkeeping, never while
/// an action runs.
struct Scheduler {
    indeg: HashMap<NodeId, usize>,
    completed: HashSet<NodeId>,
    errors: Vec<(NodeId, Error)>,
    failed: bool,
}

/// Executes the targets' dependency graphs with bounded parallelism.
///
/// The subgraph reachable from the targets by walking predecessors is
/// collected and validated (bipartite alternation, acyclicity), then
/// executed in dependency order by `max(1, n_workers)` worker threads. An
/// action begins only after every collected predecessor of its command has
/// succeeded. The first failure stops new work from being dispatched;
/// actions already running complete naturally.
pub fn execute(
    graph: &Graph,
    targets: &[NodeId],
    n_workers: usize,
) -> Result<(), BuildError> {
    if targets.is_empty() {
        return Err(BuildError::NoTargets);
    }

    let collected = collect(graph, targets)?;

    let mut indeg = HashMap::with_capacity(collected.len());
    for &node in &collected {
        let count = graph
            .predecessors(node)
            .iter()
            .filter(|&pred| collected.contains(pred))
            .count();
        indeg.insert(node, count);
    }

    let queue = WorkQueue::new();
    let seeded = queue.push_many(
        indeg
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(&node, _)| Some(node)),
    );

    // Counts nodes that are queued or being processed. The worker that
    // drops it to zero shuts the pool down.
    let active = AtomicUsize::new(seeded);

    let scheduler = Mutex::new(Scheduler {
        indeg,
        completed: HashSet::new(),
        errors: Vec::new(),
        failed: false,
    });

    let n_workers = cmp::max(n_workers, 1);

    crossbeam::scope(|scope| {
        for _ in 0..n_workers {
            scope.spawn(|_| {
                worker(graph, &queue, &active, &scheduler, n_workers)
            });
        }
    })
    .expect("build worker panicked");

    let Scheduler {
        indeg,
        completed,
        errors,
        failed,
    } = scheduler.into_inner().unwrap();

    if failed {
        return Err(BuildError::Failure(BuildFailure::new(errors)));
    }

    if completed.len() != collected.len() {
        let mut unprocessed: Vec<_> = collected
            .iter()
            .filter(|&node| !completed.contains(node))
            .map(|&node| (graph.display(node).to_string(), indeg[&node]))
            .collect();
        unprocessed.sort();

        return Err(BuildError::Incomplete { unprocessed });
    }

    Ok(())
}

/// Executes the targets with one worker per logical CPU.
pub fn execute_default(
    graph: &Graph,
    targets: &[NodeId],
) -> Result<(), BuildError> {
    execute(graph, targets, num_cpus::get())
}

/// Enumerates the subgraph reachable from the targets by walking
/// predecessors, validating as it goes: every visited node's edges must
/// alternate between artifacts and commands, and a predecessor found on the
/// depth-first stack is a back-edge, i.e. a cycle.
fn collect(
    graph: &Graph,
    targets: &[NodeId],
) -> Result<HashSet<NodeId>, BuildError> {
    let mut collected = HashSet::new();
    let mut on_stack = HashSet::new();
    let mut stack: Vec<(NodeId, usize)> = Vec::new();

    for &target in targets {
        if collected.contains(&target) {
            continue;
        }

        check_alternation(graph, target)?;
        collected.insert(target);
        on_stack.insert(target);
        stack.push((target, 0));

        while let Some(&mut (node, ref mut next)) = stack.last_mut() {
            let preds = graph.predecessors(node);

            if *next < preds.len() {
                let pred = preds[*next];
                *next += 1;

                if on_stack.contains(&pred) {
                    return Err(BuildError::Cycle {
                        node: graph.display(pred).to_string(),
                    });
                }

                if collected.contains(&pred) {
                    continue;
                }

                check_alternation(graph, pred)?;
                collected.insert(pred);
                on_stack.insert(pred);
                stack.push((pred, 0));
            } else {
                stack.pop();
                on_stack.remove(&node);
            }
        }
    }

    Ok(collected)
}

fn check_alternation(
    graph: &Graph,
    node: NodeId,
) -> Result<(), BuildError> {
    let artifact = graph.is_artifact(node);

    let neighbors = graph
        .predecessors(node)
        .iter()
        .chain(graph.successors(node));

    for &neighbor in neighbors {
        if graph.is_artifact(neighbor) == artifact {
            return Err(BuildError::Structure {
                node: graph.display(node).to_string(),
                neighbor: graph.display(neighbor).to_string(),
            });
        }
    }

    Ok(())
}

fn worker(
    graph: &Graph,
    queue: &WorkQueue<Option<NodeId>>,
    active: &AtomicUsize,
    scheduler: &Mutex<Scheduler>,
    n_workers: usize,
) {
    while let Some(node) = queue.pop() {
        // A latched failure stops new work; anything still queued drains
        // without running.
        let failed = scheduler.lock().unwrap().failed;

        let result = if failed {
            None
        } else {
            Some(run_node(graph, node))
        };

        if let Some(result) = result {
            let mut guard = scheduler.lock().unwrap();
            let state = &mut *guard;

            match result {
                Ok(()) => {
                    state.completed.insert(node);

                    for &succ in graph.successors(node) {
                        // Successors outside the collected subgraph are not
                        // scheduled.
                        if let Some(indeg) = state.indeg.get_mut(&succ) {
                            *indeg -= 1;

                            if *indeg == 0 && !state.failed {
                                active.fetch_add(1, Ordering::SeqCst);
                                queue.push(Some(succ));
                            }
                        }
                    }
                }
                Err(err) => {
                    debug!("{} failed: {}", graph.display(node), err);
                    state.failed = true;
                    state.errors.push((node, err));
                }
            }
        }

        // The last node to settle shuts down all workers.
        if active.fetch_sub(1, Ordering::SeqCst) == 1 {
            queue.push_many((0..n_workers).map(|_| None));
        }
    }
}

fn run_node(graph: &Graph, node: NodeId) -> Result<(), Error> {
    match graph.action(node) {
        Some(action) => {
            debug!("running {}", graph.display(node));
            action.execute(node, graph)
        }
        // Artifacts and commands without an action settle trivially.
        None => Ok(()),
    }
}
