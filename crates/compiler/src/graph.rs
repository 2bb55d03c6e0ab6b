//! Dependency cycle resolution
//!
//! Partitions a directed graph into groups that can be processed one after
//! another: every dependency cycle becomes one group, every other node a
//! group of its own.
//!
//! # Algorithm
//!
//! Repeatedly look for a cycle with a depth-first search that visits nodes in
//! first-appearance order. If one is found, emit its nodes as a group, delete
//! them (and every edge into them) and search again. Once the remaining graph
//! is acyclic, emit each remaining node as a singleton, in topological order
//! (for an edge `u -> v`, `u` comes first).
//!
//! This peels one detected cycle at a time; it is not a strongly connected
//! component partition. When elementary cycles overlap, the grouping follows
//! whichever cycle the search meets first.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use tracing::trace;

/// An insertion-ordered adjacency list
pub type Graph<T> = Vec<(T, Vec<T>)>;

/// Lazy sequence of node groups produced by [`cycles`]
///
/// Owns a private copy of the graph; the caller's graph is never touched.
#[derive(Debug, Clone)]
pub struct Cycles<T> {
    /// Remaining nodes in first-appearance order
    nodes: Vec<T>,
    successors: HashMap<T, Vec<T>>,
    /// Singletons from the final topological pass
    pending: VecDeque<T>,
}

/// Resolve a dependency graph into processing groups
///
/// Nodes that only appear as successors are nodes too. Groups are yielded
/// one at a time; an empty graph yields nothing.
pub fn cycles<T, G, S>(graph: G) -> Cycles<T>
where
    T: Clone + Eq + Hash,
    G: IntoIterator<Item = (T, S)>,
    S: IntoIterator<Item = T>,
{
    let mut nodes = Vec::new();
    let mut successors: HashMap<T, Vec<T>> = HashMap::new();

    for (node, succ) in graph {
        if !successors.contains_key(&node) {
            nodes.push(node.clone());
        }
        successors.entry(node).or_default().extend(succ);
    }

    let successor_only: Vec<T> = nodes
        .iter()
        .flat_map(|n| successors[n].iter())
        .filter(|s| !successors.contains_key(*s))
        .cloned()
        .collect();
    for node in successor_only {
        if !successors.contains_key(&node) {
            successors.insert(node.clone(), Vec::new());
            nodes.push(node);
        }
    }

    Cycles {
        nodes,
        successors,
        pending: VecDeque::new(),
    }
}

/// Build a graph from `(src, dest)` edges, keeping first-seen order
///
/// Repeated edges are stored once.
pub fn graph_from_edges<T, E>(edges: E) -> Graph<T>
where
    T: Clone + Eq + Hash,
    E: IntoIterator<Item = (T, T)>,
{
    let mut graph: Graph<T> = Vec::new();
    let mut index: HashMap<T, usize> = HashMap::new();
    for (src, dest) in edges {
        let slot = *index.entry(src.clone()).or_insert_with(|| {
            graph.push((src, Vec::new()));
            graph.len() - 1
        });
        let successors = &mut graph[slot].1;
        if !successors.contains(&dest) {
            successors.push(dest);
        }
    }
    graph
}

impl<T> Iterator for Cycles<T>
where
    T: Clone + Eq + Hash,
{
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(node) = self.pending.pop_front() {
            return Some(vec![node]);
        }
        if self.nodes.is_empty() {
            return None;
        }

        match self.find_cycle() {
            Some(cycle) => {
                trace!(size = cycle.len(), "peeled dependency cycle");
                self.remove(&cycle);
                Some(cycle)
            }
            None => {
                self.pending = self.topological_order();
                self.nodes.clear();
                self.successors.clear();
                self.pending.pop_front().map(|node| vec![node])
            }
        }
    }
}

impl<T> Cycles<T>
where
    T: Clone + Eq + Hash,
{
    /// First cycle met by a depth-first search in node order
    ///
    /// The cycle is returned from the node the back edge points at, without
    /// repeating it at the end.
    fn find_cycle(&self) -> Option<Vec<T>> {
        let mut done: HashSet<&T> = HashSet::new();

        for start in &self.nodes {
            if done.contains(start) {
                continue;
            }
            let mut path: Vec<&T> = vec![start];
            let mut cursor: Vec<usize> = vec![0];

            while let Some(&node) = path.last() {
                let depth = path.len() - 1;
                let succ = &self.successors[node];
                match succ.get(cursor[depth]) {
                    Some(next) => {
                        cursor[depth] += 1;
                        if let Some(pos) = path.iter().position(|n| *n == next) {
                            return Some(path[pos..].iter().map(|n| (*n).clone()).collect());
                        }
                        if !done.contains(next) {
                            path.push(next);
                            cursor.push(0);
                        }
                    }
                    None => {
                        done.insert(node);
                        path.pop();
                        cursor.pop();
                    }
                }
            }
        }
        None
    }

    /// Kahn's algorithm over an acyclic remainder
    fn topological_order(&self) -> VecDeque<T> {
        let mut in_degree: HashMap<&T, usize> = self.nodes.iter().map(|n| (n, 0)).collect();
        for succ in self.successors.values() {
            for s in succ {
                if let Some(d) = in_degree.get_mut(s) {
                    *d += 1;
                }
            }
        }

        let mut ready: VecDeque<&T> = self
            .nodes
            .iter()
            .filter(|n| in_degree[*n] == 0)
            .collect();
        let mut order = VecDeque::with_capacity(self.nodes.len());
        while let Some(node) = ready.pop_front() {
            order.push_back(node.clone());
            for s in &self.successors[node] {
                if let Some(d) = in_degree.get_mut(s) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push_back(s);
                    }
                }
            }
        }
        order
    }

    fn remove(&mut self, group: &[T]) {
        self.nodes.retain(|n| !group.contains(n));
        for node in group {
            self.successors.remove(node);
        }
        for succ in self.successors.values_mut() {
            succ.retain(|s| !group.contains(s));
        }
    }
}
