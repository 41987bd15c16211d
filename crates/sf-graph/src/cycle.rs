//! Cycle detection over the port/wire network.
//!
//! The network is a directed multimap from each port to the ports it
//! feeds: every wire contributes its (from, to) pair, and every item that
//! does not break the dependency chain (anything that is not stock-like)
//! contributes an implicit edge from each of its input ports to its
//! output port, modeling "output depends on all inputs".
//!
//! A depth-first walk with an explicit path stack starts from every
//! unvisited output port. Revisiting a port that is still on the stack is a
//! cycle; revisiting one that has been popped is a benign reconvergence
//! (diamond dependency). A cyclic graph cannot be compiled into a
//! feed-forward equation vector, so the compiler refuses it.

use std::collections::{BTreeMap, BTreeSet};

use sf_core::{ItemId, PortId};

use crate::model::{Graph, PortKind};

struct Network<'g> {
    graph: &'g Graph,
    edges: BTreeMap<PortId, Vec<PortId>>,
    visited: BTreeSet<PortId>,
    stack: Vec<PortId>,
}

impl<'g> Network<'g> {
    fn build(graph: &'g Graph) -> Self {
        let mut edges: BTreeMap<PortId, Vec<PortId>> = BTreeMap::new();
        for wire in graph.wires() {
            edges.entry(wire.from).or_default().push(wire.to);
        }
        for item in graph.items() {
            if item.kind.breaks_dependency() {
                continue;
            }
            if let Some(out) = item.output_port() {
                for input in item.input_ports() {
                    edges.entry(*input).or_default().push(out);
                }
            }
        }
        Self {
            graph,
            edges,
            visited: BTreeSet::new(),
            stack: Vec::new(),
        }
    }

    /// Depth-first walk; returns the item owning the port at which a cycle
    /// closes, for highlighting by the UI collaborator.
    fn follow(&mut self, port: PortId) -> Option<ItemId> {
        if !self.visited.insert(port) {
            if self.stack.contains(&port) {
                return self.graph.port(port).map(|p| p.item);
            }
            return None;
        }
        self.stack.push(port);
        if let Some(targets) = self.edges.get(&port).cloned() {
            for t in targets {
                if let Some(item) = self.follow(t) {
                    return Some(item);
                }
            }
        }
        self.stack.pop();
        None
    }
}

/// Find a dependency loop, returning the item where it was detected.
pub fn find_cycle(graph: &Graph) -> Option<ItemId> {
    let mut net = Network::build(graph);
    let roots: Vec<PortId> = net.edges.keys().copied().collect();
    for port in roots {
        let is_output = graph.port(port).is_some_and(|p| p.kind == PortKind::Output);
        if is_output && !net.visited.contains(&port)
            && let Some(item) = net.follow(port)
        {
            return Some(item);
        }
    }
    None
}

pub fn has_cycle(graph: &Graph) -> bool {
    find_cycle(graph).is_some()
}
