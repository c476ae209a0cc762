//! Data-flow ordering of a bin's children using daggy.
//!
//! A bin changes its children's states in data-flow order: sinks before
//! sources when going up, so that downstream is ready to accept data before
//! upstream produces it, and sources before sinks when going down. Children
//! that are not connected, or that sit on a cycle, keep the order in which
//! they were added.

use crate::element::handle::ElementInner;
use crate::element::pad::PadDirection;
use daggy::petgraph::Direction;
use daggy::{Dag, NodeIndex};
use std::sync::Arc;

/// Children of `bin` in upstream-to-downstream order, or reversed when
/// `upward`.
pub(crate) fn sorted_children(
    bin: &Arc<ElementInner>,
    children: Vec<Arc<ElementInner>>,
    upward: bool,
) -> Vec<Arc<ElementInner>> {
    if children.len() < 2 {
        return children;
    }

    let mut dag: Dag<usize, ()> = Dag::with_capacity(children.len(), children.len());
    let nodes: Vec<NodeIndex> = (0..children.len()).map(|i| dag.add_node(i)).collect();

    for (upstream, child) in children.iter().enumerate() {
        for pad in child.pad_inners() {
            if pad.direction() != PadDirection::Src {
                continue;
            }
            let Some(peer) = pad.resolved().and_then(|pad| pad.peer()) else {
                continue;
            };
            let Some(element) = peer.core.parent() else {
                continue;
            };
            let Some(downstream) = direct_child_index(bin, &children, element) else {
                continue;
            };
            if downstream == upstream || dag.find_edge(nodes[upstream], nodes[downstream]).is_some() {
                continue;
            }
            if dag.add_edge(nodes[upstream], nodes[downstream], ()).is_err() {
                tracing::trace!(bin = %bin.name(), "link cycle between children, keeping insertion order");
            }
        }
    }

    // Kahn's algorithm, always taking the earliest-added ready child.
    let graph = dag.graph();
    let mut indegree: Vec<usize> = nodes
        .iter()
        .map(|&node| graph.neighbors_directed(node, Direction::Incoming).count())
        .collect();
    let mut done = vec![false; children.len()];
    let mut order = Vec::with_capacity(children.len());
    while let Some(next) = (0..children.len()).find(|&i| !done[i] && indegree[i] == 0) {
        done[next] = true;
        order.push(next);
        for node in graph.neighbors_directed(nodes[next], Direction::Outgoing) {
            indegree[graph[node]] -= 1;
        }
    }

    if upward {
        order.reverse();
    }

    let mut slots: Vec<Option<Arc<ElementInner>>> = children.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect()
}

/// Index of the child of `bin` that contains `element`.
fn direct_child_index(
    bin: &Arc<ElementInner>,
    children: &[Arc<ElementInner>],
    mut element: Arc<ElementInner>,
) -> Option<usize> {
    loop {
        if let Some(index) = children.iter().position(|child| Arc::ptr_eq(child, &element)) {
            return Some(index);
        }
        element = element.core.parent()?;
        if Arc::ptr_eq(&element, bin) {
            return None;
        }
    }
}
