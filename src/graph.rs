//! Expression-input dependency checking.
//!
//! Expression stats pull their inputs recursively during recomputation,
//! so the input relation must stay acyclic. The wiring graph is small and
//! changes rarely; it is rebuilt from scratch on every bind attempt.

use crate::error::StatError;
use crate::stat::Stat;
use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::rc::Rc;

/// Check that binding `candidate` as an input of the stat at `owner`
/// keeps the input graph acyclic.
///
/// On failure the error carries the offending path of stat labels,
/// starting and ending at the owner.
pub(crate) fn ensure_acyclic(
    owner_label: &str,
    owner: *const Stat,
    candidate: &Rc<Stat>,
) -> Result<(), StatError> {
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut nodes: HashMap<*const Stat, NodeIndex> = HashMap::new();

    let owner_node = graph.add_node(owner_label.to_string());
    nodes.insert(owner, owner_node);

    // walk the candidate's transitive inputs, adding edges as found
    let mut pending: Vec<Rc<Stat>> = vec![candidate.clone()];
    while let Some(stat) = pending.pop() {
        let from = node_for(&mut graph, &mut nodes, &stat);
        for input in stat.input_stats() {
            let seen = nodes.contains_key(&(Rc::as_ptr(&input)));
            let to = node_for(&mut graph, &mut nodes, &input);
            graph.update_edge(from, to, ());
            if !seen {
                pending.push(input);
            }
        }
    }

    let candidate_node = nodes[&Rc::as_ptr(candidate)];
    if let Some((_, path)) = astar(
        &graph,
        candidate_node,
        |node| node == owner_node,
        |_| 1,
        |_| 0,
    ) {
        let mut labels = vec![owner_label.to_string()];
        labels.extend(path.into_iter().map(|node| graph[node].clone()));
        return Err(StatError::Cycle { path: labels });
    }

    Ok(())
}

fn node_for(
    graph: &mut DiGraph<String, ()>,
    nodes: &mut HashMap<*const Stat, NodeIndex>,
    stat: &Rc<Stat>,
) -> NodeIndex {
    *nodes
        .entry(Rc::as_ptr(stat))
        .or_insert_with(|| graph.add_node(stat.label().to_string()))
}
