//! Stable topological ordering over insertion-indexed nodes.
//!
//! Nodes are identified by their insertion index `0..node_count`. An edge `(from, to)`
//! means `from` must come before `to`. Among nodes that are ready at the same time
//! the lowest index wins, so unconstrained nodes keep their insertion order and the
//! result is identical across runs for identical input.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Orders `0..node_count` consistently with `edges`.
///
/// On success returns every index exactly once. If the edges contain a cycle, returns
/// `Err` with the indices of one cycle in edge order; no partial order is produced.
/// Edges referring to indices `>= node_count` must be filtered out by the caller.
pub fn stable_order(node_count: usize, edges: &[(usize, usize)]) -> Result<Vec<usize>, Vec<usize>> {
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut in_degree = vec![0usize; node_count];

    for &(from, to) in edges {
        successors[from].push(to);
        predecessors[to].push(from);
        in_degree[to] += 1;
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(node, _)| Reverse(node))
        .collect();

    let mut order = Vec::with_capacity(node_count);

    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);

        for &next in &successors[node] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() == node_count {
        return Ok(order);
    }

    Err(find_cycle(&in_degree, &predecessors))
}

// Every unresolved node still has an unresolved predecessor, so walking backwards
// through unresolved predecessors must eventually revisit a node. The revisited
// stretch of the walk is a cycle.
fn find_cycle(in_degree: &[usize], predecessors: &[Vec<usize>]) -> Vec<usize> {
    let unresolved = |node: usize| in_degree[node] > 0;

    let Some(start) = (0..in_degree.len()).find(|&node| unresolved(node)) else {
        return Vec::new();
    };

    let mut position = vec![None; in_degree.len()];
    let mut walk = Vec::new();
    let mut current = start;

    loop {
        if let Some(first) = position[current] {
            let mut cycle: Vec<usize> = walk[first..].to_vec();
            // The walk followed edges backwards.
            cycle.reverse();
            return cycle;
        }

        position[current] = Some(walk.len());
        walk.push(current);

        match predecessors[current]
            .iter()
            .copied()
            .find(|&prev| unresolved(prev))
        {
            Some(prev) => current = prev,
            None => return walk,
        }
    }
}
