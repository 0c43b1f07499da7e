use anyhow::Result;
use aurpack_core::{AurError, PackageNode};

use crate::graph::DependencyGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Orders every node after all of its dependencies.
///
/// Depth-first postorder, starting from nodes in discovery order and visiting
/// children in declared order, so the same graph always yields the same order.
pub fn topo_order(graph: &DependencyGraph) -> Result<Vec<&PackageNode>> {
    Ok(topo_order_indices(graph)?
        .into_iter()
        .map(|position| &graph.nodes()[position])
        .collect())
}

pub(crate) fn topo_order_indices(graph: &DependencyGraph) -> Result<Vec<usize>> {
    let mut marks = vec![Mark::Unvisited; graph.len()];
    let mut ordered = Vec::with_capacity(graph.len());

    for start in 0..graph.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }

        marks[start] = Mark::InProgress;
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        while let Some(frame) = stack.last_mut() {
            let (position, next_child) = *frame;
            let edges = graph.edges_of(position);
            if next_child == edges.len() {
                marks[position] = Mark::Done;
                ordered.push(position);
                stack.pop();
                continue;
            }

            frame.1 += 1;
            let child = edges[next_child];
            match marks[child] {
                Mark::Unvisited => {
                    marks[child] = Mark::InProgress;
                    stack.push((child, 0));
                }
                Mark::InProgress => {
                    let cycle_start = stack
                        .iter()
                        .position(|(on_stack, _)| *on_stack == child)
                        .unwrap_or(0);
                    let mut cycle = stack[cycle_start..]
                        .iter()
                        .map(|(on_stack, _)| graph.nodes()[*on_stack].name.clone())
                        .collect::<Vec<_>>();
                    cycle.push(graph.nodes()[child].name.clone());
                    return Err(AurError::CycleDetected { cycle }.into());
                }
                Mark::Done => {}
            }
        }
    }

    Ok(ordered)
}
