use crate::store::{Registry, NodeId};

/// Performs a Topological Sort using Depth-First Search (DFS).
///
/// Returns a list of NodeIds where every dependency (input or content)
/// appears before the node that depends on it.
pub fn sort(registry: &Registry) -> Result<Vec<NodeId>, String> {
    let count = registry.count();
    let mut order = Vec::with_capacity(count);
    let mut state = vec![VisitState::None; count];

    // We iterate 0..count to ensure all nodes (even disconnected ones) are visited.
    for i in 0..count {
        if state[i] == VisitState::None {
            visit(NodeId::new(i), registry, &mut state, &mut order)?;
        }
    }

    Ok(order)
}

#[derive(Clone, PartialEq, Eq)]
enum VisitState {
    None,
    Visiting, // Used for cycle detection
    Visited,
}

fn visit(
    node: NodeId,
    registry: &Registry,
    state: &mut Vec<VisitState>,
    order: &mut Vec<NodeId>,
) -> Result<(), String> {
    let idx = node.index();

    match state[idx] {
        VisitState::Visited => return Ok(()),
        VisitState::Visiting => return Err(format!("Cycle detected involving node {}", idx)),
        VisitState::None => state[idx] = VisitState::Visiting,
    }

    let deps: Vec<NodeId> = registry.dependencies(node).collect();
    for dep in deps {
        visit(dep, registry, state, order)?;
    }

    state[idx] = VisitState::Visited;
    order.push(node);
    Ok(())
}
