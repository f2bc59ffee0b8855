//! Graphviz export of the dependency graph.
use crate::compute::Engine;
use crate::store::{NodeId, Registry};
use petgraph::dot::Dot;
use petgraph::graph::DiGraph;

/// Builds a petgraph view: input edges are labelled with their tracked value,
/// containment edges (content -> container) with `owns`.
pub fn dependency_graph(registry: &Registry, threshold: f64) -> DiGraph<String, String> {
    let outputs = Engine::snapshot(registry, threshold);
    let mut graph = DiGraph::with_capacity(registry.count(), registry.child_targets.len());

    let handles: Vec<_> = (0..registry.count())
        .map(|i| graph.add_node(format!("{} {}\n{:.3}", registry.labels[i], NodeId::new(i), outputs[i])))
        .collect();

    for (consumer, inputs) in registry.inputs.iter().enumerate() {
        for edge in inputs {
            graph.add_edge(handles[edge.source.index()], handles[consumer], format!("{:.3}", edge.tracked));
        }
    }
    for (child, owner) in registry.owner.iter().enumerate() {
        if let Some(owner) = owner {
            graph.add_edge(handles[child], handles[owner.index()], "owns".to_string());
        }
    }
    graph
}

pub fn to_dot(registry: &Registry, threshold: f64) -> String {
    let graph = dependency_graph(registry, threshold);
    format!("{}", Dot::new(&graph))
}
