use crate::compute::Engine;
use crate::store::{Aggregation, NodeId, NodeKind, Registry};
use std::fmt::Write;

/// Renders `target` as an indented tree: its inputs with their tracked values,
/// then its contents, recursively.
pub fn format_trace(registry: &Registry, threshold: f64, target: NodeId) -> String {
    let mut tracer = Tracer {
        registry,
        outputs: Engine::snapshot(registry, threshold),
        output: String::new(),
    };

    if registry.contains(target) {
        let _ = writeln!(tracer.output, "TRACE for node '{}' {}:", registry.labels[target.index()], target);
        let _ = writeln!(tracer.output, "--------------------------------------------------");
        tracer.trace_node(target, 1, "");
    } else {
        let _ = writeln!(tracer.output, "Error: Invalid Node ID {}", target);
    }
    tracer.output
}

struct Tracer<'a> {
    registry: &'a Registry,
    outputs: Vec<f64>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_node(&mut self, node_id: NodeId, level: usize, prefix: &str) {
        let idx = node_id.index();
        let kind = describe_kind(&self.registry.kinds[idx]);
        let _ = writeln!(
            self.output,
            "{}[L{}] {} {} <{}> = {:.3} (rate {}, {}/{} inputs)",
            prefix,
            level,
            self.registry.labels[idx],
            node_id,
            kind,
            self.outputs[idx],
            self.registry.rates[idx],
            self.registry.inputs[idx].len(),
            self.registry.capacities[idx],
        );

        for edge in self.registry.get_inputs(node_id) {
            let src = edge.source.index();
            let _ = writeln!(
                self.output,
                "{}    <- {} {} out={:.3} tracked={:.3}",
                prefix, self.registry.labels[src], edge.source, self.outputs[src], edge.tracked
            );
        }

        let child_prefix = format!("{}    ", prefix);
        for &child in &self.registry.contents[idx] {
            self.trace_node(child, level + 1, &child_prefix);
        }
    }
}

fn describe_kind(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Source(v) => format!("source {:.3}", v),
        NodeKind::Relay => "relay".to_string(),
        NodeKind::Gate(rule) => format!("gate {}", rule.name()),
        NodeKind::Container(Aggregation::Sink(id)) => format!("container sink {}", id),
        NodeKind::Container(agg) => format!("container {:?}", agg).to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GateRule;

    #[test]
    fn test_trace_lists_inputs_and_contents() {
        let mut reg = Registry::new();
        let a = reg.add_node(NodeKind::Source(1.0), 1.0, 0).unwrap();
        let g = reg.add_node(NodeKind::Gate(GateRule::Xor), 1.0, 2).unwrap();
        reg.register_input(g, a).unwrap();
        let k = reg.add_node(NodeKind::Container(Aggregation::Sink(g)), 1.0, 2).unwrap();
        reg.adopt(k, g).unwrap();

        let text = format_trace(&reg, 0.5, k);
        assert!(text.starts_with("TRACE for node 'Container' #2:"));
        assert!(text.contains("[L1] Container #2 <container sink #1>"));
        assert!(text.contains("    [L2] Gate #1 <gate XOR> = 0.000"));
        assert!(text.contains("<- Source #0 out=1.000 tracked=0.000"));
    }

    #[test]
    fn test_trace_invalid_node() {
        let reg = Registry::new();
        assert!(format_trace(&reg, 0.5, NodeId(7)).contains("Invalid Node ID #7"));
    }
}
