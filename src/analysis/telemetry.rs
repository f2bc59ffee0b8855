//! Convergence statistics: how far tracked values still are from their targets.
use crate::compute::Engine;
use crate::store::Registry;

/// Gaps below this are reported as settled.
pub const SETTLE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvergenceReport {
    pub total_edges: usize,
    /// Edges whose tracked value sits on its target.
    pub settled_edges: usize,
    /// Largest |target - tracked| over all edges.
    pub max_gap: f64,
    /// Sum of |target - tracked| over all edges.
    pub total_gap: f64,
}

impl ConvergenceReport {
    pub fn analyze(registry: &Registry, threshold: f64) -> Self {
        let outputs = Engine::snapshot(registry, threshold);
        let mut report = Self::default();

        for inputs in &registry.inputs {
            for edge in inputs {
                let gap = (outputs[edge.source.index()] - edge.tracked).abs();
                report.total_edges += 1;
                report.total_gap += gap;
                report.max_gap = report.max_gap.max(gap);
                if gap < SETTLE_EPSILON {
                    report.settled_edges += 1;
                }
            }
        }
        report
    }

    pub fn is_settled(&self) -> bool {
        self.settled_edges == self.total_edges
    }
}
