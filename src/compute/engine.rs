//! The tick engine: output evaluation and tracked-value propagation.
//!
//! Every pass first captures a snapshot of all outputs and then advances
//! tracked values against that snapshot only. Visiting order therefore never
//! changes the result, which is what lets `step_parallel` match `step` exactly.
use super::error::SimulationError;
use super::rules;
use crate::config::CircuitConfig;
use crate::store::{Aggregation, NodeId, NodeKind, Registry, TrackPolicy};
use log::debug;
use rayon::prelude::*;

/// Outcome of one tick pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Tracked-value updates performed, one per ticked node.
    pub updated_nodes: usize,
    pub dt: f64,
}

pub struct Engine;

impl Engine {
    /// Current output of a single node.
    pub fn output(registry: &Registry, id: NodeId, threshold: f64) -> f64 {
        let mut memo = vec![None; registry.count()];
        Self::eval(registry, id, threshold, &mut memo)
    }

    /// Outputs of every node, indexed by `NodeId`.
    pub fn snapshot(registry: &Registry, threshold: f64) -> Vec<f64> {
        let count = registry.count();
        let mut memo = vec![None; count];
        (0..count)
            .map(|i| Self::eval(registry, NodeId::new(i), threshold, &mut memo))
            .collect()
    }

    fn eval(registry: &Registry, id: NodeId, threshold: f64, memo: &mut [Option<f64>]) -> f64 {
        if let Some(v) = memo[id.index()] {
            return v;
        }
        let inputs = registry.get_inputs(id);
        let value = match &registry.kinds[id.index()] {
            NodeKind::Source(v) => *v,
            NodeKind::Relay => inputs.first().map_or(0.0, |e| e.tracked),
            NodeKind::Gate(rule) => {
                let tracked: smallvec::SmallVec<[f64; 2]> = inputs.iter().map(|e| e.tracked).collect();
                rules::combine(*rule, &tracked, threshold)
            }
            // Containment is a forest, so this recursion terminates.
            NodeKind::Container(Aggregation::Sink(sink)) => Self::eval(registry, *sink, threshold, memo),
            NodeKind::Container(aggregation) => {
                let outputs: Vec<f64> = registry
                    .terminal_contents(id)
                    .into_iter()
                    .map(|c| Self::eval(registry, c, threshold, memo))
                    .collect();
                rules::reduce(*aggregation, &outputs)
            }
        };
        memo[id.index()] = Some(value);
        value
    }

    fn validate_dt(dt: f64) -> Result<(), SimulationError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(SimulationError::InvalidDeltaTime(dt));
        }
        Ok(())
    }

    /// Ticks `id` and, for containers, every node it contains.
    pub fn tick(
        registry: &mut Registry,
        config: &CircuitConfig,
        id: NodeId,
        dt: f64,
    ) -> Result<TickReport, SimulationError> {
        Self::validate_dt(dt)?;
        if !registry.contains(id) {
            return Err(SimulationError::UnknownNode(id));
        }

        let snapshot = Self::snapshot(registry, config.logic_threshold);
        let updated_nodes = Self::tick_subtree(registry, &snapshot, id, dt, config.track_policy);
        debug!("tick {} dt={} updated {} node(s)", id, dt, updated_nodes);

        Ok(TickReport { updated_nodes, dt })
    }

    /// Ticks every root node, which reaches each node exactly once.
    pub fn step(registry: &mut Registry, config: &CircuitConfig, dt: f64) -> Result<TickReport, SimulationError> {
        Self::validate_dt(dt)?;

        let snapshot = Self::snapshot(registry, config.logic_threshold);
        let roots: Vec<NodeId> = registry.roots().collect();
        let updated_nodes: usize = roots
            .into_iter()
            .map(|root| Self::tick_subtree(registry, &snapshot, root, dt, config.track_policy))
            .sum();
        debug!("step dt={} updated {} node(s)", dt, updated_nodes);

        Ok(TickReport { updated_nodes, dt })
    }

    /// Same result as [`Engine::step`], with nodes advanced in parallel.
    pub fn step_parallel(
        registry: &mut Registry,
        config: &CircuitConfig,
        dt: f64,
    ) -> Result<TickReport, SimulationError> {
        Self::validate_dt(dt)?;

        let snapshot = Self::snapshot(registry, config.logic_threshold);
        let policy = config.track_policy;
        let rates = &registry.rates;
        registry.inputs.par_iter_mut().enumerate().for_each(|(i, inputs)| {
            let rate = rates[i];
            for edge in inputs.iter_mut() {
                edge.tracked = rules::step_toward(edge.tracked, snapshot[edge.source.index()], rate, dt, policy);
            }
        });
        let updated_nodes = registry.count();
        debug!("parallel step dt={} updated {} node(s)", dt, updated_nodes);

        Ok(TickReport { updated_nodes, dt })
    }

    fn tick_subtree(registry: &mut Registry, snapshot: &[f64], id: NodeId, dt: f64, policy: TrackPolicy) -> usize {
        Self::advance_inputs(registry, snapshot, id, dt, policy);

        let mut updated = 1;
        for k in 0..registry.contents[id.index()].len() {
            let child = registry.contents[id.index()][k];
            updated += Self::tick_subtree(registry, snapshot, child, dt, policy);
        }
        updated
    }

    fn advance_inputs(registry: &mut Registry, snapshot: &[f64], id: NodeId, dt: f64, policy: TrackPolicy) {
        let idx = id.index();
        let rate = registry.rates[idx];
        for edge in registry.inputs[idx].iter_mut() {
            edge.tracked = rules::step_toward(edge.tracked, snapshot[edge.source.index()], rate, dt, policy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GateRule;

    fn cfg() -> CircuitConfig { CircuitConfig::default() }

    fn source(reg: &mut Registry, v: f64) -> NodeId {
        reg.add_node(NodeKind::Source(v), 0.0, 0).unwrap()
    }

    fn relay_from(reg: &mut Registry, input: NodeId) -> NodeId {
        let r = reg.add_node(NodeKind::Relay, 1.0, 1).unwrap();
        reg.register_input(r, input).unwrap();
        r
    }

    #[test]
    fn test_relay_tracks_source() {
        let mut reg = Registry::new();
        let a = source(&mut reg, 1.0);
        let r = relay_from(&mut reg, a);

        Engine::tick(&mut reg, &cfg(), r, 0.5).unwrap();
        assert_eq!(Engine::output(&reg, r, 0.5), 0.5);
    }

    #[test]
    fn test_negative_and_nan_dt_rejected() {
        let mut reg = Registry::new();
        let a = source(&mut reg, 1.0);
        let r = relay_from(&mut reg, a);

        assert_eq!(Engine::tick(&mut reg, &cfg(), r, -0.1), Err(SimulationError::InvalidDeltaTime(-0.1)));
        assert!(Engine::step(&mut reg, &cfg(), f64::NAN).is_err());
        assert!(Engine::step_parallel(&mut reg, &cfg(), f64::INFINITY).is_err());
        assert_eq!(reg.get_inputs(r)[0].tracked, 0.0);
    }

    #[test]
    fn test_unknown_node() {
        let mut reg = Registry::new();
        assert_eq!(
            Engine::tick(&mut reg, &cfg(), NodeId(3), 0.1),
            Err(SimulationError::UnknownNode(NodeId(3)))
        );
    }

    #[test]
    fn test_snapshot_makes_chain_order_independent() {
        // a -> r1 -> r2: within one pass r2 must see r1's pre-tick output (0).
        let mut reg = Registry::new();
        let a = source(&mut reg, 1.0);
        let r1 = relay_from(&mut reg, a);
        let r2 = relay_from(&mut reg, r1);

        Engine::step(&mut reg, &cfg(), 0.5).unwrap();
        assert_eq!(reg.get_inputs(r1)[0].tracked, 0.5);
        assert_eq!(reg.get_inputs(r2)[0].tracked, 0.0);

        Engine::step(&mut reg, &cfg(), 0.5).unwrap();
        assert_eq!(reg.get_inputs(r1)[0].tracked, 1.0);
        assert_eq!(reg.get_inputs(r2)[0].tracked, 0.5);
    }

    #[test]
    fn test_gate_output_from_tracked_values() {
        let mut reg = Registry::new();
        let hi = source(&mut reg, 1.0);
        let lo = source(&mut reg, 0.0);
        let g = reg.add_node(NodeKind::Gate(GateRule::And), 1.0, 2).unwrap();
        reg.register_input(g, hi).unwrap();
        reg.register_input(g, lo).unwrap();

        Engine::step(&mut reg, &cfg(), 1.0).unwrap();
        assert_eq!(Engine::output(&reg, g, 0.5), 0.0);

        if let NodeKind::Source(v) = &mut reg.kinds[lo.index()] { *v = 1.0; }
        // Output only moves once the tracked value does.
        assert_eq!(Engine::output(&reg, g, 0.5), 0.0);
        Engine::step(&mut reg, &cfg(), 1.0).unwrap();
        assert_eq!(Engine::output(&reg, g, 0.5), 1.0);
    }

    #[test]
    fn test_container_sink_and_mean() {
        let mut reg = Registry::new();
        let a = source(&mut reg, 1.0);
        let inner = relay_from(&mut reg, a);
        let k = reg.add_node(NodeKind::Container(Aggregation::Sink(inner)), 1.0, 2).unwrap();
        reg.adopt(k, inner).unwrap();

        Engine::tick(&mut reg, &cfg(), k, 0.25).unwrap();
        assert_eq!(Engine::output(&reg, k, 0.5), 0.25);

        // r_mid feeds r_end inside m, so only r_end is terminal.
        let m = reg.add_node(NodeKind::Container(Aggregation::Mean), 1.0, 2).unwrap();
        let r_mid = relay_from(&mut reg, a);
        let r_end = relay_from(&mut reg, r_mid);
        let r_side = reg.add_node(NodeKind::Relay, 1.0, 1).unwrap();
        for c in [r_mid, r_end, r_side] {
            reg.adopt(m, c).unwrap();
        }
        assert_eq!(reg.terminal_contents(m), vec![r_end, r_side]);

        Engine::tick(&mut reg, &cfg(), m, 1.0).unwrap();
        Engine::tick(&mut reg, &cfg(), m, 1.0).unwrap();
        // r_end reached 1.0, r_side has no input and stays 0.
        assert_eq!(Engine::output(&reg, m, 0.5), 0.5);
    }

    #[test]
    fn test_nested_container_tick_counts() {
        let mut reg = Registry::new();
        let outer = reg.add_node(NodeKind::Container(Aggregation::Max), 1.0, 1).unwrap();
        let inner = reg.add_node(NodeKind::Container(Aggregation::Max), 1.0, 1).unwrap();
        let leaves: Vec<NodeId> = (0..3).map(|_| reg.add_node(NodeKind::Relay, 1.0, 1).unwrap()).collect();
        reg.adopt(outer, inner).unwrap();
        reg.adopt(outer, leaves[0]).unwrap();
        reg.adopt(inner, leaves[1]).unwrap();
        reg.adopt(inner, leaves[2]).unwrap();

        let report = Engine::tick(&mut reg, &cfg(), inner, 0.1).unwrap();
        assert_eq!(report.updated_nodes, 3);
        let report = Engine::tick(&mut reg, &cfg(), outer, 0.1).unwrap();
        assert_eq!(report.updated_nodes, 5);
        let report = Engine::step(&mut reg, &cfg(), 0.1).unwrap();
        assert_eq!(report.updated_nodes, reg.count());
    }

    #[test]
    fn test_parallel_step_matches_sequential() {
        let mut reg = Registry::new();
        let a = source(&mut reg, 1.0);
        let b = source(&mut reg, 0.3);
        let r1 = relay_from(&mut reg, a);
        let r2 = relay_from(&mut reg, r1);
        let g = reg.add_node(NodeKind::Gate(GateRule::Mean), 0.7, 2).unwrap();
        reg.register_input(g, r2).unwrap();
        reg.register_input(g, b).unwrap();
        let k = reg.add_node(NodeKind::Container(Aggregation::Sink(g)), 2.0, 1).unwrap();
        reg.adopt(k, g).unwrap();
        reg.register_input(k, r1).unwrap();

        let mut par = reg.clone();
        for _ in 0..6 {
            Engine::step(&mut reg, &cfg(), 0.15).unwrap();
            Engine::step_parallel(&mut par, &cfg(), 0.15).unwrap();
        }
        assert_eq!(reg.inputs, par.inputs);
        assert_eq!(Engine::snapshot(&reg, 0.5), Engine::snapshot(&par, 0.5));
    }
}
