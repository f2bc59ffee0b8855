//! JSON persistence for a circuit.
//!
//! A snapshot round-trips node kinds, labels, rates, capacities, the input
//! wiring with its tracked values, container membership and the config.
//! Loading re-checks every structural invariant before handing the circuit out.

use super::circuit::Circuit;
use crate::analysis::topology;
use crate::config::CircuitConfig;
use crate::store::{Aggregation, NodeId, NodeKind, Registry};
use log::warn;
use serde::{Serialize, Deserialize};
use std::collections::HashSet;
use thiserror::Error;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Malformed snapshot: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Unsupported snapshot version {0}")]
    Version(u32),
    #[error("Inconsistent snapshot: {0}")]
    Structure(String),
    #[error("Snapshot contains a cycle: {0}")]
    Cycle(String),
}

#[derive(Serialize, Deserialize)]
struct CircuitSnapshot {
    version: u32,
    config: CircuitConfig,
    registry: Registry,
}

impl Circuit {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        let snapshot = CircuitSnapshot {
            version: SNAPSHOT_VERSION,
            config: self.config.clone(),
            registry: self.store.clone(),
        };
        Ok(serde_json::to_string(&snapshot)?)
    }

    pub fn from_json(s: &str) -> Result<Self, SnapshotError> {
        let snapshot: CircuitSnapshot = serde_json::from_str(s)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::Version(snapshot.version));
        }
        snapshot
            .config
            .validate()
            .map_err(|e| SnapshotError::Structure(e.to_string()))?;

        let mut registry = snapshot.registry;
        if let Err(e) = check_structure(&registry) {
            warn!("rejecting snapshot: {}", e);
            return Err(e);
        }
        topology::sort(&registry).map_err(|cycle| {
            warn!("rejecting snapshot: {}", cycle);
            SnapshotError::Cycle(cycle)
        })?;
        registry.rebuild_topology();

        Ok(Self { store: registry, config: snapshot.config })
    }
}

fn check_structure(reg: &Registry) -> Result<(), SnapshotError> {
    let count = reg.count();
    let bad = |msg: String| Err(SnapshotError::Structure(msg));

    let columns = [reg.labels.len(), reg.rates.len(), reg.capacities.len(), reg.inputs.len(), reg.contents.len(), reg.owner.len()];
    if columns.iter().any(|&len| len != count) {
        return bad(format!("column lengths {:?} do not match {} nodes", columns, count));
    }
    let valid = |id: NodeId| id.index() < count;

    for i in 0..count {
        let id = NodeId::new(i);
        let rate = reg.rates[i];
        if !rate.is_finite() || rate < 0.0 {
            return bad(format!("node {} has invalid rate {}", id, rate));
        }

        if let Some(fixed) = reg.kinds[i].fixed_capacity() {
            if reg.capacity(id) != fixed {
                return bad(format!("node {} declares capacity {}, its kind allows {}", id, reg.capacity(id), fixed));
            }
        }
        let inputs = reg.get_inputs(id);
        if inputs.len() > reg.capacity(id) {
            return bad(format!("node {} exceeds its capacity", id));
        }
        let mut seen = HashSet::new();
        for edge in inputs {
            if !valid(edge.source) || edge.source == id || !seen.insert(edge.source) {
                return bad(format!("node {} has an invalid input {}", id, edge.source));
            }
        }

        let contents = &reg.contents[i];
        if !contents.is_empty() && !reg.kinds[i].is_container() {
            return bad(format!("node {} holds contents but is not a container", id));
        }
        let mut members = HashSet::new();
        for &child in contents {
            if !members.insert(child) {
                return bad(format!("container {} lists {} twice", id, child));
            }
            if !valid(child) || reg.owner[child.index()] != Some(id) {
                return bad(format!("container {} lists {} without owning it", id, child));
            }
        }
        if let Some(owner) = reg.owner[i] {
            if !valid(owner) || !reg.contents[owner.index()].contains(&id) {
                return bad(format!("node {} claims owner {} that does not list it", id, owner));
            }
        }
        if let NodeKind::Container(Aggregation::Sink(sink)) = reg.kinds[i] {
            if !contents.contains(&sink) {
                return bad(format!("container {} sink {} is not one of its contents", id, sink));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{GateRule, InputEdge, TrackPolicy};

    fn sample() -> (Circuit, NodeId, NodeId) {
        let cfg = CircuitConfig { track_policy: TrackPolicy::Wrap, ..Default::default() };
        let mut c = Circuit::with_config(cfg).unwrap();
        let a = c.add_source(1.0).unwrap();
        let b = c.add_source(0.0).unwrap();
        let g = c.add_gate(GateRule::Xor, Some(a), Some(2.0)).unwrap();
        c.register_input(g, b).unwrap();
        let k = c.add_container(Aggregation::Sink(g), Some(2), None).unwrap();
        c.register_input(k, a).unwrap();
        c.set_label(k, "half adder").unwrap();
        c.step(0.2).unwrap();
        (c, g, k)
    }

    #[test]
    fn test_json_preserves_state() {
        let (c, g, k) = sample();
        let restored = Circuit::from_json(&c.to_json().unwrap()).unwrap();

        assert_eq!(restored.config(), c.config());
        assert_eq!(restored.outputs(), c.outputs());
        assert_eq!(restored.inputs(g), c.inputs(g));
        assert_eq!(restored.contents(k), &[g]);
        assert_eq!(restored.owner(g), Some(k));
        assert_eq!(restored.label(k), "half adder");
        assert_eq!(restored.propagation_rate(g), 2.0);
        assert_eq!(restored.max_inputs(k), 2);
    }

    #[test]
    fn test_restored_circuit_keeps_rejecting_cycles() {
        let (c, g, k) = sample();
        let mut restored = Circuit::from_json(&c.to_json().unwrap()).unwrap();
        let r = restored.add_relay(Some(k), None).unwrap();

        // g -> k -> r; feeding r back into g must fail after the reload too.
        assert!(!restored.try_register_input(g, r));
    }

    #[test]
    fn test_rejects_tampered_cycle() {
        let (mut c, g, k) = sample();
        // k owns g, so an input edge from k into g is a loop.
        c.store.inputs[g.index()][1] = InputEdge::new(k);

        let err = Circuit::from_json(&c.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, SnapshotError::Cycle(_)), "{}", err);
    }

    #[test]
    fn test_rejects_broken_ownership() {
        let (mut c, g, _) = sample();
        c.store.owner[g.index()] = None;

        let err = Circuit::from_json(&c.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, SnapshotError::Structure(_)), "{}", err);
    }

    #[test]
    fn test_rejects_capacity_not_matching_kind() {
        let (mut c, g, _) = sample();
        c.store.capacities[g.index()] = 9;
        let err = Circuit::from_json(&c.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, SnapshotError::Structure(_)), "{}", err);

        // A source carrying an input behind an inflated capacity.
        let (mut c, _, _) = sample();
        let s = NodeId(0);
        let r = c.add_relay(None, None).unwrap();
        c.store.capacities[s.index()] = 2;
        c.store.inputs[s.index()].push(InputEdge::new(r));
        let err = Circuit::from_json(&c.to_json().unwrap()).unwrap_err();
        assert!(err.to_string().contains("its kind allows 0"), "{}", err);
    }

    #[test]
    fn test_rejects_duplicate_contents() {
        let (mut c, g, k) = sample();
        c.store.contents[k.index()].push(g);

        let err = Circuit::from_json(&c.to_json().unwrap()).unwrap_err();
        assert!(err.to_string().contains("twice"), "{}", err);
    }

    #[test]
    fn test_rejects_unknown_version_and_garbage() {
        let (c, _, _) = sample();
        let json = c.to_json().unwrap().replacen("\"version\":1", "\"version\":9", 1);
        assert!(matches!(Circuit::from_json(&json), Err(SnapshotError::Version(9))));
        assert!(matches!(Circuit::from_json("not json"), Err(SnapshotError::Parse(_))));
    }
}
