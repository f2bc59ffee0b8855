//! circuit.rs
//! Wraps the low-level Registry with the public node-graph contract.

use crate::analysis::{topology, ConvergenceReport};
use crate::compute::{Engine, SimulationError, TickReport};
use crate::config::{CircuitConfig, ConfigError};
use crate::display::{dot, trace};
use crate::store::{Aggregation, GateRule, InputEdge, NodeId, NodeKind, Registry, RegistrationError};
use log::debug;

#[derive(Debug, Clone, Default)]
pub struct Circuit {
    pub(crate) store: Registry,
    pub(crate) config: CircuitConfig,
}

impl Circuit {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(config: CircuitConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { store: Registry::new(), config })
    }

    pub fn config(&self) -> &CircuitConfig { &self.config }

    pub fn node_count(&self) -> usize { self.store.count() }

    fn check(&self, id: NodeId) -> Result<(), RegistrationError> {
        if self.store.contains(id) { Ok(()) } else { Err(RegistrationError::UnknownNode(id)) }
    }

    fn rate_or_default(&self, rate: Option<f64>) -> f64 {
        rate.unwrap_or(self.config.default_propagation_rate)
    }

    // --- Construction ---

    pub fn add_source(&mut self, value: f64) -> Result<NodeId, RegistrationError> {
        self.store.add_node(NodeKind::Source(value), self.config.default_propagation_rate, 0)
    }

    pub fn add_relay(&mut self, input: Option<NodeId>, rate: Option<f64>) -> Result<NodeId, RegistrationError> {
        self.add_wired(NodeKind::Relay, 1, input, rate)
    }

    pub fn add_gate(
        &mut self,
        rule: GateRule,
        input: Option<NodeId>,
        rate: Option<f64>,
    ) -> Result<NodeId, RegistrationError> {
        self.add_wired(NodeKind::Gate(rule), 2, input, rate)
    }

    /// Creates a container. A `Sink` aggregation adopts its sink immediately,
    /// so the sink must exist and be unowned.
    pub fn add_container(
        &mut self,
        aggregation: Aggregation,
        capacity: Option<usize>,
        rate: Option<f64>,
    ) -> Result<NodeId, RegistrationError> {
        if let Aggregation::Sink(sink) = aggregation {
            self.check(sink)?;
            if let Some(owner) = self.store.owner[sink.index()] {
                return Err(RegistrationError::AlreadyOwned { node: sink, owner });
            }
        }
        let capacity = capacity.unwrap_or(self.config.default_container_capacity);
        let rate = self.rate_or_default(rate);
        let id = self.store.add_node(NodeKind::Container(aggregation), rate, capacity)?;
        if let Aggregation::Sink(sink) = aggregation {
            self.store.adopt(id, sink)?;
        }
        Ok(id)
    }

    /// Every check runs before the node is pushed, so a failure leaves no
    /// half-wired node behind.
    fn add_wired(
        &mut self,
        kind: NodeKind,
        capacity: usize,
        input: Option<NodeId>,
        rate: Option<f64>,
    ) -> Result<NodeId, RegistrationError> {
        if let Some(input) = input {
            self.check(input)?;
        }
        let rate = self.rate_or_default(rate);
        let id = self.store.add_node(kind, rate, capacity)?;
        if let Some(input) = input {
            self.store.register_input(id, input)?;
        }
        Ok(id)
    }

    pub fn set_label(&mut self, id: NodeId, label: impl Into<String>) -> Result<(), RegistrationError> {
        self.check(id)?;
        self.store.labels[id.index()] = label.into();
        Ok(())
    }

    pub fn set_source_value(&mut self, id: NodeId, value: f64) -> Result<(), RegistrationError> {
        self.check(id)?;
        match &mut self.store.kinds[id.index()] {
            NodeKind::Source(_) if !value.is_finite() => Err(RegistrationError::InvalidSourceValue(value)),
            NodeKind::Source(v) => {
                *v = value;
                Ok(())
            }
            _ => Err(RegistrationError::NotASource(id)),
        }
    }

    // --- Wiring ---

    pub fn register_input(&mut self, node: NodeId, input: NodeId) -> Result<(), RegistrationError> {
        self.store.register_input(node, input)
    }

    /// Boolean form of [`Circuit::register_input`]. Failures are not errors for
    /// the caller; the reason is only logged.
    pub fn try_register_input(&mut self, node: NodeId, input: NodeId) -> bool {
        match self.store.register_input(node, input) {
            Ok(()) => true,
            Err(e) => {
                debug!("registration rejected: {}", e);
                false
            }
        }
    }

    pub fn add_to_container(&mut self, container: NodeId, child: NodeId) -> Result<(), RegistrationError> {
        self.store.adopt(container, child)
    }

    // --- Simulation ---

    pub fn tick(&mut self, id: NodeId, dt: f64) -> Result<TickReport, SimulationError> {
        Engine::tick(&mut self.store, &self.config, id, dt)
    }

    pub fn step(&mut self, dt: f64) -> Result<TickReport, SimulationError> {
        Engine::step(&mut self.store, &self.config, dt)
    }

    pub fn step_parallel(&mut self, dt: f64) -> Result<TickReport, SimulationError> {
        Engine::step_parallel(&mut self.store, &self.config, dt)
    }

    // --- Accessors ---
    // Getters index the arena directly and panic on foreign handles, like slice indexing.

    pub fn output(&self, id: NodeId) -> f64 { Engine::output(&self.store, id, self.config.logic_threshold) }
    pub fn outputs(&self) -> Vec<f64> { Engine::snapshot(&self.store, self.config.logic_threshold) }
    pub fn label(&self, id: NodeId) -> &str { &self.store.labels[id.index()] }
    pub fn kind(&self, id: NodeId) -> &NodeKind { &self.store.kinds[id.index()] }
    pub fn propagation_rate(&self, id: NodeId) -> f64 { self.store.rates[id.index()] }
    pub fn max_inputs(&self, id: NodeId) -> usize { self.store.capacity(id) }
    pub fn inputs(&self, id: NodeId) -> &[InputEdge] { self.store.get_inputs(id) }
    pub fn contents(&self, id: NodeId) -> &[NodeId] { &self.store.contents[id.index()] }
    pub fn owner(&self, id: NodeId) -> Option<NodeId> { self.store.owner[id.index()] }
    pub fn contains(&self, id: NodeId) -> bool { self.store.contains(id) }

    pub fn tracked_value(&self, node: NodeId, input: NodeId) -> Option<f64> {
        self.inputs(node).iter().find(|e| e.source == input).map(|e| e.tracked)
    }

    pub fn roots(&self) -> Vec<NodeId> { self.store.roots().collect() }

    // --- Analysis & Display ---

    pub fn evaluation_order(&self) -> Result<Vec<NodeId>, String> { topology::sort(&self.store) }

    pub fn convergence(&self) -> ConvergenceReport {
        ConvergenceReport::analyze(&self.store, self.config.logic_threshold)
    }

    pub fn trace(&self, id: NodeId) -> String {
        trace::format_trace(&self.store, self.config.logic_threshold, id)
    }

    pub fn to_dot(&self) -> String { dot::to_dot(&self.store, self.config.logic_threshold) }
}
