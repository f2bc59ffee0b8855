use super::error::RegistrationError;
use super::types::*;
use serde::{Serialize, Deserialize};
use smallvec::SmallVec;
use std::collections::{HashSet, VecDeque};

/// Per-node input list. Relays and gates never spill to the heap.
pub type Inputs = SmallVec<[InputEdge; 2]>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    // Columnar Arrays
    pub kinds: Vec<NodeKind>,
    pub labels: Vec<String>,
    pub rates: Vec<f64>,
    pub capacities: Vec<usize>,

    // Topology: upstream edges carry the tracked state
    pub inputs: Vec<Inputs>,

    // Ownership (forest)
    pub contents: Vec<Vec<NodeId>>,
    pub owner: Vec<Option<NodeId>>,

    // Downstream traversal helpers (Not serialized, rebuilt on load)
    #[serde(skip)]
    pub first_child: Vec<u32>,
    #[serde(skip)]
    pub child_targets: Vec<NodeId>,
    #[serde(skip)]
    pub next_child: Vec<u32>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }
    pub fn count(&self) -> usize { self.kinds.len() }

    pub fn contains(&self, id: NodeId) -> bool { id.index() < self.count() }

    fn check(&self, id: NodeId) -> Result<(), RegistrationError> {
        if self.contains(id) { Ok(()) } else { Err(RegistrationError::UnknownNode(id)) }
    }

    pub fn add_node(
        &mut self,
        kind: NodeKind,
        rate: f64,
        capacity: usize,
    ) -> Result<NodeId, RegistrationError> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(RegistrationError::InvalidPropagationRate(rate));
        }
        if let NodeKind::Source(value) = &kind {
            if !value.is_finite() {
                return Err(RegistrationError::InvalidSourceValue(*value));
            }
        }
        let id = NodeId(self.kinds.len() as u32);

        self.labels.push(kind.default_label().to_string());
        self.kinds.push(kind);
        self.rates.push(rate);
        self.capacities.push(capacity);
        self.inputs.push(Inputs::new());
        self.contents.push(Vec::new());
        self.owner.push(None);
        self.first_child.push(u32::MAX);

        Ok(id)
    }

    #[inline(always)]
    pub fn get_inputs(&self, id: NodeId) -> &[InputEdge] {
        &self.inputs[id.index()]
    }

    #[inline(always)]
    pub fn capacity(&self, id: NodeId) -> usize {
        self.capacities[id.index()]
    }

    /// Wires `input` into `node` with a tracked value of zero.
    ///
    /// Rejected without mutation when `node` is full, when `input` is already
    /// wired or is `node` itself, or when the new edge would close a cycle.
    pub fn register_input(&mut self, node: NodeId, input: NodeId) -> Result<(), RegistrationError> {
        self.check(node)?;
        self.check(input)?;

        if node == input {
            return Err(RegistrationError::SelfReference(node));
        }
        if self.get_inputs(node).iter().any(|e| e.source == input) {
            return Err(RegistrationError::AlreadyRegistered { node, input });
        }
        let capacity = self.capacity(node);
        if self.get_inputs(node).len() >= capacity {
            return Err(RegistrationError::CapacityExceeded { node, capacity });
        }
        // The edge input -> node closes a loop iff node already feeds input.
        if self.reaches(node, input) {
            return Err(RegistrationError::CycleDetected { from: input, to: node });
        }

        self.inputs[node.index()].push(InputEdge::new(input));
        self.link_child(input, node);
        Ok(())
    }

    /// Moves `child` into the exclusive ownership of `container`.
    pub fn adopt(&mut self, container: NodeId, child: NodeId) -> Result<(), RegistrationError> {
        self.check(container)?;
        self.check(child)?;

        if !self.kinds[container.index()].is_container() {
            return Err(RegistrationError::NotAContainer(container));
        }
        if container == child {
            return Err(RegistrationError::SelfReference(container));
        }
        if let Some(owner) = self.owner[child.index()] {
            return Err(RegistrationError::AlreadyOwned { node: child, owner });
        }
        // A container depends on its contents, so this adds child -> container.
        if self.reaches(container, child) {
            return Err(RegistrationError::CycleDetected { from: child, to: container });
        }

        self.contents[container.index()].push(child);
        self.owner[child.index()] = Some(container);
        Ok(())
    }

    fn link_child(&mut self, parent: NodeId, child: NodeId) {
        let p_idx = parent.index();
        let head = self.first_child[p_idx];
        let new_edge = self.child_targets.len() as u32;
        self.child_targets.push(child);
        self.next_child.push(head);
        self.first_child[p_idx] = new_edge;
    }

    /// Nodes whose state depends directly on `id`: its consumers plus its owner.
    pub fn dependents(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut edge_idx = self.first_child[id.index()];
        while edge_idx != u32::MAX {
            out.push(self.child_targets[edge_idx as usize]);
            edge_idx = self.next_child[edge_idx as usize];
        }
        if let Some(owner) = self.owner[id.index()] {
            out.push(owner);
        }
        out
    }

    /// Nodes `id` depends on directly: its inputs plus its contents.
    pub fn dependencies(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.get_inputs(id)
            .iter()
            .map(|e| e.source)
            .chain(self.contents[id.index()].iter().copied())
    }

    /// True if a dependency path leads from `from` to `to`.
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([from]);

        while let Some(node) = queue.pop_front() {
            if node == to {
                return true;
            }
            if visited.insert(node) {
                queue.extend(self.dependents(node));
            }
        }
        false
    }

    /// Contents of `container` that no sibling content consumes, in adoption order.
    pub fn terminal_contents(&self, container: NodeId) -> Vec<NodeId> {
        let members = &self.contents[container.index()];
        let set: HashSet<NodeId> = members.iter().copied().collect();
        members
            .iter()
            .copied()
            .filter(|&c| !self.dependents(c).iter().any(|d| set.contains(d)))
            .collect()
    }

    /// Rebuilds the downstream adjacency after deserialization.
    pub fn rebuild_topology(&mut self) {
        let count = self.count();
        self.first_child = vec![u32::MAX; count];
        self.child_targets.clear();
        self.next_child.clear();

        for node in 0..count {
            let sources: SmallVec<[NodeId; 4]> =
                self.inputs[node].iter().map(|e| e.source).collect();
            for source in sources {
                self.link_child(source, NodeId::new(node));
            }
        }
    }

    /// Root nodes are the ones no container owns.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.owner
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_none())
            .map(|(i, _)| NodeId::new(i))
    }
}
