use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Combination rule of a two-input gate.
///
/// Logic rules digitise each tracked value against the circuit threshold and
/// emit `1.0` or `0.0`. Arithmetic rules work on the raw tracked values.
/// Missing inputs read as `0.0`; inputs are taken in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateRule {
    And,
    Or,
    Xor,
    Nand,
    Nor,
    Xnor,
    /// Negates the first input. The second slot is ignored.
    Not,
    /// Digitised first input.
    Buffer,
    Min,
    Max,
    Mean,
    Sum,
}

impl GateRule {
    pub fn name(&self) -> &'static str {
        match self {
            GateRule::And => "AND",
            GateRule::Or => "OR",
            GateRule::Xor => "XOR",
            GateRule::Nand => "NAND",
            GateRule::Nor => "NOR",
            GateRule::Xnor => "XNOR",
            GateRule::Not => "NOT",
            GateRule::Buffer => "BUF",
            GateRule::Min => "MIN",
            GateRule::Max => "MAX",
            GateRule::Mean => "MEAN",
            GateRule::Sum => "SUM",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let rule = match name.to_ascii_lowercase().as_str() {
            "and" => GateRule::And,
            "or" => GateRule::Or,
            "xor" => GateRule::Xor,
            "nand" => GateRule::Nand,
            "nor" => GateRule::Nor,
            "xnor" => GateRule::Xnor,
            "not" => GateRule::Not,
            "buf" | "buffer" => GateRule::Buffer,
            "min" => GateRule::Min,
            "max" => GateRule::Max,
            "mean" => GateRule::Mean,
            "sum" => GateRule::Sum,
            _ => return None,
        };
        Some(rule)
    }
}

/// How a container turns its contents into a single output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggregation {
    /// Output of one designated content node.
    Sink(NodeId),
    /// Reductions over the terminal contents, i.e. contents that no other
    /// content consumes. An empty set yields `0.0`.
    Mean,
    Max,
    Min,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Driver-controlled constant. Accepts no inputs.
    Source(f64),
    Relay,
    Gate(GateRule),
    Container(Aggregation),
}

impl NodeKind {
    pub fn default_label(&self) -> &'static str {
        match self {
            NodeKind::Source(_) => "Source",
            NodeKind::Relay => "1:1 Node",
            NodeKind::Gate(_) => "Gate",
            NodeKind::Container(_) => "Container",
        }
    }

    /// Input capacity dictated by the kind. Containers carry their own.
    pub fn fixed_capacity(&self) -> Option<usize> {
        match self {
            NodeKind::Source(_) => Some(0),
            NodeKind::Relay => Some(1),
            NodeKind::Gate(_) => Some(2),
            NodeKind::Container(_) => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Container(_))
    }
}

/// One registered input and the consumer's current approach toward its output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputEdge {
    pub source: NodeId,
    pub tracked: f64,
}

impl InputEdge {
    pub fn new(source: NodeId) -> Self {
        Self { source, tracked: 0.0 }
    }
}

/// Rule applied when a tracked value steps toward its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackPolicy {
    /// Step toward the target and stop on it.
    #[default]
    Clamp,
    /// Legacy behaviour: the step is taken modulo 1 and never stops at the
    /// target, so the tracked value oscillates around it.
    Wrap,
}
