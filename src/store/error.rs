//! Errors raised while building or wiring the node arena.
use super::types::NodeId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),
    #[error("Node {node} already has {capacity} input(s)")]
    CapacityExceeded { node: NodeId, capacity: usize },
    #[error("Node {input} is already an input of {node}")]
    AlreadyRegistered { node: NodeId, input: NodeId },
    #[error("Node {0} cannot reference itself")]
    SelfReference(NodeId),
    #[error("Linking {from} into {to} would create a cycle")]
    CycleDetected { from: NodeId, to: NodeId },
    #[error("Node {0} is not a container")]
    NotAContainer(NodeId),
    #[error("Node {0} is not a source")]
    NotASource(NodeId),
    #[error("Node {node} is already owned by container {owner}")]
    AlreadyOwned { node: NodeId, owner: NodeId },
    #[error("Invalid source value {0}: must be finite")]
    InvalidSourceValue(f64),
    #[error("Invalid propagation rate {0}: must be finite and non-negative")]
    InvalidPropagationRate(f64),
}
