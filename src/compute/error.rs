use crate::store::NodeId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Ticking backward (or by a non-finite amount) is a driver bug.
    #[error("Invalid delta time {0}: must be finite and non-negative")]
    InvalidDeltaTime(f64),
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),
}
