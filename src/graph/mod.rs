//! The public node-graph facade and its persistence.
pub mod circuit;
pub mod snapshot;

pub use circuit::Circuit;
pub use snapshot::SnapshotError;
