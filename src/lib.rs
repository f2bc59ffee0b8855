//! Signal-propagation graph for a digital-logic trainer.
//!
//! Nodes hold a scalar output and track, per registered input, a value that
//! approaches that input's output at the node's propagation rate. Relays
//! forward one input, gates combine two through a [`GateRule`], and containers
//! own a sub-graph whose result they expose through an [`Aggregation`].
//! All nodes live in one arena and are addressed by [`NodeId`] handles.

pub mod analysis;
pub mod compute;
pub mod config;
pub mod display;
pub mod graph;
pub mod store;

#[cfg(feature = "python")]
mod bindings;

pub use compute::{SimulationError, TickReport};
pub use config::{CircuitConfig, ConfigError};
pub use graph::{Circuit, SnapshotError};
pub use store::{Aggregation, GateRule, InputEdge, NodeId, NodeKind, RegistrationError, TrackPolicy};

// FFI Facade: the `_core` Python module for an external driver.
#[cfg(feature = "python")]
use pyo3::prelude::*;

/// This function defines the `logicviz._core` Python module.
/// The name `_core` is chosen to indicate it's an internal, compiled component.
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<bindings::python::PyCircuit>()?;
    Ok(())
}
