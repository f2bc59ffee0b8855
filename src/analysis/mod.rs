//! Structural and numeric analysis over a circuit.
pub mod telemetry;
pub mod topology;

pub use telemetry::ConvergenceReport;
