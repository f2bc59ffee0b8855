//! Python bindings for an external driver.
pub mod python;
