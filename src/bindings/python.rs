use crate::graph::Circuit;
use crate::store::{Aggregation, GateRule, NodeId};
use crate::config::CircuitConfig;
use pyo3::prelude::*;
use pyo3::exceptions::{PyRuntimeError, PyValueError};

fn value_err(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

#[pyclass(name = "Circuit")]
#[derive(Debug, Clone, Default)]
pub struct PyCircuit {
    inner: Circuit,
}

impl PyCircuit {
    fn id(&self, node: usize) -> PyResult<NodeId> {
        let id = NodeId::new(node);
        if self.inner.contains(id) { Ok(id) } else { Err(PyValueError::new_err("Invalid Node ID")) }
    }

    fn parse_aggregation(&self, aggregation: &str, sink: Option<usize>) -> PyResult<Aggregation> {
        match (aggregation, sink) {
            ("sink", Some(s)) => Ok(Aggregation::Sink(self.id(s)?)),
            ("sink", None) => Err(PyValueError::new_err("A sink container needs a sink node")),
            ("mean", _) => Ok(Aggregation::Mean),
            ("max", _) => Ok(Aggregation::Max),
            ("min", _) => Ok(Aggregation::Min),
            (other, _) => Err(PyValueError::new_err(format!("Invalid aggregation: '{}'", other))),
        }
    }
}

#[pymethods]
impl PyCircuit {
    #[new]
    #[pyo3(signature = (config_json=None))]
    pub fn new(config_json: Option<&str>) -> PyResult<Self> {
        let config = match config_json {
            Some(json) => CircuitConfig::from_json_str(json).map_err(value_err)?,
            None => CircuitConfig::default(),
        };
        Circuit::with_config(config).map(|inner| Self { inner }).map_err(value_err)
    }

    pub fn add_source(&mut self, value: f64) -> PyResult<usize> {
        self.inner.add_source(value).map(|id| id.index()).map_err(value_err)
    }

    #[pyo3(signature = (input=None, rate=None))]
    pub fn add_relay(&mut self, input: Option<usize>, rate: Option<f64>) -> PyResult<usize> {
        let input = input.map(NodeId::new);
        self.inner.add_relay(input, rate).map(|id| id.index()).map_err(value_err)
    }

    #[pyo3(signature = (rule, input=None, rate=None))]
    pub fn add_gate(&mut self, rule: &str, input: Option<usize>, rate: Option<f64>) -> PyResult<usize> {
        let rule = GateRule::parse(rule).ok_or_else(|| value_err(format!("Invalid gate rule: '{}'", rule)))?;
        let input = input.map(NodeId::new);
        self.inner.add_gate(rule, input, rate).map(|id| id.index()).map_err(value_err)
    }

    #[pyo3(signature = (aggregation, sink=None, capacity=None, rate=None))]
    pub fn add_container(
        &mut self,
        aggregation: &str,
        sink: Option<usize>,
        capacity: Option<usize>,
        rate: Option<f64>,
    ) -> PyResult<usize> {
        let aggregation = self.parse_aggregation(aggregation, sink)?;
        self.inner.add_container(aggregation, capacity, rate).map(|id| id.index()).map_err(value_err)
    }

    /// Unknown handles raise; wiring rejections return `False`.
    pub fn try_register_input(&mut self, node: usize, input: usize) -> PyResult<bool> {
        let (node, input) = (self.id(node)?, self.id(input)?);
        Ok(self.inner.try_register_input(node, input))
    }

    pub fn add_to_container(&mut self, container: usize, child: usize) -> PyResult<()> {
        let (container, child) = (self.id(container)?, self.id(child)?);
        self.inner.add_to_container(container, child).map_err(value_err)
    }

    pub fn set_source_value(&mut self, node: usize, value: f64) -> PyResult<()> {
        let node = self.id(node)?;
        self.inner.set_source_value(node, value).map_err(value_err)
    }

    /// Returns the number of nodes updated.
    pub fn tick(&mut self, node: usize, dt: f64) -> PyResult<usize> {
        let node = self.id(node)?;
        self.inner
            .tick(node, dt)
            .map(|r| r.updated_nodes)
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    pub fn step(&mut self, dt: f64) -> PyResult<usize> {
        self.inner.step(dt).map(|r| r.updated_nodes).map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    pub fn output(&self, node: usize) -> PyResult<f64> {
        Ok(self.inner.output(self.id(node)?))
    }

    pub fn label(&self, node: usize) -> PyResult<String> {
        Ok(self.inner.label(self.id(node)?).to_string())
    }

    pub fn propagation_rate(&self, node: usize) -> PyResult<f64> {
        Ok(self.inner.propagation_rate(self.id(node)?))
    }

    pub fn max_inputs(&self, node: usize) -> PyResult<usize> {
        Ok(self.inner.max_inputs(self.id(node)?))
    }

    /// `(input, tracked)` pairs in registration order.
    pub fn inputs(&self, node: usize) -> PyResult<Vec<(usize, f64)>> {
        let id = self.id(node)?;
        Ok(self.inner.inputs(id).iter().map(|e| (e.source.index(), e.tracked)).collect())
    }

    pub fn contents(&self, node: usize) -> PyResult<Vec<usize>> {
        let id = self.id(node)?;
        Ok(self.inner.contents(id).iter().map(|c| c.index()).collect())
    }

    pub fn trace(&self, node: usize) -> PyResult<String> {
        Ok(self.inner.trace(self.id(node)?))
    }

    pub fn to_dot(&self) -> String { self.inner.to_dot() }

    pub fn to_json(&self) -> PyResult<String> {
        self.inner.to_json().map_err(value_err)
    }

    #[staticmethod]
    pub fn from_json(json: &str) -> PyResult<Self> {
        Circuit::from_json(json).map(|inner| Self { inner }).map_err(value_err)
    }

    pub fn node_count(&self) -> usize { self.inner.node_count() }
}
