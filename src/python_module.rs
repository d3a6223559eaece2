//! Python bindings for ferric-kmer using PyO3

use crate::classifier::{ClassifierBank, Labels};
use crate::config::{ClassifierConfig, FilterParams};
use crate::{codec, ClassifierError};
use numpy::PyArray2;
use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::fs::File;
use std::io::{BufReader, BufWriter};

fn to_py_err(err: ClassifierError) -> PyErr {
    match err {
        ClassifierError::Io(e) => PyIOError::new_err(e.to_string()),
        ClassifierError::NotFitted => PyRuntimeError::new_err(err.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

/// Python wrapper for ClassifierBank
#[pyclass(name = "KmerClassifier")]
struct PyKmerClassifier {
    inner: ClassifierBank,
}

#[pymethods]
impl PyKmerClassifier {
    #[new]
    #[pyo3(signature = (k=21, capacity=1_000_000, false_positive_rate=0.01))]
    fn new(k: usize, capacity: usize, false_positive_rate: f64) -> PyResult<Self> {
        let filter = FilterParams::new(capacity, false_positive_rate).map_err(to_py_err)?;
        let config = ClassifierConfig::new(k, filter).map_err(to_py_err)?;
        let inner = ClassifierBank::new(config).map_err(to_py_err)?;
        Ok(PyKmerClassifier { inner })
    }

    /// Reset and train; `k`, `capacity`, and `false_positive_rate` replace the
    /// current configuration when given
    #[pyo3(signature = (items, labels=None, label=None, k=None, capacity=None, false_positive_rate=None))]
    fn fit(
        &mut self,
        items: Vec<String>,
        labels: Option<Vec<String>>,
        label: Option<String>,
        k: Option<usize>,
        capacity: Option<usize>,
        false_positive_rate: Option<f64>,
    ) -> PyResult<()> {
        let current = *self.inner.config();
        let config = ClassifierConfig {
            kmer_size: k.unwrap_or(current.kmer_size),
            filter: FilterParams {
                capacity: capacity.unwrap_or(current.filter.capacity),
                false_positive_rate: false_positive_rate
                    .unwrap_or(current.filter.false_positive_rate),
            },
        };
        let labels = Labels::from_options(labels.as_deref(), label.as_deref()).map_err(to_py_err)?;
        self.inner
            .fit_with_config(config, &items, labels)
            .map_err(to_py_err)
    }

    #[pyo3(signature = (items, labels=None, label=None))]
    fn partial_fit(
        &mut self,
        items: Vec<String>,
        labels: Option<Vec<String>>,
        label: Option<String>,
    ) -> PyResult<()> {
        let labels = Labels::from_options(labels.as_deref(), label.as_deref()).map_err(to_py_err)?;
        self.inner.partial_fit(&items, labels).map_err(to_py_err)
    }

    fn predict(&self, py: Python<'_>, queries: Vec<String>) -> PyResult<Vec<String>> {
        py.allow_threads(|| self.inner.predict(&queries))
            .map_err(to_py_err)
    }

    fn predict_proba<'py>(&self, py: Python<'py>, queries: Vec<String>) -> PyResult<&'py PyArray2<f64>> {
        let rows = py.allow_threads(|| self.inner.predict_proba(&queries));
        if rows.is_empty() || self.inner.is_empty() {
            return Ok(PyArray2::zeros(py, [rows.len(), self.inner.len()], false));
        }
        Ok(PyArray2::from_vec2(py, &rows)?)
    }

    #[getter]
    fn labels(&self) -> Vec<String> {
        self.inner.labels().map(str::to_string).collect()
    }

    #[getter]
    fn k(&self) -> usize {
        self.inner.config().kmer_size
    }

    fn save(&self, path: &str) -> PyResult<()> {
        let file = File::create(path).map_err(|e| PyIOError::new_err(e.to_string()))?;
        codec::save(&self.inner, BufWriter::new(file)).map_err(to_py_err)
    }

    #[staticmethod]
    fn load(path: &str) -> PyResult<Self> {
        let file = File::open(path).map_err(|e| PyIOError::new_err(e.to_string()))?;
        let inner = codec::load(BufReader::new(file)).map_err(to_py_err)?;
        Ok(PyKmerClassifier { inner })
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "KmerClassifier(k={}, classes={})",
            self.inner.config().kmer_size,
            self.inner.len()
        )
    }
}

/// Python module definition
#[pymodule]
fn ferric_kmer(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyKmerClassifier>()?;

    m.add("MODEL_VERSION", codec::MODEL_VERSION.to_vec())?;
    m.add("__version__", "0.1.0")?;

    Ok(())
}
