//! Rank-specific numeric kernels, looked up by `(name, rank)`.
//!
//! The tables are data: adding a kernel means adding a row below, the dispatch
//! in [`super::generic`] never changes. Every elementwise function is registered
//! for ranks 0, 1 and 2; buffer-level kernels only for the ranks they support.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::core::value::Matrix;

pub type ScalarKernel = fn(f64) -> f64;
pub type VectorFn = fn(&[f64]) -> Vec<f64>;
pub type MatrixFn = fn(&Matrix) -> Matrix;

/// Rank-1 kernel.
#[derive(Clone, Copy)]
pub enum VectorKernel {
    Elementwise(ScalarKernel),
    Buffer(VectorFn),
}

impl VectorKernel {
    pub fn apply(self, v: &[f64]) -> Vec<f64> {
        match self {
            VectorKernel::Elementwise(f) => v.iter().map(|&x| f(x)).collect(),
            VectorKernel::Buffer(f) => f(v),
        }
    }
}

/// Rank-2 kernel.
#[derive(Clone, Copy)]
pub enum MatrixKernel {
    Elementwise(ScalarKernel),
    Buffer(MatrixFn),
}

impl MatrixKernel {
    pub fn apply(self, m: &Matrix) -> Matrix {
        match self {
            MatrixKernel::Elementwise(f) => m.map(f),
            MatrixKernel::Buffer(f) => f(m),
        }
    }
}

const ELEMENTWISE: &[(&str, ScalarKernel)] = &[
    ("absolute", f64::abs),
    ("floor", f64::floor),
    ("ceil", f64::ceil),
    ("trunc", f64::trunc),
    ("rint", f64::round_ties_even),
    ("sign", sign),
    ("square", square),
    ("sqrt", f64::sqrt),
    ("invsqrt", invsqrt),
    ("cbrt", f64::cbrt),
    ("invcbrt", invcbrt),
    ("exp", f64::exp),
    ("exp2", f64::exp2),
    ("exp10", exp10),
    ("log", f64::ln),
    ("log2", f64::log2),
    ("log10", f64::log10),
    ("sin", f64::sin),
    ("cos", f64::cos),
    ("tan", f64::tan),
    ("arcsin", f64::asin),
    ("arccos", f64::acos),
    ("arctan", f64::atan),
    ("sinh", f64::sinh),
    ("cosh", f64::cosh),
    ("tanh", f64::tanh),
    ("arcsinh", f64::asinh),
    ("arccosh", f64::acosh),
    ("arctanh", f64::atanh),
];

const VECTOR_ONLY: &[(&str, VectorFn)] = &[("normalize", normalize_vector)];

const MATRIX_ONLY: &[(&str, MatrixFn)] = &[("normalize", normalize_matrix)];

fn sign(x: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x.signum()
    }
}

fn square(x: f64) -> f64 {
    x * x
}

fn invsqrt(x: f64) -> f64 {
    1.0 / x.sqrt()
}

fn invcbrt(x: f64) -> f64 {
    1.0 / x.cbrt()
}

fn exp10(x: f64) -> f64 {
    10f64.powf(x)
}

fn l2_norm(values: &[f64]) -> f64 {
    values.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Scale to unit L2 norm; an all-zero vector is returned unchanged.
fn normalize_vector(v: &[f64]) -> Vec<f64> {
    let norm = l2_norm(v);
    if norm == 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

/// Scale to unit Frobenius norm.
fn normalize_matrix(m: &Matrix) -> Matrix {
    let norm = l2_norm(m.as_slice());
    if norm == 0.0 {
        return m.clone();
    }
    m.map(|x| x / norm)
}

/// Per-rank name -> kernel tables. Read-only once built.
pub struct KernelTables {
    rank0: HashMap<&'static str, ScalarKernel>,
    rank1: HashMap<&'static str, VectorKernel>,
    rank2: HashMap<&'static str, MatrixKernel>,
}

impl KernelTables {
    fn build() -> Self {
        let mut tables = KernelTables {
            rank0: HashMap::new(),
            rank1: HashMap::new(),
            rank2: HashMap::new(),
        };
        for &(name, f) in ELEMENTWISE {
            tables.rank0.insert(name, f);
            tables.rank1.insert(name, VectorKernel::Elementwise(f));
            tables.rank2.insert(name, MatrixKernel::Elementwise(f));
        }
        for &(name, f) in VECTOR_ONLY {
            tables.rank1.insert(name, VectorKernel::Buffer(f));
        }
        for &(name, f) in MATRIX_ONLY {
            tables.rank2.insert(name, MatrixKernel::Buffer(f));
        }
        tables
    }

    /// Process-wide tables, built on first use.
    pub fn global() -> &'static KernelTables {
        static TABLES: OnceLock<KernelTables> = OnceLock::new();
        TABLES.get_or_init(KernelTables::build)
    }

    pub fn scalar(&self, name: &str) -> Option<ScalarKernel> {
        self.rank0.get(name).copied()
    }

    pub fn vector(&self, name: &str) -> Option<VectorKernel> {
        self.rank1.get(name).copied()
    }

    pub fn matrix(&self, name: &str) -> Option<MatrixKernel> {
        self.rank2.get(name).copied()
    }

    pub fn has_kernel(&self, name: &str, rank: usize) -> bool {
        match rank {
            0 => self.rank0.contains_key(name),
            1 => self.rank1.contains_key(name),
            2 => self.rank2.contains_key(name),
            _ => false,
        }
    }

    /// Every function name with a kernel at some rank, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .rank0
            .keys()
            .chain(self.rank1.keys())
            .chain(self.rank2.keys())
            .copied()
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}
