use serde::{Deserialize, Serialize};
use std::fmt;

// ================================
// Matrix – fixed-shape 2-D buffer
// ================================

/// Row-major 2-D buffer of doubles.
///
/// The shape is fixed at construction and `data.len() == rows * cols` always
/// holds; deserialization goes through the same check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MatrixRepr")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct MatrixRepr {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<MatrixRepr> for Matrix {
    type Error = String;

    fn try_from(repr: MatrixRepr) -> Result<Self, Self::Error> {
        Matrix::from_vec(repr.rows, repr.cols, repr.data).ok_or_else(|| {
            format!("buffer length does not match {}x{}", repr.rows, repr.cols)
        })
    }
}

impl Matrix {
    /// Wrap a row-major buffer, returning `None` when the length does not fit the shape.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        if rows.checked_mul(cols)? != data.len() {
            return None;
        }
        Some(Self { rows, cols, data })
    }

    /// Build from nested rows; all rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let count = rows.len();
        let data = rows.into_iter().flatten().collect();
        Self::from_vec(count, cols, data)
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// A single-row matrix holding `values`.
    pub fn row_vector(values: Vec<f64>) -> Self {
        Self {
            rows: 1,
            cols: values.len(),
            data: values,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(row * self.cols + col).copied()
    }

    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row >= self.rows {
            return None;
        }
        self.data.get(row * self.cols..(row + 1) * self.cols)
    }

    /// Copy of rows `start..end`; `None` when the range falls outside the matrix.
    pub fn row_range(&self, start: usize, end: usize) -> Option<Matrix> {
        if start > end || end > self.rows {
            return None;
        }
        let data = self.data.get(start * self.cols..end * self.cols)?.to_vec();
        Some(Matrix {
            rows: end - start,
            cols: self.cols,
            data,
        })
    }

    /// Apply `f` elementwise, keeping the shape.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for r in 0..self.rows {
            if r > 0 {
                write!(f, ", ")?;
            }
            write_list(f, self.row(r).unwrap_or_default())?;
        }
        write!(f, "]")
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, values: &[f64]) -> fmt::Result {
    write!(f, "[")?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", v)?;
    }
    write!(f, "]")
}

// ================================
// Value – operand and result type
// ================================

/// A value flowing through the execution tree.
///
/// Numeric variants are rank-polymorphic: `Scalar` is rank 0, `Vector` rank 1,
/// `Matrix` rank 2. `Range` carries multi-valued results such as split parts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    #[default]
    Nil,
    Scalar(f64),
    Vector(Vec<f64>),
    Matrix(Matrix),
    Range(Vec<Value>),
    String(String),
}

impl Value {
    /// Rank of a numeric value; `None` for non-numeric variants.
    pub fn rank(&self) -> Option<usize> {
        match self {
            Value::Scalar(_) => Some(0),
            Value::Vector(_) => Some(1),
            Value::Matrix(_) => Some(2),
            _ => None,
        }
    }

    /// Shape of a numeric value, outermost dimension first.
    pub fn shape(&self) -> Option<Vec<usize>> {
        match self {
            Value::Scalar(_) => Some(Vec::new()),
            Value::Vector(v) => Some(vec![v.len()]),
            Value::Matrix(m) => Some(m.shape().to_vec()),
            _ => None,
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Scalar(_) => "scalar",
            Value::Vector(_) => "vector",
            Value::Matrix(_) => "matrix",
            Value::Range(_) => "range",
            Value::String(_) => "string",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Scalar(x) => Some(*x),
            _ => None,
        }
    }

    /// Scalar holding an exact integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Scalar(x) if x.fract() == 0.0 && x.is_finite() => Some(*x as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&Matrix> {
        match self {
            Value::Matrix(m) => Some(m),
            _ => None,
        }
    }

    /// Numbers of a `Vector`, or of a `Range` made only of scalars.
    pub fn as_number_list(&self) -> Option<Vec<f64>> {
        match self {
            Value::Vector(v) => Some(v.clone()),
            Value::Range(items) => items.iter().map(Value::as_f64).collect(),
            _ => None,
        }
    }

    pub fn into_range(self) -> Option<Vec<Value>> {
        match self {
            Value::Range(items) => Some(items),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Scalar(x)
    }
}

/// Integers are promoted to doubles.
impl From<i64> for Value {
    fn from(x: i64) -> Self {
        Value::Scalar(x as f64)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Vector(v)
    }
}

impl From<Matrix> for Value {
    fn from(m: Matrix) -> Self {
        Value::Matrix(m)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Scalar(x) => write!(f, "{}", x),
            Value::Vector(v) => write_list(f, v),
            Value::Matrix(m) => write!(f, "{}", m),
            Value::Range(items) => {
                write!(f, "list(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::String(s) => write!(f, "{:?}", s),
        }
    }
}
