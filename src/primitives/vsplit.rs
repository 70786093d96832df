use async_trait::async_trait;
use std::sync::Arc;

use super::primitive::{
    evaluate_operands, CtorArgs, Operand, Primitive, PrimitiveEnv, PrimitiveMeta,
};
use crate::cluster::handle::{LocalityId, PrimitiveHandle};
use crate::cluster::Cluster;
use crate::core::config::LowerRankSplit;
use crate::core::eval_context::EvalContext;
use crate::core::value::{Matrix, Value};
use crate::error::PrimitiveResult;
use crate::registry::MatchPattern;

pub const VSPLIT_KIND: &str = "vsplit";

/// How the rows are to be cut.
#[derive(Debug, Clone, PartialEq)]
enum SplitSpec {
    /// N equal-height parts.
    Sections(usize),
    /// Cut before each listed row.
    Indices(Vec<usize>),
}

/// Splits a matrix along its vertical axis.
///
/// Operands: the array, then up to two split specifications: a scalar count
/// and/or a list of row indices. When both are given the index list wins and
/// the count is ignored. With neither, the result is a single part.
pub struct VSplitOperation {
    meta: PrimitiveMeta,
    operands: Vec<Operand>,
    lower_rank: LowerRankSplit,
}

impl VSplitOperation {
    pub fn new(meta: PrimitiveMeta, operands: Vec<Operand>, lower_rank: LowerRankSplit) -> Self {
        Self {
            meta,
            operands,
            lower_rank,
        }
    }

    pub fn create(args: CtorArgs, env: &PrimitiveEnv) -> PrimitiveResult<Arc<dyn Primitive>> {
        args.expect_arity(1, 3)?;
        let meta = args.meta();
        Ok(Arc::new(VSplitOperation::new(
            meta,
            args.operands,
            env.config.lower_rank_split,
        )))
    }

    fn split_spec(&self, specs: &[Value]) -> PrimitiveResult<SplitSpec> {
        let mut count = None;
        let mut indices = None;
        for (i, spec) in specs.iter().enumerate() {
            let position = i + 1;
            match spec {
                Value::Scalar(_) if count.is_none() => count = Some((position, spec)),
                Value::Vector(_) | Value::Range(_) if indices.is_none() => {
                    indices = Some((position, spec))
                }
                other => {
                    return Err(self.meta.type_mismatch(
                        position,
                        "at most one count and one index list",
                        other.variant_name(),
                    ))
                }
            }
        }

        if let Some((position, list)) = indices {
            if count.is_some() {
                tracing::debug!(
                    primitive = %self.meta.diagnostic_name(),
                    "both count and indices given, using indices"
                );
            }
            let numbers = list.as_number_list().ok_or_else(|| {
                self.meta
                    .type_mismatch(position, "list of row indices", "list with non-numeric items")
            })?;
            let rows = numbers
                .into_iter()
                .map(|x| {
                    if x.fract() != 0.0 || !x.is_finite() || x < 0.0 {
                        Err(self.meta.invalid_index(x, "row index must be a non-negative integer"))
                    } else {
                        Ok(x as usize)
                    }
                })
                .collect::<PrimitiveResult<Vec<_>>>()?;
            return Ok(SplitSpec::Indices(rows));
        }

        match count {
            Some((position, value)) => {
                let n = value.as_integer().ok_or_else(|| {
                    self.meta.type_mismatch(position, "integer count", "fractional scalar")
                })?;
                if n <= 0 {
                    return Err(self.meta.shape_mismatch(
                        Vec::new(),
                        format!("cannot be split into {} sections", n),
                    ));
                }
                Ok(SplitSpec::Sections(n as usize))
            }
            None => Ok(SplitSpec::Sections(1)),
        }
    }

    fn to_matrix(&self, value: Value) -> PrimitiveResult<Matrix> {
        match (value, self.lower_rank) {
            (Value::Matrix(m), _) => Ok(m),
            (Value::Vector(v), LowerRankSplit::RowMatrix) => Ok(Matrix::row_vector(v)),
            (Value::Scalar(x), LowerRankSplit::RowMatrix) => Ok(Matrix::row_vector(vec![x])),
            (other, _) => Err(self.meta.type_mismatch(0, "matrix", other.variant_name())),
        }
    }

    fn split_sections(&self, m: &Matrix, n: usize) -> PrimitiveResult<Vec<Matrix>> {
        if m.rows() % n != 0 {
            return Err(self.meta.shape_mismatch(
                m.shape().to_vec(),
                format!("cannot be split into {} equal sections", n),
            ));
        }
        let height = m.rows() / n;
        let bounds: Vec<usize> = (1..n).map(|i| i * height).collect();
        self.cut(m, &bounds)
    }

    fn split_indices(&self, m: &Matrix, indices: &[usize]) -> PrimitiveResult<Vec<Matrix>> {
        let mut previous = None;
        for &index in indices {
            if index > m.rows() {
                return Err(self.meta.invalid_index(
                    index,
                    format!("out of bounds for {} rows", m.rows()),
                ));
            }
            if previous.is_some_and(|p| index <= p) {
                return Err(self
                    .meta
                    .invalid_index(index, "indices must be strictly ascending"));
            }
            previous = Some(index);
        }
        self.cut(m, indices)
    }

    /// Cut `m` before each of `bounds`, which must be ascending and in range.
    fn cut(&self, m: &Matrix, bounds: &[usize]) -> PrimitiveResult<Vec<Matrix>> {
        let mut parts = Vec::with_capacity(bounds.len() + 1);
        let mut start = 0;
        for &end in bounds.iter().chain(std::iter::once(&m.rows())) {
            let part = m.row_range(start, end).ok_or_else(|| {
                self.meta
                    .shape_mismatch(m.shape().to_vec(), format!("has no rows {}..{}", start, end))
            })?;
            parts.push(part);
            start = end;
        }
        Ok(parts)
    }
}

#[async_trait]
impl Primitive for VSplitOperation {
    fn meta(&self) -> &PrimitiveMeta {
        &self.meta
    }

    async fn eval(&self, args: &[Value], ctx: &EvalContext) -> PrimitiveResult<Value> {
        let mut values = evaluate_operands(&self.operands, args, ctx).await?.into_iter();
        let array = values
            .next()
            .ok_or_else(|| self.meta.arity_mismatch("1..=3", 0))?;
        let specs: Vec<Value> = values.collect();

        let matrix = self.to_matrix(array)?;
        let spec = self.split_spec(&specs)?;
        let parts = match &spec {
            SplitSpec::Sections(n) => self.split_sections(&matrix, *n)?,
            SplitSpec::Indices(indices) => self.split_indices(&matrix, indices)?,
        };
        tracing::debug!(
            primitive = %self.meta.diagnostic_name(),
            shape = ?matrix.shape(),
            parts = parts.len(),
            "vsplit"
        );
        Ok(Value::Range(parts.into_iter().map(Value::Matrix).collect()))
    }
}

pub fn match_data() -> Vec<MatchPattern> {
    vec![
        MatchPattern::new(VSPLIT_KIND, "vsplit(_1)", VSplitOperation::create),
        MatchPattern::new(VSPLIT_KIND, "vsplit(_1, _2)", VSplitOperation::create),
        MatchPattern::new(VSPLIT_KIND, "vsplit(_1, _2, _3)", VSplitOperation::create),
    ]
}

pub async fn create_vsplit_operation(
    cluster: &Cluster,
    locality: LocalityId,
    operands: Vec<Operand>,
    name: &str,
    codename: &str,
) -> PrimitiveResult<PrimitiveHandle> {
    cluster
        .create(locality, VSPLIT_KIND, operands, name, codename)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn six_by_three() -> Matrix {
        Matrix::from_vec(6, 3, (0..18).map(f64::from).collect()).unwrap()
    }

    fn vsplit(operands: Vec<Value>, lower_rank: LowerRankSplit) -> VSplitOperation {
        VSplitOperation::new(
            PrimitiveMeta::new(VSPLIT_KIND, "", ""),
            operands.into_iter().map(Operand::Literal).collect(),
            lower_rank,
        )
    }

    async fn run(operands: Vec<Value>) -> PrimitiveResult<Vec<Matrix>> {
        let value = vsplit(operands, LowerRankSplit::Reject)
            .eval(&[], &EvalContext::detached())
            .await?;
        Ok(value
            .into_range()
            .unwrap()
            .into_iter()
            .map(|v| v.as_matrix().unwrap().clone())
            .collect())
    }

    #[tokio::test]
    async fn test_split_into_equal_sections() {
        let parts = run(vec![six_by_three().into(), Value::from(3.0)]).await.unwrap();
        assert_eq!(parts.len(), 3);
        for (i, part) in parts.iter().enumerate() {
            assert_eq!(part.shape(), [2, 3]);
            assert_eq!(part.get(0, 0), Some((i * 6) as f64));
        }
    }

    #[tokio::test]
    async fn test_uneven_count_is_shape_mismatch() {
        let err = run(vec![six_by_three().into(), Value::from(4.0)]).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ShapeMismatch);
    }

    #[tokio::test]
    async fn test_zero_count_is_shape_mismatch() {
        let err = run(vec![six_by_three().into(), Value::from(0.0)]).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ShapeMismatch);
    }

    #[tokio::test]
    async fn test_split_at_indices() {
        let parts = run(vec![six_by_three().into(), Value::from(vec![2.0, 4.0])])
            .await
            .unwrap();
        let heights: Vec<usize> = parts.iter().map(Matrix::rows).collect();
        assert_eq!(heights, vec![2, 2, 2]);
    }

    #[tokio::test]
    async fn test_leading_zero_index_gives_empty_first_part() {
        let m = six_by_three();
        let parts = run(vec![m.clone().into(), Value::from(vec![0.0])]).await.unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].shape(), [0, 3]);
        assert_eq!(parts[1], m);
    }

    #[tokio::test]
    async fn test_trailing_row_count_index_gives_empty_last_part() {
        let parts = run(vec![six_by_three().into(), Value::from(vec![6.0])]).await.unwrap();
        assert_eq!(parts[0].rows(), 6);
        assert_eq!(parts[1].rows(), 0);
    }

    #[tokio::test]
    async fn test_descending_indices_rejected() {
        let err = run(vec![six_by_three().into(), Value::from(vec![4.0, 2.0])])
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidIndex);
    }

    #[tokio::test]
    async fn test_duplicate_and_out_of_range_indices_rejected() {
        for indices in [vec![2.0, 2.0], vec![7.0], vec![-1.0], vec![1.5]] {
            let err = run(vec![six_by_three().into(), Value::from(indices)])
                .await
                .unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidIndex);
        }
    }

    #[tokio::test]
    async fn test_indices_take_precedence_over_count() {
        let parts = run(vec![
            six_by_three().into(),
            Value::from(4.0),
            Value::Range(vec![Value::from(1.0)]),
        ])
        .await
        .unwrap();
        let heights: Vec<usize> = parts.iter().map(Matrix::rows).collect();
        assert_eq!(heights, vec![1, 5]);
    }

    #[tokio::test]
    async fn test_no_spec_is_single_part() {
        let m = six_by_three();
        let parts = run(vec![m.clone().into()]).await.unwrap();
        assert_eq!(parts, vec![m]);
    }

    #[tokio::test]
    async fn test_vector_rejected_by_default() {
        let err = run(vec![Value::from(vec![1.0, 2.0]), Value::from(1.0)])
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TypeMismatch);
    }

    #[tokio::test]
    async fn test_vector_as_row_matrix() {
        let value = vsplit(
            vec![Value::from(vec![1.0, 2.0]), Value::from(1.0)],
            LowerRankSplit::RowMatrix,
        )
        .eval(&[], &EvalContext::detached())
        .await
        .unwrap();
        let expected = Matrix::row_vector(vec![1.0, 2.0]);
        assert_eq!(value, Value::Range(vec![Value::Matrix(expected)]));
    }

    #[tokio::test]
    async fn test_two_counts_rejected() {
        let err = run(vec![six_by_three().into(), Value::from(2.0), Value::from(3.0)])
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TypeMismatch);
    }
}
