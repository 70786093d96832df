use async_trait::async_trait;
use std::sync::Arc;

use super::kernels::KernelTables;
use super::primitive::{ConstructorFn, CtorArgs, Operand, Primitive, PrimitiveEnv, PrimitiveMeta};
use crate::cluster::handle::{LocalityId, PrimitiveHandle};
use crate::cluster::Cluster;
use crate::core::eval_context::EvalContext;
use crate::core::value::Value;
use crate::error::{PrimitiveError, PrimitiveResult};
use crate::registry::MatchPattern;

/// Kind name of the explicit form `generic("fn", x)`.
pub const GENERIC_KIND: &str = "generic";

/// Applies a named unary function to an operand of any supported rank.
///
/// The kernel is resolved from `(function, rank)` on every call: the rank of
/// the operand can change between evaluations of the same node.
pub struct GenericOperation {
    meta: PrimitiveMeta,
    operand: Operand,
    function: String,
}

impl GenericOperation {
    pub fn new(meta: PrimitiveMeta, operand: Operand, function: impl Into<String>) -> Self {
        Self {
            meta,
            operand,
            function: function.into(),
        }
    }

    /// `generic("name", x)` takes the function from a string literal; every
    /// other kind is itself the function name and takes one operand.
    pub fn create(args: CtorArgs, _env: &PrimitiveEnv) -> PrimitiveResult<Arc<dyn Primitive>> {
        let (function, operand_pos) = if args.kind == GENERIC_KIND {
            args.expect_arity(2, 2)?;
            (args.literal_string(0)?, 1)
        } else {
            args.expect_arity(1, 1)?;
            (args.kind.clone(), 0)
        };
        let meta = args.meta();
        let operand = args
            .operands
            .into_iter()
            .nth(operand_pos)
            .ok_or_else(|| meta.arity_mismatch((operand_pos + 1).to_string(), operand_pos))?;
        Ok(Arc::new(GenericOperation::new(meta, operand, function)))
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    fn unknown_function(&self, rank: usize) -> PrimitiveError {
        PrimitiveError::UnknownFunction {
            primitive: self.meta.diagnostic_name(),
            function: self.function.clone(),
            rank,
        }
    }

    fn apply(&self, value: Value) -> PrimitiveResult<Value> {
        let tables = KernelTables::global();
        match value {
            Value::Scalar(x) => {
                let kernel = tables
                    .scalar(&self.function)
                    .ok_or_else(|| self.unknown_function(0))?;
                Ok(Value::Scalar(kernel(x)))
            }
            Value::Vector(v) => {
                let kernel = tables
                    .vector(&self.function)
                    .ok_or_else(|| self.unknown_function(1))?;
                Ok(Value::Vector(kernel.apply(&v)))
            }
            Value::Matrix(m) => {
                let kernel = tables
                    .matrix(&self.function)
                    .ok_or_else(|| self.unknown_function(2))?;
                Ok(Value::Matrix(kernel.apply(&m)))
            }
            other => Err(self.meta.type_mismatch(
                0,
                "scalar, vector or matrix",
                other.variant_name(),
            )),
        }
    }
}

#[async_trait]
impl Primitive for GenericOperation {
    fn meta(&self) -> &PrimitiveMeta {
        &self.meta
    }

    async fn eval(&self, args: &[Value], ctx: &EvalContext) -> PrimitiveResult<Value> {
        let value = self.operand.value(args, ctx).await?;
        tracing::trace!(
            primitive = %self.meta.diagnostic_name(),
            function = %self.function,
            rank = ?value.rank(),
            "generic dispatch"
        );
        self.apply(value)
    }
}

/// One pattern per registered function name, plus the explicit `generic` form.
pub fn match_data() -> Vec<MatchPattern> {
    let create: ConstructorFn = GenericOperation::create;
    let mut patterns = vec![MatchPattern::new(GENERIC_KIND, "generic(_1, _2)", create)];
    for name in KernelTables::global().names() {
        patterns.push(MatchPattern::new(name, format!("{}(_1)", name), create));
    }
    patterns
}

/// Create a generic operation applying `function` at `locality`.
pub async fn create_generic_operation(
    cluster: &Cluster,
    locality: LocalityId,
    function: &str,
    operand: Operand,
    name: &str,
    codename: &str,
) -> PrimitiveResult<PrimitiveHandle> {
    cluster
        .create(
            locality,
            GENERIC_KIND,
            vec![Operand::Literal(Value::from(function)), operand],
            name,
            codename,
        )
        .await
}
