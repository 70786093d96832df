//! Leaf primitives reading run-time state: call arguments and context bindings.

use async_trait::async_trait;
use std::sync::Arc;

use super::primitive::{CtorArgs, Operand, Primitive, PrimitiveEnv, PrimitiveMeta};
use crate::core::eval_context::EvalContext;
use crate::core::value::Value;
use crate::error::PrimitiveResult;
use crate::registry::MatchPattern;

pub const ARGUMENT_KIND: &str = "argument";
pub const VARIABLE_KIND: &str = "variable";

/// Returns the run-time argument at a fixed position.
pub struct Argument {
    meta: PrimitiveMeta,
    index: usize,
}

impl Argument {
    pub fn new(meta: PrimitiveMeta, index: usize) -> Self {
        Self { meta, index }
    }

    pub fn create(args: CtorArgs, _env: &PrimitiveEnv) -> PrimitiveResult<Arc<dyn Primitive>> {
        args.expect_arity(1, 1)?;
        let meta = args.meta();
        let index = match args.operands.first() {
            Some(Operand::Literal(v)) => match v.as_integer() {
                Some(i) if i >= 0 => i as usize,
                _ => return Err(meta.invalid_index(v, "argument position must be a non-negative integer")),
            },
            _ => return Err(meta.type_mismatch(0, "integer literal", "node")),
        };
        Ok(Arc::new(Argument::new(meta, index)))
    }
}

#[async_trait]
impl Primitive for Argument {
    fn meta(&self) -> &PrimitiveMeta {
        &self.meta
    }

    async fn eval(&self, args: &[Value], _ctx: &EvalContext) -> PrimitiveResult<Value> {
        args.get(self.index).cloned().ok_or_else(|| {
            self.meta
                .invalid_index(self.index, format!("only {} argument(s) supplied", args.len()))
        })
    }
}

/// Returns a binding from the evaluation context.
pub struct Variable {
    meta: PrimitiveMeta,
    name: String,
}

impl Variable {
    pub fn new(meta: PrimitiveMeta, name: impl Into<String>) -> Self {
        Self {
            meta,
            name: name.into(),
        }
    }

    pub fn create(args: CtorArgs, _env: &PrimitiveEnv) -> PrimitiveResult<Arc<dyn Primitive>> {
        args.expect_arity(1, 1)?;
        let name = args.literal_string(0)?;
        Ok(Arc::new(Variable::new(args.meta(), name)))
    }
}

#[async_trait]
impl Primitive for Variable {
    fn meta(&self) -> &PrimitiveMeta {
        &self.meta
    }

    async fn eval(&self, _args: &[Value], ctx: &EvalContext) -> PrimitiveResult<Value> {
        ctx.binding(&self.name)
            .cloned()
            .ok_or_else(|| self.meta.invalid_index(&self.name, "unbound variable"))
    }
}

pub fn match_data() -> Vec<MatchPattern> {
    vec![
        MatchPattern::new(ARGUMENT_KIND, "argument(_1)", Argument::create),
        MatchPattern::new(VARIABLE_KIND, "variable(_1)", Variable::create),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::primitives::test_env;

    #[tokio::test]
    async fn test_argument_reads_runtime_args() {
        let p = Argument::create(CtorArgs::new(ARGUMENT_KIND, vec![Value::from(1.0).into()]), &test_env())
            .unwrap();
        let ctx = EvalContext::detached();
        let args = [Value::from("a"), Value::from("b")];
        assert_eq!(p.eval(&args, &ctx).await.unwrap(), Value::from("b"));

        let err = p.eval(&args[..1], &ctx).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidIndex);
    }

    #[test]
    fn test_argument_rejects_negative_position() {
        let err = Argument::create(CtorArgs::new(ARGUMENT_KIND, vec![Value::from(-1.0).into()]), &test_env())
            .err()
            .unwrap();
        assert_eq!(err.code(), ErrorCode::InvalidIndex);
    }

    #[tokio::test]
    async fn test_variable_reads_binding() {
        let p = Variable::new(PrimitiveMeta::new(VARIABLE_KIND, "", ""), "i");
        let ctx = EvalContext::detached();
        let err = p.eval(&[], &ctx).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidIndex);

        let ctx = ctx.with_binding("i", Value::from(3.0));
        assert_eq!(p.eval(&[], &ctx).await.unwrap(), Value::Scalar(3.0));
    }
}
