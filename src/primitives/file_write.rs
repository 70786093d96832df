use async_trait::async_trait;
use std::sync::Arc;

use super::primitive::{CtorArgs, Operand, Primitive, PrimitiveEnv, PrimitiveMeta};
use crate::cluster::handle::{LocalityId, PrimitiveHandle};
use crate::cluster::Cluster;
use crate::core::eval_context::EvalContext;
use crate::core::value::Value;
use crate::error::PrimitiveResult;
use crate::registry::MatchPattern;
use crate::sink::Sink;

pub const FILE_WRITE_KIND: &str = "file_write";

/// Persists the value of its operand to a named sink destination.
///
/// Not referentially transparent: each evaluation writes again, replacing
/// whatever the destination held. Failures are reported, never retried.
pub struct FileWrite {
    meta: PrimitiveMeta,
    destination: String,
    operand: Operand,
    sink: Arc<dyn Sink>,
}

impl FileWrite {
    pub fn new(
        meta: PrimitiveMeta,
        destination: impl Into<String>,
        operand: Operand,
        sink: Arc<dyn Sink>,
    ) -> Self {
        Self {
            meta,
            destination: destination.into(),
            operand,
            sink,
        }
    }

    /// `file_write("dest", x)`: the destination is read off the literal here,
    /// leaving `x` as the single evaluated operand.
    pub fn create(args: CtorArgs, env: &PrimitiveEnv) -> PrimitiveResult<Arc<dyn Primitive>> {
        args.expect_arity(2, 2)?;
        let destination = args.literal_string(0)?;
        let meta = args.meta();
        let operand = args
            .operands
            .into_iter()
            .nth(1)
            .ok_or_else(|| meta.arity_mismatch("2", 1))?;
        Ok(Arc::new(FileWrite::new(
            meta,
            destination,
            operand,
            env.sink.clone(),
        )))
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }
}

#[async_trait]
impl Primitive for FileWrite {
    fn meta(&self) -> &PrimitiveMeta {
        &self.meta
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    async fn eval(&self, args: &[Value], ctx: &EvalContext) -> PrimitiveResult<Value> {
        let value = self.operand.value(args, ctx).await?;
        if let Err(e) = self.sink.write(&self.destination, &value).await {
            tracing::warn!(
                primitive = %self.meta.diagnostic_name(),
                destination = %self.destination,
                error = %e,
                "file_write failed"
            );
            return Err(e.into_primitive_error(&self.meta.diagnostic_name()));
        }
        tracing::debug!(
            primitive = %self.meta.diagnostic_name(),
            destination = %self.destination,
            variant = value.variant_name(),
            "value written"
        );
        Ok(Value::Nil)
    }
}

pub fn match_data() -> Vec<MatchPattern> {
    vec![MatchPattern::new(
        FILE_WRITE_KIND,
        "file_write(_1, _2)",
        FileWrite::create,
    )]
}

pub async fn create_file_write(
    cluster: &Cluster,
    locality: LocalityId,
    destination: &str,
    operand: Operand,
    name: &str,
    codename: &str,
) -> PrimitiveResult<PrimitiveHandle> {
    cluster
        .create(
            locality,
            FILE_WRITE_KIND,
            vec![Operand::Literal(Value::from(destination)), operand],
            name,
            codename,
        )
        .await
}
