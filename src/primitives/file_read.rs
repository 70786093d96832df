use async_trait::async_trait;
use std::sync::Arc;

use super::primitive::{CtorArgs, Primitive, PrimitiveEnv, PrimitiveMeta};
use crate::core::eval_context::EvalContext;
use crate::core::value::Value;
use crate::error::PrimitiveResult;
use crate::registry::MatchPattern;
use crate::sink::Sink;

pub const FILE_READ_KIND: &str = "file_read";

/// Loads the value stored at a sink destination.
pub struct FileRead {
    meta: PrimitiveMeta,
    destination: String,
    sink: Arc<dyn Sink>,
}

impl FileRead {
    pub fn new(meta: PrimitiveMeta, destination: impl Into<String>, sink: Arc<dyn Sink>) -> Self {
        Self {
            meta,
            destination: destination.into(),
            sink,
        }
    }

    pub fn create(args: CtorArgs, env: &PrimitiveEnv) -> PrimitiveResult<Arc<dyn Primitive>> {
        args.expect_arity(1, 1)?;
        let destination = args.literal_string(0)?;
        Ok(Arc::new(FileRead::new(args.meta(), destination, env.sink.clone())))
    }
}

#[async_trait]
impl Primitive for FileRead {
    fn meta(&self) -> &PrimitiveMeta {
        &self.meta
    }

    // The result depends on external state.
    fn is_side_effecting(&self) -> bool {
        true
    }

    async fn eval(&self, _args: &[Value], _ctx: &EvalContext) -> PrimitiveResult<Value> {
        self.sink
            .read(&self.destination)
            .await
            .map_err(|e| e.into_primitive_error(&self.meta.diagnostic_name()))
    }
}

pub fn match_data() -> Vec<MatchPattern> {
    vec![MatchPattern::new(
        FILE_READ_KIND,
        "file_read(_1)",
        FileRead::create,
    )]
}
