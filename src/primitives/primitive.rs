use async_trait::async_trait;
use futures::future::try_join_all;
use std::fmt;
use std::sync::Arc;

use crate::cluster::handle::PrimitiveHandle;
use crate::core::config::EngineConfig;
use crate::core::eval_context::EvalContext;
use crate::core::value::Value;
use crate::error::{PrimitiveError, PrimitiveResult};
use crate::sink::Sink;

/// Trait for execution-tree nodes. Each primitive kind implements this.
///
/// Operands are captured at construction; `eval` may be called repeatedly and
/// concurrently on the same instance, so implementations keep no mutable state.
#[async_trait]
pub trait Primitive: Send + Sync {
    fn meta(&self) -> &PrimitiveMeta;

    /// Side-effecting primitives are not referentially transparent.
    fn is_side_effecting(&self) -> bool {
        false
    }

    /// Evaluate the node with the runtime `args`.
    async fn eval(&self, args: &[Value], ctx: &EvalContext) -> PrimitiveResult<Value>;
}

/// Diagnostic labels attached to every instance. Never used for dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimitiveMeta {
    pub kind: String,
    pub name: String,
    pub codename: String,
}

impl PrimitiveMeta {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, codename: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            codename: codename.into(),
        }
    }

    /// The label errors carry: the name when set, else the kind, plus the codename.
    pub fn diagnostic_name(&self) -> String {
        let base = if self.name.is_empty() { &self.kind } else { &self.name };
        if self.codename.is_empty() {
            base.clone()
        } else {
            format!("{} ({})", base, self.codename)
        }
    }

    pub fn arity_mismatch(&self, expected: impl Into<String>, actual: usize) -> PrimitiveError {
        PrimitiveError::ArityMismatch {
            primitive: self.diagnostic_name(),
            expected: expected.into(),
            actual,
        }
    }

    pub fn type_mismatch(
        &self,
        position: usize,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> PrimitiveError {
        PrimitiveError::TypeMismatch {
            primitive: self.diagnostic_name(),
            position,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_index(&self, index: impl fmt::Display, reason: impl Into<String>) -> PrimitiveError {
        PrimitiveError::InvalidIndex {
            primitive: self.diagnostic_name(),
            index: index.to_string(),
            reason: reason.into(),
        }
    }

    pub fn shape_mismatch(&self, shape: Vec<usize>, reason: impl Into<String>) -> PrimitiveError {
        PrimitiveError::ShapeMismatch {
            primitive: self.diagnostic_name(),
            shape,
            reason: reason.into(),
        }
    }
}

/// A child of a primitive: a literal value or a handle to another primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    Node(PrimitiveHandle),
}

impl Operand {
    /// Resolve to a value. Literals are cloned, nodes are invoked with `args`.
    pub async fn value(&self, args: &[Value], ctx: &EvalContext) -> PrimitiveResult<Value> {
        match self {
            Operand::Literal(v) => Ok(v.clone()),
            Operand::Node(handle) => ctx.invoke(*handle, args).await,
        }
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Operand::Literal(v) => Some(v),
            Operand::Node(_) => None,
        }
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Literal(v)
    }
}

impl From<PrimitiveHandle> for Operand {
    fn from(h: PrimitiveHandle) -> Self {
        Operand::Node(h)
    }
}

/// Evaluate all operands concurrently.
///
/// Results keep operand order whatever order the futures complete in. The first
/// failure observed aborts the rest and is returned as is.
pub async fn evaluate_operands(
    operands: &[Operand],
    args: &[Value],
    ctx: &EvalContext,
) -> PrimitiveResult<Vec<Value>> {
    try_join_all(operands.iter().map(|op| op.value(args, ctx))).await
}

/// Constructor input: operands plus diagnostic labels.
#[derive(Debug, Clone)]
pub struct CtorArgs {
    pub kind: String,
    pub operands: Vec<Operand>,
    pub name: String,
    pub codename: String,
}

impl CtorArgs {
    pub fn new(kind: impl Into<String>, operands: Vec<Operand>) -> Self {
        Self {
            kind: kind.into(),
            operands,
            name: String::new(),
            codename: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_codename(mut self, codename: impl Into<String>) -> Self {
        self.codename = codename.into();
        self
    }

    pub fn meta(&self) -> PrimitiveMeta {
        PrimitiveMeta::new(self.kind.clone(), self.name.clone(), self.codename.clone())
    }

    /// Check the operand count lies in `min..=max`.
    pub fn expect_arity(&self, min: usize, max: usize) -> PrimitiveResult<()> {
        let actual = self.operands.len();
        if actual < min || actual > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{}..={}", min, max)
            };
            return Err(self.meta().arity_mismatch(expected, actual));
        }
        Ok(())
    }

    /// Read a string literal operand without evaluating anything.
    pub fn literal_string(&self, position: usize) -> PrimitiveResult<String> {
        match self.operands.get(position) {
            Some(Operand::Literal(Value::String(s))) => Ok(s.clone()),
            Some(Operand::Literal(other)) => Err(self.meta().type_mismatch(
                position,
                "string literal",
                other.variant_name(),
            )),
            Some(Operand::Node(_)) => Err(self.meta().type_mismatch(position, "string literal", "node")),
            None => Err(self.meta().arity_mismatch(format!("at least {}", position + 1), self.operands.len())),
        }
    }
}

/// Shared services each locality hands to constructors.
#[derive(Clone)]
pub struct PrimitiveEnv {
    pub config: Arc<EngineConfig>,
    pub sink: Arc<dyn Sink>,
}

impl PrimitiveEnv {
    pub fn new(config: EngineConfig, sink: Arc<dyn Sink>) -> Self {
        Self {
            config: Arc::new(config),
            sink,
        }
    }
}

/// Builds a primitive from its constructor arguments. Must not evaluate anything.
pub type ConstructorFn = fn(CtorArgs, &PrimitiveEnv) -> PrimitiveResult<Arc<dyn Primitive>>;
