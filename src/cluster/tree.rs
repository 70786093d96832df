//! Execution trees: a root handle plus the instances built for it.

use std::sync::Arc;

use super::handle::{LocalityId, PrimitiveHandle};
use super::Cluster;
use crate::core::eval_context::EvalContext;
use crate::core::value::Value;
use crate::error::{PrimitiveError, PrimitiveResult};
use crate::primitives::primitive::Operand;

/// Builds a tree bottom-up, remembering every instance it creates.
pub struct TreeBuilder {
    cluster: Arc<Cluster>,
    nodes: Vec<PrimitiveHandle>,
}

impl TreeBuilder {
    pub fn new(cluster: &Arc<Cluster>) -> Self {
        Self {
            cluster: Arc::clone(cluster),
            nodes: Vec::new(),
        }
    }

    /// Create an unnamed node on `locality`.
    pub async fn node(
        &mut self,
        locality: LocalityId,
        kind: &str,
        operands: Vec<Operand>,
    ) -> PrimitiveResult<PrimitiveHandle> {
        self.named_node(locality, kind, operands, "", "").await
    }

    pub async fn named_node(
        &mut self,
        locality: LocalityId,
        kind: &str,
        operands: Vec<Operand>,
        name: &str,
        codename: &str,
    ) -> PrimitiveResult<PrimitiveHandle> {
        let handle = self
            .cluster
            .create(locality, kind, operands, name, codename)
            .await?;
        self.nodes.push(handle);
        Ok(handle)
    }

    pub fn nodes(&self) -> &[PrimitiveHandle] {
        &self.nodes
    }

    /// Finish with `root` as the tree's entry point.
    pub fn finish(self, root: PrimitiveHandle) -> ExecutionTree {
        ExecutionTree {
            root,
            cluster: self.cluster,
            nodes: self.nodes,
        }
    }

    /// Destroy everything created so far.
    pub async fn abandon(self) {
        for handle in self.nodes.into_iter().rev() {
            let _ = self.cluster.destroy(handle).await;
        }
    }
}

pub struct ExecutionTree {
    root: PrimitiveHandle,
    cluster: Arc<Cluster>,
    nodes: Vec<PrimitiveHandle>,
}

impl ExecutionTree {
    /// Wrap an existing root. `teardown` will only destroy the root.
    pub fn new(cluster: &Arc<Cluster>, root: PrimitiveHandle) -> Self {
        Self {
            root,
            cluster: Arc::clone(cluster),
            nodes: vec![root],
        }
    }

    pub fn root(&self) -> PrimitiveHandle {
        self.root
    }

    pub fn cluster(&self) -> &Arc<Cluster> {
        &self.cluster
    }

    /// Evaluate the root with a fresh context.
    pub async fn eval(&self, args: &[Value]) -> PrimitiveResult<Value> {
        self.eval_with(args, EvalContext::new(&self.cluster)).await
    }

    pub async fn eval_with(&self, args: &[Value], ctx: EvalContext) -> PrimitiveResult<Value> {
        tracing::debug!(root = %self.root, args = args.len(), "evaluating tree");
        ctx.invoke(self.root, args).await
    }

    /// Destroy the tree's instances, last created first. Returns the first
    /// failure after attempting every instance.
    pub async fn teardown(self) -> PrimitiveResult<()> {
        let mut first: Option<PrimitiveError> = None;
        for handle in self.nodes.into_iter().rev() {
            if let Err(e) = self.cluster.destroy(handle).await {
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }
}
