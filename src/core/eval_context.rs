use std::collections::HashMap;
use std::sync::{Arc, Weak};

use crate::cluster::handle::{LocalityId, PrimitiveHandle};
use crate::cluster::{Cluster, Substrate};
use crate::core::value::Value;
use crate::error::{PrimitiveError, PrimitiveResult};

/// Call-scoped state threaded through one evaluation.
///
/// Created fresh per top-level evaluation. The substrate is held weakly: an
/// in-flight evaluation never keeps the cluster alive, and a torn-down cluster
/// surfaces as a remote failure on the next handle invocation.
#[derive(Clone)]
pub struct EvalContext {
    substrate: Weak<dyn Substrate>,
    bindings: Arc<HashMap<String, Value>>,
}

impl EvalContext {
    pub fn new<S: Substrate + 'static>(substrate: &Arc<S>) -> Self {
        let substrate: Weak<S> = Arc::downgrade(substrate);
        Self {
            substrate,
            bindings: Arc::new(HashMap::new()),
        }
    }

    /// A context with no substrate; only literal operands can be evaluated.
    pub fn detached() -> Self {
        let substrate: Weak<Cluster> = Weak::new();
        Self {
            substrate,
            bindings: Arc::new(HashMap::new()),
        }
    }

    /// A copy of this context with `name` bound to `value`.
    pub fn with_binding(&self, name: impl Into<String>, value: Value) -> Self {
        let mut bindings = (*self.bindings).clone();
        bindings.insert(name.into(), value);
        Self {
            substrate: self.substrate.clone(),
            bindings: Arc::new(bindings),
        }
    }

    pub fn binding(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Evaluate the primitive behind `handle`, local or remote alike.
    pub async fn invoke(
        &self,
        handle: PrimitiveHandle,
        args: &[Value],
    ) -> PrimitiveResult<Value> {
        let substrate = self.substrate.upgrade().ok_or_else(|| {
            remote_failure(handle.locality, handle, "no substrate attached to context")
        })?;
        substrate.invoke(handle, args.to_vec(), self.clone()).await
    }
}

fn remote_failure(locality: LocalityId, handle: PrimitiveHandle, reason: &str) -> PrimitiveError {
    PrimitiveError::RemoteFailure {
        primitive: handle.to_string(),
        locality,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::handle::InstanceId;
    use crate::error::ErrorCode;

    #[test]
    fn test_bindings_are_copy_on_write() {
        let root = EvalContext::detached();
        let inner = root.with_binding("x", Value::from(1.0));
        assert_eq!(inner.binding("x"), Some(&Value::Scalar(1.0)));
        assert!(root.binding("x").is_none());
    }

    #[tokio::test]
    async fn test_detached_invoke_is_remote_failure() {
        let ctx = EvalContext::detached();
        let handle = PrimitiveHandle::new(LocalityId(0), InstanceId(1));
        let err = ctx.invoke(handle, &[]).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::RemoteFailure);
    }
}
