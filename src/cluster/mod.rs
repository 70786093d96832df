//! In-process cluster of localities and the distributed factory.
//!
//! Each locality is a worker task owning the primitive instances placed on it.
//! Every interaction (spawn, invoke, destroy) is a message to that task, so a
//! handle behaves the same whether the caller sits on the same locality or not.

pub mod handle;
mod locality;
pub mod tree;

pub use handle::{InstanceId, LocalityId, PrimitiveHandle};
pub use tree::{ExecutionTree, TreeBuilder};

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::core::config::EngineConfig;
use crate::core::eval_context::EvalContext;
use crate::core::value::Value;
use crate::error::{EngineResult, PrimitiveError, PrimitiveResult};
use crate::primitives::primitive::{CtorArgs, Operand, PrimitiveEnv};
use crate::registry::PatternRegistry;
use crate::sink::{FileSink, Sink};

use locality::{Locality, Message};

/// The distributed substrate contract the core relies on.
#[async_trait]
pub trait Substrate: Send + Sync {
    /// Construct a primitive of `args.kind` on `locality`.
    async fn spawn_at(&self, locality: LocalityId, args: CtorArgs) -> PrimitiveResult<PrimitiveHandle>;

    /// Evaluate the primitive behind `handle`.
    async fn invoke(
        &self,
        handle: PrimitiveHandle,
        args: Vec<Value>,
        ctx: EvalContext,
    ) -> PrimitiveResult<Value>;
}

pub struct Cluster {
    localities: Vec<Locality>,
    registry: Arc<PatternRegistry>,
    next_instance: AtomicU64,
}

impl Cluster {
    /// Start a cluster writing through a [`FileSink`] rooted at `config.sink_root`.
    pub fn from_config(config: EngineConfig) -> EngineResult<Arc<Cluster>> {
        let sink = Arc::new(FileSink::new(config.sink_root.clone()));
        Cluster::new(config, sink)
    }

    /// Start `config.localities` localities. Needs a running tokio runtime.
    pub fn new(config: EngineConfig, sink: Arc<dyn Sink>) -> EngineResult<Arc<Cluster>> {
        Cluster::with_registry(config, sink, PatternRegistry::global())
    }

    pub fn with_registry(
        config: EngineConfig,
        sink: Arc<dyn Sink>,
        registry: Arc<PatternRegistry>,
    ) -> EngineResult<Arc<Cluster>> {
        config.validate()?;
        let capacity = config.mailbox_capacity;
        let env = PrimitiveEnv::new(config.clone(), sink);
        let localities = (0..config.localities)
            .map(|i| Locality::start(LocalityId(i as u32), env.clone(), capacity))
            .collect();
        tracing::info!(localities = config.localities, "cluster started");
        Ok(Arc::new(Cluster {
            localities,
            registry,
            next_instance: AtomicU64::new(1),
        }))
    }

    /// The locality callers run on by default.
    pub fn here(&self) -> LocalityId {
        LocalityId(0)
    }

    pub fn localities(&self) -> Vec<LocalityId> {
        self.localities.iter().map(Locality::id).collect()
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    /// Create a `kind` primitive on `locality` and return its handle.
    ///
    /// Only captures operands and labels: nothing is evaluated. Fails with
    /// `UnknownKind` when no constructor is registered for `kind`.
    pub async fn create(
        &self,
        locality: LocalityId,
        kind: &str,
        operands: Vec<Operand>,
        name: &str,
        codename: &str,
    ) -> PrimitiveResult<PrimitiveHandle> {
        let args = CtorArgs::new(kind, operands)
            .with_name(name)
            .with_codename(codename);
        self.spawn_at(locality, args).await
    }

    /// Destroy the instance behind `handle`. In-flight evaluations finish;
    /// later ones fail with `StaleHandle`.
    pub async fn destroy(&self, handle: PrimitiveHandle) -> PrimitiveResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(handle.locality, &handle.to_string(), Message::Destroy {
            instance: handle.instance,
            reply,
        })
        .await?;
        let removed = rx
            .await
            .map_err(|_| remote_failure(&handle.to_string(), handle.locality, "locality stopped"))?;
        if removed {
            Ok(())
        } else {
            Err(PrimitiveError::StaleHandle { handle })
        }
    }

    /// Stop a locality. In-flight and later calls to it fail with `RemoteFailure`.
    pub async fn shutdown_locality(&self, locality: LocalityId) {
        let Some(mailbox) = self.find(locality).and_then(Locality::close) else {
            return;
        };
        let _ = mailbox.send(Message::Shutdown).await;
        tracing::info!(locality = %locality, "locality shut down");
    }

    pub async fn shutdown(&self) {
        for locality in self.localities() {
            self.shutdown_locality(locality).await;
        }
    }

    fn find(&self, locality: LocalityId) -> Option<&Locality> {
        self.localities.get(locality.0 as usize)
    }

    async fn send(&self, locality: LocalityId, primitive: &str, message: Message) -> PrimitiveResult<()> {
        let mailbox = self
            .find(locality)
            .ok_or_else(|| remote_failure(primitive, locality, "unknown locality"))?
            .mailbox()
            .ok_or_else(|| remote_failure(primitive, locality, "locality is shut down"))?;
        mailbox
            .send(message)
            .await
            .map_err(|_| remote_failure(primitive, locality, "locality is unreachable"))
    }
}

#[async_trait]
impl Substrate for Cluster {
    async fn spawn_at(&self, locality: LocalityId, args: CtorArgs) -> PrimitiveResult<PrimitiveHandle> {
        let create = self.registry.find_constructor(&args.kind)?;
        let instance = InstanceId(self.next_instance.fetch_add(1, Ordering::Relaxed));
        let primitive = args.meta().diagnostic_name();
        let (reply, rx) = oneshot::channel();
        self.send(locality, &primitive, Message::Spawn {
            instance,
            create,
            args,
            reply,
        })
        .await?;
        rx.await
            .map_err(|_| remote_failure(&primitive, locality, "locality stopped during construction"))??;
        Ok(PrimitiveHandle::new(locality, instance))
    }

    async fn invoke(
        &self,
        handle: PrimitiveHandle,
        args: Vec<Value>,
        ctx: EvalContext,
    ) -> PrimitiveResult<Value> {
        let primitive = handle.to_string();
        let (reply, rx) = oneshot::channel();
        self.send(handle.locality, &primitive, Message::Invoke {
            instance: handle.instance,
            args,
            ctx,
            reply,
        })
        .await?;
        rx.await
            .map_err(|_| remote_failure(&primitive, handle.locality, "evaluation abandoned"))?
    }
}

fn remote_failure(primitive: &str, locality: LocalityId, reason: &str) -> PrimitiveError {
    tracing::warn!(primitive = %primitive, locality = %locality, reason, "remote failure");
    PrimitiveError::RemoteFailure {
        primitive: primitive.to_string(),
        locality,
        reason: reason.to_string(),
    }
}
