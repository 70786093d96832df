use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

use super::handle::{InstanceId, LocalityId, PrimitiveHandle};
use crate::core::eval_context::EvalContext;
use crate::core::value::Value;
use crate::error::{PrimitiveError, PrimitiveResult};
use crate::primitives::primitive::{ConstructorFn, CtorArgs, Primitive, PrimitiveEnv};

/// Requests a locality serves. Replies travel back on the enclosed channel.
pub(crate) enum Message {
    Spawn {
        instance: InstanceId,
        create: ConstructorFn,
        args: CtorArgs,
        reply: oneshot::Sender<PrimitiveResult<()>>,
    },
    Invoke {
        instance: InstanceId,
        args: Vec<Value>,
        ctx: EvalContext,
        reply: oneshot::Sender<PrimitiveResult<Value>>,
    },
    Destroy {
        instance: InstanceId,
        reply: oneshot::Sender<bool>,
    },
    Shutdown,
}

/// Caller-side end of a locality: its mailbox, or nothing once shut down.
pub(crate) struct Locality {
    id: LocalityId,
    mailbox: Mutex<Option<mpsc::Sender<Message>>>,
}

impl Locality {
    /// Start the locality's worker task. Needs a running tokio runtime.
    pub(crate) fn start(id: LocalityId, env: PrimitiveEnv, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        let worker = LocalityWorker {
            id,
            env,
            instances: HashMap::new(),
        };
        tokio::spawn(worker.run(rx));
        Self {
            id,
            mailbox: Mutex::new(Some(tx)),
        }
    }

    pub(crate) fn id(&self) -> LocalityId {
        self.id
    }

    pub(crate) fn mailbox(&self) -> Option<mpsc::Sender<Message>> {
        self.mailbox.lock().clone()
    }

    /// Detach the mailbox; later sends fail and the worker is told to stop.
    pub(crate) fn close(&self) -> Option<mpsc::Sender<Message>> {
        self.mailbox.lock().take()
    }
}

/// Owns the instances living on one locality.
///
/// Instances are only touched from this task. An evaluation clones the
/// instance's `Arc` into its own task, so destroying the instance never pulls
/// it out from under an in-flight call.
struct LocalityWorker {
    id: LocalityId,
    env: PrimitiveEnv,
    instances: HashMap<InstanceId, Arc<dyn Primitive>>,
}

impl LocalityWorker {
    async fn run(mut self, mut rx: mpsc::Receiver<Message>) {
        let mut tasks: JoinSet<()> = JoinSet::new();
        tracing::debug!(locality = %self.id, "locality started");
        loop {
            tokio::select! {
                message = rx.recv() => match message {
                    Some(Message::Shutdown) | None => break,
                    Some(message) => self.handle(message, &mut tasks),
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            tracing::error!(locality = %self.id, "evaluation task panicked");
                        }
                    }
                }
            }
        }
        // Dropping in-flight evaluations drops their reply senders; every
        // waiter then observes a remote failure.
        let abandoned = tasks.len();
        tasks.shutdown().await;
        tracing::info!(locality = %self.id, abandoned, "locality stopped");
    }

    fn handle(&mut self, message: Message, tasks: &mut JoinSet<()>) {
        match message {
            Message::Spawn {
                instance,
                create,
                args,
                reply,
            } => {
                let kind = args.kind.clone();
                let result = create(args, &self.env).map(|primitive| {
                    self.instances.insert(instance, primitive);
                });
                tracing::debug!(
                    locality = %self.id,
                    instance = instance.0,
                    kind = %kind,
                    ok = result.is_ok(),
                    "spawn"
                );
                let _ = reply.send(result);
            }
            Message::Invoke {
                instance,
                args,
                ctx,
                reply,
            } => match self.instances.get(&instance) {
                Some(primitive) => {
                    let primitive = Arc::clone(primitive);
                    tasks.spawn(async move {
                        let result = primitive.eval(&args, &ctx).await;
                        let _ = reply.send(result);
                    });
                }
                None => {
                    let handle = PrimitiveHandle::new(self.id, instance);
                    let _ = reply.send(Err(PrimitiveError::StaleHandle { handle }));
                }
            },
            Message::Destroy { instance, reply } => {
                let _ = reply.send(self.instances.remove(&instance).is_some());
            }
            Message::Shutdown => {}
        }
    }
}
