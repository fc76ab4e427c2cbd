pub mod world_events;

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::Arc,
};

use tokio::{runtime::Handle, sync::RwLock};

pub trait Event: Send + Sync + 'static {
    /// What a listener may hand back to the dispatcher.
    type Output: Send + 'static;
}

type ErasedEvent = Arc<dyn Any + Send + Sync>;
type ErasedOutput = Box<dyn Any + Send>;
type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type Handler = Box<dyn Fn(ErasedEvent) -> BoxFuture<Option<ErasedOutput>> + Send + Sync>;

struct Listener {
    lazy: bool,
    handler: Handler,
}

//
// Listeners must not hold registry locks across the dispatch; events posted
// from the world registry are delivered on a separate task.
//

pub struct EventBus {
    listeners: RwLock<HashMap<TypeId, Vec<Listener>>>,
    /// Where [`EventBus::post`] spawns deliveries made from plain threads.
    runtime: Option<Handle>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Creates a bus bound to the tokio runtime it is built in, if any.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::default(),
            runtime: Handle::try_current().ok(),
        }
    }

    pub fn with_runtime(runtime: Handle) -> Self {
        Self {
            listeners: RwLock::default(),
            runtime: Some(runtime),
        }
    }

    /// Registers `callback` for events of type `E`.
    ///
    /// Lazy listeners are spawned and never contribute a result; eager ones
    /// are awaited in registration order by [`EventBus::dispatch`].
    pub async fn listen<E, F, Fut>(&self, lazy: bool, callback: F)
    where
        E: Event,
        F: Fn(Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<E::Output>> + Send + 'static,
    {
        let handler: Handler = Box::new(move |event: ErasedEvent| {
            let pending = event.downcast::<E>().ok().map(&callback);
            Box::pin(async move {
                match pending {
                    Some(fut) => fut.await.map(|out| Box::new(out) as ErasedOutput),
                    None => None,
                }
            }) as BoxFuture<Option<ErasedOutput>>
        });

        self.listeners
            .write()
            .await
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Listener { lazy, handler });
    }

    /// Delivers `event` and returns the result of the last eager listener
    /// that produced one.
    pub async fn dispatch<E: Event>(&self, event: Arc<E>) -> Option<E::Output> {
        let erased: ErasedEvent = event;
        let mut eager = Vec::new();

        {
            let listeners = self.listeners.read().await;
            for listener in listeners.get(&TypeId::of::<E>()).into_iter().flatten() {
                let fut = (listener.handler)(Arc::clone(&erased));
                if listener.lazy {
                    tokio::spawn(async move {
                        let _ = fut.await;
                    });
                } else {
                    eager.push(fut);
                }
            }
        }

        let mut last_result = None;
        for fut in eager {
            if let Some(out) = fut.await {
                if let Ok(out) = out.downcast::<E::Output>() {
                    last_result = Some(*out);
                }
            }
        }
        last_result
    }

    /// Fire-and-forget delivery for synchronous callers.
    ///
    /// Spawns the dispatch on the runtime the bus was bound to, so callers on
    /// threads outside tokio still get their events delivered. An unbound bus
    /// falls back to the caller's runtime and drops the event without one.
    pub fn post<E: Event>(self: &Arc<Self>, event: E) {
        let runtime = self.runtime.clone().or_else(|| Handle::try_current().ok());
        match runtime {
            Some(runtime) => {
                let bus = Arc::clone(self);
                runtime.spawn(async move {
                    bus.dispatch(Arc::new(event)).await;
                });
            }
            None => {
                tracing::warn!(
                    event = std::any::type_name::<E>(),
                    "event bus has no async runtime, dropping event"
                );
            }
        }
    }

    pub async fn listener_count<E: Event>(&self) -> usize {
        self.listeners
            .read()
            .await
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }
}
