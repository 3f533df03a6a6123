//! # Callback dispatcher
//!
//! Maps each [`NormalizedEvent`] to an ordered list of `(callback, args)`
//! subscriptions and invokes them one after another.
//!
//! ## Rules
//! - Registration order is invocation order.
//! - Registering the same callback twice invokes it twice.
//! - An error or panic in one callback is logged with the callback's name and
//!   does not stop the remaining callbacks of the same dispatch.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use color_eyre::eyre;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{error, trace};

use crate::event::{NormalizedEvent, Payload};

/// Fixed arguments captured at registration time and passed on every call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args(Vec<String>);

impl Args {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(args.into_iter().map(Into::into).collect())
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

type Handler =
    dyn Fn(NormalizedEvent, Payload, Args) -> BoxFuture<'static, eyre::Result<()>> + Send + Sync;

/// A named event handler.
#[derive(Clone)]
pub struct Callback {
    name: String,
    handler: Arc<Handler>,
}

impl Callback {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(NormalizedEvent, Payload, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = eyre::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(move |event, payload, args| f(event, payload, args).boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callback").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone)]
struct Subscription {
    callback: Callback,
    args: Args,
}

/// Multi-key registry of event callbacks.
#[derive(Debug, Default)]
pub struct Dispatcher {
    subscriptions: HashMap<NormalizedEvent, Vec<Subscription>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `callback` to the list for `event`
    pub fn register(&mut self, event: NormalizedEvent, callback: Callback, args: Args) {
        self.subscriptions
            .entry(event)
            .or_default()
            .push(Subscription { callback, args });
    }

    /// Number of subscriptions for `event`
    pub fn registered(&self, event: NormalizedEvent) -> usize {
        self.subscriptions.get(&event).map(Vec::len).unwrap_or(0)
    }

    /// Invoke every callback registered for `event` in registration order.
    /// Returns how many callbacks completed without error.
    pub async fn dispatch(&self, event: NormalizedEvent, payload: &Payload) -> usize {
        let Some(subscriptions) = self.subscriptions.get(&event) else {
            trace!("No callbacks for {}", event);
            return 0;
        };

        let mut succeeded = 0;
        for sub in subscriptions {
            let name = sub.callback.name();
            let handler = &sub.callback.handler;

            // The handler itself may panic before handing back a future
            let fut = match std::panic::catch_unwind(AssertUnwindSafe(|| {
                handler(event, payload.clone(), sub.args.clone())
            })) {
                Ok(fut) => fut,
                Err(_) => {
                    error!(callback = name, %event, "Callback panicked");
                    continue;
                }
            };

            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(())) => succeeded += 1,
                Ok(Err(e)) => {
                    error!(callback = name, %event, "Callback execution error: {e:#}");
                }
                Err(_) => {
                    error!(callback = name, %event, "Callback panicked");
                }
            }
        }
        succeeded
    }
}
