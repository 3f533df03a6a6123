//! The event loop: one task that owns the subscriptions, the normalizer and
//! the dispatcher, and drives connection-attempt timeouts.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::control::{OnConnect, SharedController};
use crate::error::MonitorResult;
use crate::event::{BusSignal, NormalizedEvent};
use crate::monitor::dispatch::{Args, Callback, Dispatcher};
use crate::monitor::normalizer::Normalizer;
use crate::monitor::source::SignalSource;

/// Stops a running [`Daemon`] from any task
#[derive(Clone)]
pub struct ShutdownHandle(Arc<watch::Sender<bool>>);

impl ShutdownHandle {
    pub fn stop(&self) {
        self.0.send_replace(true);
    }
}

pub struct Daemon<S> {
    source: S,
    signals: Option<BoxStream<'static, BusSignal>>,
    normalizer: Normalizer,
    dispatcher: Dispatcher,
    controller: SharedController,
    shutdown: Arc<watch::Sender<bool>>,
}

impl<S: SignalSource> Daemon<S> {
    /// The controller's connect-result handler is registered first on
    /// `CLIENT_CONNECTED`, ahead of any user callback. It releases the
    /// controller before running the attempt's own callback.
    pub fn new(source: S, normalizer: Normalizer, controller: SharedController) -> Self {
        let mut dispatcher = Dispatcher::new();
        let ctl = controller.clone();
        dispatcher.register(
            NormalizedEvent::ClientConnected,
            Callback::new("connect_result", move |event, _payload, _args| {
                let ctl = ctl.clone();
                async move {
                    let resolved = ctl.lock().await.on_client_event(event).await;
                    if let Some(resolved) = resolved {
                        resolved.notify().await;
                    }
                    Ok(())
                }
            }),
            Args::default(),
        );

        let (shutdown, _) = watch::channel(false);
        Self {
            source,
            signals: None,
            normalizer,
            dispatcher,
            controller,
            shutdown: Arc::new(shutdown),
        }
    }

    pub fn register(&mut self, event: NormalizedEvent, callback: Callback, args: Args) {
        self.dispatcher.register(event, callback, args);
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.shutdown.clone())
    }

    /// Establish the bus subscriptions ahead of [`Daemon::run`], so that an
    /// action taken in between cannot race its own notification.
    pub async fn subscribe(&mut self) -> MonitorResult<()> {
        if self.signals.is_none() {
            self.signals = Some(self.source.subscribe().await?);
            self.normalizer.prime().await;
        }
        Ok(())
    }

    /// Join `network` with the subscriptions in place before the attempt is
    /// armed. Client mode comes first since the supplicant interface only
    /// exists while it runs. If subscribing still fails, hotspot mode is
    /// restored and nothing is armed.
    pub async fn begin_connect(
        &mut self,
        network: &str,
        on_result: OnConnect,
        timeout: Duration,
    ) -> MonitorResult<()> {
        let client_up = self.controller.lock().await.ensure_client_mode().await;
        if client_up {
            if let Err(e) = self.subscribe().await {
                warn!("Cannot watch signals for '{}', restoring hotspot", network);
                self.controller.lock().await.enter_hotspot_mode().await;
                return Err(e);
            }
        }

        let resolved = self
            .controller
            .lock()
            .await
            .connect_with(network, on_result, timeout)
            .await;
        if let Some(resolved) = resolved {
            resolved.notify().await;
        }
        Ok(())
    }

    /// Subscribe if needed, then process signals one at a time until shutdown
    /// or until the signal stream ends. Unsubscribes on the way out.
    pub async fn run(&mut self) -> MonitorResult<()> {
        self.subscribe().await?;
        let Some(mut signals) = self.signals.take() else {
            return Ok(());
        };

        let mut deadlines = self.controller.lock().await.deadline_receiver();
        let mut shutdown = self.shutdown.subscribe();
        info!(vocabulary = ?self.normalizer.vocabulary(), "Monitor running");

        loop {
            if *shutdown.borrow_and_update() {
                info!("Shutdown requested");
                break;
            }
            let deadline = *deadlines.borrow_and_update();

            tokio::select! {
                biased;

                _ = shutdown.changed() => {}

                changed = deadlines.changed() => {
                    if changed.is_err() {
                        warn!("Controller dropped, stopping monitor");
                        break;
                    }
                }

                _ = sleep_until_opt(deadline) => {
                    let resolved = self.controller.lock().await.expire_attempt().await;
                    if let Some(resolved) = resolved {
                        resolved.notify().await;
                    }
                }

                signal = signals.next() => match signal {
                    Some(signal) => self.handle(signal).await,
                    None => {
                        warn!("Signal stream ended");
                        break;
                    }
                },
            }
        }

        drop(signals);
        if let Err(e) = self.source.unsubscribe().await {
            error!(error = e.as_label(), "{}", e);
            return Err(e);
        }
        Ok(())
    }

    async fn handle(&mut self, signal: BusSignal) {
        let Some((event, payload)) = self.normalizer.normalize(signal).await else {
            return;
        };
        debug!(%event, "Dispatching");
        self.dispatcher.dispatch(event, &payload).await;
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
