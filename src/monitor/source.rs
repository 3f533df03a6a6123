//! Raw bus subscriptions feeding the daemon loop.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tracing::{debug, info, warn};
use zbus::fdo::PropertiesProxy;
use zbus::message::Type as MessageType;
use zbus::zvariant::{Structure, Value};
use zbus::{Connection, MatchRule, MessageStream};

use crate::error::{MonitorError, MonitorResult, WifiError, WifiResult};
use crate::event::BusSignal;
use crate::monitor::vocabulary::Vocabulary;
use crate::network::dbus_proxies::*;
use crate::network::facade::ClientLink;
use crate::network::supplicant::ov_to_string;

const UNIT_INTERFACE: &str = "org.freedesktop.systemd1.Unit";

/// Where raw notifications come from.
///
/// `subscribe` failing is fatal to the daemon. `unsubscribe` failing is
/// reported but never keeps the daemon running.
#[async_trait]
pub trait SignalSource: Send {
    async fn subscribe(&mut self) -> MonitorResult<BoxStream<'static, BusSignal>>;

    async fn unsubscribe(&mut self) -> MonitorResult<()>;
}

/// Subscribes to the supplicant interface, the access point unit and the
/// lease manager on the system bus.
pub struct DbusSignalSource {
    connection: Connection,
    client: Arc<dyn ClientLink>,
    hotspot_unit: String,
    vocabulary: Vocabulary,
}

impl DbusSignalSource {
    pub fn new(
        connection: Connection,
        client: Arc<dyn ClientLink>,
        hotspot_unit: impl Into<String>,
        vocabulary: Vocabulary,
    ) -> Self {
        Self {
            connection,
            client,
            hotspot_unit: hotspot_unit.into(),
            vocabulary,
        }
    }

    async fn client_stream(&self) -> WifiResult<BoxStream<'static, BusSignal>> {
        let path = self.client.interface_path().await?;
        let proxy = WpaInterfaceProxy::builder(&self.connection)
            .path(path.clone())?
            .build()
            .await?;
        let changes = proxy.receive_properties_changed().await?;
        debug!("Watching supplicant interface {}", path);

        Ok(changes
            .filter_map(|signal| async move {
                let args = signal.args().ok()?;
                let state = args.properties().get("State").and_then(ov_to_string)?;
                Some(BusSignal::ClientProperties { state: Some(state) })
            })
            .boxed())
    }

    async fn hotspot_stream(&self) -> WifiResult<BoxStream<'static, BusSignal>> {
        let path = unit_object_path(&self.hotspot_unit);
        let proxy = PropertiesProxy::builder(&self.connection)
            .destination(SYSTEMD_SERVICE)?
            .path(path)?
            .build()
            .await?;
        let changes = proxy.receive_properties_changed().await?;
        debug!("Watching unit {}", self.hotspot_unit);

        Ok(changes
            .filter_map(|signal| async move {
                let args = signal.args().ok()?;
                if args.interface_name().as_str() != UNIT_INTERFACE {
                    return None;
                }
                let changed = args.changed_properties();
                Some(BusSignal::UnitProperties {
                    active_state: changed.get("ActiveState").and_then(value_string),
                    sub_state: changed.get("SubState").and_then(value_string),
                })
            })
            .boxed())
    }

    async fn lease_stream(&self, member: &'static str) -> WifiResult<BoxStream<'static, BusSignal>> {
        let rule = MatchRule::builder()
            .msg_type(MessageType::Signal)
            .sender(DNSMASQ_SERVICE)?
            .interface(DNSMASQ_SERVICE)?
            .path(DNSMASQ_PATH)?
            .member(member)?
            .build();
        let messages = MessageStream::for_match_rule(rule, &self.connection, None).await?;

        Ok(messages
            .filter_map(move |msg| async move {
                let msg = match msg {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!("Dropped malformed {} message: {}", member, e);
                        return None;
                    }
                };
                let body = msg.body();
                let fields = match body.deserialize::<Structure<'_>>() {
                    Ok(body) => body.fields().iter().map(field_string).collect(),
                    Err(_) => Vec::new(),
                };
                Some(BusSignal::Lease {
                    member: member.to_string(),
                    fields,
                })
            })
            .boxed())
    }

    async fn open(&self) -> WifiResult<BoxStream<'static, BusSignal>> {
        // Unit PropertiesChanged is only emitted to subscribed clients
        SystemdManagerProxy::new(&self.connection)
            .await?
            .subscribe()
            .await?;

        let mut streams = vec![self.client_stream().await?, self.hotspot_stream().await?];
        for member in self.vocabulary.lease_members() {
            streams.push(self.lease_stream(member).await?);
        }
        Ok(stream::select_all(streams).boxed())
    }
}

#[async_trait]
impl SignalSource for DbusSignalSource {
    async fn subscribe(&mut self) -> MonitorResult<BoxStream<'static, BusSignal>> {
        let signals = self.open().await.map_err(MonitorError::Initialize)?;
        info!(
            unit = %self.hotspot_unit,
            vocabulary = ?self.vocabulary,
            "Subscribed to service signals"
        );
        Ok(signals)
    }

    async fn unsubscribe(&mut self) -> MonitorResult<()> {
        let manager = SystemdManagerProxy::new(&self.connection)
            .await
            .map_err(|e| MonitorError::Teardown(WifiError::from(e)))?;
        manager
            .unsubscribe()
            .await
            .map_err(|e| MonitorError::Teardown(WifiError::from(e)))?;
        info!("Unsubscribed from service signals");
        Ok(())
    }
}

fn value_string(v: &Value<'_>) -> Option<String> {
    match v {
        Value::Str(s) => Some(s.to_string()),
        _ => None,
    }
}

fn field_string(v: &Value<'_>) -> String {
    match v {
        Value::Str(s) => s.to_string(),
        Value::U32(n) => n.to_string(),
        Value::I32(n) => n.to_string(),
        other => format!("{other:?}"),
    }
}
