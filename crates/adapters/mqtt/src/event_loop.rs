//! Inbound half of the MQTT link.
//!
//! One task polls the rumqttc event loop. It never awaits a handler: every
//! publish is handed to its own task, and a semaphore bounds how many of
//! those run at once.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Packet, QoS};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use flamewatch_app::ports::TelemetryHandler;
use flamewatch_domain::telemetry::{DISCOVERY_FILTER, SENSOR_FILTER};

pub(crate) struct LinkState {
    pub client: AsyncClient,
    pub connected: Arc<AtomicBool>,
    pub max_in_flight: usize,
    pub reconnect_delay: Duration,
}

pub(crate) async fn run<H>(mut eventloop: EventLoop, link: LinkState, handler: Arc<H>)
where
    H: TelemetryHandler + Send + Sync + 'static,
{
    let permits = Arc::new(Semaphore::new(link.max_in_flight.max(1)));

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                link.connected.store(true, Ordering::Release);
                tracing::info!("MQTT connected");
                subscribe(&link.client);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                tracing::trace!(topic = %publish.topic, "MQTT message received");
                dispatch(
                    Arc::clone(&handler),
                    Arc::clone(&permits),
                    publish.topic,
                    publish.payload.to_vec(),
                );
            }
            Ok(_) => {}
            Err(err) => {
                if link.connected.swap(false, Ordering::AcqRel) {
                    tracing::warn!("MQTT connection lost");
                }
                tracing::warn!(
                    error = %err,
                    retry_in_secs = link.reconnect_delay.as_secs(),
                    "MQTT connection error"
                );
                tokio::time::sleep(link.reconnect_delay).await;
            }
        }
    }
}

// Sessions are clean, so subscriptions are reissued on every ConnAck.
fn subscribe(client: &AsyncClient) {
    for filter in [DISCOVERY_FILTER, SENSOR_FILTER] {
        match client.try_subscribe(filter, QoS::AtLeastOnce) {
            Ok(()) => tracing::debug!(filter, "MQTT subscription requested"),
            Err(err) => tracing::warn!(filter, error = %err, "MQTT subscribe failed"),
        }
    }
}

pub(crate) fn dispatch<H>(
    handler: Arc<H>,
    permits: Arc<Semaphore>,
    topic: String,
    payload: Vec<u8>,
) -> JoinHandle<()>
where
    H: TelemetryHandler + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let Ok(_permit) = permits.acquire_owned().await else {
            return;
        };
        handler.handle(&topic, &payload).await;
    })
}
