//! Prometheus counters fed from the request event channel.
use nearby_engine::RequestEvent;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

pub struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
    provider_responses: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("nearby_requests_total", "Request lifecycle events"),
            &["event"],
        )?;
        let provider_responses = IntCounterVec::new(
            Opts::new("nearby_provider_responses_total", "Provider responses by outcome"),
            &["response"],
        )?;
        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(provider_responses.clone()))?;

        Ok(Self {
            registry,
            requests,
            provider_responses,
        })
    }

    pub fn observe(&self, event: &RequestEvent) {
        self.requests.with_label_values(&[event.name()]).inc();

        match event {
            RequestEvent::ProviderResponded { response, .. } => {
                self.provider_responses
                    .with_label_values(&[response.label()])
                    .inc();
            }
            // Silence is never committed, so it is only visible in the summary
            RequestEvent::Settled { summary, .. } if summary.no_response > 0 => {
                self.provider_responses
                    .with_label_values(&["no_response"])
                    .inc_by(summary.no_response as u64);
            }
            _ => {}
        }
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        encode(&self.registry)
    }
}

pub fn encode(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}

/// Count every event received on `events` until the channel closes.
pub fn spawn_feed(
    metrics: Arc<Metrics>,
    mut events: broadcast::Receiver<RequestEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => metrics.observe(&event),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "metrics feed lagged behind the event channel");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
