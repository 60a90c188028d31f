//! ## strom-telemetry::metrics
//! **Prometheus snapshot exporter**
//!
//! The hot paths keep their own atomic counters. A recorder samples them
//! on demand (`*_observe`) and mirrors the values into a registry.
//!
//! ### Exported families:
//! - `<ns>_pool_available`, plus `<ns>_pool_allocs_total`, `<ns>_pool_frees_total`,
//!   `<ns>_pool_empty_total` and `<ns>_pool_watermark_total` by level
//! - `<ns>_queue_depth`
//! - `<ns>_rule_hits_total` by rule and generation, so a recreated rule in a
//!   reused slot starts its own series
//! - `<ns>_pktio_rx_total`, `<ns>_pktio_tx_total` by outcome

use prometheus::{IntCounterVec, IntGaugeVec, Opts, Registry};
use tracing::debug;

use strom_classify::Classifier;
use strom_config::TelemetryConfig;
use strom_core::EventCore;
use strom_pktio::Pktio;

use crate::error::TelemetryError;

#[derive(Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pool_available: IntGaugeVec,
    pool_allocs: IntCounterVec,
    pool_frees: IntCounterVec,
    pool_empty: IntCounterVec,
    pool_watermark: IntCounterVec,
    queue_depth: IntGaugeVec,
    rule_hits: IntCounterVec,
    pktio_rx: IntCounterVec,
    pktio_tx: IntCounterVec,
}

/// Raises a counter to an absolute value sampled elsewhere.
fn counter_catch_up(counters: &IntCounterVec, labels: &[&str], value: u64) {
    let counter = counters.with_label_values(labels);
    counter.inc_by(value.saturating_sub(counter.get()));
}

impl MetricsRecorder {
    pub fn new(namespace: &str) -> Result<Self, TelemetryError> {
        let registry = Registry::new();
        let opts = |name: &str, help: &str| Opts::new(name, help).namespace(namespace);

        let pool_available = IntGaugeVec::new(
            opts("pool_available", "Buffers free in the pool"),
            &["pool"],
        )?;
        let pool_allocs = IntCounterVec::new(
            opts("pool_allocs_total", "Buffers handed out by the pool"),
            &["pool"],
        )?;
        let pool_frees = IntCounterVec::new(
            opts("pool_frees_total", "Buffers returned to the pool"),
            &["pool"],
        )?;
        let pool_empty = IntCounterVec::new(
            opts("pool_empty_total", "Allocations refused because the pool was empty"),
            &["pool"],
        )?;
        let pool_watermark = IntCounterVec::new(
            opts("pool_watermark_total", "Times free buffers crossed a watermark"),
            &["pool", "level"],
        )?;
        let queue_depth = IntGaugeVec::new(opts("queue_depth", "Events waiting in the queue"), &["queue"])?;
        let rule_hits = IntCounterVec::new(
            opts("rule_hits_total", "Packets fully matching a classification rule"),
            &["rule", "generation"],
        )?;
        let pktio_rx = IntCounterVec::new(
            opts("pktio_rx_total", "Frames received by outcome"),
            &["interface", "outcome"],
        )?;
        let pktio_tx = IntCounterVec::new(
            opts("pktio_tx_total", "Frames accepted by the adapter"),
            &["interface"],
        )?;

        registry.register(Box::new(pool_available.clone()))?;
        registry.register(Box::new(pool_allocs.clone()))?;
        registry.register(Box::new(pool_frees.clone()))?;
        registry.register(Box::new(pool_empty.clone()))?;
        registry.register(Box::new(pool_watermark.clone()))?;
        registry.register(Box::new(queue_depth.clone()))?;
        registry.register(Box::new(rule_hits.clone()))?;
        registry.register(Box::new(pktio_rx.clone()))?;
        registry.register(Box::new(pktio_tx.clone()))?;

        Ok(Self {
            registry,
            pool_available,
            pool_allocs,
            pool_frees,
            pool_empty,
            pool_watermark,
            queue_depth,
            rule_hits,
            pktio_rx,
            pktio_tx,
        })
    }

    pub fn from_config(config: &TelemetryConfig) -> Result<Self, TelemetryError> {
        Self::new(&config.metrics_namespace)
    }

    /// Samples every pool and queue of `core`. Objects destroyed between
    /// listing and sampling are skipped.
    pub fn core_observe(&self, core: &EventCore) {
        let pools = core.pools();
        for id in pools.pool_ids() {
            let (Ok(info), Ok(stats)) = (pools.pool_info(id), pools.pool_stats(id)) else {
                continue;
            };
            let labels = [info.name.as_str()];
            self.pool_available
                .with_label_values(&labels)
                .set(i64::from(stats.available));
            counter_catch_up(&self.pool_allocs, &labels, stats.buf_allocs);
            counter_catch_up(&self.pool_frees, &labels, stats.buf_frees);
            counter_catch_up(&self.pool_empty, &labels, stats.buf_empty);
            counter_catch_up(&self.pool_watermark, &[info.name.as_str(), "high"], stats.high_wm_count);
            counter_catch_up(&self.pool_watermark, &[info.name.as_str(), "low"], stats.low_wm_count);
        }

        let queues = core.queues();
        for id in queues.queue_ids() {
            let Ok(info) = queues.queue_info(id) else {
                continue;
            };
            let label = info.name.unwrap_or_else(|| format!("queue-{}", id.0));
            self.queue_depth
                .with_label_values(&[label.as_str()])
                .set(info.depth as i64);
        }
    }

    pub fn classifier_observe(&self, classifier: &Classifier) {
        for stats in classifier.rule_stats() {
            let rule = stats.rule.to_string();
            let generation = stats.generation.to_string();
            counter_catch_up(&self.rule_hits, &[rule.as_str(), generation.as_str()], stats.hits);
        }
    }

    pub fn pktio_observe(&self, pktio: &Pktio) {
        let stats = pktio.stats();
        let name = pktio.name();
        for (outcome, value) in [
            ("received", stats.rx_frames),
            ("delivered", stats.rx_delivered),
            ("dropped", stats.rx_dropped),
            ("error", stats.rx_errors),
        ] {
            counter_catch_up(&self.pktio_rx, &[name, outcome], value);
        }
        counter_catch_up(&self.pktio_tx, &[name], stats.tx_frames);
    }

    /// Renders the registry in the Prometheus text format.
    pub fn gather_metrics(&self) -> Result<String, TelemetryError> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&families, &mut buffer)?;
        debug!(families = families.len(), bytes = buffer.len(), "metrics gathered");
        Ok(String::from_utf8(buffer)?)
    }
}
