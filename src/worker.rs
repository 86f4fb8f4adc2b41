use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use reqwest::Method;
use tracing::{info, warn};

use crate::envelope::RequestEnvelope;
use crate::metrics::{DELIVERY_LATENCY, QUEUE_DEPTH};
use crate::queues::TenantQueueConsumer;
use crate::stats::StatsAggregator;

// Rolling window of delivery durations, in seconds. The worker measures;
// the stats aggregator only stores what this hands it.
pub struct TimingWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl TimingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn percentile(&self, p: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
        sorted[rank.clamp(1, sorted.len()) - 1]
    }
}

// Drains one tenant's queue in FIFO order and replays each envelope against
// its recorded target URL. Fire and forget: a failed delivery is logged and
// dropped, never retried here.
pub async fn delivery_worker(
    mut consumer: TenantQueueConsumer,
    client: reqwest::Client,
    stats: Arc<StatsAggregator>,
) {
    let project_id = consumer.project_id();
    info!(project_id, "delivery worker started");

    let mut timings = TimingWindow::new(512);

    while let Some(bytes) = consumer.recv().await {
        QUEUE_DEPTH.dec();

        let envelope = match RequestEnvelope::decode(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(project_id, error = %e, "dropping undecodable envelope");
                continue;
            }
        };

        let method = Method::from_bytes(envelope.method.as_bytes()).unwrap_or(Method::GET);
        let mut request = client.request(method, envelope.target_url.as_str());
        for (name, value) in &envelope.headers {
            // the client recomputes these for the upstream connection
            if name.eq_ignore_ascii_case("host") || name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            request = request.header(name.as_str(), value.as_str());
        }
        if !envelope.body.is_empty() {
            request = request.body(envelope.body);
        }

        let started = Instant::now();
        match request.send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(project_id, status = %response.status(), "upstream rejected envelope");
            }
            Err(e) => {
                warn!(project_id, error = %e, "upstream delivery failed");
            }
        }

        let elapsed = started.elapsed().as_secs_f64();
        DELIVERY_LATENCY.observe(elapsed);
        timings.push(elapsed);
        stats.record_latency(timings.average(), timings.percentile(90.0));
    }

    info!(project_id, "delivery worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_reports_zero() {
        let timings = TimingWindow::new(4);
        assert_eq!(timings.average(), 0.0);
        assert_eq!(timings.percentile(90.0), 0.0);
    }

    #[test]
    fn average_and_percentile_over_samples() {
        let mut timings = TimingWindow::new(16);
        for sample in [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0] {
            timings.push(sample);
        }

        assert!((timings.average() - 0.55).abs() < 1e-9);
        assert!((timings.percentile(90.0) - 0.9).abs() < 1e-9);
        assert!((timings.percentile(100.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn window_evicts_oldest_samples() {
        let mut timings = TimingWindow::new(2);
        timings.push(10.0);
        timings.push(1.0);
        timings.push(2.0);

        assert!((timings.average() - 1.5).abs() < 1e-9);
    }
}
