use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use crate::middleware::metrics::PrometheusRecorder;
use crate::models::token::mask_secret;
use crate::models::usage::UsageEvent;
use crate::store::DynStore;

/// Writes usage telemetry. Fail-open: nothing it does can return an error to
/// the caller; failures are logged and counted.
#[derive(Clone)]
pub struct UsageRecorder {
    store: DynStore,
    metrics: PrometheusRecorder,
    in_flight: TaskTracker,
}

impl UsageRecorder {
    pub fn new(store: DynStore, metrics: PrometheusRecorder) -> Self {
        Self {
            store,
            metrics,
            in_flight: TaskTracker::new(),
        }
    }

    /// Persist the usage record, then bump the token's counter. The two
    /// writes are independent: either may fail without undoing the other.
    pub async fn record(&self, event: UsageEvent) {
        let record = event.into_record();
        let token = mask_secret(&record.token);

        match self.store.insert_usage(&record).await {
            Ok(()) => {
                self.metrics.record_usage_write(true);
                tracing::debug!(%token, endpoint = %record.endpoint, "usage recorded");
            }
            Err(e) => {
                self.metrics.record_usage_write(false);
                tracing::error!(%token, endpoint = %record.endpoint, "failed to write usage record: {:#}", e);
            }
        }

        if let Err(e) = self.store.record_use(&record.token).await {
            tracing::error!(%token, "failed to update token last-used: {:#}", e);
        }
    }

    /// Run [`record`](Self::record) on its own task. The response path never
    /// awaits the handle; a panic inside the task stays inside the task.
    pub fn record_detached(&self, event: UsageEvent) -> JoinHandle<()> {
        let recorder = self.clone();
        self.in_flight
            .spawn(async move { recorder.record(event).await })
    }

    /// Wait up to `grace` for detached writes still running. Call after the
    /// server stops accepting requests and before the store is closed.
    /// Returns whether every write finished in time.
    pub async fn drain(&self, grace: Duration) -> bool {
        self.in_flight.close();
        let pending = self.in_flight.len();
        if pending > 0 {
            tracing::info!(pending, "waiting for in-flight usage writes");
        }
        match tokio::time::timeout(grace, self.in_flight.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    pending = self.in_flight.len(),
                    "usage writes still running at shutdown; they may be lost"
                );
                false
            }
        }
    }
}
