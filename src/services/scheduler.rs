use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::info;

use crate::polisen_client::EventSource;
use crate::services::sensor::Sensor;

/// Refreshes `sensor` every `period` until it is shut down. The first tick
/// fires one period from now; callers run the initial refresh themselves.
pub fn spawn_refresh_loop<S: EventSource>(sensor: Arc<Sensor<S>>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            sensor = %sensor.name(),
            interval_secs = period.as_secs(),
            "Refresh loop started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    sensor.refresh().await;
                }
                _ = sensor.stopped() => break,
            }
        }

        info!(sensor = %sensor.name(), "Refresh loop stopped");
    })
}
