use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

use crate::{
    device::{DeviceClient, FetchError},
    snapshot::{models::Reading, SnapshotStore},
};

/// Fetches a reading from the device on a fixed cadence and publishes it.
///
/// There is no retry or backoff: a failed tick is simply superseded by the
/// next scheduled one.
#[derive(Clone)]
pub struct PollerService {
    device: DeviceClient,
    store: SnapshotStore,
    interval: Duration,
}

impl PollerService {
    pub fn new(device: DeviceClient, store: SnapshotStore, interval: Duration) -> Self {
        Self {
            device,
            store,
            interval,
        }
    }

    /// Runs the polling loop indefinitely.
    /// Spawn this via `tokio::spawn`.
    ///
    /// The first tick fires immediately. Each tick runs as its own task, so a
    /// slow device never delays the schedule; overlapping ticks publish in
    /// completion order.
    pub async fn run(self) {
        info!(
            url = %self.device.url(),
            interval_secs = self.interval.as_secs_f64(),
            "Sensor polling loop started"
        );
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let poller = self.clone();
            tokio::spawn(async move { poller.tick().await });
        }
    }

    /// One fetch-and-publish attempt. Failures are logged and recorded, never
    /// propagated.
    pub async fn tick(&self) {
        match self.fetch_reading().await {
            Ok(reading) => {
                let f = reading.fields;
                info!(
                    ph = f.ph,
                    tds = f.tds,
                    temp = f.temp,
                    humidity = f.humidity,
                    pump = f.pump,
                    time = %reading.time,
                    "Fetched reading from device"
                );
                self.store.publish(reading).await;
            }
            Err(e) => {
                error!(url = %self.device.url(), error = %e, "Failed to fetch reading from device");
                self.store.record_failure(e.to_string()).await;
            }
        }
    }

    async fn fetch_reading(&self) -> Result<Reading, FetchError> {
        let fields = self.device.fetch().await?;
        Ok(Reading::capture(fields))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::StatusCode;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    use super::*;
    use crate::{
        device::fake::{body, json, FakeDevice, Reply},
        mirror::Mirror,
        snapshot::models::Snapshot,
    };

    struct Harness {
        _dir: TempDir,
        mirror: Mirror,
        store: SnapshotStore,
        poller: PollerService,
    }

    fn harness(device: &FakeDevice, timeout: Duration, interval: Duration) -> Harness {
        let dir = TempDir::new().unwrap();
        let mirror = Mirror::new(dir.path().join("sensor_data.json"));
        let store = SnapshotStore::new(mirror.clone());
        let client = DeviceClient::new(&device.url, timeout).unwrap();
        let poller = PollerService::new(client, store.clone(), interval);
        Harness {
            _dir: dir,
            mirror,
            store,
            poller,
        }
    }

    fn quick(device: &FakeDevice) -> Harness {
        harness(device, Duration::from_millis(300), Duration::from_secs(10))
    }

    #[tokio::test]
    async fn successful_tick_publishes_to_memory_and_mirror() {
        let device = FakeDevice::start(json(6.5, 450.0, 24.1, 60.0, true)).await;
        let h = quick(&device);

        let before = Utc::now();
        h.poller.tick().await;

        let Snapshot::Complete(r) = h.store.read().await else {
            panic!("snapshot should be complete after a successful tick");
        };
        assert_eq!(r.fields.ph, 6.5);
        assert_eq!(r.fields.tds, 450.0);
        assert_eq!(r.fields.temp, 24.1);
        assert_eq!(r.fields.humidity, 60.0);
        assert!(r.fields.pump);
        assert!(r.time >= before - chrono::Duration::milliseconds(1));
        assert_eq!(h.mirror.load().await.unwrap(), r);
    }

    #[tokio::test]
    async fn failed_tick_keeps_previous_reading() {
        let device = FakeDevice::start(json(6.5, 450.0, 24.1, 60.0, true)).await;
        let h = quick(&device);

        h.poller.tick().await;
        let r1 = h.store.read().await;

        device.set(Reply::Status(StatusCode::INTERNAL_SERVER_ERROR)).await;
        h.poller.tick().await;

        assert_eq!(h.store.read().await, r1);
        assert_eq!(Snapshot::Complete(h.mirror.load().await.unwrap()), r1);
        assert_eq!(h.store.status().await.consecutive_failures, 1);
    }

    #[tokio::test]
    async fn timed_out_tick_keeps_previous_reading() {
        let device = FakeDevice::start(json(6.5, 450.0, 24.1, 60.0, true)).await;
        let h = quick(&device);

        h.poller.tick().await;
        let r1 = h.store.read().await;

        device
            .set(Reply::Slow(Duration::from_secs(5), body(1.0, 1.0, 1.0, 1.0, false)))
            .await;
        h.poller.tick().await;

        assert_eq!(h.store.read().await, r1);
        let status = h.store.status().await;
        assert!(status.last_error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn malformed_body_does_not_touch_store_or_mirror() {
        let device = FakeDevice::start(Reply::Json(r#"{"temperature": 20}"#.to_owned())).await;
        let h = quick(&device);

        h.poller.tick().await;

        assert!(!h.store.read().await.is_valid());
        assert!(h.mirror.load().await.is_err());
        assert_eq!(h.store.status().await.total_failures, 1);
    }

    #[tokio::test]
    async fn device_timestamp_is_ignored() {
        let device = FakeDevice::start(Reply::Json(
            r#"{"ph": 6.5, "tds": 450, "temp": 24.1, "humidity": 60, "pump": true,
                "time": "2001-09-09T01:46:40.000Z"}"#
                .to_owned(),
        ))
        .await;
        let h = quick(&device);

        h.poller.tick().await;

        let r = *h.store.read().await.reading().unwrap();
        let device_time = Utc.with_ymd_and_hms(2001, 9, 9, 1, 46, 40).unwrap();
        assert_ne!(r.time, device_time);
        assert!(r.time > Utc::now() - chrono::Duration::seconds(60));
    }

    #[tokio::test]
    async fn run_polls_immediately_at_startup() {
        let device = FakeDevice::start(json(7.0, 300.0, 20.0, 50.0, false)).await;
        let h = harness(&device, Duration::from_millis(300), Duration::from_secs(3600));
        let store = h.store.clone();

        let handle = tokio::spawn(h.poller.clone().run());
        for _ in 0..100 {
            if store.read().await.is_valid() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert!(store.read().await.is_valid());
        assert_eq!(device.hits(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn run_lets_slow_ticks_overlap() {
        let device = FakeDevice::start(Reply::Slow(
            Duration::from_millis(250),
            body(6.0, 400.0, 22.0, 55.0, true),
        ))
        .await;
        let h = harness(&device, Duration::from_secs(2), Duration::from_millis(50));
        let store = h.store.clone();

        let handle = tokio::spawn(h.poller.clone().run());
        tokio::time::sleep(Duration::from_millis(600)).await;
        handle.abort();

        assert!(device.peak_in_flight() >= 2, "ticks should overlap");
        assert!(device.hits() >= 4);
        assert!(store.read().await.is_valid());
        assert_eq!(store.status().await.total_failures, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn run_keeps_ticking_after_failures() {
        let device = FakeDevice::start(Reply::Status(StatusCode::INTERNAL_SERVER_ERROR)).await;
        let h = harness(&device, Duration::from_millis(40), Duration::from_millis(50));
        let store = h.store.clone();

        let handle = tokio::spawn(h.poller.clone().run());

        for _ in 0..200 {
            if store.status().await.total_failures >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(device.hits() >= 3);
        assert!(store.status().await.total_failures >= 3);
        assert!(!store.read().await.is_valid());

        device.set(json(6.8, 410.0, 23.5, 58.0, true)).await;
        for _ in 0..200 {
            if store.read().await.is_valid() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        let r = *store.read().await.reading().expect("a later tick should succeed");
        assert_eq!(r.fields.ph, 6.8);
        assert_eq!(h.mirror.load().await.unwrap(), r);
        assert_eq!(store.status().await.consecutive_failures, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_ticks_publish_in_completion_order() {
        let device = FakeDevice::start(json(2.0, 200.0, 20.0, 40.0, false)).await;
        device
            .enqueue(Reply::Slow(
                Duration::from_millis(300),
                body(1.0, 100.0, 10.0, 30.0, true),
            ))
            .await;
        let h = harness(&device, Duration::from_secs(2), Duration::from_secs(10));

        let slow = {
            let poller = h.poller.clone();
            tokio::spawn(async move { poller.tick().await })
        };
        for _ in 0..100 {
            if device.hits() >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(device.hits(), 1);

        // Triggered second, completes first.
        h.poller.tick().await;
        assert_eq!(h.store.read().await.reading().unwrap().fields.ph, 2.0);

        slow.await.unwrap();
        let r = *h.store.read().await.reading().unwrap();
        assert_eq!(r.fields.ph, 1.0);
        assert!(r.fields.pump);
        assert_eq!(h.mirror.load().await.unwrap(), r);
        assert_eq!(h.store.status().await.total_successes, 2);
    }
}
