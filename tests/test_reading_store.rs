// Tests for the reading store's sync, retry and alerting behaviour
//
// These tests verify:
// - Sequential appends land in call order and raise alerts for bad values
// - Transient failures are retried and invisible in the final state
// - Exhausted retries and permanent rejections leave the store untouched
// - A fetched plot survives replace/read unchanged
// - Reload failures keep the previous local readings
// - Concurrent appends each land once and raise one alert apiece

use std::sync::Arc;
use std::time::Duration;

use plot_sensor_core::test_utils::{generators, ScriptedSync};
use plot_sensor_core::{
    error_codes, InMemorySync, Reading, ReadingCandidate, ReadingStore, ReadingType,
    RemoteSync, StoreConfig, StoreError, StoreEvent, SyncError,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn reading(plot_id: i64, reading_type: ReadingType, value: f64) -> Reading {
    Reading::from_parts(
        0,
        plot_id,
        reading_type,
        value,
        generators::unit_for(reading_type),
        generators::measured_at(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================================
    // Test: Append ordering and alerting
    // ============================================================================

    #[tokio::test]
    async fn test_sequential_appends_keep_call_order() {
        init_tracing();
        let store = ReadingStore::new(InMemorySync::new());

        let first = store
            .append(reading(7, ReadingType::Humidity, 55.0))
            .await
            .unwrap();
        let second = store
            .append(reading(7, ReadingType::Humidity, 57.0))
            .await
            .unwrap();

        assert_eq!(store.readings_for_plot(7), vec![first, second]);
    }

    #[tokio::test]
    async fn test_cold_temperature_on_plot_seven_raises_one_alert() {
        init_tracing();
        let store = ReadingStore::new(InMemorySync::new());

        let candidate = ReadingCandidate::new(7, "TEMPERATURE", 5.0, "°C");
        let persisted = store.submit(&candidate).await.unwrap();

        assert!(persisted.id() > 0);
        let alerts = store.alerts().all();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].plot_id, 7);
        assert!(alerts[0].message.contains("Plot 7"));
    }

    #[tokio::test]
    async fn test_neutral_ph_on_plot_seven_raises_nothing() {
        let store = ReadingStore::new(InMemorySync::new());

        let candidate = ReadingCandidate::new(7, "PH_LEVEL", 6.8, "pH");
        store.submit(&candidate).await.unwrap();

        assert!(store.alerts().all().is_empty());
        assert_eq!(store.readings_for_plot(7).len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_violations_are_not_deduplicated() {
        let store = ReadingStore::new(InMemorySync::new());

        store
            .append(reading(2, ReadingType::Humidity, 95.0))
            .await
            .unwrap();
        store
            .append(reading(2, ReadingType::Humidity, 95.0))
            .await
            .unwrap();

        assert_eq!(store.alerts().len(), 2);

        store.alerts().clear();
        assert!(store.alerts().all().is_empty());
        assert_eq!(store.readings_for_plot(2).len(), 2);
    }

    // ============================================================================
    // Test: Retry semantics
    // ============================================================================

    #[tokio::test]
    async fn test_two_transient_failures_are_transparent() {
        init_tracing();
        let flaky = ReadingStore::new(ScriptedSync::new().fail_persist_transient(2));
        let steady = ReadingStore::new(InMemorySync::new());

        let via_retry = flaky
            .append(reading(4, ReadingType::Temperature, 3.0))
            .await
            .unwrap();
        let direct = steady
            .append(reading(4, ReadingType::Temperature, 3.0))
            .await
            .unwrap();

        assert_eq!(flaky.sync().persist_calls(), 3);
        assert_eq!(via_retry, direct);
        assert_eq!(flaky.readings_for_plot(4), steady.readings_for_plot(4));
        assert_eq!(flaky.alerts().all(), steady.alerts().all());
    }

    #[tokio::test]
    async fn test_three_transient_failures_exhaust_retries() {
        init_tracing();
        let store = ReadingStore::new(ScriptedSync::new().fail_persist_transient(3));
        store.replace_plot_readings(4, vec![reading(4, ReadingType::Humidity, 60.0).with_id(11)]);
        let before = store.readings_for_plot(4);

        let err = store
            .append(reading(4, ReadingType::Temperature, 3.0))
            .await
            .unwrap_err();

        match &err {
            StoreError::PersistenceFailed { attempts, source } => {
                assert_eq!(*attempts, 3);
                assert_eq!(source, &SyncError::Transient("timeout #3".to_string()));
            }
            other => panic!("Expected PersistenceFailed, got {:?}", other),
        }
        assert_eq!(err.error_code(), error_codes::PERSISTENCE_FAILED);
        assert_eq!(store.sync().persist_calls(), 3);
        assert_eq!(store.readings_for_plot(4), before);
        assert!(store.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let sync = ScriptedSync::new()
            .fail_persist_with(vec![SyncError::Permanent("plot archived".to_string())]);
        let store = ReadingStore::new(sync);

        let err = store
            .append(reading(9, ReadingType::Temperature, 1.0))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Rejected(SyncError::Permanent(_))));
        assert_eq!(store.sync().persist_calls(), 1);
        assert!(store.readings_for_plot(9).is_empty());
        assert!(store.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_permanent_failure_after_transient_stops_retrying() {
        let sync = ScriptedSync::new().fail_persist_with(vec![
            SyncError::Transient("connection reset".to_string()),
            SyncError::Permanent("duplicate reading".to_string()),
        ]);
        let store = ReadingStore::new(sync);

        let err = store
            .append(reading(9, ReadingType::Humidity, 50.0))
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), error_codes::SYNC_REJECTED);
        assert_eq!(store.sync().persist_calls(), 2);
    }

    #[tokio::test]
    async fn test_configured_retry_budget_and_backoff() {
        let config = StoreConfig::default()
            .with_max_retries(4)
            .with_retry_backoff(Duration::from_millis(1));
        let store = ReadingStore::with_config(ScriptedSync::new().fail_persist_transient(4), config);

        store
            .append(reading(5, ReadingType::PhLevel, 6.0))
            .await
            .unwrap();

        assert_eq!(store.sync().persist_calls(), 5);
        assert_eq!(store.readings_for_plot(5).len(), 1);
    }

    #[tokio::test]
    async fn test_append_refuses_prebuilt_invalid_reading() {
        let store = ReadingStore::new(ScriptedSync::new());
        let invalid = Reading::from_parts(
            0,
            -5,
            ReadingType::Temperature,
            f64::NAN,
            "",
            generators::measured_at(),
        );

        let err = store.append(invalid).await.unwrap_err();

        assert_eq!(err.error_code(), error_codes::INVALID_VALUE);
        assert_eq!(store.sync().persist_calls(), 0);
        assert_eq!(store.reading_count(), 0);
        assert!(store.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_submit_rejects_before_sync() {
        let store = ReadingStore::new(ScriptedSync::new());

        let err = store
            .submit(&ReadingCandidate::new(3, "TEMPERATURE", f64::NAN, "°C"))
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), error_codes::INVALID_VALUE);
        assert_eq!(store.sync().persist_calls(), 0);
    }

    // ============================================================================
    // Test: Reload and replace
    // ============================================================================

    #[tokio::test]
    async fn test_fetched_readings_round_trip_through_replace() {
        let sync = InMemorySync::new();
        sync.seed_plot(
            12,
            vec![
                reading(12, ReadingType::Temperature, 21.0),
                reading(12, ReadingType::Humidity, 45.0),
            ],
        );
        let fetched = sync.fetch_readings_for_plot(12).await.unwrap();

        let store = ReadingStore::new(sync);
        store.replace_plot_readings(12, fetched.clone());

        assert_eq!(store.readings_for_plot(12), fetched);
    }

    #[tokio::test]
    async fn test_reload_replaces_only_that_plot() {
        let sync = Arc::new(InMemorySync::new());
        let store = ReadingStore::new(Arc::clone(&sync));
        store.replace_plot_readings(1, vec![reading(1, ReadingType::Humidity, 50.0).with_id(100)]);
        store.replace_plot_readings(2, vec![reading(2, ReadingType::Humidity, 52.0).with_id(200)]);

        sync.seed_plot(1, vec![reading(1, ReadingType::PhLevel, 6.2)]);
        let reloaded = store.reload_plot(1).await.unwrap();

        assert_eq!(reloaded.len(), 1);
        assert_eq!(store.readings_for_plot(1), reloaded);
        assert_eq!(store.readings_for_plot(2)[0].id(), 200);
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_local_readings() {
        let sync = ScriptedSync::new().fail_fetch_with(vec![
            SyncError::Transient("timeout".to_string()),
            SyncError::Transient("timeout".to_string()),
            SyncError::Transient("timeout".to_string()),
        ]);
        let store = ReadingStore::new(sync);
        let local = vec![reading(6, ReadingType::Temperature, 22.0).with_id(1)];
        store.replace_plot_readings(6, local.clone());

        let err = store.reload_plot(6).await.unwrap_err();

        assert!(matches!(
            err,
            StoreError::FetchFailed {
                plot_id: 6,
                attempts: 3,
                ..
            }
        ));
        assert_eq!(store.sync().fetch_calls(), 3);
        assert_eq!(store.readings_for_plot(6), local);
    }

    #[tokio::test]
    async fn test_reload_retries_transient_fetch_failure() {
        let sync = ScriptedSync::new()
            .fail_fetch_with(vec![SyncError::Transient("timeout".to_string())]);
        sync.inner()
            .seed_plot(8, vec![reading(8, ReadingType::Humidity, 70.0)]);
        let store = ReadingStore::new(sync);

        let reloaded = store.reload_plot(8).await.unwrap();

        assert_eq!(reloaded.len(), 1);
        assert_eq!(store.sync().fetch_calls(), 2);
    }

    // ============================================================================
    // Test: Notifications and concurrency
    // ============================================================================

    #[tokio::test]
    async fn test_events_follow_operations() {
        let store = ReadingStore::new(InMemorySync::new());
        let mut rx = store.subscribe();

        store.replace_plot_readings(3, Vec::new());
        store
            .append(reading(3, ReadingType::Humidity, 10.0))
            .await
            .unwrap();
        store.alerts().clear();

        assert_eq!(
            rx.recv().await.unwrap(),
            StoreEvent::PlotReplaced {
                plot_id: 3,
                count: 0
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            StoreEvent::ReadingAppended {
                plot_id: 3,
                reading_id: 1
            }
        );
        assert_eq!(rx.recv().await.unwrap(), StoreEvent::AlertRaised { plot_id: 3 });
        assert_eq!(rx.recv().await.unwrap(), StoreEvent::AlertsCleared);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_each_land_once() {
        let store = Arc::new(ReadingStore::new(InMemorySync::new()));

        let handles: Vec<_> = (1..=20)
            .map(|plot_id| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .append(reading(plot_id, ReadingType::Temperature, 50.0))
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.reading_count(), 20);
        assert_eq!(store.plot_ids(), (1..=20).collect::<Vec<i64>>());
        let alerts = store.alerts().all();
        assert_eq!(alerts.len(), 20);

        // Completion order is arbitrary, but every append raised exactly one alert
        let mut alert_plots: Vec<i64> = alerts.iter().map(|alert| alert.plot_id).collect();
        alert_plots.sort_unstable();
        assert_eq!(alert_plots, store.plot_ids());

        let mut ids: Vec<i64> = store
            .plot_ids()
            .into_iter()
            .filter_map(|plot_id| store.latest_for_plot(plot_id))
            .map(|reading| reading.id())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=20).collect::<Vec<i64>>());
    }
}
