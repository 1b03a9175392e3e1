//! Decision coordinator invariants under many inputs and concurrent callers.

mod common;

use common::{pump_volumes, test_config, FixedModel, SumModel};
use irrig_shared::{Action, Decision, FeatureVector, PumpStatus};
use irrigd::lifecycle::Service;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn pump_server(delay: Duration) -> MockServer {
    let pump = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pump"))
        .respond_with(ResponseTemplate::new(200).set_delay(delay))
        .mount(&pump)
        .await;
    pump
}

fn assert_invariants(d: &Decision, threshold: f64) {
    assert!((0.0..=50.0).contains(&d.volume_ml), "volume out of range: {}", d.volume_ml);
    assert_eq!(d.action == Action::Irrigate, d.volume_ml >= threshold);
    assert_eq!(d.pump_status == PumpStatus::Sent, d.action == Action::Irrigate);
}

#[tokio::test]
async fn test_invariants_hold_across_prediction_range() {
    let feed = MockServer::start().await;
    let pump = pump_server(Duration::ZERO).await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&feed, &pump, dir.path());
    config.actuator.queue_capacity = 512;
    let service = Service::start_with_model(&config, Arc::new(SumModel)).unwrap();

    let mut irrigations = 0;
    for step in -40..=240 {
        let raw = step as f64 * 0.5;
        let decision = service
            .coordinator
            .evaluate(FeatureVector::new(raw, 0.0, 0.0))
            .await
            .unwrap();
        assert_invariants(&decision, 5.0);
        if decision.action == Action::Irrigate {
            irrigations += 1;
        }
    }

    service.shutdown().await;
    assert_eq!(pump_volumes(&pump).await.len(), irrigations);
}

#[tokio::test]
async fn test_custom_threshold_is_respected() {
    let feed = MockServer::start().await;
    let pump = pump_server(Duration::ZERO).await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&feed, &pump, dir.path());
    config.policy.threshold_ml = 10.0;
    let service = Service::start_with_model(&config, Arc::new(FixedModel(7.2))).unwrap();

    let decision = service
        .coordinator
        .evaluate(FeatureVector::default())
        .await
        .unwrap();
    assert_eq!(decision.action, Action::Skip);
    assert_invariants(&decision, 10.0);

    service.shutdown().await;
    assert!(pump_volumes(&pump).await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_evaluations_leave_one_whole_snapshot() {
    let feed = MockServer::start().await;
    let pump = pump_server(Duration::ZERO).await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&feed, &pump, dir.path());
    config.actuator.queue_capacity = 256;
    let service = Service::start_with_model(&config, Arc::new(SumModel)).unwrap();

    let mut handles = Vec::new();
    for i in 0..100 {
        let coordinator = Arc::clone(&service.coordinator);
        handles.push(tokio::spawn(async move {
            // temperature == humidity_env == soil_moisture, volume is 3x
            let v = (i % 17) as f64;
            coordinator
                .evaluate(FeatureVector::new(v, v, v))
                .await
                .unwrap()
        }));
    }

    let mut produced = Vec::new();
    for h in handles {
        produced.push(h.await.unwrap());
    }

    let snapshot = service.state.get().await.unwrap();
    assert!(produced.iter().any(|d| d == snapshot.as_ref()));
    assert_eq!(snapshot.temperature, snapshot.humidity_env);
    assert_eq!(snapshot.temperature, snapshot.soil_moisture);
    assert_eq!(snapshot.volume_ml, (snapshot.temperature * 3.0).min(50.0));
    assert_invariants(&snapshot, 5.0);

    service.shutdown().await;
}

#[tokio::test]
async fn test_burst_sheds_but_reports_sent() {
    let feed = MockServer::start().await;
    let pump = pump_server(Duration::from_millis(300)).await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&feed, &pump, dir.path());
    config.actuator.max_in_flight = 1;
    config.actuator.queue_capacity = 1;
    let service = Service::start_with_model(&config, Arc::new(FixedModel(8.0))).unwrap();

    for _ in 0..6 {
        let decision = service
            .coordinator
            .evaluate(FeatureVector::default())
            .await
            .unwrap();
        assert_eq!(decision.pump_status, PumpStatus::Sent);
    }

    let metrics = Arc::clone(&service.metrics);
    service.shutdown().await;

    let ok = metrics.actuations_total.with_label_values(&["ok"]).get();
    let shed = metrics.actuations_total.with_label_values(&["shed"]).get();
    // One running, one waiting for a slot, one queued
    assert!(ok <= 3, "too many actuations accepted: {}", ok);
    assert!(shed >= 3, "expected shedding, got {}", shed);
    assert_eq!(ok + shed, 6);
    assert_eq!(pump_volumes(&pump).await.len() as u64, ok);
}

#[tokio::test]
async fn test_non_finite_prediction_is_an_error() {
    let feed = MockServer::start().await;
    let pump = pump_server(Duration::ZERO).await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&feed, &pump, dir.path());
    let service = Service::start_with_model(&config, Arc::new(FixedModel(f64::NAN))).unwrap();

    let err = service
        .coordinator
        .evaluate(FeatureVector::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "model");
    assert!(service.state.get().await.is_none());

    service.shutdown().await;
    assert!(pump_volumes(&pump).await.is_empty());
}
