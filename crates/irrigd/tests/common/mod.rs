//! Shared fixtures for irrigd integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use irrig_shared::{FeatureVector, IrrigError};
use irrigd::config::Config;
use irrigd::model::VolumeModel;
use std::path::Path;
use tower::ServiceExt;
use wiremock::MockServer;

/// Model that always predicts the same raw volume.
pub struct FixedModel(pub f64);

impl VolumeModel for FixedModel {
    fn predict(&self, _features: &FeatureVector) -> Result<f64, IrrigError> {
        Ok(self.0)
    }
}

/// Model whose prediction is the sum of its inputs.
pub struct SumModel;

impl VolumeModel for SumModel {
    fn predict(&self, f: &FeatureVector) -> Result<f64, IrrigError> {
        Ok(f.temperature + f.humidity_env + f.soil_moisture)
    }
}

/// Model that always fails.
pub struct BrokenModel;

impl VolumeModel for BrokenModel {
    fn predict(&self, _features: &FeatureVector) -> Result<f64, IrrigError> {
        Err(IrrigError::Model("pipeline rejected input".to_string()))
    }
}

/// Config pointing the feed and the pump at mock servers and the history
/// log into `dir`. The poll interval is long so the poller only fires once.
pub fn test_config(feed: &MockServer, pump: &MockServer, dir: &Path) -> Config {
    let mut config = Config::default();
    config.feed.base_url = format!("{}/get/latest/dweet/for", feed.uri());
    config.feed.thing_name = "test-thing".to_string();
    config.feed.poll_interval_secs = 3600;
    config.feed.timeout_secs = 1;
    config.actuator.address = pump.uri();
    config.actuator.timeout_secs = 1;
    config.history.path = dir.join("sensor_data.csv");
    config.server.static_dir = dir.join("static");
    config.server.shutdown_grace_secs = 5;
    config
}

pub async fn post_json(app: &Router, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_text(app: &Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, value)
}

/// `vol` query values of every request the pump mock received.
pub async fn pump_volumes(pump: &MockServer) -> Vec<f64> {
    pump.received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/pump")
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "vol")
                .and_then(|(_, v)| v.parse().ok())
        })
        .collect()
}
