//! Telemetry feed client.
//!
//! Fetches the latest published reading for one device. The feed answers
//! with an envelope like:
//!
//! ```json
//! {"this": "succeeded", "by": "getting", "the": "dweets",
//!  "with": [{"thing": "my-pump-thing", "created": "2025-06-01T08:00:00.000Z",
//!            "content": {"temp": 31.5, "hum": 62, "soil": 18}}]}
//! ```
//!
//! A failed lookup keeps the same envelope with `"this": "failed"` and a
//! `"because"` message.

use irrig_shared::{IrrigError, Reading};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    this: Option<String>,
    #[serde(default)]
    because: Option<String>,
    #[serde(default)]
    with: Value,
}

#[derive(Debug, Deserialize)]
struct Entry {
    created: String,
    #[serde(default)]
    content: Map<String, Value>,
}

/// HTTP client for the telemetry feed
#[derive(Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    url: String,
}

impl FeedClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, IrrigError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("irrigd/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| IrrigError::Feed(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the most recent reading.
    pub async fn fetch_latest(&self) -> Result<Reading, IrrigError> {
        debug!("Fetching telemetry from {}", self.url);

        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| IrrigError::Feed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IrrigError::Feed(format!("feed returned HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| IrrigError::Feed(e.to_string()))?;

        parse_latest(&body)
    }
}

/// Extract the first entry of a feed envelope.
pub fn parse_latest(body: &str) -> Result<Reading, IrrigError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| IrrigError::MalformedFeed(format!("not a feed envelope: {}", e)))?;

    if envelope.this.as_deref() == Some("failed") {
        return Err(IrrigError::Feed(
            envelope
                .because
                .unwrap_or_else(|| "feed reported failure".to_string()),
        ));
    }

    let entries: Vec<Entry> = serde_json::from_value(envelope.with)
        .map_err(|e| IrrigError::MalformedFeed(format!("bad entry list: {}", e)))?;

    let entry = entries
        .into_iter()
        .next()
        .ok_or_else(|| IrrigError::MalformedFeed("no entries in feed".to_string()))?;

    Ok(Reading {
        timestamp: entry.created,
        temperature: numeric(&entry.content, "temp"),
        humidity: numeric(&entry.content, "hum"),
        soil_moisture: numeric(&entry.content, "soil"),
    })
}

/// Devices publish numbers either as JSON numbers or numeric strings.
fn numeric(content: &Map<String, Value>, key: &str) -> Option<f64> {
    match content.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_latest_entry() {
        let body = r#"{"this":"succeeded","by":"getting","the":"dweets","with":[
            {"thing":"my-pump-thing","created":"2025-06-01T08:00:00.000Z",
             "content":{"temp":31.5,"hum":62,"soil":18}},
            {"thing":"my-pump-thing","created":"2025-06-01T07:59:50.000Z",
             "content":{"temp":31.4,"hum":61,"soil":18}}]}"#;

        let reading = parse_latest(body).unwrap();
        assert_eq!(reading.timestamp, "2025-06-01T08:00:00.000Z");
        assert_eq!(reading.temperature, Some(31.5));
        assert_eq!(reading.humidity, Some(62.0));
        assert_eq!(reading.soil_moisture, Some(18.0));
    }

    #[test]
    fn test_parse_string_and_missing_values() {
        let body = r#"{"with":[{"created":"t0","content":{"temp":"29.5","soil":"wet"}}]}"#;
        let reading = parse_latest(body).unwrap();
        assert_eq!(reading.temperature, Some(29.5));
        assert_eq!(reading.humidity, None);
        assert_eq!(reading.soil_moisture, None);
    }

    #[test]
    fn test_failed_envelope() {
        let body = r#"{"this":"failed","with":404,"because":"we couldn't find this"}"#;
        let err = parse_latest(body).unwrap_err();
        assert!(matches!(err, IrrigError::Feed(ref m) if m.contains("couldn't find")));
    }

    #[test]
    fn test_empty_entry_list_is_malformed() {
        let err = parse_latest(r#"{"this":"succeeded","with":[]}"#).unwrap_err();
        assert!(matches!(err, IrrigError::MalformedFeed(_)));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            parse_latest("<html>gateway timeout</html>").unwrap_err(),
            IrrigError::MalformedFeed(_)
        ));
        assert!(matches!(
            parse_latest(r#"{"with":[{"content":{}}]}"#).unwrap_err(),
            IrrigError::MalformedFeed(_)
        ));
    }
}
