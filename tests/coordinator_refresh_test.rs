use chrono::{DateTime, TimeZone, Utc};
use mockito::{Matcher, Server};
use ned_co2::config::{Config, WindowConfig};
use ned_co2::coordinator::{Clock, Coordinator};
use ned_co2::ned::NedClient;
use ned_co2::sensors::{SensorKind, SensorValue, derive_sensor, derive_sensors};
use serde_json::json;
use std::sync::Arc;

const PATH: &str = "/v1/utilizations";

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 16, 9, 30, 0).unwrap()
}

fn body(rows: serde_json::Value) -> String {
    json!({ "hydra:member": rows }).to_string()
}

async fn mock_ok(server: &mut Server) -> (mockito::Mock, mockito::Mock) {
    let current = server
        .mock("GET", PATH)
        .match_query(Matcher::UrlEncoded("classification".into(), "2".into()))
        .with_status(200)
        .with_body(body(json!([
            {"validfrom": "2025-10-16T08:00:00Z", "validto": "2025-10-16T09:00:00Z", "emissionfactor": 100.0},
            {"validfrom": "2025-10-16T09:00:00Z", "validto": "2025-10-16T10:00:00Z", "emissionfactor": 90.0}
        ])))
        .create_async()
        .await;
    let forecast = server
        .mock("GET", PATH)
        .match_query(Matcher::UrlEncoded("classification".into(), "1".into()))
        .with_status(200)
        .with_body(body(json!([
            {"validfrom": "2025-10-16T12:00:00Z", "validto": "2025-10-16T13:00:00Z", "emissionfactor": 120.0},
            {"validfrom": "2025-10-16T13:00:00Z", "validto": "2025-10-16T14:00:00Z", "emissionfactor": 80.0},
            {"validfrom": "2025-10-16T14:00:00Z", "validto": "2025-10-16T15:00:00Z", "emissionfactor": 95.0}
        ])))
        .create_async()
        .await;
    (current, forecast)
}

fn coordinator(server: &Server) -> Coordinator {
    let client = NedClient::new(format!("{}{}", server.url(), PATH), "key");
    Coordinator::new(
        Arc::new(client),
        WindowConfig::default(),
        chrono_tz::Europe::Amsterdam,
    )
    .with_clock(Arc::new(FixedClock(now())))
}

#[tokio::test]
async fn http_500_keeps_previous_result() {
    let mut server = Server::new_async().await;
    let (current, forecast) = mock_ok(&mut server).await;
    let mut c = coordinator(&server);

    c.first_refresh().await.unwrap();
    let before = c.state();
    let data_before = before.data.clone().unwrap();
    assert!(before.last_update_success);

    current.remove_async().await;
    forecast.remove_async().await;
    let _failing = server
        .mock("GET", PATH)
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("upstream exploded")
        .create_async()
        .await;

    assert!(!c.refresh().await);
    let after = c.state();
    assert!(!after.last_update_success);
    assert_eq!(after.data.as_deref(), Some(data_before.as_ref()));
    assert!(after.last_error.unwrap().contains("500"));

    // Last-known-good values still derive, marked unavailable
    let sensor = derive_sensor(&c.state(), SensorKind::CurrentSlot, "e", now());
    assert!(!sensor.available);
    assert_eq!(sensor.value, Some(SensorValue::EmissionFactor(90.0)));
}

#[tokio::test]
async fn sensors_follow_fetched_rows() {
    let mut server = Server::new_async().await;
    let _mocks = mock_ok(&mut server).await;
    let mut c = coordinator(&server);
    c.first_refresh().await.unwrap();

    let handle = c.handle().unwrap();
    let sensors = derive_sensors(&handle.state(), "entry", now());
    assert_eq!(sensors[0].value, Some(SensorValue::EmissionFactor(90.0)));
    assert_eq!(sensors[1].value, Some(SensorValue::EmissionFactor(80.0)));
    assert_eq!(
        sensors[2].value,
        Some(SensorValue::Timestamp(
            Utc.with_ymd_and_hms(2025, 10, 16, 13, 0, 0).unwrap()
        ))
    );
    assert_eq!(
        sensors[3].value,
        Some(SensorValue::Timestamp(
            Utc.with_ymd_and_hms(2025, 10, 16, 14, 0, 0).unwrap()
        ))
    );
}

#[tokio::test]
async fn from_config_uses_configured_endpoint() {
    let mut server = Server::new_async().await;
    let _mocks = mock_ok(&mut server).await;

    let mut config = Config::default();
    config.api.api_key = "key".into();
    config.api.base_url = format!("{}{}", server.url(), PATH);
    config.validate().unwrap();

    let mut c = Coordinator::from_config(&config).unwrap();
    c.first_refresh().await.unwrap();
    let state = c.state();
    assert_eq!(state.data.unwrap().forecast.len(), 3);
    assert_eq!(state.options, config.window);
}

#[tokio::test]
async fn sensors_from_one_snapshot_share_a_cycle() {
    let mut server = Server::new_async().await;
    let (current, forecast) = mock_ok(&mut server).await;
    let mut c = coordinator(&server);
    c.first_refresh().await.unwrap();
    let handle = c.handle().unwrap();

    let snapshot = handle.state();

    current.remove_async().await;
    forecast.remove_async().await;
    let _failing = server
        .mock("GET", PATH)
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;
    assert!(!c.refresh().await);

    // A cycle published after the snapshot does not leak into it
    let before = derive_sensors(&snapshot, "entry", now());
    assert!(before.iter().all(|s| s.available));
    assert_eq!(before[0].value, Some(SensorValue::EmissionFactor(90.0)));

    let after = derive_sensors(&handle.state(), "entry", now());
    assert!(after.iter().all(|s| !s.available));
    assert_eq!(after[0].value, Some(SensorValue::EmissionFactor(90.0)));
}
