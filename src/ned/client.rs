use crate::config::{ApiConfig, WindowConfig};
use crate::error::RefreshError;
use crate::logging::{StructuredLogger, get_logger};
use crate::ned::types::{
    ACTIVITY_PROVIDING, Classification, FetchMeta, FetchResult, TYPE_ELECTRICITY_MIX,
    TimeSlotRecord, parse_collection,
};
use crate::window::{DateWindow, TimezoneMode, compute_window};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, USER_AGENT};
use std::time::Duration;

/// Header carrying the API key
pub const AUTH_HEADER: &str = "X-AUTH-TOKEN";

const LD_JSON: &str = "application/ld+json";

/// Source of emission-factor rows for one refresh cycle
#[async_trait]
pub trait EmissionFetcher: Send + Sync {
    async fn fetch(
        &self,
        options: &WindowConfig,
        host_tz: Tz,
        now: DateTime<Utc>,
    ) -> Result<FetchResult, RefreshError>;
}

/// NED utilizations API client
pub struct NedClient {
    base_url: String,
    api_key: String,
    timeout: Option<Duration>,
    logger: StructuredLogger,
}

impl NedClient {
    /// Create new NED client
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: None,
            logger: get_logger("ned"),
        }
    }

    pub fn from_config(api: &ApiConfig) -> Self {
        let mut client = Self::new(api.base_url.clone(), api.api_key.clone());
        client.timeout = api.request_timeout_secs.map(Duration::from_secs);
        client
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query parameters shared by both classification requests
    pub fn query_params(
        options: &WindowConfig,
        mode: TimezoneMode,
        window: &DateWindow,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("point", options.point.to_string()),
            ("type", TYPE_ELECTRICITY_MIX.to_string()),
            ("activity", ACTIVITY_PROVIDING.to_string()),
            ("granularity", options.granularity.code().to_string()),
            ("granularitytimezone", mode.granularity_timezone().to_string()),
            ("validfrom[after]", window.after_param()),
            ("validfrom[strictly_before]", window.before_param()),
        ]
    }

    fn build_session(&self) -> Result<reqwest::Client, RefreshError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|e| RefreshError::Transport(format!("Failed to build HTTP client: {}", e)))
    }

    async fn fetch_classification(
        &self,
        session: &reqwest::Client,
        params: &[(&'static str, String)],
        classification: Classification,
    ) -> Result<Vec<TimeSlotRecord>, RefreshError> {
        let resp = session
            .get(&self.base_url)
            .query(params)
            .query(&[("classification", classification.code().to_string())])
            .header(ACCEPT, LD_JSON)
            .header(AUTH_HEADER, self.api_key.trim())
            .header(USER_AGENT, concat!("ned-co2/", env!("CARGO_PKG_VERSION")))
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            self.logger.error(&format!(
                "NED API error for {} rows: {}",
                classification.as_str(),
                status
            ));
            return Err(RefreshError::http(status.as_u16(), &body));
        }

        let body: serde_json::Value = resp.json().await?;
        let rows = parse_collection(&body, classification);
        self.logger.debug(&format!(
            "Fetched {} {} rows",
            rows.len(),
            classification.as_str()
        ));
        Ok(rows)
    }
}

#[async_trait]
impl EmissionFetcher for NedClient {
    async fn fetch(
        &self,
        options: &WindowConfig,
        host_tz: Tz,
        now: DateTime<Utc>,
    ) -> Result<FetchResult, RefreshError> {
        let mode = TimezoneMode::from_flag(options.local_tz_filter, host_tz);
        let window = compute_window(now, options.window_days, mode);
        let params = Self::query_params(options, mode, &window);

        // Session lives for exactly this call
        let session = self.build_session()?;
        let current = self
            .fetch_classification(&session, &params, Classification::Current)
            .await?;
        let forecast = self
            .fetch_classification(&session, &params, Classification::Forecast)
            .await?;

        Ok(FetchResult {
            current,
            forecast,
            meta: FetchMeta {
                window_start: window.after,
                window_end: window.before,
                timezone_mode: mode.as_str().to_string(),
                fetched_at: now,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Granularity;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn query_params_follow_options() {
        let options = WindowConfig {
            point: 1,
            granularity: Granularity::QuarterHour,
            window_days: 3,
            local_tz_filter: true,
        };
        let tz = chrono_tz::Europe::Amsterdam;
        let mode = TimezoneMode::from_flag(options.local_tz_filter, tz);
        let now = Utc.with_ymd_and_hms(2025, 10, 16, 12, 0, 0).unwrap();
        let window = compute_window(now, options.window_days, mode);
        let params = NedClient::query_params(&options, mode, &window);

        let get = |k: &str| {
            params
                .iter()
                .find(|(key, _)| *key == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("point"), Some("1"));
        assert_eq!(get("type"), Some("27"));
        assert_eq!(get("activity"), Some("1"));
        assert_eq!(get("granularity"), Some("4"));
        assert_eq!(get("granularitytimezone"), Some("1"));
        assert_eq!(get("validfrom[after]"), Some("2025-10-15"));
        assert_eq!(get("validfrom[strictly_before]"), Some("2025-10-19"));
        assert_eq!(get("classification"), None);
        assert_eq!(window.after, NaiveDate::from_ymd_opt(2025, 10, 15).unwrap());
    }

    #[test]
    fn from_config_carries_timeout() {
        let api = ApiConfig {
            api_key: "k".into(),
            base_url: "http://localhost:1/x".into(),
            request_timeout_secs: Some(7),
        };
        let client = NedClient::from_config(&api);
        assert_eq!(client.base_url(), "http://localhost:1/x");
        assert_eq!(client.timeout, Some(Duration::from_secs(7)));
    }
}
