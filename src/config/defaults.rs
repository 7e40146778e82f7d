use super::*;

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: None,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            point: 0,
            granularity: Granularity::Hour,
            window_days: 2,
            local_tz_filter: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/ned_co2.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8089,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            window: WindowConfig::default(),
            timezone: "Europe/Amsterdam".to_string(),
            update_interval_secs: 300,
            logging: LoggingConfig::default(),
            web: WebConfig::default(),
        }
    }
}
