//! Periodic refresh coordinator
//!
//! One coordinator polls one grid point. The task that runs it is the only
//! writer of the published `CoordinatorState`; readers hold a
//! `CoordinatorHandle` and see each cycle's result as one atomic replacement.
//! A failed cycle keeps the previous data and only flips the status fields.

use crate::config::{Config, WindowConfig};
use crate::error::{NedError, RefreshError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::ned::{EmissionFetcher, FetchResult, NedClient};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

/// Default refresh interval
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(300);

/// Source of "now" for window computation
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Snapshot published after every refresh cycle
#[derive(Debug, Clone)]
pub struct CoordinatorState {
    /// Last-known-good result
    pub data: Option<Arc<FetchResult>>,
    pub last_update_success: bool,
    pub last_error: Option<String>,
    /// Time of the last successful cycle
    pub last_refresh: Option<DateTime<Utc>>,
    /// Time of the last cycle, successful or not
    pub last_attempt: Option<DateTime<Utc>>,
    /// Options the coordinator currently polls with
    pub options: WindowConfig,
}

impl CoordinatorState {
    fn initial(options: WindowConfig) -> Self {
        Self {
            data: None,
            last_update_success: false,
            last_error: None,
            last_refresh: None,
            last_attempt: None,
            options,
        }
    }
}

/// Commands accepted by a running coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorCommand {
    /// Out-of-band refresh
    Refresh,
    /// Replace options, then refresh
    UpdateOptions(WindowConfig),
    Shutdown,
}

pub struct Coordinator {
    fetcher: Arc<dyn EmissionFetcher>,
    options: WindowConfig,
    host_tz: Tz,
    interval: Duration,
    clock: Arc<dyn Clock>,
    state_tx: watch::Sender<CoordinatorState>,
    cmd_tx: Option<mpsc::UnboundedSender<CoordinatorCommand>>,
    cmd_rx: mpsc::UnboundedReceiver<CoordinatorCommand>,
    logger: StructuredLogger,
}

impl Coordinator {
    pub fn new(fetcher: Arc<dyn EmissionFetcher>, options: WindowConfig, host_tz: Tz) -> Self {
        let (state_tx, _) = watch::channel(CoordinatorState::initial(options.clone()));
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let logger = get_logger_with_context(LogContext::new("coordinator").with_point(options.point));
        Self {
            fetcher,
            options,
            host_tz,
            interval: DEFAULT_UPDATE_INTERVAL,
            clock: Arc::new(SystemClock),
            state_tx,
            cmd_tx: Some(cmd_tx),
            cmd_rx,
            logger,
        }
    }

    /// Build a coordinator polling the real NED API
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher: Arc<dyn EmissionFetcher> = Arc::new(NedClient::from_config(&config.api));
        Self::new(fetcher, config.window.clone(), config.tz()?)
            .with_interval(Duration::from_secs(config.update_interval_secs))
    }

    /// Replace the refresh interval; zero is rejected
    pub fn with_interval(mut self, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(NedError::validation(
                "update_interval_secs",
                "Must be greater than 0",
            ));
        }
        self.interval = interval;
        Ok(self)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_entry_id(mut self, entry_id: &str) -> Self {
        self.logger = get_logger_with_context(
            LogContext::new("coordinator")
                .with_entry_id(entry_id.to_string())
                .with_point(self.options.point),
        );
        self
    }

    /// Read/command handle; take handles before calling `run`
    pub fn handle(&self) -> Result<CoordinatorHandle> {
        let cmd_tx = self.cmd_tx.clone().ok_or(NedError::CoordinatorStopped)?;
        Ok(CoordinatorHandle {
            state_rx: self.state_tx.subscribe(),
            cmd_tx,
        })
    }

    pub fn options(&self) -> &WindowConfig {
        &self.options
    }

    pub fn state(&self) -> CoordinatorState {
        self.state_tx.borrow().clone()
    }

    /// Replace the polling options wholesale
    pub fn update_options(&mut self, options: WindowConfig) {
        self.logger.info(&format!(
            "Options updated: point={} granularity={} window_days={} local_tz={}",
            options.point,
            options.granularity.code(),
            options.window_days,
            options.local_tz_filter
        ));
        self.options = options.clone();
        self.state_tx.send_modify(|s| s.options = options);
    }

    /// Initial refresh; setup fails when it does
    pub async fn first_refresh(&mut self) -> std::result::Result<(), RefreshError> {
        self.refresh_cycle().await
    }

    /// Run one cycle; returns whether it succeeded
    ///
    /// Failures are logged and recorded in the published state; the previous
    /// data stays in place.
    pub async fn refresh(&mut self) -> bool {
        self.refresh_cycle().await.is_ok()
    }

    async fn refresh_cycle(&mut self) -> std::result::Result<(), RefreshError> {
        let now = self.clock.now();
        let outcome = self.fetcher.fetch(&self.options, self.host_tz, now).await;

        match outcome {
            Ok(result) => {
                self.logger.debug(&format!(
                    "Refresh ok: {} current / {} forecast rows, window {}..{} ({})",
                    result.current.len(),
                    result.forecast.len(),
                    result.meta.window_start,
                    result.meta.window_end,
                    result.meta.timezone_mode
                ));
                let data = Arc::new(result);
                self.state_tx.send_modify(|s| {
                    s.data = Some(data);
                    s.last_update_success = true;
                    s.last_error = None;
                    s.last_refresh = Some(now);
                    s.last_attempt = Some(now);
                });
                Ok(())
            }
            Err(err) => {
                self.logger.warn(&format!("Refresh failed: {}", err));
                let message = err.to_string();
                self.state_tx.send_modify(|s| {
                    s.last_update_success = false;
                    s.last_error = Some(message);
                    s.last_attempt = Some(now);
                });
                Err(err)
            }
        }
    }

    /// Refresh on the fixed interval and serve commands until shut down
    pub async fn run(mut self) {
        // Handles hold the remaining senders; dropping ours lets the loop end
        // once every handle is gone
        self.cmd_tx = None;

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if self.state_tx.borrow().last_attempt.is_some() {
            // First tick fires immediately; skip it after a first refresh
            ticker.tick().await;
        }

        self.logger.info(&format!(
            "Coordinator running, interval {}s",
            self.interval.as_secs()
        ));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh().await;
                }
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(CoordinatorCommand::Refresh) => {
                        self.refresh().await;
                    }
                    Some(CoordinatorCommand::UpdateOptions(options)) => {
                        self.update_options(options);
                        self.refresh().await;
                    }
                    Some(CoordinatorCommand::Shutdown) | None => break,
                }
            }
        }

        self.logger.info("Coordinator stopped");
    }
}

/// Cloneable reader and command sender for a coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    state_rx: watch::Receiver<CoordinatorState>,
    cmd_tx: mpsc::UnboundedSender<CoordinatorCommand>,
}

impl CoordinatorHandle {
    pub fn state(&self) -> CoordinatorState {
        self.state_rx.borrow().clone()
    }

    /// Receiver that wakes on every published cycle
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.state_rx.clone()
    }

    pub fn request_refresh(&self) -> Result<()> {
        self.send(CoordinatorCommand::Refresh)
    }

    /// Validate and queue new options; the coordinator refreshes after applying
    pub fn update_options(&self, options: WindowConfig) -> Result<()> {
        options.validate()?;
        self.send(CoordinatorCommand::UpdateOptions(options))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(CoordinatorCommand::Shutdown)
    }

    fn send(&self, cmd: CoordinatorCommand) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| NedError::CoordinatorStopped)
    }
}
