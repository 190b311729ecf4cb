//! Sync daemon
//!
//! Long-running tokio event loop that refreshes the cache on a fixed
//! interval. Progress is published as [`SyncEvent`]s on a broadcast channel;
//! the loop is steered with [`SyncCommand`]s.

use super::SyncReport;
use crate::config::SyncSettings;
use crate::service::Holonet;
use crate::{HolonetError, Result};
use std::time::Duration;
use swapi::Collection;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Default sync interval (daily)
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default event channel capacity
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Sync daemon configuration
#[derive(Debug, Clone)]
pub struct SyncDaemonConfig {
    /// Time between two sync cycles
    pub interval: Duration,

    /// Run a cycle immediately on start instead of waiting one interval
    pub run_on_start: bool,

    /// Event broadcast channel capacity
    pub event_channel_capacity: usize,
}

impl Default for SyncDaemonConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SYNC_INTERVAL,
            run_on_start: true,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl SyncDaemonConfig {
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            interval: settings.interval(),
            run_on_start: settings.run_on_start,
            ..Default::default()
        }
    }

    /// Set the interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }
}

/// Events emitted by the sync daemon
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Daemon started
    Started,

    /// Sync cycle started
    CycleStarted,

    /// One collection refreshed
    CollectionSynced {
        collection: Collection,
        items: usize,
    },

    /// One collection failed after retries
    CollectionFailed {
        collection: Collection,
        error: String,
    },

    /// Sync cycle finished
    CycleCompleted(SyncReport),

    /// Daemon stopped
    Stopped,
}

/// Commands that can be sent to the sync daemon
#[derive(Debug, Clone)]
pub enum SyncCommand {
    /// Trigger an immediate sync cycle
    SyncNow,

    /// Change the interval; the next cycle is one new interval away
    SetInterval(Duration),

    /// Stop the daemon
    Shutdown,
}

/// Result of handling a command
enum CommandResult {
    Continue,
    Stop,
}

/// Sync daemon
pub struct SyncDaemon {
    holonet: Holonet,
    config: SyncDaemonConfig,
    event_tx: broadcast::Sender<SyncEvent>,
    command_rx: Option<mpsc::Receiver<SyncCommand>>,
    command_tx: mpsc::Sender<SyncCommand>,
    cycles: u64,
    running: bool,
}

impl SyncDaemon {
    /// Create a new daemon
    pub fn new(holonet: Holonet, config: SyncDaemonConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));
        let (command_tx, command_rx) = mpsc::channel(10);

        Self {
            holonet,
            config,
            event_tx,
            command_rx: Some(command_rx),
            command_tx,
            cycles: 0,
            running: false,
        }
    }

    /// Subscribe to daemon events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_tx.subscribe()
    }

    /// Get a command sender
    pub fn command_sender(&self) -> mpsc::Sender<SyncCommand> {
        self.command_tx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of completed sync cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    fn send_event(&self, event: SyncEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    fn new_interval(&self, run_now: bool) -> Interval {
        let period = self.config.interval.max(Duration::from_millis(1));
        let start = if run_now {
            Instant::now()
        } else {
            Instant::now() + period
        };
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    /// Run the daemon event loop with graceful shutdown on SIGTERM/SIGINT
    pub async fn run(&mut self) -> Result<()> {
        let mut command_rx = self
            .command_rx
            .take()
            .ok_or_else(|| HolonetError::Config("Daemon already running".to_string()))?;

        self.running = true;
        self.send_event(SyncEvent::Started);
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            run_on_start = self.config.run_on_start,
            "Sync daemon started"
        );

        let mut interval = self.new_interval(self.config.run_on_start);

        #[cfg(unix)]
        self.run_with_signals(&mut interval, &mut command_rx).await?;

        #[cfg(not(unix))]
        self.run_without_signals(&mut interval, &mut command_rx).await?;

        self.running = false;
        tracing::info!(cycles = self.cycles, "Sync daemon shutdown complete");
        self.send_event(SyncEvent::Stopped);
        Ok(())
    }

    /// Run event loop with Unix signal handling (SIGTERM/SIGINT)
    #[cfg(unix)]
    async fn run_with_signals(
        &mut self,
        interval: &mut Interval,
        command_rx: &mut mpsc::Receiver<SyncCommand>,
    ) -> Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
            HolonetError::Other(format!("Failed to set up SIGTERM handler: {}", e))
        })?;
        let mut sigint = signal(SignalKind::interrupt()).map_err(|e| {
            HolonetError::Other(format!("Failed to set up SIGINT handler: {}", e))
        })?;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sync_cycle().await;
                }
                cmd = command_rx.recv() => {
                    match self.handle_command(cmd, interval).await {
                        CommandResult::Continue => {}
                        CommandResult::Stop => break,
                    }
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    break;
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Run event loop without signal handling (non-Unix platforms)
    #[cfg(not(unix))]
    async fn run_without_signals(
        &mut self,
        interval: &mut Interval,
        command_rx: &mut mpsc::Receiver<SyncCommand>,
    ) -> Result<()> {
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sync_cycle().await;
                }
                cmd = command_rx.recv() => {
                    match self.handle_command(cmd, interval).await {
                        CommandResult::Continue => {}
                        CommandResult::Stop => break,
                    }
                }
            }
        }
        Ok(())
    }

    /// `None` means every sender is gone, which stops the loop
    async fn handle_command(
        &mut self,
        cmd: Option<SyncCommand>,
        interval: &mut Interval,
    ) -> CommandResult {
        match cmd {
            Some(SyncCommand::SyncNow) => {
                self.sync_cycle().await;
            }
            Some(SyncCommand::SetInterval(duration)) => {
                tracing::info!(interval_secs = duration.as_secs(), "Sync interval changed");
                self.config.interval = duration;
                *interval = self.new_interval(false);
            }
            Some(SyncCommand::Shutdown) => {
                tracing::info!("Received shutdown command");
                return CommandResult::Stop;
            }
            None => {
                tracing::debug!("Command channel closed");
                return CommandResult::Stop;
            }
        }
        CommandResult::Continue
    }

    /// Execute a single sync cycle
    ///
    /// Failures are reported as events, never returned.
    async fn sync_cycle(&mut self) {
        self.send_event(SyncEvent::CycleStarted);

        let report = self.holonet.sync_all().await;
        for outcome in &report.outcomes {
            let event = match (&outcome.items, &outcome.error) {
                (_, Some(error)) => SyncEvent::CollectionFailed {
                    collection: outcome.collection,
                    error: error.clone(),
                },
                (items, None) => SyncEvent::CollectionSynced {
                    collection: outcome.collection,
                    items: items.unwrap_or(0),
                },
            };
            self.send_event(event);
        }

        match self.holonet.purge_expired().await {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed = removed, "Purged expired cache entries"),
            Err(e) => tracing::warn!(error = %e, "Failed to purge expired cache entries"),
        }

        self.cycles += 1;
        if !report.is_success() {
            tracing::warn!(
                failed = report.failed(),
                cycle = self.cycles,
                "Sync cycle finished with failures"
            );
        }
        self.send_event(SyncEvent::CycleCompleted(report));
    }
}

/// Wait for the next daemon event, skipping over any the receiver lagged behind on
///
/// Returns `None` once the daemon is gone.
pub async fn recv_event(events: &mut broadcast::Receiver<SyncEvent>) -> Option<SyncEvent> {
    loop {
        match events.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped = skipped, "Sync event receiver lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::fake::FakeSource;
    use crate::cache::{CacheStore, MemoryCache};
    use crate::config::HolonetConfig;
    use crate::upstream::retry::RetryConfig;
    use std::sync::Arc;

    fn holonet(source: Arc<FakeSource>) -> Holonet {
        Holonet::new(source, Arc::new(MemoryCache::new()), HolonetConfig::default())
            .with_retry(RetryConfig::none())
    }

    async fn next_completed(events: &mut broadcast::Receiver<SyncEvent>) -> SyncReport {
        loop {
            if let SyncEvent::CycleCompleted(report) = events.recv().await.unwrap() {
                return report;
            }
        }
    }

    #[test]
    fn test_config_from_settings() {
        let settings = SyncSettings {
            interval_secs: 60,
            run_on_start: false,
            max_retries: 1,
        };
        let config = SyncDaemonConfig::from_settings(&settings);

        assert_eq!(config.interval, Duration::from_secs(60));
        assert!(!config.run_on_start);
        assert_eq!(config.event_channel_capacity, DEFAULT_EVENT_CHANNEL_CAPACITY);
    }

    #[tokio::test]
    async fn test_runs_on_start_and_shuts_down() {
        let source = Arc::new(FakeSource::new().with_all_collections(2));
        let mut daemon = SyncDaemon::new(holonet(source.clone()), SyncDaemonConfig::default());
        let mut events = daemon.subscribe();
        let commands = daemon.command_sender();

        let handle = tokio::spawn(async move {
            daemon.run().await.unwrap();
            daemon
        });

        assert!(matches!(events.recv().await.unwrap(), SyncEvent::Started));
        let report = next_completed(&mut events).await;
        assert!(report.is_success());

        commands.send(SyncCommand::Shutdown).await.unwrap();
        let daemon = handle.await.unwrap();

        assert_eq!(daemon.cycles(), 1);
        assert!(!daemon.is_running());
        assert_eq!(source.total_page_calls(), 6);
    }

    #[tokio::test]
    async fn test_sync_now_and_failure_events() {
        let source = Arc::new(
            FakeSource::new()
                .with_all_collections(2)
                .fail_page(Collection::Starships, 1),
        );
        let config = SyncDaemonConfig::default().with_run_on_start(false);
        let mut daemon = SyncDaemon::new(holonet(source), config);
        let mut events = daemon.subscribe();
        let commands = daemon.command_sender();

        let handle = tokio::spawn(async move { daemon.run().await });

        commands.send(SyncCommand::SyncNow).await.unwrap();

        let mut failed = Vec::new();
        let mut synced = 0;
        loop {
            match events.recv().await.unwrap() {
                SyncEvent::CollectionFailed { collection, .. } => failed.push(collection),
                SyncEvent::CollectionSynced { items, .. } => {
                    assert_eq!(items, 2);
                    synced += 1;
                }
                SyncEvent::CycleCompleted(report) => {
                    assert_eq!(report.failed(), 1);
                    break;
                }
                _ => {}
            }
        }
        assert_eq!(failed, vec![Collection::Starships]);
        assert_eq!(synced, 5);

        commands
            .send(SyncCommand::SetInterval(Duration::from_secs(3600)))
            .await
            .unwrap();
        commands.send(SyncCommand::Shutdown).await.unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_cycle_purges_expired_entries() {
        let source = Arc::new(FakeSource::new().with_all_collections(2));
        let store = Arc::new(MemoryCache::new());
        store
            .set("planets_page_9", "[]".to_string(), Duration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let holonet = Holonet::new(source, store.clone(), HolonetConfig::default())
            .with_retry(RetryConfig::none());
        let mut daemon = SyncDaemon::new(holonet, SyncDaemonConfig::default());
        let mut events = daemon.subscribe();
        let commands = daemon.command_sender();

        let handle = tokio::spawn(async move { daemon.run().await });
        next_completed(&mut events).await;
        commands.send(SyncCommand::Shutdown).await.unwrap();
        handle.await.unwrap().unwrap();

        // One merged entry per collection, the stale page is gone
        assert_eq!(store.len(), 6);
    }

    #[tokio::test]
    async fn test_recv_event_survives_lag() {
        let (tx, mut rx) = broadcast::channel(1);
        tx.send(SyncEvent::Started).unwrap();
        tx.send(SyncEvent::CycleStarted).unwrap();
        tx.send(SyncEvent::Stopped).unwrap();

        assert!(matches!(recv_event(&mut rx).await, Some(SyncEvent::Stopped)));

        drop(tx);
        assert!(recv_event(&mut rx).await.is_none());
    }

    #[tokio::test]
    async fn test_run_twice_fails() {
        let source = Arc::new(FakeSource::new());
        let config = SyncDaemonConfig::default().with_run_on_start(false);
        let mut daemon = SyncDaemon::new(holonet(source), config);
        let commands = daemon.command_sender();

        commands.send(SyncCommand::Shutdown).await.unwrap();
        daemon.run().await.unwrap();

        assert!(matches!(daemon.run().await, Err(HolonetError::Config(_))));
    }
}
