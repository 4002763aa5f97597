//! The live count synchronizer.
//!
//! Keeps a displayed integer equal to the number of rows in a remote table.
//! The primary mechanism is a change channel: every notification triggers a
//! fresh authoritative count query, never an incremental adjustment, so
//! coalesced or reordered notifications cannot make the value drift. When
//! the channel cannot be established within a grace period, or dies later, a
//! poll timer re-queries on a fixed interval instead. A dead channel with no
//! fallback is the failure mode this module exists to prevent.
//!
//! All refreshes run sequentially inside one supervisor task, so a stale
//! in-flight count can never overwrite a newer one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::Filter;
use crate::transport::{ChangeChannel, ChannelEvent, Transport};

/// How long the channel may take to become active before polling starts.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Poll cadence once the fallback is active.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Per-instance settings for a [`CountSynchronizer`].
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub table: String,
    pub filter: Option<Filter>,
    pub grace_period: Duration,
    pub poll_interval: Duration,
}

impl SyncConfig {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
            grace_period: DEFAULT_GRACE_PERIOD,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Synchronizes one table's row count to a caller-supplied sink.
///
/// `start` consumes the synchronizer: one instance owns at most one channel
/// and one poll timer for its whole life. Replacing a running view means
/// stopping the old handle and starting a new instance.
pub struct CountSynchronizer {
    transport: Arc<dyn Transport>,
    config: SyncConfig,
}

impl CountSynchronizer {
    pub fn new(transport: Arc<dyn Transport>, config: SyncConfig) -> Self {
        Self { transport, config }
    }

    /// Begin synchronization.
    ///
    /// Immediately issues one count query to initialize the display, then
    /// opens the change channel and arms the grace-period timer. `on_update`
    /// is invoked with each successfully fetched count; failed refreshes are
    /// logged and leave the previous value untouched.
    pub fn start<F>(self, on_update: F) -> SyncHandle
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        let stopped = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let supervisor = Supervisor {
            transport: self.transport,
            config: self.config,
            on_update: Box::new(on_update),
            stopped: stopped.clone(),
        };
        let task = tokio::spawn(supervisor.run(shutdown_rx));

        SyncHandle {
            stopped,
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }
}

/// Handle to a running synchronizer.
///
/// Dropping the handle stops synchronization as well.
pub struct SyncHandle {
    stopped: Arc<AtomicBool>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    /// Stop synchronizing. Idempotent.
    ///
    /// After `stop` returns, no further `on_update` call is made, even for a
    /// notification or poll tick already in flight. Channel release happens
    /// asynchronously in the supervisor task.
    pub fn stop(&mut self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown.send(true);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// The single task driving one synchronizer instance.
struct Supervisor {
    transport: Arc<dyn Transport>,
    config: SyncConfig,
    on_update: Box<dyn Fn(u64) + Send + Sync>,
    stopped: Arc<AtomicBool>,
}

impl Supervisor {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        // Initialize the display before any channel work.
        self.refresh().await;
        if *shutdown.borrow() {
            return;
        }

        // Armed alongside the open attempt, not after it resolves: a connect
        // that hangs or fails slowly must not push the fallback out.
        let deadline = Instant::now() + self.config.grace_period;

        let open = self
            .transport
            .open_channel(&self.config.table, self.config.filter.as_ref());
        tokio::pin!(open);

        tokio::select! {
            _ = shutdown.changed() => {}
            _ = sleep_until(deadline) => {
                info!(
                    table = %self.config.table,
                    "channel not open within grace period, polling instead"
                );
                self.poll(&mut shutdown).await;
            }
            result = &mut open => match result {
                Ok(channel) => self.consume_channel(channel, deadline, &mut shutdown).await,
                Err(e) => {
                    warn!(
                        error = %e,
                        table = %self.config.table,
                        "change channel could not be opened"
                    );
                    if self.wait_until(deadline, &mut shutdown).await {
                        self.poll(&mut shutdown).await;
                    }
                }
            }
        }
    }

    /// Drive the channel until shutdown, falling back to polling if it never
    /// becomes active or dies later. `deadline` is the grace deadline armed
    /// when the open attempt started.
    async fn consume_channel(
        &self,
        mut channel: Box<dyn ChangeChannel>,
        deadline: Instant,
        shutdown: &mut watch::Receiver<bool>,
    ) {
        let grace = sleep_until(deadline);
        tokio::pin!(grace);
        let mut joined = false;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    channel.close().await;
                    return;
                }
                _ = &mut grace, if !joined => {
                    info!(
                        table = %self.config.table,
                        "channel not active within grace period, polling instead"
                    );
                    channel.close().await;
                    self.poll(shutdown).await;
                    return;
                }
                event = channel.next_event() => match event {
                    Some(ChannelEvent::Joined) => {
                        debug!(table = %self.config.table, "realtime channel active");
                        joined = true;
                    }
                    Some(ChannelEvent::Change(change)) => {
                        debug!(kind = ?change.kind, table = %self.config.table, "change notification");
                        self.refresh().await;
                    }
                    Some(ChannelEvent::Closed { reason }) => {
                        channel.close().await;
                        self.channel_lost(joined, &reason, deadline, shutdown).await;
                        return;
                    }
                    None => {
                        channel.close().await;
                        self.channel_lost(joined, "channel ended", deadline, shutdown).await;
                        return;
                    }
                }
            }
        }
    }

    /// The channel died. If it was never active, the rest of the grace
    /// period is waited out first; either way polling takes over.
    async fn channel_lost(
        &self,
        was_active: bool,
        reason: &str,
        grace_deadline: Instant,
        shutdown: &mut watch::Receiver<bool>,
    ) {
        warn!(
            reason = %reason,
            table = %self.config.table,
            was_active,
            "change channel lost, polling instead"
        );
        if !was_active && !self.wait_until(grace_deadline, shutdown).await {
            return;
        }
        self.poll(shutdown).await;
    }

    /// Wait until `deadline`; returns `false` if shutdown arrived first.
    async fn wait_until(&self, deadline: Instant, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = shutdown.changed() => false,
            _ = sleep_until(deadline) => true,
        }
    }

    /// Refresh on a fixed interval until shutdown. Reached at most once per
    /// instance, so a second poll timer can never exist.
    async fn poll(&self, shutdown: &mut watch::Receiver<bool>) {
        info!(
            table = %self.config.table,
            interval = ?self.config.poll_interval,
            "poll fallback started"
        );
        let mut ticker = interval_at(
            Instant::now() + self.config.poll_interval,
            self.config.poll_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => return,
                _ = ticker.tick() => self.refresh().await,
            }
        }
    }

    /// One authoritative count query. Success publishes through `on_update`
    /// unless the handle stopped meanwhile; failure leaves the previously
    /// published value as-is and is not surfaced to the caller.
    async fn refresh(&self) {
        match self
            .transport
            .count_rows(&self.config.table, self.config.filter.as_ref())
            .await
        {
            Ok(count) => {
                if self.stopped.load(Ordering::SeqCst) {
                    return;
                }
                debug!(count, table = %self.config.table, "count refreshed");
                (self.on_update)(count);
            }
            Err(e) => {
                warn!(error = %e, table = %self.config.table, "count query failed");
            }
        }
    }
}
