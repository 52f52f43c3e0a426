//! Periodic dashboard refresh.
//!
//! [`DashboardFeed::spawn`] starts an actor task that owns a
//! [`MockGenerator`] and regenerates the snapshot every
//! [`FeedConfig::interval`]. Snapshots are published on a `watch` channel:
//! readers always see the latest one and never queue up stale renders.
//!
//! The task stops on [`DashboardFeed::shutdown`] or once every handle has
//! been dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::error::DashboardError;
use crate::generator::MockGenerator;
use crate::model::DashboardSnapshot;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Time between regenerations. Default: 30 seconds.
    pub interval: Duration,

    /// Seed for the mock generator. `None` seeds from the OS.
    pub seed: Option<u64>,

    /// Capacity of the command channel. Default: 16.
    pub channel_size: usize,
}

impl FeedConfig {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
    pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Clamps out-of-range values, warning about each one.
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                min_ms = Self::MIN_INTERVAL.as_millis() as u64,
                "dashboard refresh interval too short, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        if self.channel_size == 0 {
            warn!("dashboard feed channel size is zero, using 1");
            self.channel_size = 1;
        }
        self
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            seed: None,
            channel_size: 16,
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

enum FeedCommand {
    RefreshNow {
        reply: oneshot::Sender<Arc<DashboardSnapshot>>,
    },
    Shutdown,
}

/// Handle to a running dashboard feed. Cheap to clone.
#[derive(Clone)]
pub struct DashboardFeed {
    sender: mpsc::Sender<FeedCommand>,
    snapshots: watch::Receiver<Arc<DashboardSnapshot>>,
    interval: Duration,
}

impl DashboardFeed {
    /// Generates the first snapshot immediately and spawns the refresh task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(config: FeedConfig) -> Self {
        let config = config.validated();
        let mut generator = match config.seed {
            Some(seed) => MockGenerator::seeded(seed),
            None => MockGenerator::new(),
        };

        let (snap_tx, snap_rx) = watch::channel(Arc::new(generator.generate()));
        let (tx, rx) = mpsc::channel(config.channel_size);

        let actor = FeedActor {
            generator,
            interval: config.interval,
            snapshots: snap_tx,
            receiver: rx,
        };
        tokio::spawn(actor.run());

        Self {
            sender: tx,
            snapshots: snap_rx,
            interval: config.interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The latest snapshot.
    pub fn current(&self) -> Arc<DashboardSnapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    /// A receiver that is notified on every regeneration.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardSnapshot>> {
        let mut rx = self.snapshots.clone();
        rx.mark_unchanged();
        rx
    }

    /// Regenerates now and restarts the interval, so the next automatic
    /// refresh is a full period away.
    pub async fn refresh_now(&self) -> Result<Arc<DashboardSnapshot>, DashboardError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(FeedCommand::RefreshNow { reply: reply_tx })
            .await
            .map_err(|_| DashboardError::FeedStopped)?;
        reply_rx.await.map_err(|_| DashboardError::FeedStopped)
    }

    /// Stops the refresh task. The last snapshot stays readable through
    /// [`current`](Self::current).
    pub async fn shutdown(&self) -> Result<(), DashboardError> {
        self.sender
            .send(FeedCommand::Shutdown)
            .await
            .map_err(|_| DashboardError::FeedStopped)
    }

    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct FeedActor {
    generator: MockGenerator,
    interval: Duration,
    snapshots: watch::Sender<Arc<DashboardSnapshot>>,
    receiver: mpsc::Receiver<FeedCommand>,
}

impl FeedActor {
    async fn run(mut self) {
        info!(interval_s = self.interval.as_secs_f64(), "dashboard feed started");

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        // A stalled runtime should not cause a burst of catch-up refreshes.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.publish();
                }
                cmd = self.receiver.recv() => match cmd {
                    Some(FeedCommand::RefreshNow { reply }) => {
                        let snapshot = self.publish();
                        ticker.reset();
                        debug!(sequence = snapshot.sequence, "dashboard refreshed on demand");
                        let _ = reply.send(snapshot);
                    }
                    Some(FeedCommand::Shutdown) => break,
                    None => {
                        debug!("all dashboard feed handles dropped");
                        break;
                    }
                },
            }
        }

        info!(generated = self.generator.generated(), "dashboard feed stopped");
    }

    fn publish(&mut self) -> Arc<DashboardSnapshot> {
        let snapshot = Arc::new(self.generator.generate());
        trace!(sequence = snapshot.sequence, "publishing dashboard snapshot");
        self.snapshots.send_replace(Arc::clone(&snapshot));
        snapshot
    }
}
