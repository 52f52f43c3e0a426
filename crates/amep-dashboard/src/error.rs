/// Errors from the dashboard feed.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// The feed task has stopped (shut down or panicked), so it can no
    /// longer accept commands.
    #[error("dashboard feed is not running")]
    FeedStopped,
}
