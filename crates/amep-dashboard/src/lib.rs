//! Classroom analytics for the teacher dashboard.
//!
//! The dashboard shows mock data today: a snapshot of class metrics,
//! concept mastery, engagement, a live poll, an attention map, and project
//! status, regenerated on a fixed timer. Rendering is left to the caller;
//! this crate owns the data and the rules that decide what gets flagged.
//!
//! # Key types
//!
//! - [`DashboardSnapshot`]: everything one dashboard render needs
//! - [`MockGenerator`]: produces randomized snapshots
//! - [`MasteryBand`], [`Alert`], [`Recommendation`]: threshold rules
//! - [`DashboardFeed`]: a Tokio task that regenerates the snapshot every
//!   [`FeedConfig::interval`] and publishes it on a `watch` channel

mod error;
mod feed;
mod generator;
mod insights;
mod model;

pub use error::DashboardError;
pub use feed::{DashboardFeed, FeedConfig};
pub use generator::{MockGenerator, ROSTER_SIZE};
pub use insights::{
    engagement_delta, Alert, AttentionTally, MasteryBand, Recommendation, RecommendationKind,
    CLARIFICATION_THRESHOLD, HIGH_MASTERY, MODERATE_MASTERY,
};
pub use model::{
    AtRiskStudent, AttentionStatus, ClassMetrics, ConceptMastery,
    DashboardSnapshot, EngagementPoint, InterventionTracking, LivePoll,
    PollOption, PollResponse, ProjectStatus, StudentAttention,
};
