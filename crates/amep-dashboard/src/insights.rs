//! Threshold rules: what the dashboard colors, flags, and recommends.

use serde::Serialize;

use crate::model::{
    AttentionStatus, ConceptMastery, DashboardSnapshot, EngagementPoint, LivePoll, PollOption,
    ProjectStatus, StudentAttention,
};

/// Mastery at or above this is [`MasteryBand::High`].
pub const HIGH_MASTERY: u8 = 85;

/// Mastery at or above this (and below [`HIGH_MASTERY`]) is
/// [`MasteryBand::Moderate`]; below it the topic needs review.
pub const MODERATE_MASTERY: u8 = 60;

/// Share of "No" poll answers, in percent, that triggers a clarification
/// alert.
pub const CLARIFICATION_THRESHOLD: u8 = 8;

/// Talk-time split reported by the pacing note, teacher then student.
const TALK_TIME: (u8, u8) = (70, 30);

// =========================================================================
// Mastery
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteryBand {
    High,
    Moderate,
    Low,
}

impl MasteryBand {
    pub fn from_score(mastery: u8) -> Self {
        if mastery >= HIGH_MASTERY {
            MasteryBand::High
        } else if mastery >= MODERATE_MASTERY {
            MasteryBand::Moderate
        } else {
            MasteryBand::Low
        }
    }

    /// Display color: green, amber, red.
    pub fn color(self) -> &'static str {
        match self {
            MasteryBand::High => "#10b981",
            MasteryBand::Moderate => "#f59e0b",
            MasteryBand::Low => "#ef4444",
        }
    }
}

impl ConceptMastery {
    pub fn band(&self) -> MasteryBand {
        MasteryBand::from_score(self.mastery)
    }

    pub fn needs_review(&self) -> bool {
        self.mastery < MODERATE_MASTERY
    }
}

// =========================================================================
// Per-section rules
// =========================================================================

impl LivePoll {
    /// Percentage of "No" answers when it reaches
    /// [`CLARIFICATION_THRESHOLD`], otherwise `None`.
    pub fn clarification_needed(&self) -> Option<u8> {
        self.response(PollOption::No)
            .map(|r| r.percentage)
            .filter(|&p| p >= CLARIFICATION_THRESHOLD)
    }
}

impl ProjectStatus {
    pub fn needs_attention(&self) -> bool {
        self.at_risk > 0
    }
}

/// Last week's engagement minus the first week's. `None` for an empty
/// series.
pub fn engagement_delta(trend: &[EngagementPoint]) -> Option<i16> {
    let first = trend.first()?;
    let last = trend.last()?;
    Some(i16::from(last.engagement) - i16::from(first.engagement))
}

/// Students per attention status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttentionTally {
    pub engaged: usize,
    pub passive: usize,
    pub at_risk: usize,
}

impl AttentionTally {
    pub fn count(cells: &[StudentAttention]) -> Self {
        cells.iter().fold(Self::default(), |mut tally, cell| {
            match cell.status {
                AttentionStatus::Engaged => tally.engaged += 1,
                AttentionStatus::Passive => tally.passive += 1,
                AttentionStatus::AtRisk => tally.at_risk += 1,
            }
            tally
        })
    }

    pub fn total(&self) -> usize {
        self.engaged + self.passive + self.at_risk
    }
}

// =========================================================================
// Alerts and recommendations
// =========================================================================

/// Something on the dashboard the teacher should look at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Alert {
    /// Too many students answered "No" to the live poll.
    Clarification { percentage: u8 },
    /// Students flagged for immediate attention.
    StudentsFlagged { count: usize },
    ConceptNeedsReview { topic: String, mastery: u8 },
    ProjectsAtRisk { count: u32 },
}

impl std::fmt::Display for Alert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Alert::Clarification { percentage } => {
                write!(f, "Consider re-explaining: {percentage}% need clarification")
            }
            Alert::StudentsFlagged { count } => {
                write!(f, "{count} students flagged for immediate attention")
            }
            Alert::ConceptNeedsReview { topic, mastery } => {
                write!(f, "{topic} needs review ({mastery}% mastery)")
            }
            Alert::ProjectsAtRisk { count } => write!(f, "{count} projects need attention"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationKind {
    StudentSupport,
    TopicReview,
    Pacing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub title: String,
    pub detail: String,
}

impl DashboardSnapshot {
    pub fn attention_tally(&self) -> AttentionTally {
        AttentionTally::count(&self.student_attention)
    }

    pub fn engagement_delta(&self) -> Option<i16> {
        engagement_delta(&self.engagement_trends)
    }

    /// The topic with the lowest mastery, if any falls below
    /// [`MODERATE_MASTERY`].
    pub fn weakest_topic(&self) -> Option<&ConceptMastery> {
        self.concept_mastery
            .iter()
            .filter(|c| c.needs_review())
            .min_by_key(|c| c.mastery)
    }

    /// Every alert the snapshot raises, in display order.
    pub fn alerts(&self) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if let Some(percentage) = self.live_poll.clarification_needed() {
            alerts.push(Alert::Clarification { percentage });
        }
        if !self.at_risk_students.is_empty() {
            alerts.push(Alert::StudentsFlagged {
                count: self.at_risk_students.len(),
            });
        }
        alerts.extend(
            self.concept_mastery
                .iter()
                .filter(|c| c.needs_review())
                .map(|c| Alert::ConceptNeedsReview {
                    topic: c.topic.clone(),
                    mastery: c.mastery,
                }),
        );
        if self.projects.needs_attention() {
            alerts.push(Alert::ProjectsAtRisk {
                count: self.projects.at_risk,
            });
        }

        alerts
    }

    pub fn recommendations(&self) -> Vec<Recommendation> {
        let mut out = vec![Recommendation {
            kind: RecommendationKind::StudentSupport,
            title: "Student Support Needed".to_string(),
            detail: format!(
                "{} students may need 1-on-1 support",
                self.at_risk_students.len()
            ),
        }];

        if let Some(topic) = self.weakest_topic() {
            out.push(Recommendation {
                kind: RecommendationKind::TopicReview,
                title: "Topic Review Suggested".to_string(),
                detail: format!(
                    "{} average mastery at {}% - consider revisiting",
                    topic.topic, topic.mastery
                ),
            });
        }

        let (teacher, student) = TALK_TIME;
        out.push(Recommendation {
            kind: RecommendationKind::Pacing,
            title: "Pacing Adjustment".to_string(),
            detail: format!(
                "Talk time ratio: {teacher}% teacher / {student}% student - consider more interaction"
            ),
        });

        out
    }
}
