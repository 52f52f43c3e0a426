//! Dashboard data model.
//!
//! Percentages are whole numbers in `0..=100`. Every type serializes with
//! camelCase field names so a web front end can consume a snapshot as-is.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Everything one render of the teacher dashboard needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    /// Generation counter, starting at 1 for the first snapshot a
    /// generator produces.
    pub sequence: u64,
    pub generated_at: SystemTime,
    pub class_metrics: ClassMetrics,
    pub concept_mastery: Vec<ConceptMastery>,
    pub engagement_trends: Vec<EngagementPoint>,
    pub live_poll: LivePoll,
    pub student_attention: Vec<StudentAttention>,
    pub at_risk_students: Vec<AtRiskStudent>,
    pub intervention: InterventionTracking,
    pub projects: ProjectStatus,
}

/// Headline class metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassMetrics {
    pub mastery_rate: u8,
    pub adoption_rate: u8,
    pub confidence_score: u8,
    pub engagement_index: u8,
}

/// Mastery of one topic across the class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptMastery {
    pub topic: String,
    pub mastery: u8,
    pub students: u32,
}

/// One week of the engagement trend line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementPoint {
    pub week: String,
    pub engagement: u8,
}

/// The answers a live poll offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PollOption {
    Yes,
    Partially,
    No,
}

impl PollOption {
    pub const ALL: [PollOption; 3] = [PollOption::Yes, PollOption::Partially, PollOption::No];

    pub fn label(self) -> &'static str {
        match self {
            PollOption::Yes => "Yes",
            PollOption::Partially => "Partially",
            PollOption::No => "No",
        }
    }
}

impl std::fmt::Display for PollOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Responses for a single poll option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub option: PollOption,
    pub count: u32,
    /// `count` as a rounded share of the poll's total.
    pub percentage: u8,
}

/// The question currently being polled and how the class answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivePoll {
    pub question: String,
    /// One entry per [`PollOption`], in [`PollOption::ALL`] order.
    pub responses: Vec<PollResponse>,
    /// Always the sum of the response counts.
    pub total_responses: u32,
}

impl LivePoll {
    /// The response entry for `option`, if the poll offers it.
    pub fn response(&self, option: PollOption) -> Option<&PollResponse> {
        self.responses.iter().find(|r| r.option == option)
    }
}

/// Attention state shown on the heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttentionStatus {
    Engaged,
    Passive,
    AtRisk,
}

/// One cell of the attention heatmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttention {
    pub id: String,
    pub status: AttentionStatus,
}

/// A student flagged for early intervention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtRiskStudent {
    pub name: String,
    /// Topics the student is struggling with.
    pub concepts: Vec<String>,
    pub engagement: u8,
    pub last_active: String,
}

/// Outcome of the most recent targeted intervention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionTracking {
    pub topic: String,
    pub before: u8,
    pub after: u8,
    /// `after - before`; negative when the intervention did not help.
    pub improvement: i16,
    pub date: String,
}

/// Project-based-learning progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatus {
    pub active: u32,
    pub on_track: u32,
    pub at_risk: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attention_status_serializes_kebab_case() {
        let json = serde_json::to_string(&AttentionStatus::AtRisk).unwrap();
        assert_eq!(json, "\"at-risk\"");
    }

    #[test]
    fn test_poll_response_lookup_by_option() {
        let poll = LivePoll {
            question: "Q".into(),
            responses: vec![
                PollResponse { option: PollOption::Yes, count: 3, percentage: 75 },
                PollResponse { option: PollOption::No, count: 1, percentage: 25 },
            ],
            total_responses: 4,
        };

        assert_eq!(poll.response(PollOption::No).map(|r| r.count), Some(1));
        assert!(poll.response(PollOption::Partially).is_none());
    }

    #[test]
    fn test_class_metrics_uses_camel_case_fields() {
        let metrics = ClassMetrics {
            mastery_rate: 78,
            adoption_rate: 92,
            confidence_score: 94,
            engagement_index: 87,
        };
        let value = serde_json::to_value(metrics).unwrap();
        assert_eq!(value["masteryRate"], 78);
        assert_eq!(value["engagementIndex"], 87);
    }
}
