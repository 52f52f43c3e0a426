//! Mock snapshot generation.
//!
//! Values jitter around a fixed baseline class so that consecutive
//! snapshots look like a live classroom without ever leaving their valid
//! ranges. A seeded generator replays the same sequence of snapshots.

use std::time::SystemTime;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::model::{
    AtRiskStudent, AttentionStatus, ClassMetrics, ConceptMastery, DashboardSnapshot,
    EngagementPoint, InterventionTracking, LivePoll, PollOption, PollResponse, ProjectStatus,
    StudentAttention,
};

/// Students on the roster (and cells on the attention map).
pub const ROSTER_SIZE: usize = 30;

/// Students who answered the live poll.
const POLL_RESPONDENTS: u32 = 28;

const POLL_QUESTION: &str = "Do you understand today's concept?";

/// `(topic, baseline mastery)`.
const TOPICS: [(&str, u8); 4] = [
    ("Topic 1", 92),
    ("Topic 2", 80),
    ("Topic 3", 55),
    ("Topic 4", 95),
];

const WEEKLY_ENGAGEMENT: [u8; 4] = [72, 78, 85, 87];

const LAST_ACTIVE: [&str; 4] = ["2 hours ago", "3 hours ago", "1 day ago", "2 days ago"];

/// Produces randomized [`DashboardSnapshot`]s.
pub struct MockGenerator {
    rng: StdRng,
    sequence: u64,
}

impl MockGenerator {
    /// A generator seeded from the operating system.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// A deterministic generator: two generators with the same seed yield
    /// the same snapshots (apart from `generated_at`).
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self { rng, sequence: 0 }
    }

    /// How many snapshots this generator has produced.
    pub fn generated(&self) -> u64 {
        self.sequence
    }

    pub fn generate(&mut self) -> DashboardSnapshot {
        self.sequence += 1;

        let class_metrics = ClassMetrics {
            mastery_rate: self.around(78, 5),
            adoption_rate: self.around(92, 3),
            confidence_score: self.around(94, 3),
            engagement_index: self.around(87, 5),
        };

        let concept_mastery: Vec<ConceptMastery> = TOPICS
            .iter()
            .map(|&(topic, base)| ConceptMastery {
                topic: topic.to_string(),
                mastery: self.around(base, 8),
                students: POLL_RESPONDENTS,
            })
            .collect();

        let engagement_trends = WEEKLY_ENGAGEMENT
            .iter()
            .enumerate()
            .map(|(i, &base)| EngagementPoint {
                week: format!("Week {}", i + 1),
                engagement: self.around(base, 4),
            })
            .collect();

        let live_poll = self.live_poll();
        let student_attention = self.attention_map();
        let at_risk_students = self.at_risk_students(&student_attention, &concept_mastery);
        let intervention = self.intervention();
        let projects = self.projects();

        trace!(sequence = self.sequence, "generated dashboard snapshot");

        DashboardSnapshot {
            sequence: self.sequence,
            generated_at: SystemTime::now(),
            class_metrics,
            concept_mastery,
            engagement_trends,
            live_poll,
            student_attention,
            at_risk_students,
            intervention,
            projects,
        }
    }

    /// `base` shifted by up to `spread` either way, kept within `0..=100`.
    fn around(&mut self, base: u8, spread: u8) -> u8 {
        let offset = self.rng.random_range(-i16::from(spread)..=i16::from(spread));
        (i16::from(base) + offset).clamp(0, 100) as u8
    }

    fn live_poll(&mut self) -> LivePoll {
        let no = self.rng.random_range(0..=4);
        let partially = self.rng.random_range(3..=8);
        let yes = POLL_RESPONDENTS - no - partially;

        let responses = PollOption::ALL
            .iter()
            .zip([yes, partially, no])
            .map(|(&option, count)| PollResponse {
                option,
                count,
                percentage: percentage_of(count, POLL_RESPONDENTS),
            })
            .collect();

        LivePoll {
            question: POLL_QUESTION.to_string(),
            responses,
            total_responses: POLL_RESPONDENTS,
        }
    }

    fn attention_map(&mut self) -> Vec<StudentAttention> {
        (0..ROSTER_SIZE)
            .map(|i| {
                let roll: f64 = self.rng.random();
                let status = if roll < 0.07 {
                    AttentionStatus::AtRisk
                } else if roll < 0.27 {
                    AttentionStatus::Passive
                } else {
                    AttentionStatus::Engaged
                };
                StudentAttention {
                    id: format!("student_{i}"),
                    status,
                }
            })
            .collect()
    }

    /// One record per at-risk cell on the attention map, so the flagged
    /// list and the heatmap never disagree.
    fn at_risk_students(
        &mut self,
        attention: &[StudentAttention],
        mastery: &[ConceptMastery],
    ) -> Vec<AtRiskStudent> {
        let mut weak: Vec<&ConceptMastery> = mastery.iter().collect();
        weak.sort_by_key(|c| c.mastery);

        attention
            .iter()
            .filter(|s| s.status == AttentionStatus::AtRisk)
            .enumerate()
            .map(|(n, _)| {
                // Always the weakest topic, sometimes the runner-up as well.
                let struggles = if weak.len() > 1 && self.rng.random_bool(0.5) { 2 } else { 1 };
                let concepts = weak
                    .iter()
                    .take(struggles)
                    .map(|c| c.topic.clone())
                    .collect();

                AtRiskStudent {
                    name: format!("Student {}", roster_letter(n)),
                    concepts,
                    engagement: self.rng.random_range(35..=60),
                    last_active: LAST_ACTIVE[self.rng.random_range(0..LAST_ACTIVE.len())]
                        .to_string(),
                }
            })
            .collect()
    }

    fn intervention(&mut self) -> InterventionTracking {
        let before = self.around(55, 6);
        let after = self.around(78, 6);
        InterventionTracking {
            topic: "Topic 2.3".to_string(),
            before,
            after,
            improvement: i16::from(after) - i16::from(before),
            date: "Yesterday".to_string(),
        }
    }

    fn projects(&mut self) -> ProjectStatus {
        let active = self.rng.random_range(10..=14);
        let at_risk = self.rng.random_range(0..=4);
        ProjectStatus {
            active,
            on_track: active - at_risk,
            at_risk,
        }
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn percentage_of(count: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    ((count * 100 + total / 2) / total).min(100) as u8
}

/// `A`, `B`, ... `Z`, then `AA`, `AB`, ...
fn roster_letter(n: usize) -> String {
    let mut n = n;
    let mut out = Vec::new();
    loop {
        out.push(b'A' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
