//! Progress value object computed from a cursor and a script.

use serde::Serialize;

use super::Cursor;
use crate::domain::phase::PhaseScript;

/// Where a phase stands relative to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Completed,
    Current,
    Pending,
}

/// Per-phase status entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseProgress {
    pub key: String,
    pub display_name: String,
    pub status: PhaseStatus,
}

/// Progress through the consultation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    /// 0.0 to 100.0; 0 for an empty script.
    pub percent: f64,
    pub completed_questions: usize,
    pub total_questions: usize,
    pub phase_statuses: Vec<PhaseProgress>,
}

impl Progress {
    pub fn compute(script: &PhaseScript, cursor: &Cursor) -> Self {
        let total_questions = script.total_questions();
        let phase_index = cursor.phase_index();

        let before: usize = script
            .phases()
            .iter()
            .take(phase_index)
            .map(|p| p.question_count())
            .sum();
        let within = script
            .phase(phase_index)
            .map(|p| cursor.question_index().min(p.question_count()))
            .unwrap_or(0);
        let completed_questions = before + within;

        let percent = if total_questions == 0 {
            0.0
        } else {
            completed_questions as f64 / total_questions as f64 * 100.0
        };

        let phase_statuses = script
            .phases()
            .iter()
            .enumerate()
            .map(|(index, phase)| PhaseProgress {
                key: phase.key().to_string(),
                display_name: phase.display_name().to_string(),
                status: match index.cmp(&phase_index) {
                    std::cmp::Ordering::Less => PhaseStatus::Completed,
                    std::cmp::Ordering::Equal => PhaseStatus::Current,
                    std::cmp::Ordering::Greater => PhaseStatus::Pending,
                },
            })
            .collect();

        Self {
            percent,
            completed_questions,
            total_questions,
            phase_statuses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::phase::test_support::script_with_counts;
    use crate::domain::phase::{PhaseScript, Rationale};
    use proptest::prelude::*;

    #[test]
    fn fresh_cursor_has_zero_progress() {
        let script = script_with_counts(&[4, 4, 5]);
        let progress = Progress::compute(&script, &Cursor::start());
        assert_eq!(progress.percent, 0.0);
        assert_eq!(progress.completed_questions, 0);
        assert_eq!(progress.total_questions, 13);
    }

    #[test]
    fn counts_earlier_phases_plus_current_question() {
        let script = script_with_counts(&[2, 3, 1]);
        let progress = Progress::compute(&script, &Cursor::new(1, 2));
        assert_eq!(progress.completed_questions, 4);
        assert!((progress.percent - 4.0 / 6.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn labels_phases_relative_to_cursor() {
        let script = script_with_counts(&[1, 1, 1]);
        let progress = Progress::compute(&script, &Cursor::new(1, 0));
        let statuses: Vec<_> = progress.phase_statuses.iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![PhaseStatus::Completed, PhaseStatus::Current, PhaseStatus::Pending]
        );
    }

    #[test]
    fn complete_cursor_is_one_hundred_percent() {
        let script = script_with_counts(&[2, 1]);
        let progress = Progress::compute(&script, &Cursor::complete(&script));
        assert_eq!(progress.percent, 100.0);
        assert!(progress
            .phase_statuses
            .iter()
            .all(|p| p.status == PhaseStatus::Completed));
    }

    #[test]
    fn empty_script_reports_zero_percent() {
        let fallback = Rationale {
            framework: "Inclusive Design".to_string(),
            rationale: String::new(),
            principle: String::new(),
            sources: vec![],
            connection: String::new(),
            confidence_label: "Medium".to_string(),
            confidence_rationale: String::new(),
        };
        let script = PhaseScript::new(vec![], fallback).unwrap();
        let progress = Progress::compute(&script, &Cursor::start());
        assert_eq!(progress.percent, 0.0);
        assert_eq!(progress.total_questions, 0);
    }

    #[test]
    fn serializes_statuses_in_snake_case() {
        let script = script_with_counts(&[1]);
        let json = serde_json::to_value(Progress::compute(&script, &Cursor::start())).unwrap();
        assert_eq!(json["phase_statuses"][0]["status"], "current");
    }

    proptest! {
        #[test]
        fn advancing_total_questions_times_completes(counts in prop::collection::vec(1usize..6, 1..8)) {
            let script = script_with_counts(&counts);
            let total = script.total_questions();

            let mut cursor = Cursor::start();
            prop_assert_eq!(Progress::compute(&script, &cursor).completed_questions, 0);

            for step in 0..total {
                prop_assert!(!cursor.is_complete(&script));
                cursor = cursor.advanced(&script).cursor;
                prop_assert_eq!(Progress::compute(&script, &cursor).completed_questions, step + 1);
            }

            prop_assert!(cursor.is_complete(&script));
            prop_assert_eq!(Progress::compute(&script, &cursor).percent, 100.0);
        }

        #[test]
        fn percent_never_decreases_while_advancing(counts in prop::collection::vec(1usize..5, 1..6)) {
            let script = script_with_counts(&counts);
            let mut cursor = Cursor::start();
            let mut last = 0.0;
            for _ in 0..script.total_questions() + 2 {
                cursor = cursor.advanced(&script).cursor;
                let percent = Progress::compute(&script, &cursor).percent;
                prop_assert!(percent >= last);
                last = percent;
            }
        }
    }
}
