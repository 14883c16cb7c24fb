use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::scoring::{Outcome, OutcomeFlags, Score};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PredictionStatus {
    #[default]
    Pending,
    Evaluated,
    /// Excluded from scoring by the membership side; never touched here
    Void,
}

/// A user's guess for one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub match_id: Uuid,
    pub predicted_home: u32,
    pub predicted_away: u32,
    pub points: i32,
    pub status: PredictionStatus,
    pub flags: OutcomeFlags,
    /// Final score this prediction was last scored against
    pub evaluated_score: Option<Score>,
}

impl Prediction {
    pub fn new(user_id: Uuid, match_id: Uuid, predicted_home: u32, predicted_away: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            match_id,
            predicted_home,
            predicted_away,
            points: 0,
            status: PredictionStatus::Pending,
            flags: OutcomeFlags::cleared(),
            evaluated_score: None,
        }
    }

    pub fn predicted_score(&self) -> Score {
        Score::new(self.predicted_home, self.predicted_away)
    }

    /// The contribution this prediction currently makes to its leaderboard entry
    pub fn applied_outcome(&self) -> Option<Outcome> {
        if self.status != PredictionStatus::Evaluated {
            return None;
        }
        self.flags.category().map(|category| Outcome {
            category,
            points: self.points,
        })
    }

    pub fn is_evaluated_against(&self, score: Score) -> bool {
        self.status == PredictionStatus::Evaluated && self.evaluated_score == Some(score)
    }

    pub(crate) fn record_evaluation(&mut self, outcome: Outcome, score: Score) {
        self.points = outcome.points;
        self.flags = OutcomeFlags::from(outcome.category);
        self.status = PredictionStatus::Evaluated;
        self.evaluated_score = Some(score);
    }

    pub(crate) fn reset(&mut self) {
        self.points = 0;
        self.flags = OutcomeFlags::cleared();
        self.status = PredictionStatus::Pending;
        self.evaluated_score = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Category;

    fn prediction() -> Prediction {
        Prediction::new(Uuid::new_v4(), Uuid::new_v4(), 3, 1)
    }

    #[test]
    fn pending_prediction_has_no_applied_outcome() {
        assert_eq!(prediction().applied_outcome(), None);
    }

    #[test]
    fn record_then_reset_restores_pending_state() {
        let original = prediction();
        let mut p = original.clone();

        p.record_evaluation(Outcome::new(Category::CorrectDiff), Score::new(4, 2));
        assert_eq!(p.status, PredictionStatus::Evaluated);
        assert_eq!(p.points, 3);
        assert!(p.flags.correct_diff);
        assert!(p.is_evaluated_against(Score::new(4, 2)));
        assert!(!p.is_evaluated_against(Score::new(3, 1)));
        assert_eq!(
            p.applied_outcome(),
            Some(Outcome::new(Category::CorrectDiff))
        );

        p.reset();
        assert_eq!(p, original);
    }
}
