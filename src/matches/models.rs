use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::scoring::Score;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
    Cancelled,
}

/// How the game was decided. Display-only; points never depend on it.
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
pub enum EndingType {
    #[default]
    Regulation,
    Overtime,
    Shootout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub id: Uuid,
    pub competition_id: Uuid,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub ending: EndingType,
    pub status: MatchStatus,
    /// Set by the match-management side once it has triggered an evaluation
    pub previously_evaluated: bool,
}

impl MatchResult {
    pub fn scheduled(competition_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            competition_id,
            home_score: None,
            away_score: None,
            ending: EndingType::Regulation,
            status: MatchStatus::Scheduled,
            previously_evaluated: false,
        }
    }

    /// Marks the match finished with the given final score
    pub fn finish(mut self, home: u32, away: u32) -> Self {
        self.home_score = Some(home);
        self.away_score = Some(away);
        self.status = MatchStatus::Finished;
        self
    }

    pub fn with_ending(mut self, ending: EndingType) -> Self {
        self.ending = ending;
        self
    }

    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }

    /// The recorded score, if both sides have one
    pub fn final_score(&self) -> Option<Score> {
        match (self.home_score, self.away_score) {
            (Some(home), Some(away)) => Some(Score::new(home, away)),
            _ => None,
        }
    }
}
