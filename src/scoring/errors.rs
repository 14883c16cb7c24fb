use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    /// The final score is level, so there is no winner to compare against
    #[error("Ambiguous result: final score {home}:{away} does not determine a winner")]
    AmbiguousResult { home: u32, away: u32 },
}
