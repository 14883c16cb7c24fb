use super::{Category, Outcome, Score, ScoringError};

/// Scores a guess against the final result.
///
/// Rules apply in order: a different winner is wrong (0), an identical score is
/// exact (5), the same goal difference is correct-diff (3), and otherwise the
/// winner alone was right (2). A level final score has no winner and is
/// rejected rather than scored.
pub fn classify(
    predicted_home: u32,
    predicted_away: u32,
    actual_home: u32,
    actual_away: u32,
) -> Result<Outcome, ScoringError> {
    classify_scores(
        Score::new(predicted_home, predicted_away),
        Score::new(actual_home, actual_away),
    )
}

pub fn classify_scores(predicted: Score, actual: Score) -> Result<Outcome, ScoringError> {
    let actual_diff = actual.goal_difference();
    if actual_diff == 0 {
        return Err(ScoringError::AmbiguousResult {
            home: actual.home,
            away: actual.away,
        });
    }

    let predicted_diff = predicted.goal_difference();

    // A predicted draw has no winner and cannot match a decided game.
    let category = if predicted_diff.signum() != actual_diff.signum() {
        Category::Wrong
    } else if predicted == actual {
        Category::Exact
    } else if predicted_diff == actual_diff {
        Category::CorrectDiff
    } else {
        Category::CorrectWinnerOnly
    };

    Ok(Outcome::new(category))
}
