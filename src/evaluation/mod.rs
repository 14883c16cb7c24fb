// Applying and undoing match evaluations
//
// The coordinator owns the per-match ordering guarantees: a revert always
// finishes before the following evaluate starts, and two triggers for the
// same match never interleave.

pub use coordinator::{EvaluationReport, MatchEvaluationCoordinator, DEFAULT_BATCH_SIZE};
pub use errors::EvaluationError;
pub use events::{EvaluationEventHandler, MatchEvent, MatchEventError, MatchEventHandler};
pub use handlers::{
    recalculate_match, receive_match_event, MatchEventResponse, MatchTransitionRequest,
    RecalculateResponse,
};

mod coordinator;
mod errors;
mod events;
mod handlers;
