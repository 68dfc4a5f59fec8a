//! In-video quiz
//!
//! Questions belong to a lesson and are gated on playback progress: nothing
//! is shown before the unlock threshold, and at most one question is
//! triggered automatically per lesson session.

pub mod gate;
pub mod ledger;
pub mod model;

pub use gate::{AnswerFeedback, GateState, QuestionGate};
pub use ledger::AnswerLedger;
pub use model::{AnswerAttempt, ChoiceKey, QuestionRecord, QuestionSessionState};
