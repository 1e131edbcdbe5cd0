//! Question answering over the ITT bylaws.
//!
//! A question is triaged first. Clear questions are answered from retrieved
//! bylaw excerpts; vague ones get a request for the missing details.

pub mod generate;
pub mod triage;
pub mod workflow;

#[cfg(test)]
mod tests;

pub use generate::{build_context, AnswerGenerator, LlmAnswerGenerator};
pub use triage::{parse_triage_output, Classifier, LlmClassifier, TriageDecision};
pub use workflow::{
    AnswerWorkflow, Route, WorkflowOutcome, DONT_KNOW_ANSWER, REQUEST_INFO_FALLBACK,
};
