//! Public types for the Muninn API.

mod outcome;
mod query;
mod result;

pub use outcome::{RetrievalOutcome, RetrievalStage};
pub use query::UnderstoodQuery;
pub use result::{Candidate, CandidateRef, Metadata, ResultParts, RetrievalResult, SourceRecord};
