//! Canned response matching and prompt suggestions.

pub mod corpus;
pub mod matcher;
pub mod suggestions;

pub use corpus::{Corpus, QaPair, TopicTrigger};
pub use matcher::{MatchKind, MatchOutcome, ResponseMatcher};
pub use suggestions::{SUGGESTION_DESCRIPTION, Suggestion, sample_suggestions};
