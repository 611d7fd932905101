//! Random prompt suggestions drawn from the corpus.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::chat::matching::corpus::Corpus;

/// Description shown under every suggestion.
pub const SUGGESTION_DESCRIPTION: &str = "Get immediate AI generated response";

/// A clickable prompt.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Suggestion {
    /// The corpus question.
    pub title: String,
    /// Fixed description text.
    pub description: String,
}

/// Sample `count` distinct corpus entries (fewer if the corpus is smaller).
pub fn sample_suggestions<R: Rng + ?Sized>(
    corpus: &Corpus,
    count: usize,
    rng: &mut R,
) -> Vec<Suggestion> {
    corpus
        .entries
        .choose_multiple(rng, count)
        .map(|entry| Suggestion {
            title: entry.question.clone(),
            description: SUGGESTION_DESCRIPTION.to_string(),
        })
        .collect()
}
