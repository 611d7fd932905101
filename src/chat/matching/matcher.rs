//! Canned response lookup.
//!
//! Matching runs four passes over a lowercased input, each in corpus order:
//! exact question, significant-keyword overlap, topic substrings, default.

use serde::Serialize;

use crate::chat::core::config::MatcherConfig;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::matching::corpus::{Corpus, QaPair};

/// Which pass produced the response.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Input equals a corpus question (case-insensitive).
    Exact,
    /// Enough of a question's significant keywords appear in the input.
    KeywordOverlap,
    /// A topic substring appears in the input.
    Topic,
    /// Nothing matched; the default reply was used.
    Fallback,
}

/// Outcome of a lookup.
#[derive(Clone, Copy, Debug)]
pub struct MatchOutcome<'a> {
    /// Pass that matched.
    pub kind: MatchKind,
    /// Matched entry, absent for `Fallback`.
    pub entry: Option<&'a QaPair>,
    /// Response text.
    pub response: &'a str,
}

/// Maps free text to a canned response. Pure and deterministic.
#[derive(Clone, Debug)]
pub struct ResponseMatcher {
    corpus: Corpus,
    questions: Vec<String>,
    keywords: Vec<Vec<String>>,
    overlap_threshold: f64,
    default_response: String,
}

impl ResponseMatcher {
    /// Build a matcher over `corpus`.
    ///
    /// # Errors
    /// Returns an error if the corpus fails validation.
    pub fn new(mut corpus: Corpus, config: &MatcherConfig) -> ChatResult<Self> {
        corpus.validate()?;
        for needle in corpus.topics.iter_mut().flat_map(|t| t.needles.iter_mut()) {
            *needle = needle.to_lowercase();
        }
        if !(0.0..=1.0).contains(&config.overlap_threshold) {
            return Err(ChatError::InvalidConfig(
                "overlap_threshold must be within 0.0..=1.0".to_string(),
            ));
        }

        let questions: Vec<String> = corpus
            .entries
            .iter()
            .map(|e| e.question.to_lowercase())
            .collect();
        let keywords = questions
            .iter()
            .map(|q| significant_keywords(q, config.min_keyword_chars))
            .collect();

        Ok(Self {
            corpus,
            questions,
            keywords,
            overlap_threshold: config.overlap_threshold,
            default_response: config.default_response.clone(),
        })
    }

    /// Build a matcher from configuration, loading `corpus_path` if set.
    ///
    /// # Errors
    /// Returns an error if the corpus cannot be loaded or is invalid.
    pub fn from_config(config: &MatcherConfig) -> ChatResult<Self> {
        let corpus = match &config.corpus_path {
            Some(path) => Corpus::from_file(path)?,
            None => Corpus::default(),
        };
        Self::new(corpus, config)
    }

    /// The underlying corpus.
    #[must_use]
    pub const fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Response text for `input`.
    #[must_use]
    pub fn respond(&self, input: &str) -> &str {
        self.find(input).response
    }

    /// Run all passes and report which one matched.
    #[must_use]
    pub fn find(&self, input: &str) -> MatchOutcome<'_> {
        let input = input.to_lowercase();

        if let Some(index) = self.questions.iter().position(|q| *q == input) {
            return self.outcome(MatchKind::Exact, index);
        }

        if let Some(index) = self
            .keywords
            .iter()
            .position(|kw| self.overlaps(kw, &input))
        {
            return self.outcome(MatchKind::KeywordOverlap, index);
        }

        if let Some(topic) = self
            .corpus
            .topics
            .iter()
            .find(|t| t.needles.iter().any(|n| input.contains(n.as_str())))
        {
            return self.outcome(MatchKind::Topic, topic.entry);
        }

        MatchOutcome {
            kind: MatchKind::Fallback,
            entry: None,
            response: &self.default_response,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn overlaps(&self, keywords: &[String], input: &str) -> bool {
        if keywords.is_empty() {
            return false;
        }
        let hits = keywords
            .iter()
            .filter(|kw| input.contains(kw.as_str()))
            .count();
        hits as f64 / keywords.len() as f64 > self.overlap_threshold
    }

    fn outcome(&self, kind: MatchKind, index: usize) -> MatchOutcome<'_> {
        let entry = &self.corpus.entries[index];
        MatchOutcome {
            kind,
            entry: Some(entry),
            response: &entry.response,
        }
    }
}

/// Words of a lowercased question, split on single spaces, with at least
/// `min_chars` characters. Punctuation stays attached (`"apis?"`).
fn significant_keywords(question: &str, min_chars: usize) -> Vec<String> {
    question
        .split(' ')
        .filter(|w| w.chars().count() >= min_chars)
        .map(str::to_string)
        .collect()
}
