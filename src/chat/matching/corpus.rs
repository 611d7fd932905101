//! Canned question/answer corpus.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chat::core::errors::{ChatError, ChatResult};

/// One canned question and its response.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct QaPair {
    /// Stable entry id.
    pub id: u32,
    /// Sample question.
    pub question: String,
    /// Canned answer.
    pub response: String,
}

/// Substrings that route an unmatched input to a corpus entry.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TopicTrigger {
    /// Substrings, matched case-insensitively; any hit selects the entry.
    pub needles: Vec<String>,
    /// Index into the corpus entries.
    pub entry: usize,
}

impl TopicTrigger {
    fn new(needles: &[&str], entry: usize) -> Self {
        Self {
            needles: needles.iter().map(|n| (*n).to_string()).collect(),
            entry,
        }
    }
}

/// Question/answer entries plus topic triggers, in priority order.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    /// Entries in matching order.
    pub entries: Vec<QaPair>,
    /// Fallback triggers in priority order.
    #[serde(default)]
    pub topics: Vec<TopicTrigger>,
}

impl Corpus {
    /// Load a corpus from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: impl AsRef<Path>) -> ChatResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let corpus: Self = serde_json::from_str(&raw)?;
        corpus.validate()?;
        Ok(corpus)
    }

    /// Check that the corpus is usable.
    ///
    /// # Errors
    /// Returns an error if it is empty, a trigger points past the entries,
    /// or a trigger has an empty needle.
    pub fn validate(&self) -> ChatResult<()> {
        if self.entries.is_empty() {
            return Err(ChatError::InvalidConfig(
                "corpus must contain at least one entry".to_string(),
            ));
        }
        for topic in &self.topics {
            if topic.entry >= self.entries.len() {
                return Err(ChatError::InvalidConfig(format!(
                    "topic trigger {:?} points to entry {} but corpus has {}",
                    topic.needles,
                    topic.entry,
                    self.entries.len()
                )));
            }
            if topic.needles.iter().any(String::is_empty) {
                return Err(ChatError::InvalidConfig(format!(
                    "topic trigger for entry {} has an empty needle",
                    topic.entry
                )));
            }
        }
        Ok(())
    }
}

impl Default for Corpus {
    fn default() -> Self {
        let qa = |id: u32, question: &str, response: &str| QaPair {
            id,
            question: question.to_string(),
            response: response.to_string(),
        };

        let entries = vec![
            qa(
                1,
                "What's the difference between GET and POST requests?",
                "GET requests are used to retrieve data from the server, and are visible in the URL. POST requests are used to send data to the server to create/update resources, and the data is included in the body of the request, not visible in the URL.",
            ),
            qa(
                2,
                "Can you explain RESTful APIs?",
                "RESTful APIs are designed around the REST (Representational State Transfer) architecture, which uses HTTP requests to access and manipulate data. They follow a stateless, client-server, cacheable communications protocol.",
            ),
            qa(
                3,
                "What is a Promise in JavaScript?",
                "A Promise in JavaScript is an object representing the eventual completion or failure of an asynchronous operation. It allows you to write asynchronous code that is more readable and efficient.",
            ),
            qa(
                4,
                "How do you handle errors in async/await?",
                "Errors in async/await can be handled using try/catch blocks. You wrap your await call inside a try block, and catch any errors that occur in the catch block.",
            ),
            qa(
                5,
                "What is the virtual DOM?",
                "The virtual DOM is a concept used in web development, primarily with libraries like React. It's a lightweight copy of the real DOM, allowing for efficient updates and rendering of the UI by minimizing direct manipulations of the DOM.",
            ),
            qa(
                6,
                "Can you describe how CORS works?",
                "CORS, or Cross-Origin Resource Sharing, is a mechanism that allows restricted resources on a web page to be requested from another domain outside the domain from which the first resource was served. It involves the server setting specific headers that allow for these cross-origin requests.",
            ),
            qa(
                7,
                "What are microservices?",
                "Microservices are a architectural style that structures an application as a collection of small, autonomous services modeled around a business domain. They allow for scalable, flexible, and independent development and deployment of application components.",
            ),
            qa(
                8,
                "Explain the concept of state management in React.",
                "State management in React involves tracking changes to the state (data) of components. This can be done using React's own state management capabilities or through external libraries like Redux, to manage state across multiple components.",
            ),
            qa(
                9,
                "What is a JWT and how is it used?",
                "JWT, or JSON Web Token, is a compact, URL-safe means of representing claims to be transferred between two parties. It's used in authentication and information exchange, allowing servers to verify and trust the data in the token.",
            ),
            qa(
                10,
                "How do you optimize website performance?",
                "Website performance can be optimized through various methods, including minimizing HTTP requests, optimizing file sizes and formats, using content delivery networks, caching, and streamlining code (HTML, CSS, JavaScript).",
            ),
        ];

        let topics = vec![
            TopicTrigger::new(&["api", "rest"], 1),
            TopicTrigger::new(&["promise", "async"], 2),
            TopicTrigger::new(&["dom", "react"], 4),
            TopicTrigger::new(&["jwt", "token"], 8),
            TopicTrigger::new(&["performance", "optimize"], 9),
        ];

        Self { entries, topics }
    }
}
