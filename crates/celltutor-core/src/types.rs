//! Core data types shared by the builder, the runtime and the registry

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Seconds since the Unix epoch, with sub-second precision
pub type Timestamp = f64;

/// Current wall-clock time as a [`Timestamp`]
pub fn now_ts() -> Timestamp {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// Fresh opaque identifier for manifests, attempts and artifacts
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Structural facts extracted from a parsed cell
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralFacts {
    /// Function names in document order
    pub functions: Vec<String>,

    /// Whether any `for` or `while` statement appears
    pub has_loop: bool,

    /// Imported module names, deduplicated
    pub imports: BTreeSet<String>,

    /// Non-blank source lines, indentation kept
    pub lines: Vec<String>,
}

/// Placeholder stored when a cell cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub error: String,

    /// First 200 characters of the submitted cell
    pub raw_code: String,
}

/// Outcome of inspecting a cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Inspection {
    Parsed(StructuralFacts),
    Failed(ParseFailure),
}

impl Inspection {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn facts(&self) -> Option<&StructuralFacts> {
        match self {
            Self::Parsed(facts) => Some(facts),
            Self::Failed(_) => None,
        }
    }

    /// Non-blank lines of the cell; empty when parsing failed
    pub fn lines(&self) -> &[String] {
        match self {
            Self::Parsed(facts) => &facts.lines,
            Self::Failed(_) => &[],
        }
    }
}

/// Kind of quiz question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Short,
    Mcq,
}

/// One quiz question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Question text (`q` accepted when decoding generator output)
    #[serde(alias = "q")]
    pub text: String,

    #[serde(rename = "type")]
    pub kind: QuestionType,

    /// Choices, only meaningful for [`QuestionType::Mcq`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,

    /// Substring expected in a correct answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_hint: Option<String>,
}

impl Question {
    /// Generic question used when the generated quiz cannot be decoded
    pub fn fallback() -> Self {
        Self {
            text: "What does the code do?".to_string(),
            kind: QuestionType::Short,
            options: None,
            answer_hint: Some("describe".to_string()),
        }
    }
}

/// Persisted bundle of generated artifacts for one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Assigned by the registry at registration time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub cell_index: i64,
    pub name: String,
    pub code_sample: String,
    pub inspection: Inspection,
    pub summary: String,
    pub line_by_line: String,
    pub diagram: String,
    pub animation: String,
    #[serde(default)]
    pub quiz: Vec<Question>,
    pub created_at: Timestamp,
}

impl Manifest {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// A learner's answer to one quiz question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAnswer {
    pub q_index: usize,
    pub answer: String,
}

impl QuizAnswer {
    pub fn new(q_index: usize, answer: impl Into<String>) -> Self {
        Self {
            q_index,
            answer: answer.into(),
        }
    }
}

/// Grading of a single answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizDetail {
    pub index: usize,
    pub user_answer: String,
    pub correct: bool,
}

/// Aggregate grading of one quiz submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub score: usize,
    pub total: usize,
    pub details: Vec<QuizDetail>,
}

/// Persisted record of one grading event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: String,
    pub cell_id: String,
    pub ts: Timestamp,
    pub quiz_result: QuizResult,
}
