//! CellAgentRuntime — query layer over registered manifests

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Result, TutorError};
use crate::providers::{GenerateOptions, TextGenerator};
use crate::storage::Registry;
use crate::types::{Manifest, Question, QuizAnswer, QuizDetail, QuizResult};

/// Characters of the stored cell sent as context with a question
pub const QUESTION_CONTEXT_CHARS: usize = 2000;

/// Requested explanation depth
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplainDepth {
    #[default]
    Summary,
    Line,
}

impl From<&str> for ExplainDepth {
    /// `"line"` selects the line-by-line text; anything else the summary
    fn from(depth: &str) -> Self {
        match depth {
            "line" => Self::Line,
            _ => Self::Summary,
        }
    }
}

/// Artifact references of a cell agent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visuals {
    pub diagram: Option<String>,
    pub animation: Option<String>,
}

/// Serves explanations, visuals, questions and quizzes
pub struct CellAgentRuntime {
    registry: Registry,
    generator: Arc<dyn TextGenerator>,
    options: GenerateOptions,
}

impl std::fmt::Debug for CellAgentRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellAgentRuntime")
            .field("registry", &self.registry)
            .field("generator", &self.generator.name())
            .finish()
    }
}

impl CellAgentRuntime {
    pub fn new(registry: Registry, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            registry,
            generator,
            options: GenerateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Resolve `id` or fail with [`TutorError::NotFound`]
    pub fn manifest(&self, id: &str) -> Result<Manifest> {
        self.registry
            .get_manifest(id)?
            .ok_or_else(|| TutorError::NotFound(id.to_string()))
    }

    /// Stored summary or line-by-line text
    pub fn explain(&self, id: &str, depth: impl Into<ExplainDepth>) -> Result<String> {
        let manifest = self.manifest(id)?;
        Ok(match depth.into() {
            ExplainDepth::Summary => manifest.summary,
            ExplainDepth::Line => manifest.line_by_line,
        })
    }

    /// Diagram and animation references.
    ///
    /// Unlike the other queries an unknown id is not an error: both fields
    /// come back as `None`.
    pub fn get_visuals(&self, id: &str) -> Result<Visuals> {
        Ok(match self.registry.get_manifest(id)? {
            Some(m) => Visuals {
                diagram: Some(m.diagram),
                animation: Some(m.animation),
            },
            None => {
                tracing::debug!("No cell agent {}; returning empty visuals", id);
                Visuals::default()
            }
        })
    }

    /// Ask the generator about the cell. Every call hits the generator.
    pub fn ask_question(&self, id: &str, question: &str) -> Result<String> {
        let manifest = self.manifest(id)?;
        let context: String = manifest
            .code_sample
            .chars()
            .take(QUESTION_CONTEXT_CHARS)
            .collect();
        let prompt = format!(
            "User question: {}\nContext:\n{}\nProvide a clear, concise answer.",
            question, context
        );

        self.generator
            .generate(&prompt, &self.options)
            .map_err(TutorError::Generator)
    }

    /// Grade `answers` against the cell's quiz and record one attempt
    pub fn run_quiz(&self, id: &str, answers: &[QuizAnswer]) -> Result<QuizResult> {
        let manifest = self.manifest(id)?;
        let result = grade_quiz(&manifest.quiz, answers);
        self.registry.store_attempt(id, &result)?;
        Ok(result)
    }
}

/// Grade answers by hint containment.
///
/// An answer is correct when the lowercased hint of its question is a
/// substring of the lowercased answer. Questions without a hint, and
/// indices outside the quiz, have an empty hint and always grade correct.
pub fn grade_quiz(quiz: &[Question], answers: &[QuizAnswer]) -> QuizResult {
    let details: Vec<QuizDetail> = answers
        .iter()
        .map(|ans| {
            let expected_hint = quiz
                .get(ans.q_index)
                .and_then(|q| q.answer_hint.as_deref())
                .unwrap_or_default()
                .to_lowercase();
            let correct =
                expected_hint.is_empty() || ans.answer.to_lowercase().contains(&expected_hint);
            QuizDetail {
                index: ans.q_index,
                user_answer: ans.answer.clone(),
                correct,
            }
        })
        .collect();

    QuizResult {
        score: details.iter().filter(|d| d.correct).count(),
        total: details.len(),
        details,
    }
}
