//! CellAgentBuilder — inspection, generation, rendering, registration
//!
//! The pipeline is a fixed sequence. Only the quiz step has a fallback:
//! a generated quiz that does not decode is replaced by one generic
//! question. Generator and renderer failures propagate to the caller.

use std::sync::Arc;

use crate::error::{Result, TutorError};
use crate::inspector::CodeInspector;
use crate::providers::{GenerateOptions, TextGenerator};
use crate::storage::Registry;
use crate::types::{new_id, now_ts, Manifest, Question, QuestionType};
use crate::visual::VisualRenderer;

/// Non-blank lines sent for line-by-line explanation
pub const LINE_PROMPT_LIMIT: usize = 20;

/// Frames synthesized for every animation
pub const ANIMATION_FRAMES: usize = 3;

/// Builds and registers cell agents
pub struct CellAgentBuilder {
    generator: Arc<dyn TextGenerator>,
    renderer: Arc<dyn VisualRenderer>,
    registry: Registry,
    options: GenerateOptions,
}

impl std::fmt::Debug for CellAgentBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellAgentBuilder")
            .field("generator", &self.generator.name())
            .field("registry", &self.registry)
            .finish()
    }
}

impl CellAgentBuilder {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        renderer: Arc<dyn VisualRenderer>,
        registry: Registry,
    ) -> Self {
        Self {
            generator,
            renderer,
            registry,
            options: GenerateOptions::default(),
        }
    }

    /// Generation options passed on every generator call
    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    /// Build, register and return the manifest for one cell.
    ///
    /// `title` defaults to `CellAgent_{cell_index}`.
    pub fn build_for_cell(
        &self,
        cell_index: i64,
        code: &str,
        title: Option<&str>,
    ) -> Result<Manifest> {
        tracing::debug!(
            "Building cell agent for cell {} ({} bytes) with {}",
            cell_index,
            code.len(),
            self.generator.name()
        );

        let inspection = CodeInspector::extract_summary(code);
        if inspection.is_error() {
            tracing::warn!("Cell {} is not valid Python; storing placeholder", cell_index);
        }

        let summary = self.generate(&summary_prompt(code))?;
        let line_by_line = self.generate(&line_prompt(inspection.lines()))?;

        let instructions = self.generate(&visual_prompt(code))?;
        let diagram = self
            .renderer
            .make_diagram(&new_id(), &instructions)
            .map_err(TutorError::Renderer)?;

        let frames = animation_frames();
        let animation = self
            .renderer
            .make_animation(&new_id(), &frames)
            .map_err(TutorError::Renderer)?;

        let raw_quiz = self.generate(&quiz_prompt())?;
        let quiz = decode_quiz(&raw_quiz);

        let mut manifest = Manifest {
            id: None,
            cell_index,
            name: title
                .map(str::to_string)
                .unwrap_or_else(|| format!("CellAgent_{}", cell_index)),
            code_sample: code.to_string(),
            inspection,
            summary,
            line_by_line,
            diagram,
            animation,
            quiz,
            created_at: now_ts(),
        };

        self.registry.register(cell_index, &mut manifest)?;
        Ok(manifest)
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        self.generator
            .generate(prompt, &self.options)
            .map_err(TutorError::Generator)
    }
}

fn summary_prompt(code: &str) -> String {
    format!("Summary:\nCode:\n{}\n\nProvide a concise summary.", code)
}

fn line_prompt(lines: &[String]) -> String {
    let head = &lines[..lines.len().min(LINE_PROMPT_LIMIT)];
    format!("Line-by-line explanation:\n{}", head.join("\n"))
}

fn visual_prompt(code: &str) -> String {
    format!(
        "Visualize the following code:\n\n{}\n\nSuggest a diagram and steps.",
        code
    )
}

/// Same text for every cell
fn quiz_prompt() -> String {
    "Generate a 1-3 question quiz based on this code. Return a JSON list of questions, \
     each with fields q, type (\"short\" or \"mcq\"), options (mcq only) and answer_hint."
        .to_string()
}

fn animation_frames() -> Vec<String> {
    (1..=ANIMATION_FRAMES)
        .map(|i| format!("State {}: explain variable changes", i))
        .collect()
}

/// Decode generated quiz JSON, falling back to [`Question::fallback`]
pub(crate) fn decode_quiz(raw: &str) -> Vec<Question> {
    match serde_json::from_str::<Vec<Question>>(strip_code_fence(raw)) {
        Ok(mut quiz) => {
            for q in quiz.iter_mut().filter(|q| q.kind == QuestionType::Short) {
                q.options = None;
            }
            quiz
        }
        Err(e) => {
            tracing::warn!("Generated quiz did not decode ({}); using default question", e);
            vec![Question::fallback()]
        }
    }
}

/// Strip a surrounding Markdown code fence (```json ... ```)
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line
    match body.find('\n') {
        Some(pos) => body[pos + 1..].trim(),
        None => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{RecordingRenderer, ScriptedGenerator};
    use crate::types::Inspection;
    use tempfile::TempDir;

    const QUIZ_JSON: &str = r#"[{"q": "What is returned?", "type": "short", "answer_hint": "total"}]"#;

    fn setup(
        generator: ScriptedGenerator,
        renderer: RecordingRenderer,
    ) -> (TempDir, Arc<ScriptedGenerator>, Arc<RecordingRenderer>, CellAgentBuilder) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path().join("celltutor.db")).unwrap();
        let generator = Arc::new(generator);
        let renderer = Arc::new(renderer);
        let builder = CellAgentBuilder::new(generator.clone(), renderer.clone(), registry);
        (dir, generator, renderer, builder)
    }

    #[test]
    fn test_build_runs_full_pipeline() {
        let generator = ScriptedGenerator::new()
            .reply("summary:", "sums a list")
            .reply("line-by-line", "line notes")
            .reply("visualize", "draw a loop")
            .reply("quiz", QUIZ_JSON);
        let (_dir, generator, renderer, builder) = setup(generator, RecordingRenderer::default());

        let code = "def total(xs):\n    t = 0\n    for x in xs:\n        t += x\n    return t\n";
        let manifest = builder.build_for_cell(4, code, None).unwrap();

        assert!(manifest.id().is_some());
        assert_eq!(manifest.name, "CellAgent_4");
        assert_eq!(manifest.summary, "sums a list");
        assert_eq!(manifest.line_by_line, "line notes");
        assert_eq!(manifest.quiz.len(), 1);
        assert_eq!(manifest.quiz[0].text, "What is returned?");
        assert!(manifest.diagram.ends_with("/diagram"));
        assert!(manifest.animation.ends_with("/animation"));

        // Four generator calls in pipeline order
        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 4);
        assert!(prompts[0].starts_with("Summary:"));
        assert!(prompts[1].starts_with("Line-by-line explanation:"));
        assert!(prompts[2].starts_with("Visualize"));
        assert!(prompts[3].starts_with("Generate a 1-3 question quiz"));

        let diagrams = renderer.diagrams.lock().unwrap();
        assert_eq!(diagrams[0].1, "draw a loop");
        let animations = renderer.animations.lock().unwrap();
        assert_eq!(
            animations[0].1,
            vec![
                "State 1: explain variable changes",
                "State 2: explain variable changes",
                "State 3: explain variable changes",
            ]
        );
        assert_ne!(diagrams[0].0, animations[0].0);
    }

    #[test]
    fn test_title_used_as_name() {
        let (_dir, _g, _r, builder) = setup(
            ScriptedGenerator::new().reply("quiz", "[]"),
            RecordingRenderer::default(),
        );
        let manifest = builder.build_for_cell(1, "x = 1\n", Some("Assign")).unwrap();
        assert_eq!(manifest.name, "Assign");
        assert!(manifest.quiz.is_empty());
    }

    #[test]
    fn test_line_prompt_limited_to_twenty_lines() {
        let code: String = (0..30).map(|i| format!("x{} = {}\n\n", i, i)).collect();
        let (_dir, generator, _r, builder) =
            setup(ScriptedGenerator::new(), RecordingRenderer::default());
        builder.build_for_cell(0, &code, None).unwrap();

        let line_prompt = &generator.prompts()[1];
        assert_eq!(line_prompt.lines().count(), 1 + LINE_PROMPT_LIMIT);
        assert!(line_prompt.contains("x19 = 19"));
        assert!(!line_prompt.contains("x20 = 20"));
    }

    #[test]
    fn test_malformed_quiz_falls_back() {
        let (_dir, _g, _r, builder) = setup(
            ScriptedGenerator::new().reply("quiz", "here are some questions: 1) ..."),
            RecordingRenderer::default(),
        );
        let manifest = builder.build_for_cell(1, "x = 1\n", None).unwrap();
        assert_eq!(manifest.quiz, vec![Question::fallback()]);
    }

    #[test]
    fn test_unparseable_cell_still_builds() {
        let (_dir, generator, _r, builder) =
            setup(ScriptedGenerator::new(), RecordingRenderer::default());
        let manifest = builder.build_for_cell(2, "def (:\n", None).unwrap();
        assert!(matches!(manifest.inspection, Inspection::Failed(_)));
        assert_eq!(generator.prompts()[1], "Line-by-line explanation:\n");
    }

    #[test]
    fn test_generator_failure_propagates() {
        let (dir, _g, _r, builder) = setup(
            ScriptedGenerator::new().fail_on("visualize"),
            RecordingRenderer::default(),
        );
        let err = builder.build_for_cell(1, "x = 1\n", None).unwrap_err();
        assert!(matches!(err, TutorError::Generator(_)));

        // Nothing was registered
        let registry = Registry::open(dir.path().join("celltutor.db")).unwrap();
        assert_eq!(registry.stats().unwrap().manifests, 0);
    }

    #[test]
    fn test_renderer_failure_propagates() {
        let renderer = RecordingRenderer {
            fail: true,
            ..RecordingRenderer::default()
        };
        let (_dir, _g, _r, builder) = setup(ScriptedGenerator::new(), renderer);
        let err = builder.build_for_cell(1, "x = 1\n", None).unwrap_err();
        assert!(matches!(err, TutorError::Renderer(_)));
    }

    #[test]
    fn test_mock_quiz_for_cell_mentioning_other_keywords() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path().join("celltutor.db")).unwrap();
        let builder = CellAgentBuilder::new(
            Arc::new(crate::providers::MockGenerator::new()),
            Arc::new(RecordingRenderer::default()),
            registry,
        );

        let code = "def summarize(xs):\n    # explain line-by-line\n    return sum(xs)\n";
        let manifest = builder.build_for_cell(1, code, None).unwrap();
        assert_eq!(manifest.quiz.len(), 2);
        assert_ne!(manifest.quiz, vec![Question::fallback()]);
    }

    #[test]
    fn test_quiz_prompt_excludes_cell_code() {
        let (_dir, generator, _r, builder) =
            setup(ScriptedGenerator::new(), RecordingRenderer::default());
        builder.build_for_cell(1, "def summarize(xs):\n    return xs\n", None).unwrap();
        let prompts = generator.prompts();
        assert!(prompts[3].starts_with("Generate a 1-3 question quiz"));
        assert!(!prompts[3].contains("summarize"));
    }

    #[test]
    fn test_decode_quiz_variants() {
        let fenced = format!("```json\n{}\n```", QUIZ_JSON);
        assert_eq!(decode_quiz(&fenced).len(), 1);

        // Wrong shape: an object, not a list
        assert_eq!(
            decode_quiz(r#"{"q": "x", "type": "short"}"#),
            vec![Question::fallback()]
        );

        // Unknown question type
        assert_eq!(
            decode_quiz(r#"[{"q": "x", "type": "essay"}]"#),
            vec![Question::fallback()]
        );

        // Options are dropped from short questions
        let quiz = decode_quiz(r#"[{"q": "x", "type": "short", "options": ["a"]}]"#);
        assert!(quiz[0].options.is_none());
    }
}
