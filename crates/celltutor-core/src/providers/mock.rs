//! Deterministic offline generator
//!
//! Answers by keyword so the whole pipeline can run without network access:
//! summaries echo the prompt, line explanations enumerate lines, quiz prompts
//! get a fixed two-question JSON quiz.

use anyhow::Result;

use super::{GenerateOptions, TextGenerator};

const SUMMARY_CHARS: usize = 200;
const LINE_LIMIT: usize = 10;
const LINE_CHARS: usize = 80;
const ECHO_CHARS: usize = 180;

#[derive(Debug, Clone, Default)]
pub struct MockGenerator;

impl MockGenerator {
    pub fn new() -> Self {
        Self
    }

    fn quiz() -> String {
        serde_json::json!([
            {
                "q": "What does the function return?",
                "type": "short",
                "answer_hint": "It returns an int"
            },
            {
                "q": "Is there a loop in the code?",
                "type": "mcq",
                "options": ["Yes", "No"],
                "answer_hint": "Yes"
            }
        ])
        .to_string()
    }
}

impl TextGenerator for MockGenerator {
    fn generate(&self, prompt: &str, _options: &GenerateOptions) -> Result<String> {
        let p = prompt.to_lowercase();

        if p.contains("summary:") || p.contains("summarize") {
            let flat = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
            let s: String = flat.chars().take(SUMMARY_CHARS).collect();
            return Ok(format!("Quick summary: {}", s));
        }

        if p.contains("explain line") || p.contains("line-by-line") {
            let out = prompt
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .take(LINE_LIMIT)
                .enumerate()
                .map(|(i, l)| {
                    let l: String = l.chars().take(LINE_CHARS).collect();
                    format!("Line {}: {} -> Explanation: This line ...", i + 1, l)
                })
                .collect::<Vec<_>>();
            return Ok(out.join("\n"));
        }

        if p.contains("generate quiz") || p.contains("quiz") {
            return Ok(Self::quiz());
        }

        if p.contains("visualize") || p.contains("diagram") {
            return Ok(
                "visual_instructions: draw a control-flow box for the function and label variables x, y"
                    .to_string(),
            );
        }

        let echo: String = prompt.trim().chars().take(ECHO_CHARS).collect();
        Ok(format!("MOCK_LLM_REPLY: {}", echo))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
