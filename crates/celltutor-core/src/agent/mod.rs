//! Cell agents: build once, then query
//!
//! [`CellAgentBuilder`] turns a code cell into a registered [`Manifest`];
//! [`CellAgentRuntime`] serves explanations, visuals, questions and quizzes
//! from the stored manifest.
//!
//! [`Manifest`]: crate::types::Manifest

pub mod builder;
pub mod runtime;

pub use builder::CellAgentBuilder;
pub use runtime::{grade_quiz, CellAgentRuntime, ExplainDepth, Visuals};
