//! CellTutor Core - per-cell tutoring agents
//!
//! Turns a code cell into a persisted tutoring bundle (summary, line-by-line
//! explanation, diagram, animation, quiz) and answers follow-up requests
//! against it.
//!
//! # Architecture
//!
//! ```text
//! code ──► CodeInspector ──► prompts ──► TextGenerator ──┐
//!                                        VisualRenderer ─┤
//!                                                        ▼
//!                              CellAgentBuilder ──► Registry (SQLite)
//!                                                        │
//!                  explain / visuals / ask / quiz ◄── CellAgentRuntime
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use celltutor_core::agent::{CellAgentBuilder, CellAgentRuntime};
//! use celltutor_core::providers::MockGenerator;
//! use celltutor_core::storage::Registry;
//! use celltutor_core::types::QuizAnswer;
//! use celltutor_core::visual::PlaceholderRenderer;
//!
//! # fn main() -> anyhow::Result<()> {
//! let registry = Registry::open("celltutor.db")?;
//! let generator = Arc::new(MockGenerator::new());
//! let renderer = Arc::new(PlaceholderRenderer::new("agents")?);
//!
//! let builder = CellAgentBuilder::new(generator.clone(), renderer, registry.clone());
//! let manifest = builder.build_for_cell(1, "def f(n):\n    return n\n", Some("Identity"))?;
//! let id = manifest.id().unwrap_or_default();
//!
//! let runtime = CellAgentRuntime::new(registry, generator);
//! println!("{}", runtime.explain(id, "line")?);
//! let result = runtime.run_quiz(id, &[QuizAnswer::new(0, "It returns an int")])?;
//! println!("{}/{}", result.score, result.total);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod agent;
pub mod config;
pub mod error;
pub mod inspector;
pub mod providers;
pub mod storage;
pub mod types;
pub mod visual;

pub use agent::{CellAgentBuilder, CellAgentRuntime, ExplainDepth, Visuals};
pub use config::{ProviderKind, TutorConfig};
pub use error::{Result, TutorError};
pub use inspector::CodeInspector;
pub use providers::{GenerateOptions, TextGenerator};
pub use storage::Registry;
pub use types::{Attempt, Inspection, Manifest, Question, QuizAnswer, QuizResult};
pub use visual::VisualRenderer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
