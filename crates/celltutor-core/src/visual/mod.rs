//! Visual artifact rendering
//!
//! Renderers turn descriptive text into artifact references (paths or URIs).
//! The core stores those references verbatim and never looks inside them.

pub mod placeholder;

use anyhow::Result;

pub use placeholder::PlaceholderRenderer;

/// Produces a diagram and an animation for a cell
pub trait VisualRenderer: Send + Sync {
    /// Render `text` as a diagram and return its reference
    fn make_diagram(&self, id: &str, text: &str) -> Result<String>;

    /// Render one frame per entry of `frames` and return the animation reference
    fn make_animation(&self, id: &str, frames: &[String]) -> Result<String>;
}
