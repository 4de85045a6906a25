use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::VisualRenderer;

const DIAGRAM_CHARS: usize = 800;
const FRAME_CHARS: usize = 200;

/// Writes text placeholders in place of rendered images
#[derive(Debug, Clone)]
pub struct PlaceholderRenderer {
    artifacts_dir: PathBuf,
}

impl PlaceholderRenderer {
    /// Create the renderer, creating `artifacts_dir` if needed
    pub fn new(artifacts_dir: impl Into<PathBuf>) -> Result<Self> {
        let artifacts_dir = artifacts_dir.into();
        std::fs::create_dir_all(&artifacts_dir).with_context(|| {
            format!(
                "Failed to create artifacts directory '{}'",
                artifacts_dir.display()
            )
        })?;
        Ok(Self { artifacts_dir })
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    fn write(&self, file_name: String, content: String) -> Result<String> {
        let path = self.artifacts_dir.join(file_name);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write artifact '{}'", path.display()))?;
        tracing::debug!("Wrote artifact {}", path.display());
        Ok(path.to_string_lossy().into_owned())
    }
}

impl VisualRenderer for PlaceholderRenderer {
    fn make_diagram(&self, id: &str, text: &str) -> Result<String> {
        let body: String = text.chars().take(DIAGRAM_CHARS).collect();
        self.write(
            format!("{}_diagram.txt", id),
            format!("DIAGRAM PLACEHOLDER\n{}\n", body),
        )
    }

    fn make_animation(&self, id: &str, frames: &[String]) -> Result<String> {
        if frames.is_empty() {
            anyhow::bail!("Animation '{}' has no frames", id);
        }
        let mut content = String::from("ANIM PLACEHOLDER\n");
        for (i, frame) in frames.iter().enumerate() {
            let frame: String = frame.chars().take(FRAME_CHARS).collect();
            content.push_str(&format!("Frame {}: {}\n", i + 1, frame));
        }
        self.write(format!("{}_anim.txt", id), content)
    }
}
