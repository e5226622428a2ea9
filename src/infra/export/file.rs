use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::usecase::pipeline::export::ExportArtifact;

/// Writes the artifact under `dir` using its own file name.
pub fn write_artifact(dir: &Path, artifact: &ExportArtifact) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export dir: {}", dir.display()))?;
    let path = dir.join(&artifact.file_name);
    std::fs::write(&path, &artifact.content)
        .with_context(|| format!("failed to write export: {}", path.display()))?;
    info!(path = %path.display(), rows = artifact.rows, "export written");
    Ok(path)
}
