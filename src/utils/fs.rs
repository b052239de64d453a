use std::path::{Path, PathBuf};
use tokio::fs;
use crate::core::SourceFile;
use crate::utils::{media_type_from_name, validate_input_path, ConverterResult};

/// Reads a file from disk into a [`SourceFile`], declaring its media type
/// from the extension.
pub async fn read_source_file(path: impl AsRef<Path>) -> ConverterResult<SourceFile> {
    let path = path.as_ref();
    validate_input_path(path)?;

    let bytes = fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = media_type_from_name(&name);

    Ok(SourceFile::new(name, mime_type, bytes))
}

/// Writes `bytes` as `file_name` inside `dir`, creating the directory if needed.
pub async fn write_output(dir: impl AsRef<Path>, file_name: &str, bytes: &[u8]) -> ConverterResult<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).await?;
    let path = dir.join(file_name);
    fs::write(&path, bytes).await?;
    Ok(path)
}
