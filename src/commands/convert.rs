//! Front-end operations on top of [`AppState`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use serde::Serialize;
use tracing::{debug, info, warn};
use crate::core::{AppState, BatchSettings, EntryId};
use crate::processing::BatchSummary;
use crate::utils::{read_source_file, unique_name, validate_output_dir, write_output, ConverterResult};

/// What a [`convert_files`] call did.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertReport {
    /// Paths that could not be read, with the reason
    pub unreadable: Vec<(PathBuf, String)>,
    pub dropped_non_image: usize,
    /// Images refused because the queue was full
    pub refused: usize,
    pub admitted: usize,
    pub converted: usize,
    /// (file name, error message)
    pub failed: Vec<(String, String)>,
}

/// Reads `paths`, admits them into the queue and converts everything pending.
///
/// Unreadable paths are reported and skipped; they never abort the call.
pub async fn convert_files(
    state: &AppState,
    paths: &[PathBuf],
    settings: BatchSettings,
) -> ConverterResult<ConvertReport> {
    debug!("Received convert_files for {} path(s)", paths.len());

    let mut sources = Vec::with_capacity(paths.len());
    let mut unreadable = Vec::new();
    for path in paths {
        match read_source_file(path).await {
            Ok(source) => sources.push(source),
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                unreadable.push((path.clone(), e.to_string()));
            }
        }
    }

    let intake = state.add_files(sources).await;
    let dropped_non_image = intake.dropped_non_image;
    let refused = intake.refused;
    let admitted = intake.staged().await.len();

    let BatchSummary { converted, failed, .. } = state.run_batch(settings).await?;

    Ok(ConvertReport {
        unreadable,
        dropped_non_image,
        refused,
        admitted,
        converted: converted.len(),
        failed,
    })
}

/// Writes the output of one converted entry into `out_dir`.
///
/// Returns `None` when the entry has no converted output.
pub async fn export_entry(state: &AppState, id: &EntryId, out_dir: &Path) -> ConverterResult<Option<PathBuf>> {
    validate_output_dir(out_dir)?;
    match state.download(id).await {
        Some(artifact) => Ok(Some(write_output(out_dir, &artifact.file_name, &artifact.bytes).await?)),
        None => Ok(None),
    }
}

/// Writes every visible converted entry into `out_dir`, either as separate
/// files or, with `as_archive`, as a single ZIP.
///
/// Separate files whose names collide get a ` (n)` suffix, as inside the archive.
pub async fn export_results(state: &AppState, out_dir: &Path, as_archive: bool) -> ConverterResult<Vec<PathBuf>> {
    validate_output_dir(out_dir)?;

    if as_archive {
        let written = match state.build_archive().await? {
            Some(archive) => vec![write_output(out_dir, &archive.file_name, &archive.bytes).await?],
            None => Vec::new(),
        };
        info!("Wrote {} archive(s) to {}", written.len(), out_dir.display());
        return Ok(written);
    }

    let mut written = Vec::new();
    let mut used = HashSet::new();
    for view in state.entries().await.into_iter().filter(|v| v.visible) {
        let Some(artifact) = state.download(&view.id).await else {
            continue;
        };
        let name = unique_name(&artifact.file_name, &mut used);
        written.push(write_output(out_dir, &name, &artifact.bytes).await?);
    }
    info!("Wrote {} file(s) to {}", written.len(), out_dir.display());
    Ok(written)
}
