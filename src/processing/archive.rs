//! Individual downloads and the bulk ZIP archive of converted images.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::sync::Arc;
use serde::Serialize;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};
use crate::core::{AppState, EntryId, EntryState, Notice};
use crate::utils::{output_file_name, unique_name, ConverterError, ConverterResult};

/// File name of the bulk archive.
pub const ARCHIVE_NAME: &str = "converted-images.zip";

/// Bytes ready to be saved under `file_name`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadArtifact {
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Arc<[u8]>,
}

impl AppState {
    /// The converted output of one entry, named after its source.
    pub async fn download(&self, id: &EntryId) -> Option<DownloadArtifact> {
        let queue = self.queue().await;
        let entry = queue.get(id)?;
        match &entry.state {
            EntryState::Done(result) => Some(DownloadArtifact {
                file_name: output_file_name(&entry.source.name, result.output.extension()),
                bytes: result.output.payload.clone(),
            }),
            _ => None,
        }
    }

    /// Bundles every visible converted entry into one archive.
    ///
    /// Entries waiting out an undo window are left out. Returns `None` when
    /// there is nothing to bundle.
    pub async fn build_archive(&self) -> ConverterResult<Option<DownloadArtifact>> {
        let files: Vec<(String, Arc<[u8]>)> = {
            let queue = self.queue().await;
            queue
                .iter()
                .filter(|e| e.is_visible())
                .filter_map(|e| match &e.state {
                    EntryState::Done(result) => Some((
                        output_file_name(&e.source.name, result.output.extension()),
                        result.output.payload.clone(),
                    )),
                    _ => None,
                })
                .collect()
        };
        if files.is_empty() {
            debug!("No converted images to archive");
            return Ok(None);
        }

        self.notify(Notice::new("Compressing files..."));
        let count = files.len();
        let bytes = tokio::task::spawn_blocking(move || write_archive(&files))
            .await
            .map_err(|e| ConverterError::archive(format!("Archive task panicked: {e}")))??;
        info!("Archived {} image(s) ({} bytes)", count, bytes.len());

        Ok(Some(DownloadArtifact {
            file_name: ARCHIVE_NAME.to_string(),
            bytes: bytes.into(),
        }))
    }
}

/// Writes `files` into an in-memory ZIP archive.
///
/// Images are already compressed, so entries are stored as-is. Repeated
/// names get a ` (n)` suffix so no entry shadows another.
pub fn write_archive(files: &[(String, Arc<[u8]>)]) -> ConverterResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut used = HashSet::new();

    for (name, bytes) in files {
        let name = unique_name(name, &mut used);
        writer.start_file(name, options)?;
        writer.write_all(bytes)?;
    }

    Ok(writer.finish()?.into_inner())
}
