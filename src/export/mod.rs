use std::collections::HashSet;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha1::{Digest, Sha1};
use thiserror::Error;
use tracing::{info, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::descriptor::build_descriptor;
use crate::filesystem::{self, FilesystemError, WriteOptions};
use crate::node::NodeStore;
use crate::project::Project;
use crate::validation::{validate, Diagnostic};

/// Archive entry holding the generated descriptor.
pub const DESCRIPTOR_ENTRY: &str = "pack.mcmeta";
/// Archive entry holding the decoded pack icon.
pub const ICON_ENTRY: &str = "pack.png";

/// Represents errors that can occur while exporting a pack.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The ZIP writer failed.
    #[error("archive error: {0}")]
    Zip(#[from] ZipError),
    /// Writing into the in-memory archive failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// `pack_icon` is not valid base64.
    #[error("pack icon is not valid base64: {0}")]
    Icon(#[from] base64::DecodeError),
    /// The descriptor could not be serialized.
    #[error("failed to serialize pack.mcmeta: {0}")]
    Descriptor(#[from] serde_json::Error),
    /// Writing the archive to disk failed.
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
    /// Validation found this many errors and the export was not confirmed.
    #[error("project has {0} validation error(s); confirm to export anyway")]
    Unconfirmed(usize),
    /// The background export task panicked or was cancelled.
    #[error("export task failed: {0}")]
    Task(String),
}

/// Result of writing an archive to disk.
#[derive(Debug, Clone)]
pub struct ExportReport {
    /// Where the archive was written.
    pub path: PathBuf,
    /// Archive size in bytes.
    pub bytes: usize,
    /// Hex SHA-1 of the archive.
    pub sha1: String,
    /// Validation findings at export time.
    pub diagnostics: Vec<Diagnostic>,
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Decodes a pack icon stored as base64, with or without a `data:` URL
/// prefix.
pub fn decode_icon(icon: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = match icon.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
        None => icon,
    };
    STANDARD.decode(payload.trim())
}

/// File name offered for the download: `<project name>.zip`.
pub fn archive_file_name(project: &Project) -> String {
    let cleaned: String = project
        .name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "datapack.zip".to_string()
    } else {
        format!("{cleaned}.zip")
    }
}

/// Builds the ZIP archive of a project.
///
/// `pack.mcmeta` is generated from the project and written first, followed by
/// `pack.png` when the project has an icon, then every file node that has
/// content, at its resolved path. Folders are not written as entries. When two
/// nodes resolve to the same path only the first is kept.
pub fn build_archive(project: &Project, store: &NodeStore) -> Result<Vec<u8>, ExportError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut written = HashSet::new();

    let descriptor = build_descriptor(project).to_json_pretty()?;
    zip.start_file(DESCRIPTOR_ENTRY, entry_options())?;
    zip.write_all(descriptor.as_bytes())?;
    written.insert(DESCRIPTOR_ENTRY.to_string());

    if let Some(icon) = &project.pack_icon {
        let bytes = decode_icon(icon)?;
        zip.start_file(ICON_ENTRY, entry_options())?;
        zip.write_all(&bytes)?;
        written.insert(ICON_ENTRY.to_string());
    }

    for node in store.iter().filter(|node| !node.is_folder()) {
        let Some(content) = node.content.as_deref() else {
            continue;
        };
        let path = store.resolve_path(&node.id);
        if path.is_empty() {
            warn!(id = %node.id, "skipping node with unresolvable path");
            continue;
        }
        if !written.insert(path.clone()) {
            warn!(path = %path, "skipping duplicate archive entry");
            continue;
        }
        zip.start_file(path, entry_options())?;
        zip.write_all(content.as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Validates, builds and writes `<dir>/<project name>.zip`.
///
/// # Arguments
///
/// * `project` - Pack metadata, used for the descriptor and the file name.
/// * `store` - The file tree to pack.
/// * `dir` - Output directory, created if missing.
/// * `confirmed` - Export even when validation reports errors.
///
/// # Errors
///
/// Returns [`ExportError::Unconfirmed`] when validation reports errors and
/// `confirmed` is false. Nothing is written in that case.
pub fn export_to_dir(
    project: &Project,
    store: &NodeStore,
    dir: &Path,
    confirmed: bool,
) -> Result<ExportReport, ExportError> {
    let diagnostics = validate(project, store);
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    if errors > 0 && !confirmed {
        return Err(ExportError::Unconfirmed(errors));
    }

    let archive = build_archive(project, store)?;
    let path = dir.join(archive_file_name(project));
    filesystem::write_atomic(&path, &archive, WriteOptions::default())?;

    let sha1 = hex::encode(Sha1::digest(&archive).to_vec());
    info!(path = %path.display(), bytes = archive.len(), %sha1, "exported datapack");
    Ok(ExportReport {
        path,
        bytes: archive.len(),
        sha1,
        diagnostics,
    })
}

/// Runs [`export_to_dir`] on the blocking thread pool.
pub async fn export_in_background(
    project: Project,
    store: NodeStore,
    dir: PathBuf,
    confirmed: bool,
) -> Result<ExportReport, ExportError> {
    tokio::task::spawn_blocking(move || export_to_dir(&project, &store, &dir, confirmed))
        .await
        .map_err(|err| ExportError::Task(err.to_string()))?
}
