use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::project::Project;

/// Format used for versions missing from the table.
pub const DEFAULT_PACK_FORMAT: u32 = 48;

/// Data pack format declared for a game version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackFormat {
    /// Older releases declare a single `pack_format` number.
    Single(u32),
    /// Newer releases declare `min_format` and `max_format` as
    /// `[major, minor]` pairs.
    Range { min: [u32; 2], max: [u32; 2] },
}

impl PackFormat {
    /// Major format number, used to compare releases across both schemes.
    pub fn major(self) -> u32 {
        match self {
            PackFormat::Single(format) => format,
            PackFormat::Range { min, .. } => min[0],
        }
    }
}

const fn range(major: u32, minor: u32) -> PackFormat {
    PackFormat::Range {
        min: [major, minor],
        max: [major, minor],
    }
}

/// Known releases and their data pack format, oldest first.
const VERSION_FORMATS: &[(&str, PackFormat)] = &[
    ("1.13", PackFormat::Single(4)),
    ("1.13.1", PackFormat::Single(4)),
    ("1.13.2", PackFormat::Single(4)),
    ("1.14", PackFormat::Single(4)),
    ("1.14.1", PackFormat::Single(4)),
    ("1.14.2", PackFormat::Single(4)),
    ("1.14.3", PackFormat::Single(4)),
    ("1.14.4", PackFormat::Single(4)),
    ("1.15", PackFormat::Single(5)),
    ("1.15.1", PackFormat::Single(5)),
    ("1.15.2", PackFormat::Single(5)),
    ("1.16", PackFormat::Single(5)),
    ("1.16.1", PackFormat::Single(5)),
    ("1.16.2", PackFormat::Single(6)),
    ("1.16.3", PackFormat::Single(6)),
    ("1.16.4", PackFormat::Single(6)),
    ("1.16.5", PackFormat::Single(6)),
    ("1.17", PackFormat::Single(7)),
    ("1.17.1", PackFormat::Single(7)),
    ("1.18", PackFormat::Single(8)),
    ("1.18.1", PackFormat::Single(8)),
    ("1.18.2", PackFormat::Single(9)),
    ("1.19", PackFormat::Single(10)),
    ("1.19.1", PackFormat::Single(10)),
    ("1.19.2", PackFormat::Single(10)),
    ("1.19.3", PackFormat::Single(10)),
    ("1.19.4", PackFormat::Single(12)),
    ("1.20", PackFormat::Single(15)),
    ("1.20.1", PackFormat::Single(15)),
    ("1.20.2", PackFormat::Single(18)),
    ("1.20.3", PackFormat::Single(26)),
    ("1.20.4", PackFormat::Single(26)),
    ("1.20.5", PackFormat::Single(41)),
    ("1.20.6", PackFormat::Single(41)),
    ("1.21", PackFormat::Single(48)),
    ("1.21.1", PackFormat::Single(48)),
    ("1.21.2", PackFormat::Single(57)),
    ("1.21.3", PackFormat::Single(57)),
    ("1.21.4", PackFormat::Single(61)),
    ("1.21.5", PackFormat::Single(71)),
    ("1.21.6", PackFormat::Single(80)),
    ("1.21.7", PackFormat::Single(81)),
    ("1.21.8", PackFormat::Single(81)),
    ("1.21.9", range(88, 0)),
    ("1.21.10", range(88, 0)),
    ("1.21.11", range(94, 1)),
];

/// First format number where registry folders use singular names
/// (`function` instead of `functions`).
const SINGULAR_FOLDERS_SINCE: u32 = 45;

/// Versions the editor can target, oldest first.
pub fn supported_versions() -> impl Iterator<Item = &'static str> {
    VERSION_FORMATS.iter().map(|(version, _)| *version)
}

/// Looks up the format for `version`, returning `None` for unknown versions.
pub fn lookup_format(version: &str) -> Option<PackFormat> {
    VERSION_FORMATS
        .iter()
        .find(|(known, _)| *known == version)
        .map(|(_, format)| *format)
}

/// Format for `version`, falling back to [`DEFAULT_PACK_FORMAT`].
pub fn pack_format_for(version: &str) -> PackFormat {
    lookup_format(version).unwrap_or(PackFormat::Single(DEFAULT_PACK_FORMAT))
}

/// Returns `true` if packs for `version` use the plural registry folder names
/// (`functions`, `advancements`, ...).
pub fn uses_legacy_folder_names(version: &str) -> bool {
    pack_format_for(version).major() < SINGULAR_FOLDERS_SINCE
}

/// Contents of a `pack.mcmeta` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub pack: PackSection,
}

/// The `pack` section of `pack.mcmeta`. Holds either `pack_format` or the
/// `min_format`/`max_format` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackSection {
    /// Single format number used before 1.21.9.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack_format: Option<u32>,
    /// Text shown in the pack list.
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_format: Option<[u32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_format: Option<[u32; 2]>,
}

impl PackSection {
    /// The declared format, if the section declares one.
    pub fn format(&self) -> Option<PackFormat> {
        match (self.pack_format, self.min_format, self.max_format) {
            (_, Some(min), Some(max)) => Some(PackFormat::Range { min, max }),
            (Some(format), _, _) => Some(PackFormat::Single(format)),
            _ => None,
        }
    }
}

impl Descriptor {
    /// Creates a descriptor declaring `format` in the matching scheme.
    pub fn new(description: impl Into<String>, format: PackFormat) -> Self {
        let description = description.into();
        let pack = match format {
            PackFormat::Single(format) => PackSection {
                pack_format: Some(format),
                description,
                min_format: None,
                max_format: None,
            },
            PackFormat::Range { min, max } => PackSection {
                pack_format: None,
                description,
                min_format: Some(min),
                max_format: Some(max),
            },
        };
        Self { pack }
    }

    /// Serializes the descriptor as indented JSON, as written to the archive.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Derives the pack descriptor for a project from its target version.
///
/// Never fails: an unknown version gets [`DEFAULT_PACK_FORMAT`].
pub fn build_descriptor(project: &Project) -> Descriptor {
    Descriptor::new(
        project.description.clone(),
        pack_format_for(&project.target_version),
    )
}

/// Errors raised while reading an existing `pack.mcmeta`.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// Wrapper for IO errors while reading the file.
    #[error("Failed to read the file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("The `pack` section declares neither `pack_format` nor `min_format`/`max_format`")]
    MissingFormat,
}

/// Parses the text of a `pack.mcmeta` file.
///
/// # Errors
///
/// Fails if the text is not JSON of the expected shape, or if the `pack`
/// section declares no format.
pub fn parse_descriptor(content: &str) -> Result<Descriptor, DescriptorError> {
    let descriptor: Descriptor = serde_json::from_str(content)?;
    if descriptor.pack.format().is_none() {
        return Err(DescriptorError::MissingFormat);
    }
    Ok(descriptor)
}

/// Reads and parses a `pack.mcmeta` file from disk.
pub fn parse_descriptor_file<P: AsRef<Path>>(path: P) -> Result<Descriptor, DescriptorError> {
    let content = fs::read_to_string(path)?;
    parse_descriptor(&content)
}
