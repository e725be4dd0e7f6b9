use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::filesystem::{self, expand_home, FilesystemError};

/// A typed value read from a `key: value` settings line.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    /// Whole number, such as `500`.
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    StringList(Vec<String>),
}

impl SettingValue {
    fn type_name(&self) -> &'static str {
        match self {
            SettingValue::Integer(_) => "integer",
            SettingValue::Float(_) => "float",
            SettingValue::Boolean(_) => "boolean",
            SettingValue::String(_) => "string",
            SettingValue::StringList(_) => "list",
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Integer(v) => write!(f, "{v}"),
            SettingValue::Float(v) => write!(f, "{v}"),
            SettingValue::Boolean(v) => write!(f, "{v}"),
            SettingValue::String(v) => f.write_str(v),
            SettingValue::StringList(v) => write!(f, "[{}]", v.join(", ")),
        }
    }
}

/// One parsed settings line.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingLine {
    /// Text before the first `:`, trimmed.
    pub key: String,
    /// Typed value.
    pub value: SettingValue,
    /// The value text before typing.
    pub raw: String,
}

/// Represents errors that can occur while reading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A non-comment line has nothing before the `:`.
    #[error("line {line}: key is missing or empty")]
    MissingKey { line: usize },
    /// A known key holds a value of the wrong type.
    #[error("setting `{key}` expects {expected}, got {found} `{value}`")]
    InvalidValue {
        key: String,
        expected: &'static str,
        found: &'static str,
        value: String,
    },
    /// The settings file could not be read.
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Parses a single `key: value` line. Only the first `:` separates key and
/// value; both sides are trimmed.
pub fn parse_line(line: &str) -> Option<SettingLine> {
    let (key, value) = match line.split_once(':') {
        Some((key, value)) => (key.trim(), value.trim()),
        None => (line.trim(), ""),
    };
    if key.is_empty() {
        return None;
    }
    Some(SettingLine {
        key: key.to_string(),
        value: parse_value(value),
        raw: value.to_string(),
    })
}

fn parse_value(raw: &str) -> SettingValue {
    if let Ok(v) = raw.parse::<i64>() {
        return SettingValue::Integer(v);
    }
    if let Ok(v) = raw.parse::<f64>() {
        return SettingValue::Float(v);
    }
    match raw {
        "true" | "\"true\"" => SettingValue::Boolean(true),
        "false" | "\"false\"" => SettingValue::Boolean(false),
        _ => match raw.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            Some(items) => {
                SettingValue::StringList(items.split(',').map(|s| s.trim().to_string()).collect())
            }
            None => SettingValue::String(raw.to_string()),
        },
    }
}

/// Parses settings text. Blank lines and `#` comments are skipped.
///
/// # Errors
///
/// Returns [`SettingsError::MissingKey`] for a line like `: value`.
pub fn parse_settings_str(content: &str) -> Result<Vec<SettingLine>, SettingsError> {
    let mut lines = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let parsed = parse_line(trimmed).ok_or(SettingsError::MissingKey { line: index + 1 })?;
        lines.push(parsed);
    }
    Ok(lines)
}

/// Editor configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSettings {
    /// Where the workspace snapshot is persisted.
    pub storage_path: PathBuf,
    /// Directory receiving exported archives.
    pub export_dir: PathBuf,
    /// Quiet period before a change is persisted.
    pub autosave_debounce: Duration,
    /// Version preselected when creating a project.
    pub default_target_version: String,
    /// Whether new projects get load/tick starter functions.
    pub starter_files: bool,
    /// `tracing` filter directive.
    pub log_filter: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        let storage_path = dirs::data_dir()
            .map(|dir| dir.join("datapack-studio").join("snapshot.json"))
            .unwrap_or_else(|| PathBuf::from("datapack-studio.json"));
        Self {
            storage_path,
            export_dir: PathBuf::from("."),
            autosave_debounce: Duration::from_millis(500),
            default_target_version: "1.21.4".to_string(),
            starter_files: true,
            log_filter: "info".to_string(),
        }
    }
}

/// Default location of the settings file.
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("datapack-studio").join("settings.txt"))
        .unwrap_or_else(|| PathBuf::from("datapack-studio.txt"))
}

fn invalid(key: &str, expected: &'static str, value: &SettingValue) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        expected,
        found: value.type_name(),
        value: value.to_string(),
    }
}

fn expect_string(key: &str, value: SettingValue) -> Result<String, SettingsError> {
    match value {
        SettingValue::String(v) => Ok(v),
        other => Err(invalid(key, "a string", &other)),
    }
}

impl EditorSettings {
    /// Applies settings text on top of the defaults.
    ///
    /// Unknown keys are logged and ignored.
    pub fn from_settings_str(content: &str) -> Result<Self, SettingsError> {
        let mut settings = Self::default();
        for SettingLine { key, value, raw } in parse_settings_str(content)? {
            match key.as_str() {
                "storage_path" => settings.storage_path = expand_home(&expect_string(&key, value)?),
                "export_dir" => settings.export_dir = expand_home(&expect_string(&key, value)?),
                "autosave_debounce_ms" => match value {
                    SettingValue::Integer(ms) if ms >= 0 => {
                        settings.autosave_debounce = Duration::from_millis(ms.unsigned_abs())
                    }
                    other => return Err(invalid(&key, "a non-negative integer", &other)),
                },
                // Versions like `1.20` would read back as floats; keep the text.
                "default_target_version" => match value {
                    SettingValue::String(_) | SettingValue::Float(_) | SettingValue::Integer(_) => {
                        settings.default_target_version = raw
                    }
                    other => return Err(invalid(&key, "a version string", &other)),
                },
                "starter_files" => match value {
                    SettingValue::Boolean(v) => settings.starter_files = v,
                    other => return Err(invalid(&key, "a boolean", &other)),
                },
                "log_filter" => settings.log_filter = expect_string(&key, value)?,
                _ => warn!(key = %key, "ignoring unknown setting"),
            }
        }
        Ok(settings)
    }

    /// Loads settings from `path`, using defaults when the file is absent.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        match filesystem::read_if_exists(path)? {
            Some(content) => Self::from_settings_str(&content),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parses_typed_values() {
        assert_eq!(parse_line("count: 42").unwrap().value, SettingValue::Integer(42));
        assert_eq!(parse_line("ratio: 3.5").unwrap().value, SettingValue::Float(3.5));
        assert_eq!(parse_line("on: true").unwrap().value, SettingValue::Boolean(true));
        assert_eq!(parse_line("off:\"false\"").unwrap().value, SettingValue::Boolean(false));
        assert_eq!(
            parse_line("items: [a,  , b ]").unwrap().value,
            SettingValue::StringList(vec!["a".into(), "".into(), "b".into()])
        );
        assert_eq!(
            parse_line("name: John Doe").unwrap().value,
            SettingValue::String("John Doe".into())
        );
        assert_eq!(parse_line("empty:").unwrap().value, SettingValue::String(String::new()));
    }

    #[test]
    fn splits_on_first_colon_only() {
        let parsed = parse_line("  path :  C:\\packs ").unwrap();
        assert_eq!(parsed.key, "path");
        assert_eq!(parsed.value, SettingValue::String("C:\\packs".into()));
    }

    #[test]
    fn rejects_missing_key() {
        assert!(parse_line(": value").is_none());
        let result = parse_settings_str("a: 1\n: value\n");
        assert!(matches!(result, Err(SettingsError::MissingKey { line: 2 })));
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let content = "\n# comment\nkey1: 123\n\n  # another\nkey2: true\n";
        let parsed = parse_settings_str(content).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].key, "key1");
        assert_eq!(parsed[1].key, "key2");
    }

    #[test]
    fn applies_known_settings() {
        let settings = EditorSettings::from_settings_str(
            "storage_path: /tmp/snap.json\n\
             export_dir: /tmp/out\n\
             autosave_debounce_ms: 250\n\
             default_target_version: 1.21.11\n\
             starter_files: false\n\
             log_filter: debug\n\
             colour: blue\n",
        )
        .unwrap();
        assert_eq!(settings.storage_path, PathBuf::from("/tmp/snap.json"));
        assert_eq!(settings.export_dir, PathBuf::from("/tmp/out"));
        assert_eq!(settings.autosave_debounce, Duration::from_millis(250));
        assert_eq!(settings.default_target_version, "1.21.11");
        assert!(!settings.starter_files);
        assert_eq!(settings.log_filter, "debug");
    }

    #[test]
    fn short_versions_survive_number_parsing() {
        let settings = EditorSettings::from_settings_str("default_target_version: 1.20").unwrap();
        assert_eq!(settings.default_target_version, "1.20");
    }

    #[test]
    fn wrong_type_is_an_error() {
        let result = EditorSettings::from_settings_str("autosave_debounce_ms: soon");
        assert!(matches!(
            result,
            Err(SettingsError::InvalidValue { expected: "a non-negative integer", .. })
        ));
        let result = EditorSettings::from_settings_str("starter_files: 1");
        assert!(matches!(result, Err(SettingsError::InvalidValue { .. })));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = EditorSettings::load(dir.path().join("settings.txt")).unwrap();
        assert_eq!(settings, EditorSettings::default());
        assert_eq!(settings.autosave_debounce, Duration::from_millis(500));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.txt");
        fs::write(&path, "starter_files: false\n").unwrap();
        assert!(!EditorSettings::load(&path).unwrap().starter_files);
    }
}
