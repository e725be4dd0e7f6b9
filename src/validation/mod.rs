use std::collections::HashSet;
use std::fmt;

use crate::node::{is_valid_namespace, NodeId, NodeStore};
use crate::project::Project;

/// How serious a diagnostic is. Neither level blocks editing; errors ask for
/// confirmation before export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The pack is likely broken in game.
    Error,
    /// Worth a look, but harmless.
    Warning,
}

/// A problem found in the project or its tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    /// The project name is blank.
    MissingProjectName,
    /// The namespace is empty.
    MissingNamespace,
    /// The namespace breaks the namespace grammar.
    InvalidNamespace(String),
    /// Two or more nodes resolve to this path.
    DuplicatePath(String),
    /// A JSON or `pack.mcmeta` file does not parse.
    MalformedContent {
        /// Resolved path of the file.
        path: String,
        /// Parser message, unchanged.
        message: String,
    },
    /// A folder without children. Exported archives omit it.
    EmptyFolder(String),
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::MissingProjectName => write!(f, "Project name is required"),
            Issue::MissingNamespace => write!(f, "Namespace is required"),
            Issue::InvalidNamespace(namespace) => write!(
                f,
                "Namespace `{namespace}` may only contain lowercase letters, digits, `_` and `-`"
            ),
            Issue::DuplicatePath(path) => write!(f, "Duplicate path: {path}"),
            Issue::MalformedContent { path, message } => {
                write!(f, "Invalid JSON in {path}: {message}")
            }
            Issue::EmptyFolder(path) => write!(f, "Empty folder: {path}"),
        }
    }
}

/// One finding of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// How serious the finding is.
    pub severity: Severity,
    /// What was found.
    pub issue: Issue,
}

impl Diagnostic {
    fn error(issue: Issue) -> Self {
        Self {
            severity: Severity::Error,
            issue,
        }
    }

    fn warning(issue: Issue) -> Self {
        Self {
            severity: Severity::Warning,
            issue,
        }
    }

    /// Returns `true` for [`Severity::Error`].
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Text shown in the status panel, without the severity label.
    pub fn message(&self) -> String {
        self.issue.to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{label}: {}", self.issue)
    }
}

/// Returns `true` if any diagnostic is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

fn check_project(project: &Project, out: &mut Vec<Diagnostic>) {
    if project.name.trim().is_empty() {
        out.push(Diagnostic::error(Issue::MissingProjectName));
    }
    if project.namespace.is_empty() {
        out.push(Diagnostic::error(Issue::MissingNamespace));
    } else if !is_valid_namespace(&project.namespace) {
        out.push(Diagnostic::error(Issue::InvalidNamespace(project.namespace.clone())));
    }
}

fn check_duplicate_paths(store: &NodeStore, out: &mut Vec<Diagnostic>) {
    let mut seen = HashSet::new();
    let mut flagged = HashSet::new();
    for id in store.ids() {
        let path = store.resolve_path(id);
        if path.is_empty() {
            continue;
        }
        if seen.contains(&path) {
            if flagged.insert(path.clone()) {
                out.push(Diagnostic::error(Issue::DuplicatePath(path)));
            }
        } else {
            seen.insert(path);
        }
    }
}

fn check_contents(store: &NodeStore, out: &mut Vec<Diagnostic>) {
    for node in store.iter().filter(|node| node.kind.is_structured()) {
        let Some(content) = node.content.as_deref() else {
            continue;
        };
        if content.is_empty() {
            continue;
        }
        if let Err(err) = serde_json::from_str::<serde_json::Value>(content) {
            out.push(Diagnostic::error(Issue::MalformedContent {
                path: store.resolve_path(&node.id),
                message: err.to_string(),
            }));
        }
    }
}

fn check_empty_folders(store: &NodeStore, out: &mut Vec<Diagnostic>) {
    let parents: HashSet<&NodeId> = store
        .iter()
        .filter_map(|node| node.parent_id.as_ref())
        .collect();
    for node in store.iter().filter(|node| node.is_folder()) {
        if !parents.contains(&node.id) {
            out.push(Diagnostic::warning(Issue::EmptyFolder(
                store.resolve_path(&node.id),
            )));
        }
    }
}

/// Checks the project metadata and every node, in this order: required
/// project fields, duplicate paths, JSON syntax, empty folders.
pub fn validate(project: &Project, store: &NodeStore) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    check_project(project, &mut diagnostics);
    check_duplicate_paths(store, &mut diagnostics);
    check_contents(store, &mut diagnostics);
    check_empty_folders(store, &mut diagnostics);
    diagnostics
}
