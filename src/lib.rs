/// The `node` module holds the virtual file tree: node records, the flat
/// id-keyed store they live in, id generation, name grammars, path
/// resolution and ordered child listing.
pub mod node;

/// The `edit` module provides the tree mutations (create, rename, delete,
/// duplicate, move, content edits and template instantiation). Each takes a
/// store snapshot and returns a new one.
pub mod edit;

/// The `project` module describes pack-level metadata and builds the
/// namespace-rooted skeleton produced by the setup wizard.
pub mod project;

/// The `validation` module scans a project and its tree and reports
/// errors and warnings for the status panel.
pub mod validation;

/// The `descriptor` module maps game versions to data pack formats and
/// generates or parses `pack.mcmeta` files.
pub mod descriptor;

/// The `templates` module is the catalog of starter resources.
pub mod templates;

/// The `preview` module renders the tree as text.
pub mod preview;

/// The `export` module packs a project into a ZIP archive.
pub mod export;

/// The `storage` module persists workspace snapshots and runs the debounced
/// autosave task.
pub mod storage;

/// The `session` module owns the workspace being edited and notifies
/// subscribers of every change.
pub mod session;

/// The `settings` module parses the `key: value` editor settings file.
pub mod settings;

/// The `filesystem` module wraps the file operations used for persistence and
/// export.
pub mod filesystem;

/// The `logging` module installs the `tracing` subscriber.
pub mod logging;
