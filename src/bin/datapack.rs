//! Datapack CLI
//!
//! Command-line front end for editing, validating and exporting a datapack
//! workspace.

use std::io::Read;
use std::path::PathBuf;
use std::process;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use datapack_studio::descriptor::{lookup_format, supported_versions, PackFormat};
use datapack_studio::edit::NewNode;
use datapack_studio::export::{export_in_background, ExportError};
use datapack_studio::logging::init_logging;
use datapack_studio::node::NodeId;
use datapack_studio::preview::render_tree;
use datapack_studio::project::ProjectSetup;
use datapack_studio::session::Session;
use datapack_studio::settings::{default_settings_path, EditorSettings};
use datapack_studio::storage::{spawn_autosave, SnapshotStore};
use datapack_studio::templates::catalog;
use datapack_studio::validation::has_errors;

#[derive(Parser)]
#[command(name = "datapack", version, about = "Build Minecraft datapacks from a virtual file tree")]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Snapshot file, overriding `storage_path` from the settings
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new project, replacing any stored one
    New {
        #[arg(long)]
        name: String,
        #[arg(long)]
        namespace: String,
        /// Target game version (defaults to `default_target_version`)
        #[arg(long)]
        target_version: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
        /// Skip the load/tick starter functions
        #[arg(long)]
        no_starter: bool,
    },
    /// Print the file tree
    Tree,
    /// Report errors and warnings
    Validate,
    /// Create an empty file
    Touch { path: String },
    /// Create a folder
    Mkdir { path: String },
    /// Rename a file or folder
    Rename { path: String, name: String },
    /// Delete a file or folder with everything below it
    Rm { path: String },
    /// Duplicate a file, or a folder without its contents
    Cp { path: String },
    /// Move a node under another folder, or to the root
    Mv { path: String, parent: Option<String> },
    /// Replace a file's content from a local file or stdin
    Write {
        path: String,
        #[arg(long)]
        from: Option<PathBuf>,
    },
    /// Add a file from the template catalog
    Template {
        parent: String,
        template: String,
        name: String,
    },
    /// List the template catalog
    Templates,
    /// List supported game versions and their pack formats
    Versions,
    /// Write `<project name>.zip`
    Export {
        /// Output directory (defaults to `export_dir`)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Export even when validation reports errors
        #[arg(long)]
        force: bool,
    },
    /// Delete the stored project
    Reset,
}

fn lookup(session: &Session, path: &str) -> Result<NodeId> {
    session
        .store()
        .find_by_path(path)
        .cloned()
        .ok_or_else(|| anyhow!("no file or folder at `{path}`"))
}

/// Splits `a/b/c` into the id of `a/b` (or `None` at the root) and `c`.
fn parent_and_name<'a>(session: &Session, path: &'a str) -> Result<(Option<NodeId>, &'a str)> {
    let path = path.trim_matches('/');
    match path.rsplit_once('/') {
        Some((parent, name)) => Ok((Some(lookup(session, parent)?), name)),
        None => Ok((None, path)),
    }
}

fn describe(format: PackFormat) -> String {
    match format {
        PackFormat::Single(number) => number.to_string(),
        PackFormat::Range { min, max } => {
            format!("{}.{} - {}.{}", min[0], min[1], max[0], max[1])
        }
    }
}

fn load_session(storage: &SnapshotStore) -> Result<Session> {
    let snapshot = storage
        .load()
        .with_context(|| format!("reading {}", storage.path().display()))?
        .ok_or_else(|| anyhow!("no project found; run `datapack new` first"))?;
    Ok(Session::new(snapshot.into_workspace()))
}

/// Applies `edit` to the stored session and waits for the autosave task to
/// flush it.
async fn edit_session<F>(
    storage: &SnapshotStore,
    settings: &EditorSettings,
    edit: F,
) -> Result<String>
where
    F: FnOnce(&mut Session) -> Result<String>,
{
    let mut session = load_session(storage)?;
    let autosave = spawn_autosave(storage.clone(), session.subscribe(), settings.autosave_debounce);
    let result = edit(&mut session);
    drop(session);
    autosave.await.context("autosave task failed")?;
    result
}

async fn run(cli: Cli) -> Result<String> {
    let settings_path = cli.settings.clone().unwrap_or_else(default_settings_path);
    let settings = EditorSettings::load(&settings_path)
        .with_context(|| format!("loading settings from {}", settings_path.display()))?;
    init_logging(&settings.log_filter)?;

    let storage = SnapshotStore::new(cli.storage.clone().unwrap_or(settings.storage_path.clone()));

    match cli.command {
        Command::New {
            name,
            namespace,
            target_version,
            description,
            no_starter,
        } => {
            let setup = ProjectSetup {
                name,
                description,
                target_version: target_version.unwrap_or(settings.default_target_version.clone()),
                namespace,
                starter_files: settings.starter_files && !no_starter,
            };
            let session = Session::create(&setup)?;
            storage.save(session.workspace())?;
            Ok(render_tree(session.store()))
        }
        Command::Tree => Ok(render_tree(load_session(&storage)?.store())),
        Command::Validate => {
            let session = load_session(&storage)?;
            let diagnostics = session.validate();
            if diagnostics.is_empty() {
                return Ok("no problems found".to_string());
            }
            let report: Vec<String> = diagnostics.iter().map(ToString::to_string).collect();
            if has_errors(&diagnostics) {
                bail!(report.join("\n"));
            }
            Ok(report.join("\n"))
        }
        Command::Touch { path } => {
            edit_session(&storage, &settings, |session| {
                let (parent, name) = parent_and_name(session, &path)?;
                session.create_node(parent.as_ref(), name, NewNode::File)?;
                Ok(format!("created {path}"))
            })
            .await
        }
        Command::Mkdir { path } => {
            edit_session(&storage, &settings, |session| {
                let (parent, name) = parent_and_name(session, &path)?;
                session.create_node(parent.as_ref(), name, NewNode::Folder)?;
                Ok(format!("created {path}/"))
            })
            .await
        }
        Command::Rename { path, name } => {
            edit_session(&storage, &settings, |session| {
                let id = lookup(session, &path)?;
                session.rename(&id, &name)?;
                Ok(format!("renamed to {}", session.store().resolve_path(&id)))
            })
            .await
        }
        Command::Rm { path } => {
            edit_session(&storage, &settings, |session| {
                let id = lookup(session, &path)?;
                let removed = session.delete(&id)?;
                Ok(format!("removed {removed} node(s)"))
            })
            .await
        }
        Command::Cp { path } => {
            edit_session(&storage, &settings, |session| {
                let id = lookup(session, &path)?;
                let copy = session.duplicate(&id)?;
                Ok(format!("created {}", session.store().resolve_path(&copy)))
            })
            .await
        }
        Command::Mv { path, parent } => {
            edit_session(&storage, &settings, |session| {
                let id = lookup(session, &path)?;
                let parent = match parent.as_deref() {
                    Some(parent) => Some(lookup(session, parent)?),
                    None => None,
                };
                session.move_node(&id, parent.as_ref())?;
                Ok(format!("moved to {}", session.store().resolve_path(&id)))
            })
            .await
        }
        Command::Write { path, from } => {
            let content = match from {
                Some(file) => std::fs::read_to_string(&file)
                    .with_context(|| format!("reading {}", file.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            edit_session(&storage, &settings, |session| {
                let id = lookup(session, &path)?;
                session.set_content(&id, &content)?;
                Ok(format!("wrote {} bytes to {path}", content.len()))
            })
            .await
        }
        Command::Template {
            parent,
            template,
            name,
        } => {
            edit_session(&storage, &settings, |session| {
                let parent = lookup(session, &parent)?;
                let id = session.add_template(&parent, &template, &name)?;
                Ok(format!("created {}", session.store().resolve_path(&id)))
            })
            .await
        }
        Command::Templates => Ok(catalog()
            .iter()
            .map(|template| format!("{:<16} {}", template.id, template.label))
            .collect::<Vec<_>>()
            .join("\n")),
        Command::Versions => Ok(supported_versions()
            .filter_map(|version| lookup_format(version).map(|format| (version, format)))
            .map(|(version, format)| format!("{version:<10} {}", describe(format)))
            .collect::<Vec<_>>()
            .join("\n")),
        Command::Export { out, force } => {
            let session = load_session(&storage)?;
            let dir = out.unwrap_or(settings.export_dir.clone());
            let workspace = session.workspace().clone();
            match export_in_background(workspace.project, workspace.store, dir, force).await {
                Ok(report) => {
                    let mut lines: Vec<String> =
                        report.diagnostics.iter().map(ToString::to_string).collect();
                    lines.push(format!(
                        "wrote {} ({} bytes, sha1 {})",
                        report.path.display(),
                        report.bytes,
                        report.sha1
                    ));
                    Ok(lines.join("\n"))
                }
                Err(err @ ExportError::Unconfirmed(_)) => {
                    bail!("{err}; rerun with --force to export anyway")
                }
                Err(err) => Err(err.into()),
            }
        }
        Command::Reset => {
            storage.clear()?;
            Ok(format!("removed {}", storage.path().display()))
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output.trim_end());
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
