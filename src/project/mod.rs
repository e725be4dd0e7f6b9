use serde::{Deserialize, Serialize};
use tracing::info;

use crate::descriptor::uses_legacy_folder_names;
use crate::edit::{self, EditError, NewNode};
use crate::node::{is_valid_namespace, NodeId, NodeStore};

/// Pack-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Display name, also used for the archive file name.
    pub name: String,
    /// Written to `pack.mcmeta`.
    pub description: String,
    /// Game version the pack targets, such as `1.21.4`.
    pub target_version: String,
    /// Namespace for the pack's own resources.
    pub namespace: String,
    /// Base64 image, optionally wrapped in a `data:` URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack_icon: Option<String>,
}

/// A project together with its file tree. Created, mutated and persisted as
/// one unit.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Pack metadata.
    pub project: Project,
    /// The file tree.
    pub store: NodeStore,
}

/// Answers collected by the setup wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSetup {
    pub name: String,
    pub description: String,
    pub target_version: String,
    pub namespace: String,
    /// Adds `load`/`tick` functions and the tags that run them.
    pub starter_files: bool,
}

const LOAD_FUNCTION: &str = "# Runs once when the pack is (re)loaded\n";
const TICK_FUNCTION: &str = "# Runs every game tick\n";

fn function_folder(target_version: &str) -> &'static str {
    if uses_legacy_folder_names(target_version) {
        "functions"
    } else {
        "function"
    }
}

fn function_tag(namespace: &str, function: &str) -> String {
    format!("{{\n  \"values\": [\n    \"{namespace}:{function}\"\n  ]\n}}\n")
}

fn folder(
    store: NodeStore,
    parent: Option<&NodeId>,
    name: &str,
) -> Result<(NodeStore, NodeId), EditError> {
    edit::create_node(&store, parent, name, NewNode::Folder)
}

fn text_file(
    store: NodeStore,
    parent: &NodeId,
    name: &str,
    content: &str,
) -> Result<NodeStore, EditError> {
    let (store, id) = edit::create_node(&store, Some(parent), name, NewNode::File)?;
    edit::set_content(&store, &id, content)
}

/// Builds a new workspace from wizard answers.
///
/// The tree always holds `data/<namespace>/function`. With starter files it
/// also gets `load` and `tick` functions and the `minecraft` function tags
/// that run them.
///
/// # Errors
///
/// Returns [`EditError::InvalidNamespace`] if the namespace is empty or not
/// made of lowercase letters, digits, `_` and `-`.
pub fn create_workspace(setup: &ProjectSetup) -> Result<Workspace, EditError> {
    if !is_valid_namespace(&setup.namespace) {
        return Err(EditError::InvalidNamespace(setup.namespace.clone()));
    }

    let functions = function_folder(&setup.target_version);
    let (store, data) = folder(NodeStore::new(), None, "data")?;
    let (store, namespace) = folder(store, Some(&data), &setup.namespace)?;
    let (mut store, function) = folder(store, Some(&namespace), functions)?;

    if setup.starter_files {
        store = text_file(store, &function, "load.mcfunction", LOAD_FUNCTION)?;
        store = text_file(store, &function, "tick.mcfunction", TICK_FUNCTION)?;
        let (next, minecraft) = if setup.namespace == "minecraft" {
            (store, namespace.clone())
        } else {
            folder(store, Some(&data), "minecraft")?
        };
        let (next, tags) = folder(next, Some(&minecraft), "tags")?;
        let (next, tag_folder) = folder(next, Some(&tags), functions)?;
        store = text_file(
            next,
            &tag_folder,
            "load.json",
            &function_tag(&setup.namespace, "load"),
        )?;
        store = text_file(
            store,
            &tag_folder,
            "tick.json",
            &function_tag(&setup.namespace, "tick"),
        )?;
    }

    info!(
        name = %setup.name,
        namespace = %setup.namespace,
        version = %setup.target_version,
        nodes = store.len(),
        "created project"
    );
    Ok(Workspace {
        project: Project {
            name: setup.name.clone(),
            description: setup.description.clone(),
            target_version: setup.target_version.clone(),
            namespace: setup.namespace.clone(),
            pack_icon: None,
        },
        store,
    })
}
