use thiserror::Error;
use tracing::debug;

use crate::node::{create_id, is_valid_name, Node, NodeId, NodeKind, NodeStore};

/// Errors raised by tree mutations. Each aborts the operation and leaves the
/// input store as it was.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    /// The name breaks the file name grammar.
    #[error("invalid name `{0}`: use lowercase letters, digits, `_`, `-` and `.` only")]
    InvalidName(String),
    /// The namespace breaks the namespace grammar.
    #[error("invalid namespace `{0}`: use lowercase letters, digits, `_` and `-` only")]
    InvalidNamespace(String),
    /// No node has this id.
    #[error("node {0} does not exist")]
    NodeNotFound(NodeId),
    /// A folder was required; holds the offending path.
    #[error("`{0}` is not a folder")]
    NotAFolder(String),
    /// Folders and binary files carry no text.
    #[error("`{0}` has no editable text content")]
    NotEditable(String),
    /// The target folder lies inside the node being moved.
    #[error("cannot move `{0}` inside itself")]
    WouldCycle(String),
    /// No catalog template has this id.
    #[error("unknown template `{0}`")]
    UnknownTemplate(String),
}

/// Kind of node to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewNode {
    Folder,
    File,
}

fn check_name(name: &str) -> Result<(), EditError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(EditError::InvalidName(name.to_string()))
    }
}

fn require<'a>(store: &'a NodeStore, id: &NodeId) -> Result<&'a Node, EditError> {
    store
        .get(id)
        .ok_or_else(|| EditError::NodeNotFound(id.clone()))
}

fn require_folder(store: &NodeStore, parent: Option<&NodeId>) -> Result<(), EditError> {
    if let Some(parent) = parent {
        let node = require(store, parent)?;
        if !node.is_folder() {
            return Err(EditError::NotAFolder(store.resolve_path(parent)));
        }
    }
    Ok(())
}

/// Creates a file or folder under `parent` (a root when `None`).
///
/// Files get content matching their kind: an empty object for JSON, a
/// comment line for functions, nothing for binary kinds.
///
/// # Arguments
///
/// * `store` - Current tree. It is left unchanged.
/// * `parent` - Folder to create the node in, or `None` for the top level.
/// * `name` - Name of the new node, including any extension.
/// * `new_node` - Whether to create a file or a folder.
///
/// # Returns
///
/// The new store and the id of the created node.
///
/// # Errors
///
/// Returns [`EditError::InvalidName`] if `name` breaks the grammar,
/// [`EditError::NodeNotFound`] if `parent` does not exist, or
/// [`EditError::NotAFolder`] if `parent` is a file.
pub fn create_node(
    store: &NodeStore,
    parent: Option<&NodeId>,
    name: &str,
    new_node: NewNode,
) -> Result<(NodeStore, NodeId), EditError> {
    let kind = match new_node {
        NewNode::Folder => NodeKind::Folder,
        NewNode::File => NodeKind::from_file_name(name),
    };
    create_with(store, parent, name, kind, kind.initial_content(name))
}

fn create_with(
    store: &NodeStore,
    parent: Option<&NodeId>,
    name: &str,
    kind: NodeKind,
    content: Option<String>,
) -> Result<(NodeStore, NodeId), EditError> {
    check_name(name)?;
    require_folder(store, parent)?;
    let id = create_id();
    let node = Node {
        id: id.clone(),
        name: name.to_string(),
        kind,
        content,
        parent_id: parent.cloned(),
    };
    debug!(id = %id, name, ?kind, "created node");
    Ok((store.with_node(node), id))
}

/// Renames a node. Descendants keep their parent link, so their paths move
/// with it.
pub fn rename_node(store: &NodeStore, id: &NodeId, name: &str) -> Result<NodeStore, EditError> {
    let node = require(store, id)?;
    if node.name == name {
        return Ok(store.clone());
    }
    check_name(name)?;
    debug!(id = %id, from = %node.name, to = name, "renamed node");
    Ok(store.with_node(Node {
        name: name.to_string(),
        ..node.clone()
    }))
}

/// Deletes a node and its whole subtree. Returns the new store and the
/// number of nodes removed.
///
/// # Errors
///
/// Returns [`EditError::NodeNotFound`] if `id` does not exist.
pub fn delete_node(store: &NodeStore, id: &NodeId) -> Result<(NodeStore, usize), EditError> {
    require(store, id)?;
    let doomed = store.subtree_ids(id);
    debug!(id = %id, removed = doomed.len(), "deleted subtree");
    Ok((store.without(&doomed), doomed.len()))
}

/// Name given to a copy of `name`: `_copy` goes before the extension, and a
/// counter is appended while `taken` reports a clash.
pub fn duplicate_name(name: &str, is_folder: bool, taken: impl Fn(&str) -> bool) -> String {
    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, ext)) if !is_folder && !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    let build = |suffix: &str| match extension {
        Some(ext) => format!("{stem}_copy{suffix}.{ext}"),
        None => format!("{stem}_copy{suffix}"),
    };
    let mut candidate = build("");
    let mut counter = 2;
    while taken(&candidate) {
        candidate = build(&counter.to_string());
        counter += 1;
    }
    candidate
}

/// Copies a single node next to the original. Folders are copied without
/// their contents.
pub fn duplicate_node(store: &NodeStore, id: &NodeId) -> Result<(NodeStore, NodeId), EditError> {
    let original = require(store, id)?;
    let siblings = store.children_of(original.parent_id.as_ref());
    let name = duplicate_name(&original.name, original.is_folder(), |candidate| {
        siblings.iter().any(|sibling| sibling.name == candidate)
    });
    let copy_id = create_id();
    let copy = Node {
        id: copy_id.clone(),
        name,
        ..original.clone()
    };
    debug!(id = %id, copy = %copy_id, "duplicated node");
    Ok((store.with_node(copy), copy_id))
}

/// Replaces the text of an editable file.
pub fn set_content(store: &NodeStore, id: &NodeId, content: &str) -> Result<NodeStore, EditError> {
    let node = require(store, id)?;
    if node.is_folder() || node.kind.is_binary() {
        return Err(EditError::NotEditable(store.resolve_path(id)));
    }
    Ok(store.with_node(Node {
        content: Some(content.to_string()),
        ..node.clone()
    }))
}

/// Moves a node under another folder, or to the root when `new_parent` is
/// `None`.
pub fn move_node(
    store: &NodeStore,
    id: &NodeId,
    new_parent: Option<&NodeId>,
) -> Result<NodeStore, EditError> {
    let node = require(store, id)?;
    require_folder(store, new_parent)?;
    if let Some(target) = new_parent {
        if store.subtree_ids(id).contains(target) {
            return Err(EditError::WouldCycle(store.resolve_path(id)));
        }
    }
    debug!(id = %id, parent = ?new_parent, "moved node");
    Ok(store.with_node(Node {
        parent_id: new_parent.cloned(),
        ..node.clone()
    }))
}

/// Returns `true` if `parent` and its ancestors are named after `folders`,
/// innermost last.
fn ends_with_chain(store: &NodeStore, parent: &NodeId, folders: &[&str]) -> bool {
    let mut current = store.get(parent);
    for expected in folders.iter().rev() {
        match current {
            Some(node) if node.is_folder() && node.name == *expected => {
                current = node.parent_id.as_ref().and_then(|id| store.get(id));
            }
            _ => return false,
        }
    }
    true
}

fn child_folder(store: &NodeStore, parent: &NodeId, name: &str) -> Option<NodeId> {
    store
        .children_of(Some(parent))
        .into_iter()
        .find(|child| child.is_folder() && child.name == name)
        .map(|child| child.id.clone())
}

/// Adds a generated file under `parent`, filed into the registry folder chain
/// `folders` (for example `["recipe"]` or `["tags", "function"]`).
///
/// A child folder named after the first level is reused when present.
/// Otherwise, if `parent` already sits at the end of the chain (a folder
/// named after the category), the file goes straight into it. In every other
/// case each level is reused or created below `parent`.
///
/// # Errors
///
/// Returns [`EditError::InvalidName`] for a bad file or folder name,
/// [`EditError::NodeNotFound`] or [`EditError::NotAFolder`] for a bad parent.
pub fn instantiate_template(
    store: &NodeStore,
    parent: &NodeId,
    folders: &[&str],
    file_name: &str,
    content: &str,
) -> Result<(NodeStore, NodeId), EditError> {
    check_name(file_name)?;
    for folder in folders {
        check_name(folder)?;
    }
    let parent_node = require(store, parent)?;
    if !parent_node.is_folder() {
        return Err(EditError::NotAFolder(store.resolve_path(parent)));
    }

    let reuse_parent = match folders.first() {
        Some(first) => {
            child_folder(store, parent, first).is_none() && ends_with_chain(store, parent, folders)
        }
        None => true,
    };

    let mut store = store.clone();
    let mut target = parent.clone();
    if !reuse_parent {
        for folder in folders {
            target = match child_folder(&store, &target, folder) {
                Some(existing) => existing,
                None => {
                    let (next, created) =
                        create_node(&store, Some(&target), folder, NewNode::Folder)?;
                    store = next;
                    created
                }
            };
        }
    }

    let kind = NodeKind::from_file_name(file_name);
    let content = (!kind.is_binary()).then(|| content.to_string());
    create_with(&store, Some(&target), file_name, kind, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::tests::{file, folder};

    fn id(raw: &str) -> NodeId {
        NodeId::new(raw)
    }

    fn store() -> NodeStore {
        NodeStore::from_nodes([
            folder("1", "data", None),
            folder("2", "demo", Some("1")),
            folder("3", "function", Some("2")),
            file("4", "load.mcfunction", Some("3"), "say hi"),
            folder("5", "nested", Some("3")),
            file("6", "deep.json", Some("5"), "{}"),
            file("7", "a.json", Some("2"), "{}"),
        ])
    }

    #[test]
    fn creates_file_with_stub_content() {
        let (next, new_id) =
            create_node(&store(), Some(&id("2")), "b.json", NewNode::File).unwrap();
        let node = next.get(&new_id).unwrap();
        assert_eq!(node.kind, NodeKind::Json);
        assert_eq!(node.content.as_deref(), Some("{\n}\n"));
        assert_eq!(next.resolve_path(&new_id), "data/demo/b.json");
        assert_eq!(next.len(), store().len() + 1);
    }

    #[test]
    fn creates_folder_without_content() {
        let (next, new_id) = create_node(&store(), None, "extra", NewNode::Folder).unwrap();
        let node = next.get(&new_id).unwrap();
        assert!(node.is_folder());
        assert_eq!(node.content, None);
        assert_eq!(node.parent_id, None);
    }

    #[test]
    fn create_leaves_input_untouched() {
        let before = store();
        let (_next, new_id) =
            create_node(&before, Some(&id("2")), "b.json", NewNode::File).unwrap();
        assert!(!before.contains(&new_id));
        assert_eq!(before.len(), 7);
    }

    #[test]
    fn create_rejects_bad_names() {
        for bad in ["", "Bad.json", "a b", "x..json", "a/b"] {
            let result = create_node(&store(), Some(&id("2")), bad, NewNode::File);
            assert_eq!(result.unwrap_err(), EditError::InvalidName(bad.to_string()));
        }
    }

    #[test]
    fn create_requires_folder_parent() {
        let missing = create_node(&store(), Some(&id("99")), "x.json", NewNode::File);
        assert_eq!(missing.unwrap_err(), EditError::NodeNotFound(id("99")));
        let under_file = create_node(&store(), Some(&id("7")), "x.json", NewNode::File);
        assert!(matches!(under_file, Err(EditError::NotAFolder(_))));
    }

    #[test]
    fn rename_moves_descendant_paths() {
        let next = rename_node(&store(), &id("3"), "functions").unwrap();
        assert_eq!(next.resolve_path(&id("6")), "data/demo/functions/nested/deep.json");
        assert_eq!(next.get(&id("6")).unwrap().parent_id, Some(id("5")));
    }

    #[test]
    fn rename_to_same_name_is_noop() {
        let next = rename_node(&store(), &id("7"), "a.json").unwrap();
        assert_eq!(next.to_vec(), store().to_vec());
    }

    #[test]
    fn rename_validates_name() {
        let result = rename_node(&store(), &id("7"), "A.json");
        assert_eq!(result.unwrap_err(), EditError::InvalidName("A.json".to_string()));
    }

    #[test]
    fn delete_removes_whole_subtree() {
        let before = store();
        let subtree = before.subtree_ids(&id("3")).len();
        let (next, removed) = delete_node(&before, &id("3")).unwrap();
        assert_eq!(removed, 4);
        assert_eq!(subtree, removed);
        assert_eq!(next.len(), before.len() - removed);
        for gone in ["3", "4", "5", "6"] {
            assert!(!next.contains(&id(gone)));
        }
        assert!(next.contains(&id("7")));
    }

    #[test]
    fn delete_file_removes_only_it() {
        let (next, removed) = delete_node(&store(), &id("7")).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(next.len(), 6);
    }

    #[test]
    fn delete_unknown_node_fails() {
        assert_eq!(
            delete_node(&store(), &id("42")).unwrap_err(),
            EditError::NodeNotFound(id("42"))
        );
    }

    #[test]
    fn duplicate_names_keep_extension() {
        let never = |_: &str| false;
        assert_eq!(duplicate_name("a.json", false, never), "a_copy.json");
        assert_eq!(duplicate_name("load.mcfunction", false, never), "load_copy.mcfunction");
        assert_eq!(duplicate_name("readme", false, never), "readme_copy");
        assert_eq!(duplicate_name("v1.2", true, never), "v1.2_copy");
        assert_eq!(duplicate_name(".hidden", false, never), ".hidden_copy");
        let taken = |name: &str| name == "a_copy.json" || name == "a_copy2.json";
        assert_eq!(duplicate_name("a.json", false, taken), "a_copy3.json");
    }

    #[test]
    fn duplicate_file_copies_content() {
        let (next, copy) = duplicate_node(&store(), &id("4")).unwrap();
        let node = next.get(&copy).unwrap();
        assert_eq!(node.name, "load_copy.mcfunction");
        assert_eq!(node.content.as_deref(), Some("say hi"));
        assert_eq!(node.kind, NodeKind::Mcfunction);
        assert_eq!(node.parent_id, Some(id("3")));
        assert_ne!(copy, id("4"));
    }

    #[test]
    fn duplicate_folder_is_shallow() {
        let (next, copy) = duplicate_node(&store(), &id("3")).unwrap();
        assert_eq!(next.get(&copy).unwrap().name, "function_copy");
        assert!(next.children_of(Some(&copy)).is_empty());
        assert_eq!(next.len(), store().len() + 1);
    }

    #[test]
    fn set_content_only_on_text_files() {
        let next = set_content(&store(), &id("7"), "{\"a\":1}").unwrap();
        assert_eq!(next.get(&id("7")).unwrap().content.as_deref(), Some("{\"a\":1}"));
        assert!(matches!(
            set_content(&store(), &id("3"), "x"),
            Err(EditError::NotEditable(_))
        ));

        let (with_png, png) =
            create_node(&store(), Some(&id("2")), "icon.png", NewNode::File).unwrap();
        assert!(matches!(
            set_content(&with_png, &png, "x"),
            Err(EditError::NotEditable(_))
        ));
    }

    #[test]
    fn move_reparents_node() {
        let next = move_node(&store(), &id("7"), Some(&id("5"))).unwrap();
        assert_eq!(next.resolve_path(&id("7")), "data/demo/function/nested/a.json");
        let to_root = move_node(&store(), &id("7"), None).unwrap();
        assert_eq!(to_root.resolve_path(&id("7")), "a.json");
    }

    #[test]
    fn move_into_own_subtree_is_refused() {
        assert!(matches!(
            move_node(&store(), &id("3"), Some(&id("5"))),
            Err(EditError::WouldCycle(_))
        ));
        assert!(matches!(
            move_node(&store(), &id("3"), Some(&id("3"))),
            Err(EditError::WouldCycle(_))
        ));
    }

    #[test]
    fn template_into_category_named_parent_adds_no_folder() {
        let before = store();
        let (next, new_id) =
            instantiate_template(&before, &id("3"), &["function"], "tick.mcfunction", "say tick")
                .unwrap();
        assert_eq!(next.len(), before.len() + 1);
        assert_eq!(next.get(&new_id).unwrap().parent_id, Some(id("3")));
        assert_eq!(next.resolve_path(&new_id), "data/demo/function/tick.mcfunction");
    }

    #[test]
    fn template_reuses_existing_category_folder() {
        let before = store();
        let (next, new_id) =
            instantiate_template(&before, &id("2"), &["function"], "tick.mcfunction", "say tick")
                .unwrap();
        assert_eq!(next.len(), before.len() + 1);
        assert_eq!(next.get(&new_id).unwrap().parent_id, Some(id("3")));
    }

    #[test]
    fn matching_child_folder_wins_over_parent_name() {
        let before = NodeStore::from_nodes([
            folder("1", "function", None),
            folder("2", "function", Some("1")),
        ]);
        let (next, new_id) =
            instantiate_template(&before, &id("1"), &["function"], "a.mcfunction", "").unwrap();
        assert_eq!(next.len(), 3);
        assert_eq!(next.get(&new_id).unwrap().parent_id, Some(id("2")));
        assert_eq!(next.resolve_path(&new_id), "function/function/a.mcfunction");
    }

    #[test]
    fn template_creates_exactly_one_category_folder() {
        let before = store();
        let (next, new_id) =
            instantiate_template(&before, &id("2"), &["recipe"], "stick.json", "{}").unwrap();
        assert_eq!(next.len(), before.len() + 2);
        assert_eq!(next.resolve_path(&new_id), "data/demo/recipe/stick.json");
        let folders: Vec<&Node> = next
            .children_of(Some(&id("2")))
            .into_iter()
            .filter(|child| child.name == "recipe")
            .collect();
        assert_eq!(folders.len(), 1);
        assert_eq!(next.get(&new_id).unwrap().content.as_deref(), Some("{}"));
    }

    #[test]
    fn nested_category_creates_each_level() {
        let before = store();
        let chain = ["tags", "function"];
        let (next, tag) =
            instantiate_template(&before, &id("2"), &chain, "load.json", "{}").unwrap();
        assert_eq!(next.len(), before.len() + 3);
        assert_eq!(next.resolve_path(&tag), "data/demo/tags/function/load.json");

        let (next, tick) =
            instantiate_template(&next, &id("2"), &chain, "tick.json", "{}").unwrap();
        assert_eq!(next.resolve_path(&tick), "data/demo/tags/function/tick.json");
        assert_eq!(next.len(), before.len() + 4);

        let inner = next.get(&tick).unwrap().parent_id.clone().unwrap();
        let (next, third) =
            instantiate_template(&next, &inner, &chain, "third.json", "{}").unwrap();
        assert_eq!(next.resolve_path(&third), "data/demo/tags/function/third.json");
    }

    #[test]
    fn template_rejects_file_parent() {
        let result = instantiate_template(&store(), &id("7"), &["recipe"], "stick.json", "{}");
        assert!(matches!(result, Err(EditError::NotAFolder(_))));
    }
}
