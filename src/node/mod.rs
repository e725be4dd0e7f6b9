use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, LazyLock};

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_.-]+$").expect("valid name pattern"));

static NAMESPACE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_-]+$").expect("valid namespace pattern"));

static IDS: LazyLock<IdGenerator> = LazyLock::new(IdGenerator::seeded_from_clock);

/// Returns `true` if `name` is a legal file or folder name inside a pack.
///
/// Names are lowercase ascii letters, digits, `_`, `-` and `.`, and may not
/// contain `..`.
pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name) && !name.contains("..")
}

/// Returns `true` if `namespace` is a legal resource namespace.
pub fn is_valid_namespace(namespace: &str) -> bool {
    NAMESPACE_PATTERN.is_match(namespace)
}

/// Opaque identifier of a node, stable for the node's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Wraps an existing id, for example one read from a snapshot.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out node ids from a counter seeded with the wall clock, so ids issued
/// after a reload never collide with ids persisted by an earlier run.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Creates a generator whose first id is `seed`.
    pub fn starting_at(seed: u64) -> Self {
        Self {
            next: AtomicU64::new(seed),
        }
    }

    /// Creates a generator seeded with the current Unix time in milliseconds.
    pub fn seeded_from_clock() -> Self {
        let millis = Utc::now().timestamp_millis();
        Self::starting_at(u64::try_from(millis).unwrap_or_default())
    }

    /// Returns a fresh id. Safe to call from several threads.
    pub fn next_id(&self) -> NodeId {
        NodeId(self.next.fetch_add(1, AtomicOrdering::Relaxed).to_string())
    }

    /// Moves the counter past `id` if it is numeric.
    pub fn observe(&self, id: &NodeId) {
        if let Ok(n) = id.as_str().parse::<u64>() {
            self.next.fetch_max(n.saturating_add(1), AtomicOrdering::Relaxed);
        }
    }
}

/// Generates a fresh node id, unique for the lifetime of the process.
pub fn create_id() -> NodeId {
    IDS.next_id()
}

/// Makes the process-wide generator skip every id in `ids`.
pub fn observe_ids<'a>(ids: impl IntoIterator<Item = &'a NodeId>) {
    for id in ids {
        IDS.observe(id);
    }
}

/// What a node holds. Decided from the file extension when the node is
/// created and stored from then on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Container with no content of its own.
    Folder,
    /// Structured JSON resource (recipes, tags, advancements, ...).
    Json,
    /// Pack metadata, parsed as JSON.
    Mcmeta,
    /// Command function script.
    Mcfunction,
    /// Binary structure file.
    Nbt,
    /// Binary image.
    Png,
    /// Any other file, edited as plain text.
    Text,
}

impl NodeKind {
    /// Derives the content kind of a file from its extension.
    pub fn from_file_name(name: &str) -> Self {
        let extension = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        match extension {
            "json" => NodeKind::Json,
            "mcmeta" => NodeKind::Mcmeta,
            "mcfunction" => NodeKind::Mcfunction,
            "nbt" => NodeKind::Nbt,
            "png" => NodeKind::Png,
            _ => NodeKind::Text,
        }
    }

    /// Returns `true` for [`NodeKind::Folder`].
    pub fn is_folder(self) -> bool {
        self == NodeKind::Folder
    }

    /// Binary kinds carry no editable text.
    pub fn is_binary(self) -> bool {
        matches!(self, NodeKind::Nbt | NodeKind::Png)
    }

    /// Kinds whose content must parse as JSON.
    pub fn is_structured(self) -> bool {
        matches!(self, NodeKind::Json | NodeKind::Mcmeta)
    }

    /// Content given to a freshly created node of this kind.
    pub fn initial_content(self, name: &str) -> Option<String> {
        match self {
            NodeKind::Folder | NodeKind::Nbt | NodeKind::Png => None,
            NodeKind::Json | NodeKind::Mcmeta => Some("{\n}\n".to_string()),
            NodeKind::Mcfunction => {
                let stem = name.strip_suffix(".mcfunction").unwrap_or(name);
                Some(format!("# {stem}\n"))
            }
            NodeKind::Text => Some(String::new()),
        }
    }
}

/// Primary collation weight of a character. Punctuation sorts before
/// digits, digits before letters, and letters ignore case.
fn collation_weight(c: char) -> u32 {
    match c {
        '_' => 0,
        '-' => 1,
        '.' => 2,
        '0'..='9' => 10 + (c as u32 - '0' as u32),
        'a'..='z' => 20 + (c as u32 - 'a' as u32),
        'A'..='Z' => 20 + (c as u32 - 'A' as u32),
        other => 100 + other as u32,
    }
}

/// Compares two names the way a user-facing file list does: `_`, `-` and
/// `.` before digits, digits before letters, letters without regard to case.
/// Names equal under that order fall back to byte order.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.chars()
        .map(collation_weight)
        .cmp(b.chars().map(collation_weight))
        .then_with(|| a.cmp(b))
}

fn sort_siblings(nodes: &mut [&Node]) {
    nodes.sort_by(|a, b| {
        b.is_folder()
            .cmp(&a.is_folder())
            .then_with(|| compare_names(&a.name, &b.name))
    });
}

/// A file or folder entry of the virtual tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique id, never reused while the node exists.
    pub id: NodeId,
    /// Single path segment, without slashes.
    pub name: String,
    /// Content kind, stored as `type` in snapshots.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Text content. `None` for folders and binary files without data.
    pub content: Option<String>,
    /// Containing folder, or `None` for a top-level node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
}

impl Node {
    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }
}

/// Flat arena of nodes keyed by id. The tree is implicit in `parent_id`.
///
/// A store is an immutable snapshot: operations in [`crate::edit`] build a
/// new store and leave the old one untouched. Nodes are shared between
/// snapshots through `Arc`, so cloning a store does not copy node payloads.
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    order: Vec<NodeId>,
    nodes: HashMap<NodeId, Arc<Node>>,
}

impl NodeStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from the array form used by snapshots. When an id
    /// appears twice the later record wins but keeps the first position.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut store = Self::new();
        for node in nodes {
            store.put(node);
        }
        store
    }

    /// Array form of the store, in insertion order.
    pub fn to_vec(&self) -> Vec<Node> {
        self.iter().cloned().collect()
    }

    /// Number of nodes in the store.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the store holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Looks up a node by id.
    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id).map(Arc::as_ref)
    }

    /// Returns `true` if a node with `id` exists.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// All ids, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.order.iter()
    }

    /// All nodes, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.order
            .iter()
            .filter_map(|id| self.nodes.get(id).map(Arc::as_ref))
    }

    /// Full slash-separated path of a node, root segment first.
    ///
    /// Returns an empty string if `id` is unknown or if the parent chain
    /// loops back on itself. A parent reference to a missing node ends the
    /// walk as if the node were a root.
    pub fn resolve_path(&self, id: &NodeId) -> String {
        let mut segments = Vec::new();
        let mut visited = HashSet::new();
        let mut current = match self.get(id) {
            Some(node) => node,
            None => return String::new(),
        };
        loop {
            if !visited.insert(&current.id) {
                return String::new();
            }
            segments.push(current.name.as_str());
            match current.parent_id.as_ref().and_then(|parent| self.get(parent)) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        segments.reverse();
        segments.join("/")
    }

    /// Direct children of `parent` (parentless nodes when `None`): folders
    /// first, then by [`compare_names`].
    pub fn children_of(&self, parent: Option<&NodeId>) -> Vec<&Node> {
        let mut children: Vec<&Node> = self
            .iter()
            .filter(|node| node.parent_id.as_ref() == parent)
            .collect();
        sort_siblings(&mut children);
        children
    }

    /// Top-level nodes: those without a parent, and those whose parent is
    /// missing from the store. Ordered like [`NodeStore::children_of`].
    pub fn roots(&self) -> Vec<&Node> {
        let mut roots: Vec<&Node> = self
            .iter()
            .filter(|node| match &node.parent_id {
                Some(parent) => !self.contains(parent),
                None => true,
            })
            .collect();
        sort_siblings(&mut roots);
        roots
    }

    /// First node in store order whose resolved path equals `path`.
    pub fn find_by_path(&self, path: &str) -> Option<&NodeId> {
        let wanted = path.trim_matches('/');
        if wanted.is_empty() {
            return None;
        }
        self.ids().find(|id| self.resolve_path(id) == wanted)
    }

    /// Ids of `id` and every node below it.
    pub fn subtree_ids(&self, id: &NodeId) -> HashSet<NodeId> {
        let mut collected = HashSet::new();
        if !self.contains(id) {
            return collected;
        }
        collected.insert(id.clone());
        let mut frontier = vec![id.clone()];
        while !frontier.is_empty() {
            let next: Vec<NodeId> = self
                .iter()
                .filter(|node| {
                    node.parent_id
                        .as_ref()
                        .is_some_and(|parent| frontier.contains(parent))
                })
                .filter(|node| !collected.contains(&node.id))
                .map(|node| node.id.clone())
                .collect();
            collected.extend(next.iter().cloned());
            frontier = next;
        }
        collected
    }

    pub(crate) fn with_node(&self, node: Node) -> Self {
        let mut store = self.clone();
        store.put(node);
        store
    }

    pub(crate) fn without(&self, ids: &HashSet<NodeId>) -> Self {
        Self {
            order: self
                .order
                .iter()
                .filter(|id| !ids.contains(*id))
                .cloned()
                .collect(),
            nodes: self
                .nodes
                .iter()
                .filter(|(id, _)| !ids.contains(*id))
                .map(|(id, node)| (id.clone(), Arc::clone(node)))
                .collect(),
        }
    }

    fn put(&mut self, node: Node) {
        if !self.nodes.contains_key(&node.id) {
            self.order.push(node.id.clone());
        }
        self.nodes.insert(node.id.clone(), Arc::new(node));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn folder(id: &str, name: &str, parent: Option<&str>) -> Node {
        Node {
            id: NodeId::new(id),
            name: name.to_string(),
            kind: NodeKind::Folder,
            content: None,
            parent_id: parent.map(NodeId::new),
        }
    }

    pub(crate) fn file(id: &str, name: &str, parent: Option<&str>, content: &str) -> Node {
        Node {
            id: NodeId::new(id),
            name: name.to_string(),
            kind: NodeKind::from_file_name(name),
            content: Some(content.to_string()),
            parent_id: parent.map(NodeId::new),
        }
    }

    fn sample_store() -> NodeStore {
        NodeStore::from_nodes([
            folder("1", "data", None),
            folder("2", "demo", Some("1")),
            folder("3", "function", Some("2")),
            file("4", "load.mcfunction", Some("3"), "say hi"),
            file("5", "a_file.json", Some("2"), "{}"),
            folder("6", "z_folder", Some("2")),
        ])
    }

    #[test]
    fn accepts_valid_names() {
        assert!(is_valid_name("load.mcfunction"));
        assert!(is_valid_name("my-folder_2"));
        assert!(is_valid_name(".hidden"));
    }

    #[test]
    fn rejects_invalid_names() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("Upper.json"));
        assert!(!is_valid_name("with space"));
        assert!(!is_valid_name("a/b"));
        assert!(!is_valid_name("a..json"));
        assert!(!is_valid_name(".."));
    }

    #[test]
    fn namespace_grammar_excludes_dots() {
        assert!(is_valid_namespace("my_pack-1"));
        assert!(!is_valid_namespace("my.pack"));
        assert!(!is_valid_namespace(""));
        assert!(!is_valid_namespace("Pack"));
    }

    #[test]
    fn kind_follows_extension() {
        assert_eq!(NodeKind::from_file_name("a.json"), NodeKind::Json);
        assert_eq!(NodeKind::from_file_name("pack.mcmeta"), NodeKind::Mcmeta);
        assert_eq!(NodeKind::from_file_name("tick.mcfunction"), NodeKind::Mcfunction);
        assert_eq!(NodeKind::from_file_name("house.nbt"), NodeKind::Nbt);
        assert_eq!(NodeKind::from_file_name("icon.png"), NodeKind::Png);
        assert_eq!(NodeKind::from_file_name("readme"), NodeKind::Text);
        assert_eq!(NodeKind::from_file_name("notes.txt"), NodeKind::Text);
    }

    #[test]
    fn initial_content_per_kind() {
        assert_eq!(NodeKind::Folder.initial_content("x"), None);
        assert_eq!(NodeKind::Png.initial_content("x.png"), None);
        assert_eq!(NodeKind::Nbt.initial_content("x.nbt"), None);
        assert_eq!(NodeKind::Text.initial_content("x.txt"), Some(String::new()));
        let json = NodeKind::Json.initial_content("x.json").unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&json).unwrap().is_object());
        let function = NodeKind::Mcfunction.initial_content("tick.mcfunction").unwrap();
        assert!(function.starts_with('#'));
        assert!(function.contains("tick"));
    }

    #[test]
    fn generator_never_repeats_and_skips_observed_ids() {
        let ids = IdGenerator::starting_at(10);
        let first = ids.next_id();
        let second = ids.next_id();
        assert_ne!(first, second);
        ids.observe(&NodeId::new("500"));
        ids.observe(&NodeId::new("not-a-number"));
        assert_eq!(ids.next_id(), NodeId::new("501"));
        ids.observe(&NodeId::new("20"));
        assert_eq!(ids.next_id(), NodeId::new("502"));
    }

    #[test]
    fn create_id_is_unique() {
        let ids: HashSet<NodeId> = (0..100).map(|_| create_id()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn resolves_path_from_root() {
        let store = sample_store();
        assert_eq!(store.resolve_path(&NodeId::new("1")), "data");
        assert_eq!(
            store.resolve_path(&NodeId::new("4")),
            "data/demo/function/load.mcfunction"
        );
    }

    #[test]
    fn path_is_parent_path_plus_name() {
        let store = sample_store();
        for node in store.iter() {
            let path = store.resolve_path(&node.id);
            match &node.parent_id {
                Some(parent) => {
                    assert_eq!(path, format!("{}/{}", store.resolve_path(parent), node.name))
                }
                None => assert_eq!(path, node.name),
            }
        }
    }

    #[test]
    fn unknown_id_resolves_to_empty_path() {
        assert_eq!(sample_store().resolve_path(&NodeId::new("missing")), "");
    }

    #[test]
    fn cyclic_parents_resolve_to_empty_path() {
        let store = NodeStore::from_nodes([
            folder("a", "a", Some("c")),
            folder("b", "b", Some("a")),
            folder("c", "c", Some("b")),
        ]);
        assert_eq!(store.resolve_path(&NodeId::new("a")), "");
        assert_eq!(store.resolve_path(&NodeId::new("b")), "");

        let self_loop = NodeStore::from_nodes([folder("x", "x", Some("x"))]);
        assert_eq!(self_loop.resolve_path(&NodeId::new("x")), "");
    }

    #[test]
    fn dangling_parent_ends_walk() {
        let store = NodeStore::from_nodes([file("1", "a.json", Some("gone"), "{}")]);
        assert_eq!(store.resolve_path(&NodeId::new("1")), "a.json");
    }

    #[test]
    fn children_put_folders_first() {
        let store = sample_store();
        let names: Vec<&str> = store
            .children_of(Some(&NodeId::new("2")))
            .iter()
            .map(|node| node.name.as_str())
            .collect();
        assert_eq!(names, vec!["function", "z_folder", "a_file.json"]);
    }

    #[test]
    fn children_ordering_is_stable() {
        let store = sample_store();
        let first: Vec<NodeId> = store
            .children_of(Some(&NodeId::new("2")))
            .iter()
            .map(|node| node.id.clone())
            .collect();
        let second: Vec<NodeId> = store
            .children_of(Some(&NodeId::new("2")))
            .iter()
            .map(|node| node.id.clone())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn punctuation_sorts_before_digits_and_letters() {
        let store = NodeStore::from_nodes([
            file("1", "load_extra.mcfunction", None, ""),
            file("2", "load.mcfunction", None, ""),
            file("3", "a1.json", None, "{}"),
            file("4", "a_b.json", None, "{}"),
            file("5", "a-b.json", None, "{}"),
        ]);
        let names: Vec<&str> = store
            .children_of(None)
            .iter()
            .map(|node| node.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "a_b.json",
                "a-b.json",
                "a1.json",
                "load_extra.mcfunction",
                "load.mcfunction",
            ]
        );
    }

    #[test]
    fn name_comparison() {
        assert_eq!(compare_names("load.mcfunction", "load_extra.mcfunction"), Ordering::Greater);
        assert_eq!(compare_names("a", "ab"), Ordering::Less);
        assert_eq!(compare_names("z9", "za"), Ordering::Less);
        assert_eq!(compare_names("same", "same"), Ordering::Equal);
    }

    #[test]
    fn dangling_parents_count_as_roots() {
        let store = NodeStore::from_nodes([
            folder("1", "data", None),
            file("2", "lost.json", Some("gone"), "{}"),
            file("3", "inner.json", Some("1"), "{}"),
        ]);
        let names: Vec<&str> = store.roots().iter().map(|node| node.name.as_str()).collect();
        assert_eq!(names, vec!["data", "lost.json"]);
        assert_eq!(store.children_of(None).len(), 1);
    }

    #[test]
    fn roots_are_children_of_none() {
        let store = sample_store();
        let roots = store.children_of(None);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].name, "data");
    }

    #[test]
    fn finds_node_by_path() {
        let store = sample_store();
        assert_eq!(
            store.find_by_path("data/demo/a_file.json"),
            Some(&NodeId::new("5"))
        );
        assert_eq!(store.find_by_path("/data/demo/"), Some(&NodeId::new("2")));
        assert_eq!(store.find_by_path("data/nope"), None);
        assert_eq!(store.find_by_path(""), None);
    }

    #[test]
    fn subtree_covers_all_descendants() {
        let store = sample_store();
        let subtree = store.subtree_ids(&NodeId::new("2"));
        assert_eq!(subtree.len(), 5);
        assert!(!subtree.contains(&NodeId::new("1")));
    }

    #[test]
    fn array_form_keeps_order() {
        let store = sample_store();
        let ids: Vec<String> = store.to_vec().into_iter().map(|n| n.id.0).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6"]);
    }

    #[test]
    fn serializes_with_snapshot_field_names() {
        let node = file("7", "a.json", Some("1"), "{}");
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "json");
        assert_eq!(value["parentId"], "1");
        let root = serde_json::to_value(folder("1", "data", None)).unwrap();
        assert!(root.get("parentId").is_none());
        assert!(root["content"].is_null());

        let parsed: Node = serde_json::from_str(
            r#"{"id":"9","name":"x","type":"folder","content":null,"parentId":null}"#,
        )
        .unwrap();
        assert_eq!(parsed.parent_id, None);
    }
}
