use std::collections::HashSet;
use std::fmt::Write;

use crate::node::{Node, NodeId, NodeStore};

/// Draws the tree as text, one node per line, folders suffixed with `/`.
///
/// Starts from [`NodeStore::roots`], so nodes whose parent is missing show at
/// the top level, where the exporter also puts them. Siblings appear in
/// [`NodeStore::children_of`] order.
pub fn render_tree(store: &NodeStore) -> String {
    let mut out = String::new();
    let mut visited = HashSet::new();
    render_level(store, store.roots(), "", &mut visited, &mut out);
    out
}

fn render_level<'a>(
    store: &'a NodeStore,
    children: Vec<&'a Node>,
    prefix: &str,
    visited: &mut HashSet<&'a NodeId>,
    out: &mut String,
) {
    let last = children.len().saturating_sub(1);
    for (index, node) in children.into_iter().enumerate() {
        if !visited.insert(&node.id) {
            continue;
        }
        let (branch, indent) = if index == last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        let suffix = if node.is_folder() { "/" } else { "" };
        let _ = writeln!(out, "{prefix}{branch}{}{suffix}", node.name);
        if node.is_folder() {
            let nested = store.children_of(Some(&node.id));
            render_level(store, nested, &format!("{prefix}{indent}"), visited, out);
        }
    }
}
