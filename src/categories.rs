//! Category hierarchy reconstruction for the MMEX `CATEGORY_V1` table.
//!
//! MMEX stores categories as a flat `(id, name, parent_id)` table. Paths are
//! the colon-joined names from a root down to a node, e.g. `Food:Groceries`.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::models::MmexCategory;

pub const SEPARATOR: char = ':';

pub struct CategoryTree {
    nodes: HashMap<i64, MmexCategory>,
    roots: Vec<i64>,
    children: HashMap<i64, Vec<i64>>,
    by_path: HashMap<String, i64>,
}

impl CategoryTree {
    pub fn new(rows: Vec<MmexCategory>) -> Self {
        let mut nodes = HashMap::new();
        let mut roots = Vec::new();
        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();

        for row in rows {
            if nodes.contains_key(&row.id) {
                log::warn!("duplicate category id {} ({}); keeping first", row.id, row.name);
                continue;
            }
            match row.parent_id {
                None => roots.push(row.id),
                Some(parent) => children.entry(parent).or_default().push(row.id),
            }
            nodes.insert(row.id, row);
        }

        let mut tree = Self {
            nodes,
            roots,
            children,
            by_path: HashMap::new(),
        };

        let mut ids: Vec<i64> = tree.nodes.keys().copied().collect();
        ids.sort_unstable();
        let mut by_path = HashMap::new();
        for id in ids {
            if let Some(path) = tree.full_path(id) {
                by_path.entry(path).or_insert(id);
            }
        }
        tree.by_path = by_path;
        tree
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Every path reachable from a root, sorted and deduplicated.
    pub fn paths(&self) -> Vec<String> {
        let mut out = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut stack: Vec<(i64, String)> = Vec::new();

        for &root in &self.roots {
            stack.push((root, self.nodes[&root].name.clone()));
            while let Some((id, path)) = stack.pop() {
                if !visited.insert(id) {
                    continue;
                }
                if let Some(kids) = self.children.get(&id) {
                    for kid in kids.iter().rev() {
                        if let Some(node) = self.nodes.get(kid) {
                            stack.push((*kid, format!("{path}{SEPARATOR}{}", node.name)));
                        }
                    }
                }
                out.insert(path);
            }
        }

        let unreachable = self.nodes.len() - visited.len();
        if unreachable > 0 {
            log::warn!("{unreachable} categories are not reachable from any root");
        }
        out.into_iter().collect()
    }

    /// Walk parent links up to a root. `None` when a parent is missing or the
    /// walk revisits a node.
    pub fn full_path(&self, id: i64) -> Option<String> {
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.nodes.get(&id)?;
        loop {
            if !seen.insert(current.id) {
                log::warn!("category {id} has a cyclic parent chain");
                return None;
            }
            names.push(current.name.as_str());
            match current.parent_id {
                None => break,
                Some(parent) => match self.nodes.get(&parent) {
                    Some(node) => current = node,
                    None => {
                        log::debug!("category {id}: parent {parent} not found");
                        return None;
                    }
                },
            }
        }
        names.reverse();
        Some(names.join(&SEPARATOR.to_string()))
    }

    /// Leaf id for a full path; lowest id wins when paths collide.
    pub fn resolve(&self, path: &str) -> Option<i64> {
        self.by_path.get(path).copied()
    }
}

/// Every non-empty prefix of a colon-delimited path.
pub fn prefixes(category: &str) -> Vec<String> {
    let segments: Vec<&str> = category.split(SEPARATOR).collect();
    (1..=segments.len())
        .map(|n| segments[..n].join(&SEPARATOR.to_string()))
        .filter(|p| !p.is_empty() && !p.ends_with(SEPARATOR))
        .collect()
}

pub fn root_segment(category: &str) -> &str {
    category.split(SEPARATOR).next().unwrap_or(category)
}

pub fn last_segment(category: &str) -> &str {
    category.rsplit(SEPARATOR).next().unwrap_or(category)
}

/// Split on the last separator: `A:B:C` -> (`A:B`, `C`), `A` -> (`A`, ``).
pub fn split_leaf(path: &str) -> (String, String) {
    match path.rsplit_once(SEPARATOR) {
        Some((parent, leaf)) => (parent.to_string(), leaf.to_string()),
        None => (path.to_string(), String::new()),
    }
}
