use std::{collections::BTreeMap, sync::Arc};

use log::warn;
use once_cell::sync::OnceCell;

use crate::class::ClassDescription;

/// Lazily decoded class. Unset until first requested; `Some(None)` records a class that
/// failed to decode so it is not retried.
pub type ClassSlot = Arc<OnceCell<Option<Arc<ClassDescription>>>>;

#[derive(Debug, Clone)]
pub enum PackageNode {
    Package(BTreeMap<String, PackageNode>),
    Class(ClassSlot),
}

impl PackageNode {
    pub fn is_package(&self) -> bool {
        matches!(self, PackageNode::Package(_))
    }

    /// The decoded class, if this is a class leaf that has already been requested.
    pub fn loaded(&self) -> Option<&Arc<ClassDescription>> {
        match self {
            PackageNode::Class(slot) => slot.get().and_then(Option::as_ref),
            PackageNode::Package(_) => None,
        }
    }
}

/// Package segments folded into nested ordered maps, with class slots at the leaves.
#[derive(Debug, Clone, Default)]
pub struct PackageTree {
    root: BTreeMap<String, PackageNode>,
}

impl PackageTree {
    pub(crate) fn insert(&mut self, qualified: &str, slot: ClassSlot) {
        let mut segments: Vec<&str> = qualified.split('.').collect();
        let Some(leaf) = segments.pop() else {
            return;
        };

        let mut level = &mut self.root;
        for segment in segments {
            let node = level
                .entry(segment.to_string())
                .or_insert_with(|| PackageNode::Package(BTreeMap::new()));
            level = match node {
                PackageNode::Package(children) => children,
                PackageNode::Class(_) => {
                    warn!("{qualified}: package segment {segment} clashes with a class");
                    return;
                }
            };
        }
        level
            .entry(leaf.to_string())
            .or_insert(PackageNode::Class(slot));
    }

    pub fn root(&self) -> &BTreeMap<String, PackageNode> {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Node at a dotted path, e.g. `java.util` or `java.util.Map`.
    pub fn get(&self, path: &str) -> Option<&PackageNode> {
        let mut segments = path.split('.');
        let mut node = self.root.get(segments.next()?)?;
        for segment in segments {
            match node {
                PackageNode::Package(children) => node = children.get(segment)?,
                PackageNode::Class(_) => return None,
            }
        }
        Some(node)
    }

    /// Qualified names of every class in the tree, in tree order.
    pub fn class_names(&self) -> Vec<String> {
        fn walk(prefix: &str, level: &BTreeMap<String, PackageNode>, out: &mut Vec<String>) {
            for (segment, node) in level {
                let path = if prefix.is_empty() {
                    segment.clone()
                } else {
                    format!("{prefix}.{segment}")
                };
                match node {
                    PackageNode::Package(children) => walk(&path, children, out),
                    PackageNode::Class(_) => out.push(path),
                }
            }
        }

        let mut out = Vec::new();
        walk("", &self.root, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tree(names: &[&str]) -> PackageTree {
        let mut tree = PackageTree::default();
        for name in names {
            tree.insert(name, ClassSlot::default());
        }
        tree
    }

    #[test]
    fn segments_fold_into_nested_packages() {
        let tree = tree(&["java.util.Map", "java.util.Map$Entry", "java.lang.String", "Top"]);
        assert!(tree.get("java").is_some_and(PackageNode::is_package));
        assert!(tree.get("java.util.Map").is_some_and(|node| !node.is_package()));
        assert!(tree.get("java.util.Map.Entry").is_none());
        assert_eq!(
            tree.class_names(),
            vec!["Top", "java.lang.String", "java.util.Map", "java.util.Map$Entry"]
        );
    }

    #[test]
    fn leaves_start_unresolved() {
        let tree = tree(&["a.B"]);
        let node = tree.get("a.B").unwrap();
        assert!(node.loaded().is_none());
        let PackageNode::Class(slot) = node else {
            panic!("expected a class leaf");
        };
        assert!(slot.get().is_none());
    }

    #[test]
    fn class_shadowing_a_package_is_kept() {
        let tree = tree(&["a.b", "a.b.C"]);
        assert_eq!(tree.class_names(), vec!["a.b"]);
    }
}
