//! Logical tree of merged pre-walk targets.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Component, MAIN_SEPARATOR_STR, Path, PathBuf};

use compact_str::CompactString;

use crate::error::ScanError;
use crate::node::{LazyMetadata, compare_names};

/// Targets merged under their common ancestors.
///
/// A `Leaf` is one concrete target whose real filesystem subtree gets walked.
/// A `Node` only groups sub-targets sharing a path prefix; it is never stat'ed
/// itself.
#[derive(Debug, Clone)]
pub enum TargetTree<M> {
    /// A single target, not yet resolved.
    Leaf(M),
    /// Named sub-targets. Keys are path components.
    Node(BTreeMap<CompactString, TargetTree<M>>),
}

impl<M> Default for TargetTree<M> {
    fn default() -> Self {
        Self::Node(BTreeMap::new())
    }
}

impl<M> TargetTree<M> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if this is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, TargetTree::Leaf(_))
    }

    /// Child names of a node in walk order. Empty for leaves.
    pub fn node_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = match self {
            TargetTree::Leaf(_) => Vec::new(),
            TargetTree::Node(children) => children.keys().map(CompactString::as_str).collect(),
        };
        names.sort_by(|a, b| compare_names(a, b));
        names
    }

    /// Look up a direct child by name.
    pub fn get(&self, name: &str) -> Option<&TargetTree<M>> {
        match self {
            TargetTree::Leaf(_) => None,
            TargetTree::Node(children) => children.get(name),
        }
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            TargetTree::Leaf(_) => 1,
            TargetTree::Node(children) => children.values().map(TargetTree::leaf_count).sum(),
        }
    }

    fn insert(&mut self, components: &[CompactString], target: M) {
        // An existing leaf already covers everything below it.
        let TargetTree::Node(children) = self else {
            return;
        };
        let Some((first, rest)) = components.split_first() else {
            return;
        };

        if rest.is_empty() {
            children.insert(first.clone(), TargetTree::Leaf(target));
            return;
        }

        children
            .entry(first.clone())
            .or_default()
            .insert(rest, target);
    }
}

impl<M: LazyMetadata> TargetTree<M> {
    /// Merge targets into a logical tree.
    ///
    /// Every target is resolved to its absolute form and normalized
    /// lexically; the leaf holds an entry for the normalized path, which is
    /// the path the walk visits. Targets nested inside another target
    /// collapse into the outer one, and duplicates collapse into a single
    /// leaf.
    pub fn build(targets: impl IntoIterator<Item = M>) -> Result<Self, ScanError> {
        let mut tree = Self::new();

        for target in targets {
            let absolute = target.absolute()?;
            let components = path_components(absolute.path())?;
            if components.is_empty() {
                return Err(ScanError::invalid_target(
                    target.path(),
                    "path has no components",
                ));
            }
            let normalized: PathBuf = components.iter().map(CompactString::as_str).collect();
            tree.insert(&components, absolute.with_path(&normalized));
        }

        Ok(tree)
    }
}

/// Split a path into lexically normalized components.
///
/// The root (and drive prefix, where there is one) forms the first component.
/// `.` is dropped and `..` removes the preceding name. Paths that are not
/// valid UTF-8 are rejected.
pub fn path_components(path: &Path) -> Result<Vec<CompactString>, ScanError> {
    let mut root = String::new();
    let mut names: Vec<CompactString> = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => root.push_str(utf8(path, prefix.as_os_str())?),
            Component::RootDir => root.push_str(MAIN_SEPARATOR_STR),
            Component::CurDir => {}
            Component::ParentDir => {
                names.pop();
            }
            Component::Normal(name) => names.push(CompactString::new(utf8(path, name)?)),
        }
    }

    if root.is_empty() {
        Ok(names)
    } else {
        Ok(std::iter::once(CompactString::from(root)).chain(names).collect())
    }
}

fn utf8<'a>(path: &Path, part: &'a OsStr) -> Result<&'a str, ScanError> {
    part.to_str()
        .ok_or_else(|| ScanError::invalid_target(path, "path is not valid UTF-8"))
}
