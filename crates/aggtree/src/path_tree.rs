//! The set of expanded ("open") nodes of a pivot tree.
//!
//! A path is a sequence of nullable group values, one per pivot column. Opening a path opens all
//! of its prefixes, so the set is always prefix-closed. Children are keyed by an encoding that
//! keeps `None` distinct from every string (including the empty string) and orders it first.

use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

pub type PathComponent = Option<String>;
pub type Path = Vec<PathComponent>;

const NULL_KEY: &str = "0";
const STRING_PREFIX: char = '1';

fn encode(component: &PathComponent) -> String {
    match component {
        None => NULL_KEY.to_string(),
        Some(s) => {
            let mut key = String::with_capacity(s.len() + 1);
            key.push(STRING_PREFIX);
            key.push_str(s);
            key
        }
    }
}

fn decode(key: &str) -> PathComponent {
    key.strip_prefix(STRING_PREFIX).map(str::to_string)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Node {
    children: BTreeMap<String, Node>,
}

impl Node {
    fn count(&self) -> usize {
        self.children.values().map(|c| 1 + c.count()).sum()
    }

    fn trim(&mut self, depth: usize) {
        if depth == 0 {
            self.children.clear();
        } else {
            for child in self.children.values_mut() {
                child.trim(depth - 1);
            }
        }
    }
}

/// Immutable, prefix-closed set of open paths. Every operation returns a new tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Path>", into = "Vec<Path>")]
pub struct PathTree {
    root: Node,
}

impl PathTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[PathComponent]>,
    {
        let mut tree = Self::new();
        for path in paths {
            tree.insert(path.as_ref());
        }
        tree
    }

    fn insert(&mut self, path: &[PathComponent]) {
        let mut node = &mut self.root;
        for component in path {
            node = node.children.entry(encode(component)).or_default();
        }
    }

    /// Tree with `path` and all of its prefixes open.
    pub fn open(&self, path: &[PathComponent]) -> Self {
        let mut tree = self.clone();
        tree.insert(path);
        tree
    }

    /// Tree without `path` or anything below it. Closing the empty path closes everything.
    pub fn close(&self, path: &[PathComponent]) -> Self {
        let mut tree = self.clone();
        let Some((last, parents)) = path.split_last() else {
            return Self::new();
        };
        let mut node = &mut tree.root;
        for component in parents {
            match node.children.get_mut(&encode(component)) {
                Some(child) => node = child,
                None => return tree,
            }
        }
        node.children.remove(&encode(last));
        tree
    }

    pub fn is_open(&self, path: &[PathComponent]) -> bool {
        let mut node = &self.root;
        for component in path {
            match node.children.get(&encode(component)) {
                Some(child) => node = child,
                None => return false,
            }
        }
        true
    }

    /// Tree keeping only the paths of length `<= depth`.
    pub fn trim_to_depth(&self, depth: usize) -> Self {
        let mut tree = self.clone();
        tree.root.trim(depth);
        tree
    }

    /// Number of open paths.
    pub fn len(&self) -> usize {
        self.root.count()
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Pre-order walk of every open path; a path is always yielded before its extensions.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: vec![self.root.children.iter()],
            prefix: Vec::new(),
        }
    }
}

impl From<Vec<Path>> for PathTree {
    fn from(paths: Vec<Path>) -> Self {
        Self::from_paths(paths)
    }
}

impl From<PathTree> for Vec<Path> {
    fn from(tree: PathTree) -> Self {
        tree.iter().collect()
    }
}

impl<'a> IntoIterator for &'a PathTree {
    type Item = Path;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

pub struct Iter<'a> {
    stack: Vec<btree_map::Iter<'a, String, Node>>,
    prefix: Vec<&'a str>,
}

impl Iterator for Iter<'_> {
    type Item = Path;

    fn next(&mut self) -> Option<Path> {
        while let Some(children) = self.stack.last_mut() {
            match children.next() {
                Some((key, child)) => {
                    self.prefix.push(key);
                    let path = self.prefix.iter().map(|k| decode(k)).collect();
                    self.stack.push(child.children.iter());
                    return Some(path);
                }
                None => {
                    self.stack.pop();
                    self.prefix.pop();
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn p(parts: &[Option<&str>]) -> Path {
        parts.iter().map(|c| c.map(str::to_string)).collect()
    }

    #[test]
    fn open_implies_prefixes() {
        let tree = PathTree::new().open(&p(&[Some("US"), Some("CA")]));
        assert!(tree.is_open(&p(&[Some("US")])));
        assert!(tree.is_open(&p(&[Some("US"), Some("CA")])));
        assert!(!tree.is_open(&p(&[Some("US"), Some("NY")])));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn close_removes_descendants() {
        let tree = PathTree::new()
            .open(&p(&[Some("US"), Some("CA")]))
            .open(&p(&[Some("MX")]));
        let closed = tree.close(&p(&[Some("US")]));
        assert!(!closed.is_open(&p(&[Some("US")])));
        assert!(!closed.is_open(&p(&[Some("US"), Some("CA")])));
        assert!(closed.is_open(&p(&[Some("MX")])));
        // The original is untouched.
        assert!(tree.is_open(&p(&[Some("US"), Some("CA")])));
        // Closing something that is not open changes nothing.
        assert_eq!(tree.close(&p(&[Some("FR"), Some("Paris")])), tree);
    }

    #[test]
    fn null_empty_and_strings_are_distinct() {
        let tree = PathTree::new()
            .open(&p(&[Some("b")]))
            .open(&p(&[Some("")]))
            .open(&p(&[None]))
            .open(&p(&[Some("0")]));
        let paths: Vec<Path> = tree.iter().collect();
        assert_eq!(
            paths,
            vec![p(&[None]), p(&[Some("")]), p(&[Some("0")]), p(&[Some("b")])]
        );
    }

    #[test]
    fn iteration_is_preorder() {
        let tree = PathTree::from_paths([
            p(&[Some("b"), Some("y")]),
            p(&[Some("a")]),
            p(&[Some("b"), Some("x"), None]),
        ]);
        let paths: Vec<Path> = tree.iter().collect();
        assert_eq!(
            paths,
            vec![
                p(&[Some("a")]),
                p(&[Some("b")]),
                p(&[Some("b"), Some("x")]),
                p(&[Some("b"), Some("x"), None]),
                p(&[Some("b"), Some("y")]),
            ]
        );
        // Restartable.
        assert_eq!(tree.iter().count(), paths.len());
    }

    #[test]
    fn trim_keeps_shallow_paths() {
        let tree = PathTree::from_paths([p(&[Some("a"), Some("b"), Some("c")]), p(&[Some("d")])]);
        let trimmed = tree.trim_to_depth(1);
        assert_eq!(
            trimmed.iter().collect::<Vec<_>>(),
            vec![p(&[Some("a")]), p(&[Some("d")])]
        );
        assert!(tree.trim_to_depth(0).is_empty());
        assert_eq!(tree.trim_to_depth(3), tree);
    }

    #[test]
    fn serializes_as_path_list() {
        let tree = PathTree::new().open(&p(&[Some("US"), None]));
        let json = serde_json::to_string(&tree).unwrap();
        assert_eq!(json, r#"[["US"],["US",null]]"#);
        let back: PathTree = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }

    fn arb_path() -> impl Strategy<Value = Path> {
        prop::collection::vec(prop::option::of("[a-c]{0,2}"), 0..4)
    }

    proptest! {
        #[test]
        fn open_paths_are_prefix_closed(paths in prop::collection::vec(arb_path(), 0..8)) {
            let tree = PathTree::from_paths(&paths);
            for path in &paths {
                for len in 0..=path.len() {
                    prop_assert!(tree.is_open(&path[..len]));
                }
            }
            let listed: Vec<Path> = tree.iter().collect();
            prop_assert_eq!(listed.len(), tree.len());
            for (idx, path) in listed.iter().enumerate() {
                // Every proper prefix was yielded earlier.
                for len in 1..path.len() {
                    prop_assert!(listed[..idx].contains(&path[..len].to_vec()));
                }
            }
        }

        #[test]
        fn close_removes_exactly_the_subtree(
            paths in prop::collection::vec(arb_path(), 1..8),
            pick in any::<prop::sample::Index>(),
        ) {
            let tree = PathTree::from_paths(&paths);
            let target = &paths[pick.index(paths.len())];
            let closed = tree.close(target);
            for path in tree.iter() {
                let below = !target.is_empty() && path.starts_with(target);
                prop_assert_eq!(closed.is_open(&path), !below && !target.is_empty());
            }
        }
    }
}
