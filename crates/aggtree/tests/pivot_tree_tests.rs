mod common;

use aggtree::{
    AggTreeError, PathComponent, PathTree, PivotTreeConfig, VPivotTree, DEPTH_COLUMN,
    PIVOT_COLUMN,
};
use common::{payroll, text};
use pretty_assertions::assert_eq;
use reltab::{Connection, Scalar, SortKey, TableRep};

fn path(parts: &[&str]) -> Vec<PathComponent> {
    parts.iter().map(|p| Some(p.to_string())).collect()
}

fn pivots(conn: &common::SqliteConnection, cfg: PivotTreeConfig) -> VPivotTree {
    VPivotTree::from_config(conn.table_query("payroll").unwrap(), &cfg).unwrap()
}

fn by_family_and_title() -> PivotTreeConfig {
    PivotTreeConfig::new(["JobFamily", "Title"]).with_leaf_column("Name")
}

fn pivot_values(rows: &TableRep) -> Vec<Scalar> {
    rows.column(PIVOT_COLUMN)
        .unwrap()
        .into_iter()
        .cloned()
        .collect()
}

#[test]
fn leaf_rows_carry_depth_and_leaf_value() {
    let conn = payroll();
    let tree = pivots(&conn, by_family_and_title());
    let q = tree.apply_path(&path(&["Engineering", "Engineer"])).unwrap();
    let rows = conn.eval_query(&q, None, None).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows
        .column(DEPTH_COLUMN)
        .unwrap()
        .iter()
        .all(|d| **d == Scalar::Int(3)));
    let mut names = pivot_values(&rows);
    names.sort_by_key(|v| v.to_string());
    assert_eq!(names, [text("Ada"), text("Brook")]);

    let no_leaf = pivots(&conn, PivotTreeConfig::new(["JobFamily", "Title"]));
    let q = no_leaf.apply_path(&path(&["Engineering", "Engineer"])).unwrap();
    let rows = conn.eval_query(&q, None, None).unwrap();
    assert_eq!(pivot_values(&rows), [text(""), text("")]);
}

#[test]
fn paths_longer_than_pivots_are_rejected() {
    let conn = payroll();
    let tree = pivots(&conn, by_family_and_title());
    let err = tree
        .apply_path(&path(&["Engineering", "Engineer", "Ada"]))
        .unwrap_err();
    assert!(matches!(
        err,
        AggTreeError::InvalidPath {
            path_len: 3,
            pivot_len: 2
        }
    ));

    let stale = PathTree::new().open(&path(&["Engineering", "Engineer", "Ada"]));
    assert!(tree.get_tree_query(&stale).is_err());
    assert!(tree.get_tree_query(&stale.trim_to_depth(2)).is_ok());
}

#[test]
fn interior_rows_aggregate_their_subtree() {
    let conn = payroll();
    let tree = pivots(&conn, by_family_and_title().with_root(true));
    let rows = conn
        .eval_query(&tree.get_tree_query(&PathTree::new()).unwrap(), None, None)
        .unwrap();
    // Root plus the four job families, one of them NULL.
    assert_eq!(rows.len(), 5);
    let total: f64 = rows
        .rows
        .iter()
        .zip(rows.column("TCOE").unwrap())
        .filter(|(row, _)| row[0] == Scalar::Int(1))
        .filter_map(|(_, tcoe)| tcoe.as_f64())
        .sum();
    assert_eq!(total, 1_000_000.0);

    let root = conn
        .eval_query(tree.root_query().unwrap(), None, None)
        .unwrap();
    assert_eq!(root.get(0, "TCOE"), Some(&Scalar::Real(1_000_000.0)));
    assert_eq!(root.get(0, DEPTH_COLUMN), Some(&Scalar::Int(0)));
}

fn open_engineering() -> PathTree {
    PathTree::new()
        .open(&path(&["Engineering", "Engineer"]))
        .open(&[None])
}

#[test]
fn sorted_tree_descending_key() {
    let conn = payroll();
    let tree = pivots(
        &conn,
        by_family_and_title().with_sort_key(vec![SortKey::desc("TCOE")]),
    );
    let q = tree.get_sorted_tree_query(&open_engineering()).unwrap();
    let rows = conn.eval_query(&q, None, None).unwrap();
    assert_eq!(
        pivot_values(&rows),
        [
            text("Engineering"),
            text("Engineer"),
            text("Ada"),
            text("Brook"),
            text("Manager"),
            text("Operations"),
            text("Finance"),
            Scalar::Null,
            text("Intern"),
        ]
    );
}

#[test]
fn sorted_tree_ascending_key_with_root() {
    let conn = payroll();
    let tree = pivots(
        &conn,
        by_family_and_title()
            .with_root(true)
            .with_sort_key(vec![SortKey::asc("TCOE")]),
    );
    let q = tree.get_sorted_tree_query(&open_engineering()).unwrap();
    let rows = conn.eval_query(&q, None, None).unwrap();
    assert_eq!(
        pivot_values(&rows),
        [
            Scalar::Null,
            Scalar::Null,
            text("Intern"),
            text("Finance"),
            text("Operations"),
            text("Engineering"),
            text("Manager"),
            text("Engineer"),
            text("Brook"),
            text("Ada"),
        ]
    );
    assert_eq!(rows.get(0, DEPTH_COLUMN), Some(&Scalar::Int(0)));
    assert_eq!(rows.get(1, DEPTH_COLUMN), Some(&Scalar::Int(1)));
}

/// Node path of a result row: `_path0 .. _path{depth-1}`, plus a marker for leaf rows.
fn node_path(rows: &TableRep, idx: usize, pivot_count: usize) -> Vec<Scalar> {
    let depth = match rows.get(idx, DEPTH_COLUMN) {
        Some(Scalar::Int(d)) => *d as usize,
        other => panic!("bad depth {other:?}"),
    };
    let mut out: Vec<Scalar> = (0..depth.min(pivot_count))
        .map(|i| rows.get(idx, &aggtree::path_column(i)).cloned().unwrap_or(Scalar::Null))
        .collect();
    if depth > pivot_count {
        out.push(rows.get(idx, PIVOT_COLUMN).cloned().unwrap_or(Scalar::Null));
    }
    out
}

#[test]
fn parents_precede_children_under_every_sort_key() {
    let conn = payroll();
    let open = PathTree::from_paths([
        path(&["Engineering", "Engineer"]),
        path(&["Engineering", "Manager"]),
        path(&["Operations", "Train Operator"]),
        vec![None, Some("Intern".to_string())],
    ]);
    let keys = [
        vec![],
        vec![SortKey::asc("TCOE")],
        vec![SortKey::desc("TCOE")],
        vec![SortKey::desc("Name"), SortKey::asc("Base")],
        vec![SortKey::desc("Title")],
    ];
    for sort_key in keys {
        for show_root in [false, true] {
            let tree = pivots(
                &conn,
                by_family_and_title()
                    .with_root(show_root)
                    .with_sort_key(sort_key.clone()),
            );
            let rows = conn
                .eval_query(&tree.get_sorted_tree_query(&open).unwrap(), None, None)
                .unwrap();
            let paths: Vec<Vec<Scalar>> =
                (0..rows.len()).map(|i| node_path(&rows, i, 2)).collect();
            for (i, node) in paths.iter().enumerate() {
                for after in &paths[i + 1..] {
                    let is_ancestor = after.len() < node.len() && node.starts_with(after);
                    assert!(!is_ancestor, "{sort_key:?}: {after:?} sorted after its descendant {node:?}");
                }
                // Every node's parent (other than a hidden root) appears before it.
                if !node.is_empty() && (show_root || node.len() > 1) {
                    let parent = &node[..node.len() - 1];
                    assert!(
                        paths[..i].iter().any(|p| p.as_slice() == parent),
                        "{sort_key:?}: parent of {node:?} missing before it"
                    );
                }
            }
        }
    }
}
