//! Pivot-tree query generation on top of [`reltab`].
//!
//! A [`VPivotTree`] turns a base query and an ordered list of pivot columns into reltab queries
//! for the visible part of a drill-down tree; a [`PathTree`] records which nodes are expanded.

mod config;
mod error;
mod path_tree;
mod vpivot;

pub use crate::config::PivotTreeConfig;
pub use crate::error::{AggTreeError, AggTreeResult};
pub use crate::path_tree::{Iter, Path, PathComponent, PathTree};
pub use crate::vpivot::{
    path_column, sort_key_column, sort_val_column, VPivotTree, DEPTH_COLUMN, IS_ROOT_COLUMN,
    PIVOT_COLUMN,
};
