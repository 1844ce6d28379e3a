use reltab::{AggFn, SortKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serializable description of one pivot view, as it crosses the UI boundary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PivotTreeConfig {
    pub pivot_columns: Vec<String>,
    pub pivot_leaf_column: Option<String>,
    pub show_root: bool,
    pub sort_key: Vec<SortKey>,
    /// Per-column aggregation overriding the column type's default.
    pub agg_map: BTreeMap<String, AggFn>,
}

impl PivotTreeConfig {
    pub fn new<I>(pivot_columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            pivot_columns: pivot_columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_leaf_column(mut self, col: impl Into<String>) -> Self {
        self.pivot_leaf_column = Some(col.into());
        self
    }

    pub fn with_root(mut self, show_root: bool) -> Self {
        self.show_root = show_root;
        self
    }

    pub fn with_sort_key(mut self, sort_key: Vec<SortKey>) -> Self {
        self.sort_key = sort_key;
        self
    }

    pub fn with_agg(mut self, col: impl Into<String>, agg_fn: AggFn) -> Self {
        self.agg_map.insert(col.into(), agg_fn);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn deserializes_partial_config() {
        let cfg: PivotTreeConfig = serde_json::from_str(
            r#"{"pivotColumns":["JobFamily","Title"],"sortKey":[{"col":"TCOE","asc":false}],"aggMap":{"Base":"avg"}}"#,
        )
        .unwrap();
        assert_eq!(
            cfg,
            PivotTreeConfig::new(["JobFamily", "Title"])
                .with_sort_key(vec![SortKey::desc("TCOE")])
                .with_agg("Base", AggFn::Avg)
        );
        assert!(!cfg.show_root);
        assert_eq!(cfg.pivot_leaf_column, None);
    }
}
