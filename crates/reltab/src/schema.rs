use crate::column_type::ColumnType;
use crate::error::{ReltabError, ReltabResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    pub display_name: String,
    pub column_type: Arc<ColumnType>,
}

impl ColumnMetadata {
    pub fn new(display_name: impl Into<String>, column_type: Arc<ColumnType>) -> Self {
        Self {
            display_name: display_name.into(),
            column_type,
        }
    }
}

/// An ordered, name-unique list of columns with per-column metadata.
///
/// Schemas are never mutated in place; every operator that changes the column set builds a new
/// one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawSchema")]
pub struct Schema {
    columns: Vec<String>,
    column_metadata: HashMap<String, ColumnMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSchema {
    columns: Vec<String>,
    column_metadata: HashMap<String, ColumnMetadata>,
}

impl TryFrom<RawSchema> for Schema {
    type Error = ReltabError;

    fn try_from(raw: RawSchema) -> ReltabResult<Self> {
        let mut cols = Vec::with_capacity(raw.columns.len());
        for id in raw.columns {
            let Some(md) = raw.column_metadata.get(&id).cloned() else {
                return Err(ReltabError::UnknownColumn {
                    column: id,
                    available: raw.column_metadata.keys().cloned().collect(),
                });
            };
            cols.push((id, md));
        }
        Schema::new(cols)
    }
}

impl Schema {
    pub fn new(columns: Vec<(String, ColumnMetadata)>) -> ReltabResult<Self> {
        let mut ids = Vec::with_capacity(columns.len());
        let mut column_metadata = HashMap::with_capacity(columns.len());
        for (id, md) in columns {
            if column_metadata.insert(id.clone(), md).is_some() {
                return Err(ReltabError::DuplicateColumn(id));
            }
            ids.push(id);
        }
        Ok(Self {
            columns: ids,
            column_metadata,
        })
    }

    /// Build a schema whose display names equal the column ids.
    pub fn from_types<I, S>(columns: I) -> ReltabResult<Self>
    where
        I: IntoIterator<Item = (S, Arc<ColumnType>)>,
        S: Into<String>,
    {
        Self::new(
            columns
                .into_iter()
                .map(|(id, ct)| {
                    let id = id.into();
                    let md = ColumnMetadata::new(id.clone(), ct);
                    (id, md)
                })
                .collect(),
        )
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn has_column(&self, id: &str) -> bool {
        self.column_metadata.contains_key(id)
    }

    pub fn metadata(&self, id: &str) -> Option<&ColumnMetadata> {
        self.column_metadata.get(id)
    }

    pub fn column_type(&self, id: &str) -> Option<&Arc<ColumnType>> {
        self.column_metadata.get(id).map(|md| &md.column_type)
    }

    pub fn display_name(&self, id: &str) -> Option<&str> {
        self.column_metadata.get(id).map(|md| md.display_name.as_str())
    }

    pub fn column_index(&self, id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == id)
    }

    /// Metadata for `id`, or [`ReltabError::UnknownColumn`].
    pub fn require(&self, id: &str) -> ReltabResult<&ColumnMetadata> {
        self.column_metadata
            .get(id)
            .ok_or_else(|| ReltabError::unknown_column(id, self))
    }

    pub fn require_type(&self, id: &str) -> ReltabResult<&Arc<ColumnType>> {
        self.require(id).map(|md| &md.column_type)
    }

    /// Iterate `(id, metadata)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnMetadata)> + '_ {
        self.columns
            .iter()
            .map(|id| (id.as_str(), &self.column_metadata[id]))
    }

    /// Schema restricted to `ids`, in the order given.
    pub fn project(&self, ids: &[String]) -> ReltabResult<Schema> {
        let mut cols = Vec::with_capacity(ids.len());
        for id in ids {
            cols.push((id.clone(), self.require(id)?.clone()));
        }
        Schema::new(cols)
    }

    /// Schema with one extra column appended.
    pub fn extend(&self, id: &str, md: ColumnMetadata) -> ReltabResult<Schema> {
        if self.has_column(id) {
            return Err(ReltabError::DuplicateColumn(id.to_string()));
        }
        let mut cols: Vec<(String, ColumnMetadata)> = self
            .iter()
            .map(|(id, md)| (id.to_string(), md.clone()))
            .collect();
        cols.push((id.to_string(), md));
        Schema::new(cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Schema {
        Schema::from_types([
            ("A", ColumnType::string()),
            ("B", ColumnType::integer()),
            ("C", ColumnType::real()),
        ])
        .unwrap()
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = Schema::from_types([("A", ColumnType::string()), ("A", ColumnType::string())])
            .unwrap_err();
        assert!(matches!(err, ReltabError::DuplicateColumn(c) if c == "A"));
    }

    #[test]
    fn project_preserves_requested_order() {
        let schema = abc();
        let projected = schema.project(&["C".to_string(), "A".to_string()]).unwrap();
        assert_eq!(projected.columns(), ["C", "A"]);
        assert_eq!(projected.column_index("A"), Some(1));
    }

    #[test]
    fn deserialization_checks_metadata_presence() {
        let json = r#"{"columns":["A"],"columnMetadata":{}}"#;
        assert!(serde_json::from_str::<Schema>(json).is_err());

        let schema = abc();
        let json = serde_json::to_string(&schema).unwrap();
        let revived: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(revived, schema);
    }
}
