use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::{ContentNode, NodeId};
use crate::tree::ContentTree;

/// Tree snapshot in its `{"items": [...]}` JSON form.
/// 以 `{"items": [...]}` JSON 表示的內容樹快照。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub items: Vec<Arc<ContentNode>>,
}

impl Snapshot {
    /// Parses a snapshot and rejects duplicate node ids.
    /// 解析快照，並拒絕重複的節點識別碼。
    pub fn from_json_str(contents: &str) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = serde_json::from_str(contents)
            .map_err(|err| SnapshotError::Invalid(err.to_string()))?;
        snapshot.check_unique_ids()?;
        Ok(snapshot)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_pretty(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(|err| SnapshotError::Invalid(err.to_string()))
    }

    pub fn from_tree(tree: &ContentTree) -> Self {
        Self {
            items: tree.roots().to_vec(),
        }
    }

    pub fn into_tree(self) -> ContentTree {
        ContentTree::from_shared(self.items)
    }

    fn check_unique_ids(&self) -> Result<(), SnapshotError> {
        let tree = ContentTree::from_shared(self.items.clone());
        let mut seen = HashSet::new();
        for node in &tree {
            if !seen.insert(node.id().as_str()) {
                return Err(SnapshotError::DuplicateId(node.id().clone()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid snapshot payload: {0}")]
    Invalid(String),
    #[error("snapshot contains node id {0} more than once")]
    DuplicateId(NodeId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tab::TabContent;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"{
        "items": [
            {
                "id": "1",
                "label": "pipelines",
                "type": "folder",
                "tabContents": {
                    "summary": {"type": "text", "content": "2 files"}
                },
                "children": [
                    {
                        "id": "2",
                        "label": "etl.py",
                        "type": "py",
                        "content": "run()",
                        "language": "python",
                        "tabContents": {
                            "logs": {"type": "log", "content": "started"},
                            "results": {
                                "type": "table",
                                "content": {
                                    "columns": ["rows", "status"],
                                    "rows": [[10, "ok"]],
                                    "executionTime": "0.4s"
                                }
                            },
                            "chart": {"type": "chart", "content": {"kind": "bar"}}
                        }
                    },
                    {"id": "3", "label": "archive", "type": "folder"}
                ]
            }
        ]
    }"#;

    #[test]
    fn parses_nested_items_and_tab_contents() {
        let snapshot = Snapshot::from_json_str(SAMPLE).unwrap();
        let tree = snapshot.into_tree();
        assert_eq!(tree.len(), 3);

        let etl = tree.find("2").unwrap();
        assert_eq!(etl.body(), Some("run()"));
        assert_eq!(etl.render_hint(), Some("python"));
        assert!(matches!(etl.tab_contents()["logs"], TabContent::Log(_)));
        let table = etl.tab_contents()["results"].as_table().unwrap();
        assert_eq!(table.execution_time.as_deref(), Some("0.4s"));
        assert_eq!(etl.tab_contents()["chart"].type_name(), "chart");

        let archive = tree.find("3").unwrap();
        assert_eq!(archive.children().map(<[_]>::len), Some(0));
    }

    #[test]
    fn reserializes_what_was_loaded() {
        let snapshot = Snapshot::from_json_str(SAMPLE).unwrap();
        let json = snapshot.to_json_pretty().unwrap();
        let reloaded = Snapshot::from_json_str(&json).unwrap();
        assert_eq!(reloaded, snapshot);
        assert!(json.contains("\"chart\""));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Snapshot::from_json_str(
            r#"{"items": [{"id": "a", "label": "x", "type": "folder", "children": [{"id": "a", "label": "y", "type": "txt"}]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SnapshotError::DuplicateId(id) if id.as_str() == "a"));
    }

    #[test]
    fn rejects_leaf_with_children() {
        let err = Snapshot::from_json_str(
            r#"{"items": [{"id": "a", "label": "x.sql", "type": "sql", "children": []}]}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::Invalid(message) if message.contains("cannot carry children")
        ));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("content.json");
        fs::write(&path, SAMPLE).unwrap();
        let snapshot = Snapshot::load(&path).unwrap();
        assert_eq!(snapshot.items.len(), 1);

        let err = Snapshot::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::Read { .. }));
    }

    #[test]
    fn empty_document_is_an_empty_tree() {
        let snapshot = Snapshot::from_json_str("{}").unwrap();
        assert!(snapshot.into_tree().is_empty());
    }
}
