use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tab definition for a node kind.
/// 節點類型的分頁定義。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub icon: String,
}

impl TabInfo {
    pub fn new(id: impl Into<String>, label: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            icon: icon.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TabConfig {
    #[serde(default)]
    pub tabs: Vec<TabInfo>,
}

/// Read-only kind → tab schema supplied at startup.
/// 啟動時載入的唯讀「節點類型 → 分頁結構」設定。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfig {
    #[serde(default)]
    pub tab_config: BTreeMap<String, TabConfig>,
    #[serde(default)]
    pub default_tab: String,
}

static BUILTIN_CONFIG: Lazy<ViewConfig> = Lazy::new(|| {
    let preview = || TabInfo::new("preview", "Preview", "visibility");
    let logs = || TabInfo::new("logs", "Logs", "terminal");
    let output = || TabInfo::new("output", "Output", "output");
    let results = || TabInfo::new("results", "Results", "table_chart");
    let structure = || TabInfo::new("tree", "Structure", "account_tree");

    let script = vec![preview(), logs(), output()];
    let query = vec![preview(), results(), logs()];
    let data = vec![preview(), structure()];
    let document = vec![preview()];

    let mut tab_config = BTreeMap::new();
    let mut register = |kinds: &[&str], tabs: &[TabInfo]| {
        for kind in kinds {
            tab_config.insert(
                kind.to_string(),
                TabConfig {
                    tabs: tabs.to_vec(),
                },
            );
        }
    };
    register(&["folder"], &[TabInfo::new("summary", "Summary", "info")]);
    register(&["py", "script", "js", "ts"], &script);
    register(&["sql", "query"], &query);
    register(&["json", "data"], &data);
    register(
        &["md", "doc", "html", "markup", "css", "style", "txt", "text"],
        &document,
    );

    ViewConfig {
        tab_config,
        default_tab: "preview".to_string(),
    }
});

impl ViewConfig {
    /// Schema shipped with the application.
    /// 應用程式內建的分頁設定。
    pub fn builtin() -> Self {
        BUILTIN_CONFIG.clone()
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(contents).map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    /// Loads a view configuration file.
    /// 從檔案載入檢視設定。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Tabs declared for `kind`, or `None` when the kind has no schema.
    pub fn tabs_for(&self, kind: &str) -> Option<&[TabInfo]> {
        self.tab_config.get(kind).map(|config| config.tabs.as_slice())
    }

    /// Initially active tab for `kind`: the declared default when the kind has
    /// it, otherwise the kind's first tab.
    pub fn default_tab_for(&self, kind: &str) -> Option<&str> {
        let tabs = self.tabs_for(kind)?;
        tabs.iter()
            .find(|tab| !self.default_tab.is_empty() && tab.id == self.default_tab)
            .or_else(|| tabs.first())
            .map(|tab| tab.id.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read view config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid view config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn builtin_covers_folder_and_common_kinds() {
        let config = ViewConfig::builtin();
        for kind in ["folder", "py", "sql", "json", "md", "doc", "text"] {
            assert!(config.tabs_for(kind).is_some(), "missing schema for {kind}");
        }
        assert!(config.tabs_for("bin").is_none());
    }

    #[test]
    fn default_tab_prefers_declared_default() {
        let config = ViewConfig::builtin();
        assert_eq!(config.default_tab_for("sql"), Some("preview"));
        assert_eq!(config.default_tab_for("folder"), Some("summary"));
        assert_eq!(config.default_tab_for("bin"), None);
    }

    #[test]
    fn default_tab_falls_back_to_first_entry() {
        let config = ViewConfig::from_json_str(
            r#"{"tabConfig": {"sql": {"tabs": [{"id": "results", "label": "Results", "icon": "t"}, {"id": "logs", "label": "Logs"}]}}}"#,
        )
        .unwrap();
        assert_eq!(config.default_tab, "");
        assert_eq!(config.default_tab_for("sql"), Some("results"));
        assert_eq!(config.tabs_for("sql").unwrap()[1].icon, "");
    }

    #[test]
    fn load_reads_file_and_reports_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"tabConfig": {"md": {"tabs": [{"id": "preview", "label": "Preview", "icon": "eye"}]}}, "defaultTab": "preview"}"#,
        )
        .unwrap();
        let config = ViewConfig::load(&path).unwrap();
        assert_eq!(config.default_tab, "preview");
        assert_eq!(config.tabs_for("md").unwrap().len(), 1);

        let err = ViewConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn invalid_json_is_reported() {
        let err = ViewConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
