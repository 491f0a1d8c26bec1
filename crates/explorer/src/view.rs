use crate::config::{TabInfo, ViewConfig};
use crate::node::ContentNode;
use crate::tab::{TabContent, TabContents};

/// Tabs and contents to show for a selected node.
/// 選取節點時要顯示的分頁與內容。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewProjection {
    pub tabs: Vec<TabInfo>,
    pub active_tab: Option<String>,
    pub tab_contents: TabContents,
}

impl ViewProjection {
    /// `true` when the node's kind has no schema; callers show an empty state.
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn active_content(&self) -> Option<&TabContent> {
        self.active_tab
            .as_deref()
            .and_then(|tab| self.tab_contents.get(tab))
    }

    /// Schema tabs paired with their content, if the node has any for them.
    pub fn visible_tabs(&self) -> impl Iterator<Item = (&TabInfo, Option<&TabContent>)> {
        self.tabs
            .iter()
            .map(|tab| (tab, self.tab_contents.get(&tab.id)))
    }
}

/// Resolves the tab schema of `node`'s kind and pairs it with the node's contents.
/// 依節點類型解析分頁結構並帶出節點內容。
///
/// Contents are not filtered against the schema: tabs outside it are kept in
/// `tab_contents` but have no entry in `tabs`.
pub fn project_view(node: &ContentNode, config: &ViewConfig) -> ViewProjection {
    let kind = node.kind_name();
    match config.tabs_for(kind) {
        None => ViewProjection::default(),
        Some(tabs) => ViewProjection {
            tabs: tabs.to_vec(),
            active_tab: config.default_tab_for(kind).map(str::to_string),
            tab_contents: node.tab_contents().clone(),
        },
    }
}
