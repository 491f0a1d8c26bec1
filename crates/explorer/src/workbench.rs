use thiserror::Error;
use tracing::info;

use crate::config::ViewConfig;
use crate::node::{make_node, ContentNode, NodeId, NodeKind};
use crate::tab::{merge_tab_content, TabContent};
use crate::tree::{ContentTree, TreeError};
use crate::view::{project_view, ViewProjection};

/// What the editor surface needs to open a leaf.
/// 編輯器開啟葉節點時需要的資料。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorBuffer {
    pub node_id: NodeId,
    pub label: String,
    pub body: String,
    pub render_hint: &'static str,
}

/// Single owner of the current tree and selection.
/// 持有目前內容樹與選取狀態的唯一控制器。
///
/// Selection is stored as an id and resolved against the current tree on
/// every access, so a replaced tree never leaves a stale node behind.
#[derive(Debug, Clone)]
pub struct Workbench {
    config: ViewConfig,
    tree: ContentTree,
    selection: Option<NodeId>,
    revision: u64,
}

impl Workbench {
    pub fn new(config: ViewConfig, tree: ContentTree) -> Self {
        Self {
            config,
            tree,
            selection: None,
            revision: 0,
        }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn tree(&self) -> &ContentTree {
        &self.tree
    }

    /// Incremented after every successful mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn selection(&self) -> Option<&NodeId> {
        self.selection.as_ref()
    }

    pub fn selected_node(&self) -> Option<&ContentNode> {
        let id = self.selection.as_ref()?;
        self.tree.find(id.as_str()).map(|node| node.as_ref())
    }

    /// Selects `id` and returns its view; clears the selection when missing.
    /// 選取節點並回傳其檢視；節點不存在時清除選取。
    pub fn select(&mut self, id: &str) -> Option<ViewProjection> {
        let view = self
            .tree
            .find(id)
            .map(|node| project_view(node, &self.config));
        self.selection = view.as_ref().map(|_| NodeId::from(id));
        view
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn current_view(&self) -> Option<ViewProjection> {
        self.selected_node()
            .map(|node| project_view(node, &self.config))
    }

    /// Creates a node and inserts it under `parent_id` (roots when `None`).
    pub fn add_node(
        &mut self,
        label: &str,
        kind: &str,
        body: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<NodeId, TreeError> {
        let node = make_node(label, NodeKind::parse(kind), body, &self.config);
        let id = node.id().clone();
        let tree = self.tree.try_insert(node, parent_id)?;
        self.commit(tree);
        info!(%id, kind, parent = parent_id.unwrap_or_default(), "node added");
        Ok(id)
    }

    /// Merges one tab into the contents of node `id`.
    pub fn add_tab_content(
        &mut self,
        id: &str,
        tab_id: &str,
        content: TabContent,
    ) -> Result<(), TreeError> {
        let node = self
            .tree
            .find(id)
            .ok_or_else(|| TreeError::NotFound(NodeId::from(id)))?;
        let merged = merge_tab_content(node.tab_contents(), tab_id, content);
        let tree = self.tree.try_update_tab_contents(id, merged)?;
        self.commit(tree);
        info!(id, tab_id, "tab content stored");
        Ok(())
    }

    /// Hands the selected leaf to the editor surface.
    pub fn editor_buffer(&self) -> Option<EditorBuffer> {
        let node = self.selected_node()?;
        Some(EditorBuffer {
            node_id: node.id().clone(),
            label: node.label().to_string(),
            body: node.body()?.to_string(),
            render_hint: node.render_hint()?,
        })
    }

    /// Stores a body edited in the editor surface on the selected leaf.
    /// 將編輯器回傳的內容寫回目前選取的葉節點。
    pub fn apply_editor_change(&mut self, body: impl Into<String>) -> Result<(), WorkbenchError> {
        let id = self.selection.clone().ok_or(WorkbenchError::NoSelection)?;
        let tree = self.tree.try_update_body(id.as_str(), body)?;
        self.commit(tree);
        Ok(())
    }

    fn commit(&mut self, tree: ContentTree) {
        self.tree = tree;
        self.revision = self.revision.wrapping_add(1);
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkbenchError {
    #[error("no node is selected")]
    NoSelection,
    #[error(transparent)]
    Tree(#[from] TreeError),
}
