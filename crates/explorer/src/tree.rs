use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::node::{ContentNode, NodeId};
use crate::tab::TabContents;

/// Immutable root sequence of the content tree.
/// 內容樹的不可變根節點序列。
///
/// Every mutation returns a new tree. Only the nodes on the path to the edited
/// node are rebuilt; all other subtrees are shared with the previous version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentTree {
    roots: Vec<Arc<ContentNode>>,
}

impl ContentTree {
    pub fn new(roots: Vec<ContentNode>) -> Self {
        Self::from_shared(roots.into_iter().map(Arc::new).collect())
    }

    pub fn from_shared(roots: Vec<Arc<ContentNode>>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[Arc<ContentNode>] {
        &self.roots
    }

    /// Depth-first, pre-order walk over every node.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder {
            stack: self.roots.iter().rev().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Finds the first node with `id` in pre-order; `None` means not found.
    /// 以前序走訪尋找節點；找不到時回傳 `None`。
    pub fn find(&self, id: &str) -> Option<&Arc<ContentNode>> {
        let found = self.iter().find(|node| node.id().as_str() == id);
        trace!(id, found = found.is_some(), "tree lookup");
        found
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Ids of the folders enclosing `id`, from the outermost root inwards.
    /// Root-level nodes have no ancestors.
    pub fn ancestors(&self, id: &str) -> Option<Vec<NodeId>> {
        let mut path = Vec::new();
        if collect_path(&self.roots, id, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    /// Appends `node` under `parent_id`, or to the roots when no parent is given.
    /// 將節點加入指定父資料夾；未指定父節點時加入根序列。
    pub fn try_insert(
        &self,
        node: ContentNode,
        parent_id: Option<&str>,
    ) -> Result<Self, TreeError> {
        self.ensure_unique(&node)?;
        let node = Arc::new(node);
        match parent_id.filter(|id| !id.is_empty()) {
            None => {
                let mut roots = self.roots.clone();
                roots.push(node);
                Ok(Self { roots })
            }
            Some(parent_id) => self.rebuild(parent_id, |parent| {
                let children = parent
                    .children()
                    .ok_or_else(|| TreeError::InvalidParent(parent.id().clone()))?;
                let mut children = children.to_vec();
                children.push(node);
                Ok(parent.clone().with_shared_children(children))
            }),
        }
    }

    /// Like [`ContentTree::try_insert`], but returns the tree unchanged when the
    /// parent is missing, is not a folder, or the node id is already taken.
    pub fn insert(&self, node: ContentNode, parent_id: Option<&str>) -> Self {
        self.try_insert(node, parent_id)
            .unwrap_or_else(|err| self.ignore("insert", err))
    }

    /// Replaces the body of the leaf `id`.
    pub fn try_update_body(&self, id: &str, body: impl Into<String>) -> Result<Self, TreeError> {
        let body = body.into();
        self.rebuild(id, |node| {
            if node.is_folder() {
                return Err(TreeError::NotALeaf(node.id().clone()));
            }
            Ok(node.clone().with_body(body))
        })
    }

    /// Like [`ContentTree::try_update_body`], but returns the tree unchanged for
    /// missing ids and folders.
    pub fn update_body(&self, id: &str, body: impl Into<String>) -> Self {
        self.try_update_body(id, body)
            .unwrap_or_else(|err| self.ignore("update_body", err))
    }

    /// Replaces the whole tab mapping of node `id`. Callers merge beforehand.
    pub fn try_update_tab_contents(
        &self,
        id: &str,
        tab_contents: TabContents,
    ) -> Result<Self, TreeError> {
        self.rebuild(id, |node| Ok(node.clone().with_tab_contents(tab_contents)))
    }

    pub fn update_tab_contents(&self, id: &str, tab_contents: TabContents) -> Self {
        self.try_update_tab_contents(id, tab_contents)
            .unwrap_or_else(|err| self.ignore("update_tab_contents", err))
    }

    fn ignore(&self, operation: &'static str, err: TreeError) -> Self {
        debug!(operation, error = %err, "mutation skipped");
        self.clone()
    }

    fn ensure_unique(&self, node: &ContentNode) -> Result<(), TreeError> {
        let mut seen: HashSet<&str> = self.iter().map(|existing| existing.id().as_str()).collect();
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            if !seen.insert(current.id().as_str()) {
                return Err(TreeError::DuplicateId(current.id().clone()));
            }
            if let Some(children) = current.children() {
                pending.extend(children.iter().map(Arc::as_ref));
            }
        }
        Ok(())
    }

    fn rebuild<F>(&self, id: &str, edit: F) -> Result<Self, TreeError>
    where
        F: FnOnce(&ContentNode) -> Result<ContentNode, TreeError>,
    {
        let mut edit = Some(edit);
        match rebuild_recursive(&self.roots, id, &mut edit)? {
            Some(roots) => Ok(Self { roots }),
            None => Err(TreeError::NotFound(NodeId::from(id))),
        }
    }
}

impl<'a> IntoIterator for &'a ContentTree {
    type Item = &'a Arc<ContentNode>;
    type IntoIter = PreOrder<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Pre-order iterator returned by [`ContentTree::iter`].
pub struct PreOrder<'a> {
    stack: Vec<&'a Arc<ContentNode>>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a Arc<ContentNode>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if let Some(children) = node.children() {
            self.stack.extend(children.iter().rev());
        }
        Some(node)
    }
}

/// Returns `Ok(None)` when `id` is not in `nodes`; otherwise the rebuilt
/// sequence with only the path to the edited node replaced.
fn rebuild_recursive<F>(
    nodes: &[Arc<ContentNode>],
    id: &str,
    edit: &mut Option<F>,
) -> Result<Option<Vec<Arc<ContentNode>>>, TreeError>
where
    F: FnOnce(&ContentNode) -> Result<ContentNode, TreeError>,
{
    for (index, node) in nodes.iter().enumerate() {
        let replacement = if node.id().as_str() == id {
            match edit.take() {
                Some(edit) => edit(node)?,
                None => return Ok(None),
            }
        } else {
            let Some(children) = node.children() else {
                continue;
            };
            match rebuild_recursive(children, id, edit)? {
                Some(children) => node.as_ref().clone().with_shared_children(children),
                None => continue,
            }
        };
        let mut rebuilt = nodes.to_vec();
        rebuilt[index] = Arc::new(replacement);
        return Ok(Some(rebuilt));
    }
    Ok(None)
}

fn collect_path(nodes: &[Arc<ContentNode>], id: &str, path: &mut Vec<NodeId>) -> bool {
    for node in nodes {
        if node.id().as_str() == id {
            return true;
        }
        if let Some(children) = node.children() {
            path.push(node.id().clone());
            if collect_path(children, id, path) {
                return true;
            }
            path.pop();
        }
    }
    false
}

/// Failures reported by the `try_*` tree operations.
/// 樹狀操作 `try_*` 回報的錯誤。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {0} not found")]
    NotFound(NodeId),
    #[error("node {0} cannot accept children")]
    InvalidParent(NodeId),
    #[error("node {0} is a folder and has no body")]
    NotALeaf(NodeId),
    #[error("node id {0} is already in use")]
    DuplicateId(NodeId),
}
