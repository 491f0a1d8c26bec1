use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::config::ViewConfig;
use crate::tab::{TabContent, TabContents};

/// Discriminator value reserved for folders.
pub const FOLDER_KIND: &str = "folder";

/// Render hint used when a kind has no entry in the hint table.
pub const PLAINTEXT_HINT: &str = "plaintext";

static NEXT_NODE_SEQ: AtomicU64 = AtomicU64::new(1);

static PROCESS_EPOCH_MILLIS: Lazy<u128> = Lazy::new(|| {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
});

static RENDER_HINTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("py", "python"),
        ("script", "python"),
        ("sql", "sql"),
        ("query", "sql"),
        ("json", "json"),
        ("data", "json"),
        ("md", "markdown"),
        ("doc", "markdown"),
        ("js", "javascript"),
        ("ts", "typescript"),
        ("html", "html"),
        ("markup", "html"),
        ("css", "css"),
        ("style", "css"),
        ("txt", PLAINTEXT_HINT),
        ("text", PLAINTEXT_HINT),
    ])
});

/// Looks up the display-language tag for a node kind.
/// 依節點類型查詢顯示語言標籤。
pub fn render_hint_for(kind: &str) -> &'static str {
    RENDER_HINTS.get(kind).copied().unwrap_or(PLAINTEXT_HINT)
}

/// Opaque identifier assigned to each content node.
/// 內容節點的不透明識別碼。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Generates an id that is unique for the lifetime of the process.
    /// 產生在整個行程生命週期內唯一的識別碼。
    pub fn generate() -> Self {
        let seq = NEXT_NODE_SEQ.fetch_add(1, Ordering::Relaxed);
        Self(format!("node-{}-{seq}", *PROCESS_EPOCH_MILLIS))
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Leaf kind name; never equal to [`FOLDER_KIND`].
/// 葉節點類型名稱，永遠不會是 `folder`。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafKind(String);

impl LeafKind {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Node discriminator: a folder or one of the extensible leaf kinds.
/// 節點類型：資料夾或可擴充的葉節點類型。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Folder,
    Leaf(LeafKind),
}

impl NodeKind {
    /// Parses a kind name; `"folder"` maps to [`NodeKind::Folder`].
    /// 解析類型名稱，`"folder"` 對應資料夾。
    pub fn parse(name: &str) -> Self {
        if name == FOLDER_KIND {
            NodeKind::Folder
        } else {
            NodeKind::Leaf(LeafKind(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Folder => FOLDER_KIND,
            NodeKind::Leaf(kind) => kind.as_str(),
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, NodeKind::Folder)
    }
}

impl From<&str> for NodeKind {
    fn from(name: &str) -> Self {
        NodeKind::parse(name)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Folder/leaf specific part of a node.
/// 節點中依資料夾或葉節點而不同的部分。
#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    Folder { children: Vec<Arc<ContentNode>> },
    Leaf { kind: LeafKind, body: String },
}

/// Immutable entry of the content tree.
/// 內容樹中的不可變節點。
///
/// Children only exist on folders, so a leaf carrying children cannot be
/// represented. Edits go through [`crate::ContentTree`], which returns new
/// trees instead of touching shared nodes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawNode")]
pub struct ContentNode {
    id: NodeId,
    label: String,
    content: NodeContent,
    tab_contents: TabContents,
}

impl ContentNode {
    /// Builds a node with an empty body (leaf) or no children (folder).
    /// 建立空白節點：葉節點內容為空，資料夾沒有子節點。
    pub fn new(id: NodeId, label: impl Into<String>, kind: NodeKind) -> Self {
        let content = match kind {
            NodeKind::Folder => NodeContent::Folder {
                children: Vec::new(),
            },
            NodeKind::Leaf(kind) => NodeContent::Leaf {
                kind,
                body: String::new(),
            },
        };
        Self {
            id,
            label: label.into(),
            content,
            tab_contents: TabContents::new(),
        }
    }

    /// Replaces the body. Folders have no body and are returned unchanged.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        if let NodeContent::Leaf { body: current, .. } = &mut self.content {
            *current = body.into();
        }
        self
    }

    /// Replaces the children. Leaves cannot hold children and are returned unchanged.
    pub fn with_children(self, children: Vec<ContentNode>) -> Self {
        self.with_shared_children(children.into_iter().map(Arc::new).collect())
    }

    pub(crate) fn with_shared_children(mut self, children: Vec<Arc<ContentNode>>) -> Self {
        if let NodeContent::Folder { children: current } = &mut self.content {
            *current = children;
        }
        self
    }

    pub fn with_tab_contents(mut self, tab_contents: TabContents) -> Self {
        self.tab_contents = tab_contents;
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn content(&self) -> &NodeContent {
        &self.content
    }

    pub fn kind(&self) -> NodeKind {
        match &self.content {
            NodeContent::Folder { .. } => NodeKind::Folder,
            NodeContent::Leaf { kind, .. } => NodeKind::Leaf(kind.clone()),
        }
    }

    pub fn kind_name(&self) -> &str {
        match &self.content {
            NodeContent::Folder { .. } => FOLDER_KIND,
            NodeContent::Leaf { kind, .. } => kind.as_str(),
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.content, NodeContent::Folder { .. })
    }

    /// Body text of a leaf; `None` for folders.
    pub fn body(&self) -> Option<&str> {
        match &self.content {
            NodeContent::Folder { .. } => None,
            NodeContent::Leaf { body, .. } => Some(body),
        }
    }

    /// Derived display-language tag; `None` for folders.
    pub fn render_hint(&self) -> Option<&'static str> {
        match &self.content {
            NodeContent::Folder { .. } => None,
            NodeContent::Leaf { kind, .. } => Some(render_hint_for(kind.as_str())),
        }
    }

    /// Children of a folder; `None` for leaves.
    pub fn children(&self) -> Option<&[Arc<ContentNode>]> {
        match &self.content {
            NodeContent::Folder { children } => Some(children),
            NodeContent::Leaf { .. } => None,
        }
    }

    pub fn tab_contents(&self) -> &TabContents {
        &self.tab_contents
    }
}

/// Creates a fresh node with a new id and schema-seeded tab contents.
/// 建立新節點：指派新識別碼並依設定產生預設分頁內容。
pub fn make_node(
    label: impl Into<String>,
    kind: impl Into<NodeKind>,
    initial_body: Option<&str>,
    config: &ViewConfig,
) -> ContentNode {
    let label = label.into();
    let kind = kind.into();
    let tab_contents = seed_tab_contents(&kind, &label, config);
    ContentNode::new(NodeId::generate(), label, kind)
        .with_body(initial_body.unwrap_or_default())
        .with_tab_contents(tab_contents)
}

fn seed_tab_contents(kind: &NodeKind, label: &str, config: &ViewConfig) -> TabContents {
    match kind {
        NodeKind::Folder => BTreeMap::from([(
            "summary".to_string(),
            TabContent::Text(format!(
                "**Folder: {label}**\n\nNew folder created.\n\nFiles: 0\nSubfolders: 0"
            )),
        )]),
        NodeKind::Leaf(leaf) => config
            .tabs_for(leaf.as_str())
            .unwrap_or_default()
            .iter()
            .map(|tab| {
                let text = if tab.id == "preview" {
                    format!("**File: {label}**\n\nNew {} file created.", leaf.as_str())
                } else {
                    format!("{} content for {label}", tab.label)
                };
                (tab.id.clone(), TabContent::Text(text))
            })
            .collect(),
    }
}

/// Errors raised when a serialized node violates the folder/children pairing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeShapeError {
    #[error("node {id} of kind '{kind}' cannot carry children")]
    LeafWithChildren { id: NodeId, kind: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    id: NodeId,
    label: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    children: Option<Vec<Arc<ContentNode>>>,
    #[serde(default)]
    tab_contents: TabContents,
}

impl TryFrom<RawNode> for ContentNode {
    type Error = NodeShapeError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let content = match NodeKind::parse(&raw.kind) {
            NodeKind::Folder => NodeContent::Folder {
                children: raw.children.unwrap_or_default(),
            },
            NodeKind::Leaf(kind) => {
                if raw.children.is_some() {
                    return Err(NodeShapeError::LeafWithChildren {
                        id: raw.id,
                        kind: raw.kind,
                    });
                }
                NodeContent::Leaf {
                    kind,
                    body: raw.content.unwrap_or_default(),
                }
            }
        };
        Ok(Self {
            id: raw.id,
            label: raw.label,
            content,
            tab_contents: raw.tab_contents,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RawNodeRef<'a> {
    id: &'a NodeId,
    label: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    children: Option<&'a [Arc<ContentNode>]>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tab_contents: &'a TabContents,
}

impl Serialize for ContentNode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        RawNodeRef {
            id: &self.id,
            label: &self.label,
            kind: self.kind_name(),
            content: self.body(),
            language: self.render_hint(),
            children: self.children(),
            tab_contents: &self.tab_contents,
        }
        .serialize(serializer)
    }
}
