//! Content tree, tab contents and view projection for the workbench explorer.
//! 工作台瀏覽器的內容樹、分頁內容與檢視投影核心模組。

pub mod config;
pub mod node;
pub mod snapshot;
pub mod tab;
pub mod tree;
pub mod view;
pub mod workbench;

pub use config::{ConfigError, TabConfig, TabInfo, ViewConfig};
pub use node::{
    make_node, render_hint_for, ContentNode, LeafKind, NodeContent, NodeId, NodeKind,
    NodeShapeError, FOLDER_KIND, PLAINTEXT_HINT,
};
pub use snapshot::{Snapshot, SnapshotError};
pub use tab::{
    merge_tab_content, ContentType, Scalar, TabContent, TabContentError, TabContentVisitor,
    TabContents, TableContent, UnknownContentType,
};
pub use tree::{ContentTree, PreOrder, TreeError};
pub use view::{project_view, ViewProjection};
pub use workbench::{EditorBuffer, Workbench, WorkbenchError};
