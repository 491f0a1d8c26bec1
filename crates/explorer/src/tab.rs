//! Tab payloads attached to content nodes and the tag-based dispatch contract.
//! 節點分頁內容與依標籤分派的約定。

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Mapping from tab id to its content, ordered by tab id.
pub type TabContents = BTreeMap<String, TabContent>;

/// Closed set of content tags understood by consumers.
/// 消費端可辨識的內容標籤集合。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Text,
    Markdown,
    Log,
    Html,
    Tree,
    Json,
    Table,
    List,
}

impl ContentType {
    pub const ALL: [ContentType; 8] = [
        ContentType::Text,
        ContentType::Markdown,
        ContentType::Log,
        ContentType::Html,
        ContentType::Tree,
        ContentType::Json,
        ContentType::Table,
        ContentType::List,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Markdown => "markdown",
            ContentType::Log => "log",
            ContentType::Html => "html",
            ContentType::Tree => "tree",
            ContentType::Json => "json",
            ContentType::Table => "table",
            ContentType::List => "list",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = UnknownContentType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == value)
            .ok_or_else(|| UnknownContentType(value.to_string()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown content type '{0}'")]
pub struct UnknownContentType(pub String);

/// Scalar cell of a table row.
///
/// Integers beyond `i64::MAX` land in [`Scalar::Unsigned`] so they are not
/// widened to floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(value) => write!(f, "{value}"),
            Scalar::Integer(value) => write!(f, "{value}"),
            Scalar::Unsigned(value) => write!(f, "{value}"),
            Scalar::Float(value) => write!(f, "{value}"),
            Scalar::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// Tabular payload, e.g. query results.
/// 表格內容，例如查詢結果。
///
/// Producers must keep every row as long as `columns`; use [`TableContent::new`]
/// to have that checked. Loaded tables are stored as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableContent {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<String>,
    /// Fields this crate does not interpret, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TableContent {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Scalar>>) -> Result<Self, TabContentError> {
        if let Some((row, cells)) = rows
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != columns.len())
        {
            return Err(TabContentError::RaggedRow {
                row,
                expected: columns.len(),
                actual: cells.len(),
            });
        }
        Ok(Self {
            columns,
            rows,
            row_count: None,
            execution_time: None,
            extra: Map::new(),
        })
    }

    /// Re-checks a table built elsewhere, e.g. parsed from user input.
    pub fn validated(self) -> Result<Self, TabContentError> {
        let Self {
            columns,
            rows,
            row_count,
            execution_time,
            extra,
        } = self;
        let mut table = Self::new(columns, rows)?;
        table.row_count = row_count;
        table.execution_time = execution_time;
        table.extra = extra;
        Ok(table)
    }

    pub fn with_row_count(mut self, row_count: u64) -> Self {
        self.row_count = Some(row_count);
        self
    }

    pub fn with_execution_time(mut self, execution_time: impl Into<String>) -> Self {
        self.execution_time = Some(execution_time.into());
        self
    }

    /// Returns `true` when every row matches the column count.
    pub fn is_rectangular(&self) -> bool {
        self.rows.iter().all(|row| row.len() == self.columns.len())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TabContentError {
    #[error("table row {row} has {actual} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// Tagged payload shown in one tab.
/// 單一分頁中顯示的標記內容。
///
/// Tags outside [`ContentType`], or known tags whose payload has the wrong
/// shape, are kept as [`TabContent::Opaque`] so they survive a round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum TabContent {
    Text(String),
    Markdown(String),
    Log(String),
    Html(String),
    Tree(String),
    Json(String),
    List(String),
    Table(TableContent),
    /// `content` is `None` when the tab carried no payload at all.
    Opaque {
        type_name: String,
        content: Option<Value>,
    },
}

impl TabContent {
    /// Builds a textual content for any non-table tag.
    pub fn textual(content_type: ContentType, text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let content = match content_type {
            ContentType::Text => TabContent::Text(text),
            ContentType::Markdown => TabContent::Markdown(text),
            ContentType::Log => TabContent::Log(text),
            ContentType::Html => TabContent::Html(text),
            ContentType::Tree => TabContent::Tree(text),
            ContentType::Json => TabContent::Json(text),
            ContentType::List => TabContent::List(text),
            ContentType::Table => return None,
        };
        Some(content)
    }

    /// Decodes a `(type, content)` pair the way a loaded snapshot is decoded.
    /// 以與載入快照相同的方式解碼 `(type, content)`。
    pub fn from_parts(type_name: &str, content: Value) -> Self {
        Self::decode(type_name, Some(content))
    }

    fn decode(type_name: &str, content: Option<Value>) -> Self {
        let Some(content) = content else {
            return TabContent::opaque(type_name, None);
        };
        match type_name.parse::<ContentType>() {
            Ok(ContentType::Table) => match serde_json::from_value::<TableContent>(content.clone())
            {
                Ok(table) => TabContent::Table(table),
                Err(_) => TabContent::opaque(type_name, Some(content)),
            },
            Ok(content_type) => match content {
                Value::String(text) => match TabContent::textual(content_type, text) {
                    Some(textual) => textual,
                    None => TabContent::opaque(type_name, None),
                },
                other => TabContent::opaque(type_name, Some(other)),
            },
            Err(_) => TabContent::opaque(type_name, Some(content)),
        }
    }

    fn opaque(type_name: &str, content: Option<Value>) -> Self {
        TabContent::Opaque {
            type_name: type_name.to_string(),
            content,
        }
    }

    /// Recognised tag, or `None` for opaque content.
    pub fn content_type(&self) -> Option<ContentType> {
        match self {
            TabContent::Text(_) => Some(ContentType::Text),
            TabContent::Markdown(_) => Some(ContentType::Markdown),
            TabContent::Log(_) => Some(ContentType::Log),
            TabContent::Html(_) => Some(ContentType::Html),
            TabContent::Tree(_) => Some(ContentType::Tree),
            TabContent::Json(_) => Some(ContentType::Json),
            TabContent::List(_) => Some(ContentType::List),
            TabContent::Table(_) => Some(ContentType::Table),
            TabContent::Opaque { .. } => None,
        }
    }

    /// Tag as written on the wire, including unrecognised ones.
    pub fn type_name(&self) -> &str {
        match self {
            TabContent::Opaque { type_name, .. } => type_name,
            other => other
                .content_type()
                .map(ContentType::as_str)
                .unwrap_or_default(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TabContent::Text(text)
            | TabContent::Markdown(text)
            | TabContent::Log(text)
            | TabContent::Html(text)
            | TabContent::Tree(text)
            | TabContent::Json(text)
            | TabContent::List(text) => Some(text),
            TabContent::Table(_) | TabContent::Opaque { .. } => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableContent> {
        match self {
            TabContent::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Dispatches on the tag.
    pub fn accept<V: TabContentVisitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            TabContent::Table(table) => visitor.visit_table(table),
            TabContent::Opaque { type_name, content } => {
                visitor.visit_opaque(type_name, content.as_ref())
            }
            textual => match (textual.content_type(), textual.as_text()) {
                (Some(content_type), Some(text)) => visitor.visit_text(content_type, text),
                _ => visitor.visit_opaque(textual.type_name(), None),
            },
        }
    }
}

/// Consumer-side dispatch over [`TabContent`] tags.
/// 依 [`TabContent`] 標籤分派的消費端介面。
pub trait TabContentVisitor {
    type Output;

    fn visit_text(&mut self, content_type: ContentType, text: &str) -> Self::Output;

    fn visit_table(&mut self, table: &TableContent) -> Self::Output;

    fn visit_opaque(&mut self, type_name: &str, content: Option<&Value>) -> Self::Output;
}

/// Returns a copy of `existing` with `tab_id` set to `content`.
/// 合併既有分頁內容並回傳新的對應表。
pub fn merge_tab_content(
    existing: &TabContents,
    tab_id: impl Into<String>,
    content: TabContent,
) -> TabContents {
    let mut merged = existing.clone();
    merged.insert(tab_id.into(), content);
    merged
}

#[derive(Deserialize)]
struct RawTabContent {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default, deserialize_with = "present")]
    content: Option<Value>,
}

// Keeps an explicit `null` apart from a missing key.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Serialize)]
struct RawTabContentRef<'a> {
    #[serde(rename = "type")]
    type_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<PayloadRef<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum PayloadRef<'a> {
    Text(&'a str),
    Table(&'a TableContent),
    Raw(&'a Value),
}

impl Serialize for TabContent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let content = match self {
            TabContent::Table(table) => Some(PayloadRef::Table(table)),
            TabContent::Opaque { content, .. } => content.as_ref().map(PayloadRef::Raw),
            textual => Some(PayloadRef::Text(textual.as_text().unwrap_or_default())),
        };
        RawTabContentRef {
            type_name: self.type_name(),
            content,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TabContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawTabContent::deserialize(deserializer)?;
        Ok(TabContent::decode(&raw.type_name, raw.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_type_parses_closed_set() {
        for content_type in ContentType::ALL {
            assert_eq!(content_type.as_str().parse(), Ok(content_type));
        }
        assert_eq!(
            "chart".parse::<ContentType>(),
            Err(UnknownContentType("chart".into()))
        );
    }

    #[test]
    fn table_rejects_ragged_rows() {
        let err = TableContent::new(
            vec!["id".into(), "name".into()],
            vec![
                vec![Scalar::Integer(1), "a".into()],
                vec![Scalar::Integer(2)],
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            TabContentError::RaggedRow {
                row: 1,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn ragged_table_loads_unvalidated() {
        let content: TabContent = serde_json::from_value(json!({
            "type": "table",
            "content": {"columns": ["a", "b"], "rows": [[1]]}
        }))
        .unwrap();
        let table = content.as_table().expect("table payload");
        assert!(!table.is_rectangular());
    }

    #[test]
    fn table_serializes_with_camel_case_fields() {
        let table = TableContent::new(
            vec!["id".into(), "ok".into()],
            vec![
                vec![Scalar::Integer(7), true.into()],
                vec![Scalar::Null, Scalar::Float(1.5)],
            ],
        )
        .unwrap()
        .with_row_count(2)
        .with_execution_time("12ms");
        let value = serde_json::to_value(TabContent::Table(table)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "table",
                "content": {
                    "columns": ["id", "ok"],
                    "rows": [[7, true], [null, 1.5]],
                    "rowCount": 2,
                    "executionTime": "12ms"
                }
            })
        );
    }

    #[test]
    fn unknown_tag_is_preserved_as_opaque() {
        let raw = json!({"type": "chart", "content": {"series": [1, 2, 3]}});
        let content: TabContent = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(content.content_type(), None);
        assert_eq!(content.type_name(), "chart");
        assert_eq!(serde_json::to_value(&content).unwrap(), raw);
    }

    #[test]
    fn mismatched_payload_shape_is_opaque() {
        let content = TabContent::from_parts("markdown", json!(["not", "text"]));
        assert!(matches!(
            content,
            TabContent::Opaque { ref type_name, .. } if type_name == "markdown"
        ));

        let content = TabContent::from_parts("table", json!("a,b\n1,2"));
        assert_eq!(content.type_name(), "table");
        assert!(content.as_table().is_none());
    }

    #[test]
    fn visitor_sees_each_arm() {
        struct Tags(Vec<String>);

        impl TabContentVisitor for Tags {
            type Output = ();

            fn visit_text(&mut self, content_type: ContentType, text: &str) {
                self.0.push(format!("{content_type}:{text}"));
            }

            fn visit_table(&mut self, table: &TableContent) {
                self.0.push(format!("table:{}", table.columns.len()));
            }

            fn visit_opaque(&mut self, type_name: &str, _content: Option<&Value>) {
                self.0.push(format!("opaque:{type_name}"));
            }
        }

        let mut tags = Tags(Vec::new());
        TabContent::Log("boot".into()).accept(&mut tags);
        TabContent::Table(TableContent::new(vec!["x".into()], Vec::new()).unwrap())
            .accept(&mut tags);
        TabContent::from_parts("chart", Value::Null).accept(&mut tags);
        assert_eq!(tags.0, vec!["log:boot", "table:1", "opaque:chart"]);
    }

    #[test]
    fn merge_keeps_existing_tabs() {
        let existing = TabContents::from([("logs".to_string(), TabContent::Log("a".into()))]);
        let merged = merge_tab_content(&existing, "preview", TabContent::Markdown("# Hi".into()));
        assert_eq!(merged.len(), 2);
        assert_eq!(existing.len(), 1);
        assert_eq!(merged["preview"].type_name(), "markdown");
    }

    #[test]
    fn loaded_table_keeps_unknown_fields_and_wide_integers() {
        let raw = json!({
            "type": "table",
            "content": {
                "columns": ["a", "b"],
                "rows": [[18446744073709551615u64, -3]],
                "caption": "q1"
            }
        });
        let content: TabContent = serde_json::from_value(raw.clone()).unwrap();
        let table = content.as_table().expect("table payload");
        assert_eq!(table.rows[0][0], Scalar::Unsigned(u64::MAX));
        assert_eq!(table.rows[0][1], Scalar::Integer(-3));
        assert_eq!(table.extra["caption"], "q1");
        assert_eq!(serde_json::to_value(&content).unwrap(), raw);
    }

    #[test]
    fn missing_payload_stays_missing() {
        let raw = json!({"type": "text"});
        let content: TabContent = serde_json::from_value(raw.clone()).unwrap();
        assert!(matches!(content, TabContent::Opaque { content: None, .. }));
        assert_eq!(serde_json::to_value(&content).unwrap(), raw);

        let raw = json!({"type": "text", "content": null});
        let content: TabContent = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&content).unwrap(), raw);
    }

    #[test]
    fn validated_rechecks_parsed_tables() {
        let table: TableContent =
            serde_json::from_value(json!({"columns": ["a", "b"], "rows": [[1]], "rowCount": 1}))
                .unwrap();
        assert_eq!(
            table.validated(),
            Err(TabContentError::RaggedRow {
                row: 0,
                expected: 2,
                actual: 1
            })
        );

        let table: TableContent =
            serde_json::from_value(json!({"columns": ["a"], "rows": [[1]], "rowCount": 1}))
                .unwrap();
        assert_eq!(table.validated().unwrap().row_count, Some(1));
    }
}
