use std::fmt::Write as _;

use serde_json::Value;
use workbench_explorer::{ContentNode, ContentTree, ContentType, TabContentVisitor, TableContent};

/// 以純文字呈現分頁內容。 / Renders tab contents as plain text for the terminal.
pub struct PlainTextRenderer;

impl TabContentVisitor for PlainTextRenderer {
    type Output = String;

    fn visit_text(&mut self, _content_type: ContentType, text: &str) -> String {
        text.to_string()
    }

    fn visit_table(&mut self, table: &TableContent) -> String {
        let mut out = table.columns.join("\t");
        for row in &table.rows {
            out.push('\n');
            let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
            out.push_str(&cells.join("\t"));
        }
        if !table.is_rectangular() {
            out.push_str("\n(warning: row lengths do not match the column count)");
        }
        let row_count = table.row_count.unwrap_or(table.rows.len() as u64);
        let _ = write!(out, "\n({row_count} rows");
        if let Some(time) = &table.execution_time {
            let _ = write!(out, ", {time}");
        }
        out.push(')');
        out
    }

    fn visit_opaque(&mut self, type_name: &str, content: Option<&Value>) -> String {
        match content {
            Some(content) => format!("[unsupported content type '{type_name}']\n{content}"),
            None => format!("[unsupported content type '{type_name}']"),
        }
    }
}

/// 輸出樹狀大綱。 / Writes an indented outline of the tree.
pub fn outline(tree: &ContentTree) -> String {
    let mut out = String::new();
    for root in tree.roots() {
        outline_node(root, 0, &mut out);
    }
    out
}

fn outline_node(node: &ContentNode, depth: usize, out: &mut String) {
    let marker = if node.is_folder() { "/" } else { "" };
    let _ = writeln!(
        out,
        "{:indent$}{}{marker} [{}] ({})",
        "",
        node.label(),
        node.kind_name(),
        node.id(),
        indent = depth * 2
    );
    for child in node.children().unwrap_or_default() {
        outline_node(child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workbench_explorer::{NodeKind, Scalar, TabContent};

    #[test]
    fn table_renders_tab_separated_with_footer() {
        let table = TableContent::new(
            vec!["id".into(), "name".into()],
            vec![vec![Scalar::Integer(1), Scalar::Text("alpha".into())]],
        )
        .unwrap()
        .with_execution_time("3ms");
        let rendered = TabContent::Table(table).accept(&mut PlainTextRenderer);
        assert_eq!(rendered, "id\tname\n1\talpha\n(1 rows, 3ms)");
    }

    #[test]
    fn opaque_without_payload_shows_only_the_tag() {
        let rendered = TabContent::Opaque {
            type_name: "chart".into(),
            content: None,
        }
        .accept(&mut PlainTextRenderer);
        assert_eq!(rendered, "[unsupported content type 'chart']");
    }

    #[test]
    fn outline_indents_children() {
        let tree = ContentTree::new(vec![ContentNode::new("f".into(), "src", NodeKind::Folder)
            .with_children(vec![ContentNode::new("a".into(), "a.py", "py".into())])]);
        assert_eq!(outline(&tree), "src/ [folder] (f)\n  a.py [py] (a)\n");
    }
}
