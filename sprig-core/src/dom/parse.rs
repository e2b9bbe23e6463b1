//! Markup Parsing
//!
//! Response text and initial markup are parsed with `scraper` (html5ever)
//! and copied into the document arena as detached nodes.

use scraper::Html;

use super::document::Document;
use super::NodeId;

/// Parse `html` as body content and return the top-level nodes, detached,
/// in source order.
pub fn parse_fragment(doc: &mut Document, html: &str) -> Vec<NodeId> {
    let parsed = Html::parse_fragment(html);
    let mut top_level = Vec::new();

    // Depth-first with an explicit stack; children are pushed reversed so
    // they are appended in source order.
    let mut stack: Vec<_> = parsed
        .root_element()
        .children()
        .rev()
        .map(|child| (child, None))
        .collect();

    while let Some((node, parent)) = stack.pop() {
        let id = match node.value() {
            scraper::Node::Element(element) => {
                let id = doc.create_element(element.name());
                for (name, value) in element.attrs() {
                    doc.set_attr(id, name, value);
                }
                id
            }
            scraper::Node::Text(text) => doc.create_text(&text.text),
            scraper::Node::Comment(comment) => doc.create_comment(&comment.comment),
            _ => continue,
        };

        match parent {
            Some(parent) => doc.append_child(parent, id),
            None => top_level.push(id),
        }

        for child in node.children().rev() {
            stack.push((child, Some(id)));
        }
    }

    top_level
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_top_level_nodes_in_order() {
        let mut doc = Document::new();
        let nodes = parse_fragment(&mut doc, r#"<div id="a">x</div> <p id="b"><i>y</i></p><!--c-->"#);
        assert_eq!(nodes.len(), 4);
        assert_eq!(doc.attr(nodes[0], "id"), Some("a"));
        assert!(!doc.is_element(nodes[1]));
        assert_eq!(doc.outer_html(nodes[2]), r#"<p id="b"><i>y</i></p>"#);
        assert!(nodes.iter().all(|&n| doc.parent(n).is_none()));
    }

    #[test]
    fn keeps_attribute_order() {
        let mut doc = Document::new();
        let nodes = parse_fragment(&mut doc, r#"<div id="panel" sp-swap="inner" class="c"></div>"#);
        let names: Vec<_> = doc.element(nodes[0]).unwrap().attrs().keys().cloned().collect();
        assert_eq!(names, ["id", "sp-swap", "class"]);
    }
}
