//! Tree traversal helpers
//!
//! Lookups by name or attribute value and ancestry queries.

use crate::Node;

/// Whether `ancestor` is a strict ancestor of `node`
pub fn is_ancestor(ancestor: &Node, node: &Node) -> bool {
    let mut cursor = node.parent();
    while let Some(current) = cursor {
        if current == *ancestor {
            return true;
        }
        cursor = current.parent();
    }
    false
}

/// Deepest node that is `a` or `b` or an ancestor of both
pub fn common_ancestor(a: &Node, b: &Node) -> Option<Node> {
    let mut cursor = Some(a.clone());
    while let Some(candidate) = cursor {
        if candidate == *b || is_ancestor(&candidate, b) {
            return Some(candidate);
        }
        cursor = candidate.parent();
    }
    None
}

/// First child of `parent` whose `key` attribute equals `value`
pub fn lookup_child(parent: &Node, key: &str, value: &str) -> Option<Node> {
    let key = parent.document()?.lookup(key)?;
    parent
        .children()
        .find(|child| child.attribute_by_code(key).as_deref() == Some(value))
}

/// Depth-first search for a node named `name`, starting with `node` itself
///
/// `max_depth` limits how many levels below `node` are searched; `None`
/// searches the whole subtree.
pub fn lookup_name(node: &Node, name: &str, max_depth: Option<usize>) -> Option<Node> {
    let code = node.document()?.lookup(name)?;
    lookup_code(node, code, max_depth)
}

fn lookup_code(node: &Node, code: crate::Quark, max_depth: Option<usize>) -> Option<Node> {
    if node.code() == code {
        return Some(node.clone());
    }
    let remaining = match max_depth {
        Some(0) => return None,
        Some(depth) => Some(depth - 1),
        None => None,
    };
    node.children()
        .find_map(|child| lookup_code(&child, code, remaining))
}

/// Pre-order iterator over `node` and all of its descendants
pub fn descendants(node: &Node) -> Descendants {
    Descendants {
        start: node.clone(),
        next: Some(node.clone()),
    }
}

pub struct Descendants {
    start: Node,
    next: Option<Node>,
}

impl Iterator for Descendants {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        let current = self.next.take()?;

        self.next = current.first_child().or_else(|| {
            let mut cursor = current.clone();
            loop {
                if cursor == self.start {
                    return None;
                }
                if let Some(sibling) = cursor.next() {
                    return Some(sibling);
                }
                cursor = cursor.parent()?;
            }
        });

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;

    fn sample() -> (Document, Node, Node, Node, Node) {
        let doc = Document::new();
        let svg = doc.create_element("svg:svg");
        let g = doc.create_element("svg:g");
        let rect = doc.create_element("svg:rect");
        let circle = doc.create_element("svg:circle");
        doc.root().append_child(&svg);
        svg.append_child(&g);
        g.append_child(&rect);
        svg.append_child(&circle);
        rect.set_attribute("id", Some("r1"));
        (doc, svg, g, rect, circle)
    }

    #[test]
    fn test_is_ancestor() {
        let (_doc, svg, g, rect, circle) = sample();
        assert!(is_ancestor(&svg, &rect));
        assert!(is_ancestor(&g, &rect));
        assert!(!is_ancestor(&rect, &rect));
        assert!(!is_ancestor(&circle, &rect));
    }

    #[test]
    fn test_common_ancestor() {
        let (_doc, svg, g, rect, circle) = sample();
        assert_eq!(common_ancestor(&rect, &circle), Some(svg.clone()));
        assert_eq!(common_ancestor(&rect, &g), Some(g.clone()));
    }

    #[test]
    fn test_lookup_child_by_id() {
        let (_doc, _svg, g, rect, _circle) = sample();
        assert_eq!(lookup_child(&g, "id", "r1"), Some(rect));
        assert_eq!(lookup_child(&g, "id", "missing"), None);
        assert_eq!(lookup_child(&g, "never-interned", "r1"), None);
    }

    #[test]
    fn test_lookup_name_depth() {
        let (doc, svg, _g, rect, _circle) = sample();
        assert_eq!(lookup_name(&svg, "svg:rect", None), Some(rect));
        assert_eq!(lookup_name(&svg, "svg:rect", Some(1)), None);
        assert!(lookup_name(&doc.root(), "svg:svg", Some(1)).is_some());
    }

    #[test]
    fn test_descendants_preorder() {
        let (_doc, svg, g, rect, circle) = sample();
        let order: Vec<Node> = descendants(&svg).collect();
        assert_eq!(order, vec![svg, g, rect, circle]);
    }

    #[test]
    fn test_descendants_stays_in_subtree() {
        let (_doc, _svg, g, rect, _circle) = sample();
        let order: Vec<Node> = descendants(&g).collect();
        assert_eq!(order, vec![g, rect]);
    }
}
