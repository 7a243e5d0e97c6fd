//! Arena-based document
//!
//! The `Document` owns three flat arenas: nodes, attributes and interned
//! strings. Nodes are appended in document pre-order during parsing, so a
//! NodeId doubles as a document-order key. All read access goes through
//! the `DomAccess` trait so the query and invariant layers never touch
//! the arena layout directly.

use super::node::{DomAttribute, DomNode, NodeId, NodeKind};
use super::strings::StringPool;
use super::{parse, DomAccess};

/// An immutable document snapshot
#[derive(Debug)]
pub struct Document {
    /// Node arena; index 0 is the synthetic document root
    nodes: Vec<DomNode>,
    /// Attribute arena; each element owns a contiguous span
    attributes: Vec<DomAttribute>,
    /// Interned strings (names, values, text content)
    strings: StringPool,
    /// First element child of the document root
    root_element: Option<NodeId>,
}

impl Document {
    /// Create an empty document containing only the synthetic root
    pub fn new() -> Self {
        Document {
            nodes: vec![DomNode::document()],
            attributes: Vec::new(),
            strings: StringPool::new(),
            root_element: None,
        }
    }

    /// Parse a markup snapshot. Parsing is lenient and never fails;
    /// malformed input produces the best-effort tree.
    pub fn parse(input: &str) -> Self {
        parse::parse_document(input)
    }

    /// Number of nodes in the arena (including the document root)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Intern a string into this document's pool
    pub(crate) fn intern(&mut self, s: &str) -> u32 {
        self.strings.intern(s)
    }

    /// Append a node to the arena and link it under its parent.
    /// Returns the new node's id.
    pub(crate) fn push_node(&mut self, node: DomNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        let parent = node.parent;
        let is_element = node.is_element();
        self.nodes.push(node);

        if let Some(parent_id) = parent {
            self.link_child(parent_id, id);
            if is_element && parent_id == 0 && self.root_element.is_none() {
                self.root_element = Some(id);
            }
        }
        id
    }

    /// Append an attribute span for the element created last
    pub(crate) fn set_attributes(&mut self, id: NodeId, attrs: Vec<DomAttribute>) {
        let node = &mut self.nodes[id as usize];
        node.attr_start = self.attributes.len() as u32;
        node.attr_count = attrs.len() as u16;
        self.attributes.extend(attrs);
    }

    /// Link `child` as the last child of `parent`
    fn link_child(&mut self, parent: NodeId, child: NodeId) {
        let prev_last = self.nodes[parent as usize].last_child;
        {
            let node = &mut self.nodes[child as usize];
            node.prev_sibling = prev_last;
        }
        if let Some(prev) = prev_last {
            self.nodes[prev as usize].next_sibling = Some(child);
        } else {
            self.nodes[parent as usize].first_child = Some(child);
        }
        self.nodes[parent as usize].last_child = Some(child);
    }

    /// Iterate the direct children of a node
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        ChildIter {
            doc: self,
            next: self.nodes.get(id as usize).and_then(|n| n.first_child),
        }
    }

    /// Iterate all descendants of a node in pre-order
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut stack = Vec::new();
        push_children_reversed(self, id, &mut stack);
        DescendantIter { doc: self, stack }
    }

    /// Serialize the document as indented markup, one node per line.
    /// Text is escaped for `&`, `<`, `>`; attribute values for `&`, `"`,
    /// `<`. Childless elements render self-closed.
    pub fn to_pretty_string(&self, indent: &str) -> String {
        let mut out = String::new();
        for child in self.children(0) {
            self.pretty_node(child, 0, indent, &mut out);
        }
        out
    }

    fn pretty_node(&self, id: NodeId, depth: usize, indent: &str, out: &mut String) {
        let node = &self.nodes[id as usize];
        for _ in 0..depth {
            out.push_str(indent);
        }
        match node.kind {
            NodeKind::Document => {}
            NodeKind::Element => {
                let name = self.strings.get(node.name_id).unwrap_or("");
                out.push('<');
                out.push_str(name);
                for attr in self.attributes(id) {
                    let k = self.strings.get(attr.name_id).unwrap_or("");
                    let v = self.strings.get(attr.value_id).unwrap_or("");
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    escape_attr(v, out);
                    out.push('"');
                }
                if node.has_children() {
                    out.push_str(">\n");
                    for child in self.children(id) {
                        self.pretty_node(child, depth + 1, indent, out);
                    }
                    for _ in 0..depth {
                        out.push_str(indent);
                    }
                    out.push_str("</");
                    out.push_str(name);
                    out.push_str(">\n");
                } else {
                    out.push_str("/>\n");
                }
            }
            NodeKind::Text => {
                let content = self.strings.get(node.name_id).unwrap_or("");
                escape_text(content, out);
                out.push('\n');
            }
            NodeKind::Comment => {
                let content = self.strings.get(node.name_id).unwrap_or("");
                out.push_str("<!--");
                out.push_str(content);
                out.push_str("-->\n");
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl DomAccess for Document {
    fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }

    fn node(&self, id: NodeId) -> Option<&DomNode> {
        self.nodes.get(id as usize)
    }

    fn tag_name(&self, id: NodeId) -> Option<&str> {
        let node = self.nodes.get(id as usize)?;
        if node.is_element() {
            self.strings.get(node.name_id)
        } else {
            None
        }
    }

    fn text(&self, id: NodeId) -> Option<&str> {
        let node = self.nodes.get(id as usize)?;
        match node.kind {
            NodeKind::Text | NodeKind::Comment => self.strings.get(node.name_id),
            _ => None,
        }
    }

    fn attributes(&self, id: NodeId) -> &[DomAttribute] {
        match self.nodes.get(id as usize) {
            Some(node) if node.has_attributes() => {
                let start = node.attr_start as usize;
                &self.attributes[start..start + node.attr_count as usize]
            }
            _ => &[],
        }
    }

    fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        for attr in self.attributes(id) {
            if self.strings.get(attr.name_id) == Some(name) {
                return self.strings.get(attr.value_id);
            }
        }
        None
    }

    fn attribute_pairs(&self, id: NodeId) -> Vec<(&str, &str)> {
        self.attributes(id)
            .iter()
            .filter_map(|a| {
                let name = self.strings.get(a.name_id)?;
                let value = self.strings.get(a.value_id)?;
                Some((name, value))
            })
            .collect()
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id as usize).and_then(|n| n.parent)
    }

    fn children_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).collect()
    }

    fn descendants_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id).collect()
    }
}

/// Iterator over the direct children of a node
pub struct ChildIter<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self
            .doc
            .nodes
            .get(id as usize)
            .and_then(|n| n.next_sibling);
        Some(id)
    }
}

/// Pre-order iterator over all descendants of a node
pub struct DescendantIter<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for DescendantIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        push_children_reversed(self.doc, id, &mut self.stack);
        Some(id)
    }
}

fn push_children_reversed(doc: &Document, id: NodeId, stack: &mut Vec<NodeId>) {
    // Pushed last-to-first so pops come out in document order
    let mut child = doc.nodes.get(id as usize).and_then(|n| n.last_child);
    while let Some(c) = child {
        stack.push(c);
        child = doc.nodes[c as usize].prev_sibling;
    }
}

fn escape_text(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            _ => out.push(c),
        }
    }
}
