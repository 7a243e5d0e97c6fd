//! DOM node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.
//! NodeIds are assigned in document pre-order, so id comparison doubles
//! as document-order comparison for non-nested nodes.

/// Compact node identifier (index into the document arena)
pub type NodeId = u32;

/// Type of DOM node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Synthetic document root (always node 0)
    Document,
    /// Element node
    Element,
    /// Text content
    Text,
    /// Comment
    Comment,
}

/// A node in the document arena
#[derive(Debug, Clone)]
pub struct DomNode {
    /// Type of this node
    pub kind: NodeKind,
    /// Parent node (None for the document root)
    pub parent: Option<NodeId>,
    /// First child node
    pub first_child: Option<NodeId>,
    /// Last child node
    pub last_child: Option<NodeId>,
    /// Previous sibling
    pub prev_sibling: Option<NodeId>,
    /// Next sibling
    pub next_sibling: Option<NodeId>,
    /// String pool index of the tag name (elements) or content (text,
    /// comments)
    pub name_id: u32,
    /// Start of this element's attributes in the attribute arena
    pub attr_start: u32,
    /// Number of attributes
    pub attr_count: u16,
}

impl DomNode {
    /// Create the synthetic document root node
    pub fn document() -> Self {
        DomNode {
            kind: NodeKind::Document,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: 0,
            attr_start: 0,
            attr_count: 0,
        }
    }

    /// Create a new element node
    pub fn element(name_id: u32, parent: NodeId) -> Self {
        DomNode {
            kind: NodeKind::Element,
            parent: Some(parent),
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id,
            attr_start: 0,
            attr_count: 0,
        }
    }

    /// Create a new text node (content interned under `name_id`)
    pub fn text(content_id: u32, parent: NodeId) -> Self {
        DomNode {
            kind: NodeKind::Text,
            parent: Some(parent),
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: content_id,
            attr_start: 0,
            attr_count: 0,
        }
    }

    /// Create a new comment node
    pub fn comment(content_id: u32, parent: NodeId) -> Self {
        DomNode {
            kind: NodeKind::Comment,
            parent: Some(parent),
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: content_id,
            attr_start: 0,
            attr_count: 0,
        }
    }

    /// Check if this is an element node
    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Check if this node has children
    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }

    /// Check if this node has attributes
    #[inline]
    pub fn has_attributes(&self) -> bool {
        self.attr_count > 0
    }
}

/// Stored attribute of an element, kept in document attribute order
#[derive(Debug, Clone)]
pub struct DomAttribute {
    /// String pool index of the attribute name
    pub name_id: u32,
    /// String pool index of the attribute value
    pub value_id: u32,
}

impl DomAttribute {
    pub fn new(name_id: u32, value_id: u32) -> Self {
        DomAttribute { name_id, value_id }
    }
}
