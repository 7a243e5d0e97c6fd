//! DOM module - arena-based document snapshots
//!
//! Implements an efficient read-only DOM representation using:
//! - Arena allocation for nodes
//! - NodeId (u32) indices assigned in document pre-order
//! - String interning for names, values and text
//! - Document-order position comparison for the ordering checks

pub mod document;
pub mod node;
pub mod parse;
pub mod strings;

pub use document::Document;
pub use node::{DomAttribute, DomNode, NodeId, NodeKind};
pub use strings::StringPool;

/// Trait for document access - the seam between the invariant core and
/// whatever produced the snapshot. Path queries, expression derivation
/// and the ordering checks are all written against this.
pub trait DomAccess {
    /// Id of the synthetic document root
    fn document_id(&self) -> NodeId {
        0
    }

    /// Id of the root element, if the document has one
    fn root_element_id(&self) -> Option<NodeId>;

    /// Get a node by id
    fn node(&self, id: NodeId) -> Option<&DomNode>;

    /// Tag name of an element node (None for non-elements)
    fn tag_name(&self, id: NodeId) -> Option<&str>;

    /// Content of a text or comment node
    fn text(&self, id: NodeId) -> Option<&str>;

    /// Attributes of an element, in document attribute order
    fn attributes(&self, id: NodeId) -> &[DomAttribute];

    /// Attribute value by name
    fn attribute(&self, id: NodeId, name: &str) -> Option<&str>;

    /// All attribute (name, value) pairs, in document attribute order
    fn attribute_pairs(&self, id: NodeId) -> Vec<(&str, &str)>;

    /// Parent of a node (None for the document root)
    fn parent_of(&self, id: NodeId) -> Option<NodeId>;

    /// Children of a node - returns a collected Vec for trait object
    /// compatibility
    fn children_vec(&self, id: NodeId) -> Vec<NodeId>;

    /// Descendants of a node in pre-order - returns a collected Vec for
    /// trait object compatibility
    fn descendants_vec(&self, id: NodeId) -> Vec<NodeId>;

    /// Kind of a node
    fn kind_of(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(|n| n.kind)
    }
}

/// Position of one node relative to another in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentPosition {
    /// The two ids are the same node
    Same,
    /// The other node comes before this node
    Preceding,
    /// The other node comes after this node
    Following,
    /// The other node is an ancestor of this node
    Contains,
    /// The other node is a descendant of this node
    ContainedBy,
}

/// Compare document positions: where does `other` stand relative to
/// `node`?
///
/// Relies on pre-order NodeId assignment: for nodes on disjoint branches
/// the smaller id comes first in the document.
pub fn document_position<D: DomAccess + ?Sized>(
    doc: &D,
    node: NodeId,
    other: NodeId,
) -> DocumentPosition {
    if node == other {
        return DocumentPosition::Same;
    }
    if is_ancestor(doc, other, node) {
        return DocumentPosition::Contains;
    }
    if is_ancestor(doc, node, other) {
        return DocumentPosition::ContainedBy;
    }
    if other > node {
        DocumentPosition::Following
    } else {
        DocumentPosition::Preceding
    }
}

/// Check whether `ancestor` is a strict ancestor of `node`
pub fn is_ancestor<D: DomAccess + ?Sized>(doc: &D, ancestor: NodeId, node: NodeId) -> bool {
    let mut current = doc.parent_of(node);
    while let Some(p) = current {
        if p == ancestor {
            return true;
        }
        current = doc.parent_of(p);
    }
    false
}

/// 1-based position of an element among same-tag siblings under its
/// parent. This is the index the `[n]` predicate and `derive_path` agree
/// on.
pub fn same_tag_index<D: DomAccess + ?Sized>(doc: &D, node: NodeId) -> usize {
    let tag = doc.tag_name(node);
    let parent = match doc.parent_of(node) {
        Some(p) => p,
        None => return 1,
    };

    let mut index = 0;
    for sibling in doc.children_vec(parent) {
        if doc.kind_of(sibling) == Some(NodeKind::Element) && doc.tag_name(sibling) == tag {
            index += 1;
            if sibling == node {
                return index;
            }
        }
    }
    index.max(1)
}
