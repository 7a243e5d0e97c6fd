//! Lenient snapshot parser
//!
//! Builds the arena document from serialized markup. Snapshots come from
//! rendered pages, so the parser is forgiving rather than validating:
//! - stray end tags are ignored
//! - unclosed elements are closed at end of input
//! - void elements (`<br>`, `<img>`, ...) never take children
//! - doctype and processing instructions are skipped
//!
//! Parsing never fails; the worst malformed input yields is an empty
//! document. Byte scanning uses memchr to jump between markup boundaries.

use memchr::memchr;

use super::document::Document;
use super::node::{DomAttribute, DomNode, NodeId};
use super::DomAccess;

/// Elements that never have content or an end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Parse markup into an arena document. Never fails.
pub fn parse_document(input: &str) -> Document {
    let mut doc = Document::new();
    let bytes = input.as_bytes();
    let mut pos = 0;
    // Stack of currently-open nodes; the document root is always open
    let mut stack: Vec<NodeId> = vec![0];

    while pos < bytes.len() {
        match memchr(b'<', &bytes[pos..]) {
            Some(offset) => {
                if offset > 0 {
                    push_text(&mut doc, &stack, &input[pos..pos + offset]);
                    pos += offset;
                }
                pos = parse_markup(&mut doc, &mut stack, input, pos);
            }
            None => {
                push_text(&mut doc, &stack, &input[pos..]);
                break;
            }
        }
    }

    doc
}

/// Parse one markup construct starting at the `<` at `pos`; returns the
/// position just past it.
fn parse_markup(doc: &mut Document, stack: &mut Vec<NodeId>, input: &str, pos: usize) -> usize {
    let bytes = input.as_bytes();
    let rest = &input[pos..];

    if rest.starts_with("<!--") {
        return parse_comment(doc, stack, input, pos);
    }
    if rest.starts_with("<!") || rest.starts_with("<?") {
        // Doctype, CDATA, processing instruction: skip to closing '>'
        return match memchr(b'>', &bytes[pos..]) {
            Some(offset) => pos + offset + 1,
            None => bytes.len(),
        };
    }
    if rest.starts_with("</") {
        return parse_end_tag(doc, stack, input, pos);
    }
    parse_start_tag(doc, stack, input, pos)
}

fn parse_comment(doc: &mut Document, stack: &[NodeId], input: &str, pos: usize) -> usize {
    let body_start = pos + 4;
    let (content, end) = match input[body_start..].find("-->") {
        Some(offset) => (&input[body_start..body_start + offset], body_start + offset + 3),
        None => (&input[body_start..], input.len()),
    };
    let parent = *stack.last().unwrap_or(&0);
    let content_id = doc.intern(content);
    doc.push_node(DomNode::comment(content_id, parent));
    end
}

fn parse_end_tag(doc: &mut Document, stack: &mut Vec<NodeId>, input: &str, pos: usize) -> usize {
    let bytes = input.as_bytes();
    let name_start = pos + 2;
    let mut i = name_start;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    let name = input[name_start..i].to_ascii_lowercase();
    let end = match memchr(b'>', &bytes[i..]) {
        Some(offset) => i + offset + 1,
        None => bytes.len(),
    };

    // Find a matching open element; a stray end tag leaves the stack
    // untouched
    let matching = stack
        .iter()
        .rposition(|&id| doc.tag_name(id) == Some(name.as_str()));
    if let Some(index) = matching {
        // The document root is at index 0 and never matches a tag name,
        // so the stack stays non-empty
        stack.truncate(index);
    }
    end
}

fn parse_start_tag(doc: &mut Document, stack: &mut Vec<NodeId>, input: &str, pos: usize) -> usize {
    let bytes = input.as_bytes();
    let name_start = pos + 1;
    let mut i = name_start;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    if i == name_start {
        // Bare '<' in text content
        push_text(doc, stack, "<");
        return pos + 1;
    }
    let name = input[name_start..i].to_ascii_lowercase();

    let mut attrs: Vec<DomAttribute> = Vec::new();
    let mut self_closing = false;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        match bytes[i] {
            b'>' => {
                i += 1;
                break;
            }
            b'/' => {
                self_closing = true;
                i += 1;
            }
            _ => {
                let (attr, next) = parse_attribute(doc, input, i);
                if let Some(attr) = attr {
                    attrs.push(attr);
                }
                if next == i {
                    i += 1; // never stall on junk bytes
                } else {
                    i = next;
                }
            }
        }
    }

    let parent = *stack.last().unwrap_or(&0);
    let name_id = doc.intern(&name);
    let id = doc.push_node(DomNode::element(name_id, parent));
    if !attrs.is_empty() {
        doc.set_attributes(id, attrs);
    }
    if !self_closing && !is_void(&name) {
        stack.push(id);
    }
    i
}

/// Parse one attribute at `pos`; returns the parsed attribute (if the
/// name was non-empty) and the position after it.
fn parse_attribute(doc: &mut Document, input: &str, pos: usize) -> (Option<DomAttribute>, usize) {
    let bytes = input.as_bytes();
    let mut i = pos;
    let name_start = i;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    if i == name_start {
        return (None, i);
    }
    let name = input[name_start..i].to_ascii_lowercase();

    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i >= bytes.len() || bytes[i] != b'=' {
        // Valueless attribute, e.g. `disabled`
        let name_id = doc.intern(&name);
        return (Some(DomAttribute::new(name_id, 0)), i);
    }
    i += 1;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }

    let value = if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
        let quote = bytes[i];
        i += 1;
        let value_start = i;
        match memchr(quote, &bytes[i..]) {
            Some(offset) => {
                i += offset;
                let v = &input[value_start..i];
                i += 1;
                v
            }
            None => {
                let v = &input[value_start..];
                i = bytes.len();
                v
            }
        }
    } else {
        let value_start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' && bytes[i] != b'/' {
            i += 1;
        }
        &input[value_start..i]
    };

    let decoded = decode_entities(value);
    let name_id = doc.intern(&name);
    let value_id = doc.intern(&decoded);
    (Some(DomAttribute::new(name_id, value_id)), i)
}

fn push_text(doc: &mut Document, stack: &[NodeId], raw: &str) {
    if raw.trim().is_empty() {
        return;
    }
    let parent = *stack.last().unwrap_or(&0);
    let decoded = decode_entities(raw.trim());
    let content_id = doc.intern(&decoded);
    doc.push_node(DomNode::text(content_id, parent));
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':' || b == b'.'
}

/// Decode the named entities snapshots actually contain. Unknown
/// entities pass through verbatim.
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let replaced = [
            ("&amp;", "&"),
            ("&lt;", "<"),
            ("&gt;", ">"),
            ("&quot;", "\""),
            ("&apos;", "'"),
        ]
        .iter()
        .find(|(entity, _)| rest.starts_with(entity));
        match replaced {
            Some((entity, ch)) => {
                out.push_str(ch);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_elements_take_no_children() {
        let doc = parse_document("<div><br><span>after</span></div>");
        let div = doc.root_element_id().unwrap();
        let children = doc.children_vec(div);
        assert_eq!(children.len(), 2);
        assert_eq!(doc.tag_name(children[0]), Some("br"));
        assert_eq!(doc.tag_name(children[1]), Some("span"));
    }

    #[test]
    fn unclosed_elements_close_at_eof() {
        let doc = parse_document("<div><span>text");
        let div = doc.root_element_id().unwrap();
        let span = doc.children_vec(div)[0];
        assert_eq!(doc.tag_name(span), Some("span"));
        assert_eq!(doc.text(doc.children_vec(span)[0]), Some("text"));
    }

    #[test]
    fn stray_end_tag_is_ignored() {
        let doc = parse_document("<div></p><span/></div>");
        let div = doc.root_element_id().unwrap();
        let children = doc.children_vec(div);
        assert_eq!(children.len(), 1);
        assert_eq!(doc.tag_name(children[0]), Some("span"));
    }

    #[test]
    fn end_tag_closes_through_unclosed_inner_elements() {
        let doc = parse_document("<div><span>a</div><p/>");
        let top: Vec<_> = doc.children_vec(0);
        assert_eq!(top.len(), 2);
        assert_eq!(doc.tag_name(top[0]), Some("div"));
        assert_eq!(doc.tag_name(top[1]), Some("p"));

        // The unclosed span stays inside the div it opened in
        let span = doc.children_vec(top[0])[0];
        assert_eq!(doc.tag_name(span), Some("span"));
        assert_eq!(doc.text(doc.children_vec(span)[0]), Some("a"));
    }

    #[test]
    fn attributes_without_values_and_unquoted() {
        let doc = parse_document("<input disabled type=text value='a b'>");
        let input = doc.root_element_id().unwrap();
        assert_eq!(doc.attribute(input, "disabled"), Some(""));
        assert_eq!(doc.attribute(input, "type"), Some("text"));
        assert_eq!(doc.attribute(input, "value"), Some("a b"));
    }

    #[test]
    fn tag_and_attribute_names_are_lowercased() {
        let doc = parse_document("<DIV CLASS=\"Header\"/>");
        let div = doc.root_element_id().unwrap();
        assert_eq!(doc.tag_name(div), Some("div"));
        assert_eq!(doc.attribute(div, "class"), Some("Header"));
    }

    #[test]
    fn comments_and_doctype() {
        let doc = parse_document("<!DOCTYPE html><!-- note --><html/>");
        let html = doc.root_element_id().unwrap();
        assert_eq!(doc.tag_name(html), Some("html"));
        let comment = doc.children_vec(0)[0];
        assert_eq!(doc.text(comment), Some(" note "));
    }

    #[test]
    fn entities_decode_in_text_and_attributes() {
        let doc = parse_document("<a title=\"x &amp; y\">&lt;b&gt;</a>");
        let a = doc.root_element_id().unwrap();
        assert_eq!(doc.attribute(a, "title"), Some("x & y"));
        assert_eq!(doc.text(doc.children_vec(a)[0]), Some("<b>"));
    }

    #[test]
    fn garbage_input_yields_a_document() {
        let doc = parse_document("<<<>>> &&& </");
        assert!(doc.node_count() >= 1);
    }
}
