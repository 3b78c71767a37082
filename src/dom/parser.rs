//! Best-effort recovery parse of markup bytes into a [`Document`].

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

use super::{Document, Node, NodeId, NodeKind};
use crate::error::{Error, Result};
use crate::util;

pub(crate) fn parse(bytes: &[u8]) -> Result<Document> {
    if bytes.is_empty() {
        return Err(Error::Parse("empty input".into()));
    }

    let hint = util::extract_xml_encoding(bytes);
    let text = util::decode_text(bytes, hint);

    let mut reader = Reader::from_str(&text);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    // Scratch root collects top-level content; normalization below decides
    // the real html/head/body structure.
    let mut doc = Document {
        nodes: vec![Node::element("#fragment")],
        root: NodeId(0),
        head: NodeId(0),
        body: NodeId(0),
    };
    let scratch = NodeId(0);
    let mut stack: Vec<NodeId> = vec![scratch];

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let element = open_element(&mut doc, *stack.last().unwrap(), &e);
                stack.push(element);
            }
            Ok(Event::Empty(e)) => {
                open_element(&mut doc, *stack.last().unwrap(), &e);
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                // Lenient close: pop to the nearest matching open element,
                // ignore closers that match nothing.
                if let Some(pos) = stack[1..]
                    .iter()
                    .rposition(|&id| doc.node(id).name == name)
                {
                    stack.truncate(pos + 1);
                }
            }
            Ok(Event::Text(e)) => {
                let value = match e.decode() {
                    Ok(t) => t.into_owned(),
                    Err(_) => String::from_utf8_lossy(&e).into_owned(),
                };
                if !value.is_empty() {
                    let text = doc.alloc(Node::text(&value));
                    let parent = *stack.last().unwrap();
                    doc.append_child(parent, text);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                let value = resolve_entity(&String::from_utf8_lossy(&e));
                let text = doc.alloc(Node::text(&value));
                let parent = *stack.last().unwrap();
                doc.append_child(parent, text);
            }
            Ok(Event::CData(e)) => {
                let value = String::from_utf8_lossy(&e).into_owned();
                let text = doc.alloc(Node::text(&value));
                let parent = *stack.last().unwrap();
                doc.append_child(parent, text);
            }
            Ok(Event::Comment(e)) => {
                let value = String::from_utf8_lossy(&e).into_owned();
                let comment = doc.alloc(Node::comment(&value));
                let parent = *stack.last().unwrap();
                doc.append_child(parent, comment);
            }
            Ok(Event::Decl(_)) | Ok(Event::PI(_)) | Ok(Event::DocType(_)) => {}
            Ok(Event::Eof) => break,
            Err(err) => {
                // Keep whatever was read so far; the emptiness check below
                // decides whether that amounts to a document.
                debug!(error = %err, "recovering from markup error");
                break;
            }
        }
    }

    normalize(doc, scratch)
}

/// Create an element from a start/empty tag and attach it.
fn open_element(
    doc: &mut Document,
    parent: NodeId,
    tag: &quick_xml::events::BytesStart,
) -> NodeId {
    let name = String::from_utf8_lossy(tag.name().as_ref()).to_ascii_lowercase();
    let element = doc.alloc(Node::element(&name));
    for attr in tag.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        doc.set_attribute(element, &key, &value);
    }
    doc.append_child(parent, element);
    element
}

/// Resolve a general entity reference, keeping unknown ones literal.
fn resolve_entity(name: &str) -> String {
    match name {
        "amp" => "&".to_string(),
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        "nbsp" => "\u{a0}".to_string(),
        _ => {
            if let Some(code) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                if let Some(c) = u32::from_str_radix(code, 16).ok().and_then(char::from_u32) {
                    return c.to_string();
                }
            } else if let Some(code) = name.strip_prefix('#')
                && let Some(c) = code.parse::<u32>().ok().and_then(char::from_u32)
            {
                return c.to_string();
            }
            format!("&{};", name)
        }
    }
}

/// Establish the html/head/body structure over whatever the event loop
/// produced, synthesizing missing wrappers and reparenting stray content
/// into the body.
fn normalize(mut doc: Document, scratch: NodeId) -> Result<Document> {
    let top: Vec<NodeId> = doc.node(scratch).children.clone();
    doc.node_mut(scratch).children.clear();

    let has_content = top.iter().any(|&id| match doc.node(id).kind {
        NodeKind::Element => true,
        NodeKind::Text => !doc.node(id).value.trim().is_empty(),
        _ => false,
    });
    if !has_content {
        return Err(Error::Parse("no markup content".into()));
    }

    let mut html = None;
    let mut head = None;
    let mut body = None;
    let mut strays: Vec<NodeId> = Vec::new();

    for &id in &top {
        let node = doc.node(id);
        match (node.kind, node.name.as_str()) {
            (NodeKind::Element, "html") if html.is_none() => html = Some(id),
            (NodeKind::Element, "head") if html.is_none() && head.is_none() => head = Some(id),
            (NodeKind::Element, "body") if html.is_none() && body.is_none() => body = Some(id),
            (NodeKind::Text, _) if node.value.trim().is_empty() => {}
            (NodeKind::Comment, _) => {}
            _ => strays.push(id),
        }
    }

    let html = match html {
        Some(id) => {
            doc.node_mut(id).parent = None;
            id
        }
        None => doc.alloc(Node::element("html")),
    };

    // Discover head/body inside an existing html element.
    for &child in &doc.node(html).children.clone() {
        let node = doc.node(child);
        if node.kind != NodeKind::Element {
            continue;
        }
        match node.name.as_str() {
            "head" if head.is_none() => head = Some(child),
            "body" if body.is_none() => body = Some(child),
            _ => {}
        }
    }

    let head = match head {
        Some(id) => {
            if doc.node(id).parent != Some(html) {
                doc.node_mut(id).parent = Some(html);
                doc.node_mut(html).children.insert(0, id);
            }
            id
        }
        None => {
            let id = doc.alloc(Node::element("head"));
            doc.node_mut(id).parent = Some(html);
            doc.node_mut(html).children.insert(0, id);
            id
        }
    };

    let body = match body {
        Some(id) => {
            if doc.node(id).parent != Some(html) {
                doc.append_child(html, id);
            }
            id
        }
        None => {
            let id = doc.alloc(Node::element("body"));
            doc.append_child(html, id);
            id
        }
    };

    for id in strays {
        doc.node_mut(id).parent = None;
        doc.append_child(body, id);
    }

    doc.root = html;
    doc.head = head;
    doc.body = body;
    Ok(doc)
}
