//! Full re-encode of a [`Document`] to bytes.

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use super::{Document, NodeId, NodeKind};
use crate::error::Result;

pub(crate) fn serialize(doc: &Document) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    write_node(doc, doc.root(), &mut writer)?;
    Ok(writer.into_inner())
}

fn write_node(doc: &Document, id: NodeId, writer: &mut Writer<Vec<u8>>) -> Result<()> {
    match doc.kind(id) {
        NodeKind::Element => {
            let name = doc.name(id).to_string();
            let mut start = BytesStart::new(name.as_str());
            for &attr in doc.attributes(id) {
                // Namespace declarations write back as plain attributes.
                start.push_attribute((doc.name(attr), doc.child_content(attr).unwrap_or("")));
            }
            if doc.children(id).is_empty() {
                writer.write_event(Event::Empty(start))?;
            } else {
                writer.write_event(Event::Start(start))?;
                for &child in doc.children(id) {
                    write_node(doc, child, writer)?;
                }
                writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
            }
        }
        NodeKind::Text => {
            writer.write_event(Event::Text(BytesText::new(
                doc.child_content(id).unwrap_or(""),
            )))?;
        }
        NodeKind::Comment => {
            writer.write_event(Event::Comment(BytesText::from_escaped(
                doc.child_content(id).unwrap_or(""),
            )))?;
        }
        // Attribute and namespace nodes are emitted with their owner element
        // and never appear in the child walk.
        NodeKind::Attribute | NodeKind::Namespace => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::dom::Document;

    fn serialized(doc: &Document) -> String {
        String::from_utf8(doc.serialize().unwrap()).unwrap()
    }

    #[test]
    fn test_serialize_skeleton() {
        let doc = Document::new();
        assert_eq!(serialized(&doc), "<html><head/><body/></html>");
    }

    #[test]
    fn test_serialize_escapes_text() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.set_content(body, "a < b & c").unwrap();
        let out = serialized(&doc);
        assert!(out.contains("a &lt; b &amp; c"));
    }

    #[test]
    fn test_serialize_attributes() {
        let doc = Document::parse(b"<body><a href=\"x.html\">go</a></body>").unwrap();
        let out = serialized(&doc);
        assert!(out.contains("<a href=\"x.html\">go</a>"));
    }

    #[test]
    fn test_roundtrip_mutated_document() {
        let mut doc = Document::new();
        doc.append_head_element("title", "My Book");
        let fragment = Document::parse(b"<p>Hello <b>world</b></p>").unwrap();
        let p = fragment.children(fragment.body())[0];
        doc.append_body_copy(&fragment, p, false).unwrap();

        let first = doc.serialize().unwrap();
        let reparsed = Document::parse(&first).unwrap();
        let second = reparsed.serialize().unwrap();
        assert_eq!(first, second);
    }
}
