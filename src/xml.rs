// xml.rs -- Streaming XML event pump shared by the herds.xml and metadata.xml handlers

pub mod herds;
pub mod metadata;

use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::encoding::Decoder;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};

use crate::exception::HerdstatError;

/// Receives document events in depth-first order.
///
/// `enter`/`exit` calls are always balanced when [`parse_xml`] returns `Ok`.
/// Character data of an element is coalesced and trimmed, so `text` sees one
/// call per run of content between two tags.
pub trait XmlHandler {
    fn enter(&mut self, tag: &str, attrs: &[(String, String)]);
    fn exit(&mut self, tag: &str);
    fn text(&mut self, content: &str);
}

/// Feed the whole document read from `source` into `handler`.
pub fn parse_xml<R: BufRead, H: XmlHandler>(source: R, handler: &mut H) -> Result<(), HerdstatError> {
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();
    let mut pending = String::new();
    let mut open: Vec<String> = Vec::new();
    let mut seen_root = false;

    loop {
        let decoder = reader.decoder();
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            HerdstatError::parse(format!("{} (at byte {})", e, reader.buffer_position()))
        })?;

        match event {
            Event::Start(e) => {
                let (tag, attrs) = start_tag(&e, decoder, open.is_empty() && seen_root)?;
                flush_text(&mut pending, handler);
                handler.enter(&tag, &attrs);
                open.push(tag);
                seen_root = true;
            }
            Event::Empty(e) => {
                let (tag, attrs) = start_tag(&e, decoder, open.is_empty() && seen_root)?;
                flush_text(&mut pending, handler);
                handler.enter(&tag, &attrs);
                handler.exit(&tag);
                seen_root = true;
            }
            Event::End(e) => {
                let tag = decode(decoder, e.local_name().as_ref())?;
                if open.pop().is_none() {
                    return Err(HerdstatError::parse(format!("unexpected end tag </{}>", tag)));
                }
                flush_text(&mut pending, handler);
                handler.exit(&tag);
            }
            Event::Text(e) => {
                let content = decode(decoder, &e)?;
                if open.is_empty() {
                    if !content.trim().is_empty() {
                        return Err(HerdstatError::parse("character data outside the document element"));
                    }
                } else {
                    pending.push_str(&content);
                }
            }
            Event::CData(e) => {
                if open.is_empty() {
                    return Err(HerdstatError::parse("CDATA outside the document element"));
                }
                pending.push_str(&decode(decoder, &e)?);
            }
            Event::GeneralRef(e) => {
                let name = decode(decoder, &e)?;
                if open.is_empty() {
                    return Err(HerdstatError::parse(format!("entity &{}; outside the document element", name)));
                }
                pending.push_str(&resolve_entity(&name)?);
            }
            Event::Eof => break,
            // declaration, comments, processing instructions, doctype
            _ => {}
        }
        buf.clear();
    }

    if let Some(tag) = open.last() {
        return Err(HerdstatError::parse(format!(
            "unexpected end of document, <{}> is not closed",
            tag
        )));
    }
    if !seen_root {
        return Err(HerdstatError::parse("no document element"));
    }

    Ok(())
}

fn start_tag(
    e: &BytesStart<'_>,
    decoder: Decoder,
    after_root: bool,
) -> Result<(String, Vec<(String, String)>), HerdstatError> {
    let tag = decode(decoder, e.local_name().as_ref())?;
    if after_root {
        return Err(HerdstatError::parse(format!(
            "<{}> found after the document element",
            tag
        )));
    }

    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| HerdstatError::parse(e.to_string()))?;
        let key = decode(decoder, attr.key.as_ref())?;
        let value = decode(decoder, &attr.value)?;
        attrs.push((key, value));
    }

    Ok((tag, attrs))
}

fn decode(decoder: Decoder, bytes: &[u8]) -> Result<String, HerdstatError> {
    decoder
        .decode(bytes)
        .map(|s| s.into_owned())
        .map_err(|e| HerdstatError::parse(e.to_string()))
}

fn resolve_entity(name: &str) -> Result<String, HerdstatError> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => num.parse::<u32>(),
        };
        return code
            .ok()
            .and_then(char::from_u32)
            .map(|c| c.to_string())
            .ok_or_else(|| HerdstatError::parse(format!("invalid character reference &{};", name)));
    }

    resolve_predefined_entity(name)
        .map(|s| s.to_string())
        .ok_or_else(|| HerdstatError::parse(format!("unknown entity &{};", name)))
}

fn flush_text<H: XmlHandler>(pending: &mut String, handler: &mut H) {
    let content = pending.trim();
    if !content.is_empty() {
        handler.text(content);
    }
    pending.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl XmlHandler for Recorder {
        fn enter(&mut self, tag: &str, attrs: &[(String, String)]) {
            let attrs: Vec<String> = attrs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            self.events.push(format!("enter {} [{}]", tag, attrs.join(",")));
        }

        fn exit(&mut self, tag: &str) {
            self.events.push(format!("exit {}", tag));
        }

        fn text(&mut self, content: &str) {
            self.events.push(format!("text {}", content));
        }
    }

    fn record(doc: &str) -> Result<Vec<String>, HerdstatError> {
        let mut recorder = Recorder::default();
        parse_xml(doc.as_bytes(), &mut recorder)?;
        Ok(recorder.events)
    }

    #[test]
    fn test_events_in_document_order() {
        let events = record(r#"<?xml version="1.0"?>
<!-- comment -->
<herds>
  <herd kind="x">
    <name>a</name>
  </herd>
</herds>"#)
            .unwrap();

        assert_eq!(
            events,
            vec![
                "enter herds []",
                "enter herd [kind=x]",
                "enter name []",
                "text a",
                "exit name",
                "exit herd",
                "exit herds",
            ]
        );
    }

    #[test]
    fn test_empty_element_enters_and_exits() {
        let events = record("<herds><herd/></herds>").unwrap();
        assert_eq!(events, vec!["enter herds []", "enter herd []", "exit herd", "exit herds"]);
    }

    #[test]
    fn test_entities_and_cdata_are_coalesced() {
        let events = record("<d>Tools &amp; libs &#65;&#x42; <![CDATA[<raw>]]></d>").unwrap();
        assert_eq!(events[1], "text Tools & libs AB <raw>");
    }

    #[test]
    fn test_unknown_entity_fails() {
        assert!(matches!(record("<d>&bogus;</d>"), Err(HerdstatError::Parse(_))));
    }

    #[test]
    fn test_truncated_document_fails() {
        let err = record("<herds><herd><name>a</name>").unwrap_err();
        assert!(err.to_string().contains("<herd> is not closed"));
    }

    #[test]
    fn test_mismatched_end_tag_fails() {
        assert!(matches!(record("<herds><herd></herds>"), Err(HerdstatError::Parse(_))));
    }

    #[test]
    fn test_empty_document_fails() {
        assert!(matches!(record(""), Err(HerdstatError::Parse(_))));
        assert!(matches!(record("   \n"), Err(HerdstatError::Parse(_))));
    }

    #[test]
    fn test_second_root_fails() {
        assert!(matches!(record("<a/><b/>"), Err(HerdstatError::Parse(_))));
    }
}
