//! Small quick-xml helpers shared by the part parsers.

use crate::error::Result;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Reader;

/// Gets the local name of an element (without namespace prefix).
pub fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Gets the local name of a closing tag.
pub fn local_name_end(e: &BytesEnd) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Gets an attribute value by local name, unescaped.
pub fn attr_value(e: &BytesStart, name: &str) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return attr.unescape_value().ok().map(|v| v.into_owned());
        }
    }
    None
}

/// Reads an on/off property such as `<w:b/>` or `<w:i w:val="0"/>`.
///
/// The element being present means on unless `val` says otherwise.
pub fn toggle_on(e: &BytesStart) -> bool {
    !matches!(
        attr_value(e, "val").as_deref(),
        Some("0") | Some("false") | Some("off") | Some("none")
    )
}

/// Skips an element and all its children.
pub fn skip_element(reader: &mut Reader<&[u8]>) -> Result<()> {
    let mut depth = 1;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_start(xml: &str) -> BytesStart<'static> {
        let mut reader = Reader::from_str(xml);
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) | Event::Empty(e) => return e.into_owned(),
                Event::Eof => panic!("no element"),
                _ => {}
            }
        }
    }

    #[test]
    fn test_local_name_strips_prefix() {
        assert_eq!(local_name(&first_start(r#"<w:pStyle w:val="Quote"/>"#)), "pStyle");
    }

    #[test]
    fn test_attr_value_by_local_name() {
        let e = first_start(r#"<a:blip r:embed="rId7" cstate="print"/>"#);
        assert_eq!(attr_value(&e, "embed").as_deref(), Some("rId7"));
        assert_eq!(attr_value(&e, "cstate").as_deref(), Some("print"));
        assert_eq!(attr_value(&e, "link"), None);
    }

    #[test]
    fn test_toggle_values() {
        assert!(toggle_on(&first_start("<w:b/>")));
        assert!(toggle_on(&first_start(r#"<w:b w:val="true"/>"#)));
        assert!(!toggle_on(&first_start(r#"<w:b w:val="0"/>"#)));
        assert!(!toggle_on(&first_start(r#"<w:i w:val="false"/>"#)));
    }
}
