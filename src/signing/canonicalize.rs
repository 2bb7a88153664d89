//! Inclusive C14N (`http://www.w3.org/TR/2001/REC-xml-c14n-20010315`),
//! restricted to the unprefixed, namespace-free documents this crate
//! produces. No crate in the corpus implements C14N, so this is
//! a small hand-rolled serializer over a `quick_xml`-parsed event
//! stream: strip the XML declaration and comments, expand empty
//! elements, sort attributes, and apply the canonical escaping rules.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::Error;

fn c14n_io(e: quick_xml::Error) -> Error {
    Error::SigningError(format!("C14N parse error: {e}"))
}

/// Canonicalize an XML document (or well-formed fragment) per inclusive
/// C14N, returning the canonical UTF-8 byte sequence used for digesting.
pub fn canonicalize(xml: &str) -> Result<Vec<u8>, Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut out = Vec::with_capacity(xml.len());

    loop {
        match reader.read_event().map_err(c14n_io)? {
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => continue,
            Event::Start(start) => {
                write_open_tag(&mut out, &start)?;
            }
            Event::Empty(start) => {
                write_open_tag(&mut out, &start)?;
                out.extend_from_slice(b"</");
                out.extend_from_slice(start.name().as_ref());
                out.push(b'>');
            }
            Event::End(end) => {
                out.extend_from_slice(b"</");
                out.extend_from_slice(end.name().as_ref());
                out.push(b'>');
            }
            Event::Text(text) => {
                let raw = text.unescape().map_err(c14n_io)?;
                out.extend_from_slice(escape_text(&raw).as_bytes());
            }
            Event::CData(cdata) => {
                let raw = String::from_utf8_lossy(cdata.as_ref()).into_owned();
                out.extend_from_slice(escape_text(&raw).as_bytes());
            }
            Event::Eof => break,
        }
    }

    Ok(out)
}

fn write_open_tag(
    out: &mut Vec<u8>,
    start: &quick_xml::events::BytesStart<'_>,
) -> Result<(), Error> {
    out.push(b'<');
    out.extend_from_slice(start.name().as_ref());

    let mut attrs: Vec<(String, String)> = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::SigningError(format!("C14N attribute error: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(c14n_io)?
            .into_owned();
        attrs.push((key, value));
    }
    attrs.sort_by(|a, b| a.0.cmp(&b.0));

    for (key, value) in &attrs {
        out.push(b' ');
        out.extend_from_slice(key.as_bytes());
        out.extend_from_slice(b"=\"");
        out.extend_from_slice(escape_attr(value).as_bytes());
        out.push(b'"');
    }
    out.push(b'>');
    Ok(())
}

/// C14N text-node escaping: `&`, `<`, `>`, and CR.
fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            c => out.push(c),
        }
    }
    out
}

/// C14N attribute-value escaping: `&`, `<`, `"`, tab, LF, CR.
fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            c => out.push(c),
        }
    }
    out
}
