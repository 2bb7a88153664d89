use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use rust_decimal::Decimal;
use std::io::Cursor;

use crate::error::Error;

pub type XmlResult = Result<String, Error>;

fn xml_io(e: std::io::Error) -> Error {
    Error::SchemaViolation(format!("XML write error: {e}"))
}

/// A small indentation-free XML writer used by [`super::document`] to
/// build the factura tree. Mirrors the way a hand-rolled `quick_xml`
/// writer is used elsewhere in this corpus for UBL/CII generation — kept
/// deliberately thin: one `start`/`end`/`text` primitive each, plus a
/// decimal-amount helper.
pub struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    pub fn new() -> Result<Self, Error> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_io)?;
        Ok(Self { writer })
    }

    pub fn into_string(self) -> Result<String, Error> {
        let buf = self.writer.into_inner().into_inner();
        String::from_utf8(buf).map_err(|e| Error::SchemaViolation(format!("XML UTF-8 error: {e}")))
    }

    pub fn start_element(&mut self, name: &str) -> Result<&mut Self, Error> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn start_element_with_attrs(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, Error> {
        let mut elem = BytesStart::new(name);
        for (k, v) in attrs {
            elem.push_attribute((*k, *v));
        }
        self.writer.write_event(Event::Start(elem)).map_err(xml_io)?;
        Ok(self)
    }

    pub fn end_element(&mut self, name: &str) -> Result<&mut Self, Error> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn text_element(&mut self, name: &str, text: &str) -> Result<&mut Self, Error> {
        self.start_element(name)?;
        self.writer
            .write_event(Event::Text(BytesText::from_escaped(sanitize_text(text))))
            .map_err(xml_io)?;
        self.end_element(name)
    }

    /// Write a decimal amount with at least two decimal places (
    /// numeric formatting rule).
    pub fn decimal_element(&mut self, name: &str, amount: Decimal) -> Result<&mut Self, Error> {
        self.text_element(name, &format_decimal(amount))
    }

    pub fn text_element_with_attrs(
        &mut self,
        name: &str,
        text: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, Error> {
        self.start_element_with_attrs(name, attrs)?;
        self.writer
            .write_event(Event::Text(BytesText::from_escaped(sanitize_text(text))))
            .map_err(xml_io)?;
        self.end_element(name)
    }

    /// `<campoAdicional nombre="...">value</campoAdicional>` — used by
    /// `infoAdicional`.
    pub fn text_element_with_name_attr(
        &mut self,
        elem: &str,
        nombre: &str,
        text: &str,
    ) -> Result<&mut Self, Error> {
        self.text_element_with_attrs(elem, text, &[("nombre", nombre)])
    }
}

/// Entity-escape `&<>"'`, strip C0 control characters except tab/LF/CR,
/// and strip code points that are illegal in XML 1.0 (text
/// sanitization rule).
pub fn sanitize_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 => {} // C0 control, stripped
            c if is_xml10_illegal(c) => {}
            c => out.push(c),
        }
    }
    out
}

fn is_xml10_illegal(c: char) -> bool {
    let cp = c as u32;
    matches!(cp, 0x7F..=0x84 | 0x86..=0x9F | 0xFDD0..=0xFDEF)
        || (cp & 0xFFFE) == 0xFFFE // noncharacters U+xFFFE / U+xFFFF in every plane
}

/// Format a `Decimal` with exactly two decimal places (half-away-from-zero
/// rounding — SRI requires the invariant hold to the cent, not a specific
/// rounding mode beyond that).
pub fn format_decimal(d: Decimal) -> String {
    format!("{:.2}", d.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero))
}
