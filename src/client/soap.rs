//! SOAP envelope construction and response parsing for the reception
//! and authorization services.

use base64::Engine;
use quick_xml::Reader;
use quick_xml::events::Event;

use super::state::{AuthorizationRecord, AuthorizationState, ReceptionResult, ReceptionState};
use crate::error::Error;

pub fn build_validar_envelope(signed_xml: &str) -> String {
    let xml_b64 = base64::engine::general_purpose::STANDARD.encode(signed_xml);
    format!(
        "<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\" \
         xmlns:ec=\"http://ec.gob.sri.ws.recepcion\">\
         <soapenv:Header/>\
         <soapenv:Body><ec:validarComprobante><xml>{xml_b64}</xml></ec:validarComprobante></soapenv:Body>\
         </soapenv:Envelope>"
    )
}

pub fn build_autorizacion_envelope(access_key: &str) -> String {
    format!(
        "<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\" \
         xmlns:ec=\"http://ec.gob.sri.ws.autorizacion\">\
         <soapenv:Header/>\
         <soapenv:Body><ec:autorizacionComprobante>\
         <claveAccesoComprobante>{access_key}</claveAccesoComprobante>\
         </ec:autorizacionComprobante></soapenv:Body>\
         </soapenv:Envelope>"
    )
}

/// Strip a namespace prefix off a qualified element name, the way SRI
/// responses mix `ns2:`/unprefixed elements inconsistently.
fn local_name(qname: &[u8]) -> &[u8] {
    match qname.iter().position(|&b| b == b':') {
        Some(pos) => &qname[pos + 1..],
        None => qname,
    }
}

/// Collect the text content of every element with local name `tag`,
/// namespace-prefix-insensitive.
fn extract_text(xml: &str, tag: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut out = Vec::new();
    let mut capturing = false;
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if local_name(e.name().as_ref()) == tag.as_bytes() => {
                capturing = true;
                current.clear();
            }
            Ok(Event::Text(t)) if capturing => {
                current.push_str(&t.unescape().unwrap_or_default());
            }
            Ok(Event::End(e)) if local_name(e.name().as_ref()) == tag.as_bytes() => {
                if capturing {
                    out.push(std::mem::take(&mut current));
                    capturing = false;
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
    out
}

pub fn parse_reception_response(xml: &str) -> Result<ReceptionResult, Error> {
    let estado = extract_text(xml, "estado").into_iter().next().ok_or_else(|| {
        Error::SriProtocolError("reception response has no estado element".into())
    })?;
    let state = match estado.as_str() {
        "RECIBIDA" => ReceptionState::Recibida,
        "DEVUELTA" => ReceptionState::Devuelta,
        other => {
            return Err(Error::SriProtocolError(format!(
                "unexpected reception estado {other:?}"
            )));
        }
    };
    Ok(ReceptionResult {
        state,
        messages: extract_text(xml, "mensaje"),
    })
}

pub fn parse_authorization_response(xml: &str) -> Result<AuthorizationRecord, Error> {
    let estado = extract_text(xml, "estado").into_iter().next().ok_or_else(|| {
        Error::SriProtocolError("authorization response has no estado element".into())
    })?;
    let state = match estado.as_str() {
        "AUTORIZADO" => AuthorizationState::Autorizado,
        "NO AUTORIZADO" => AuthorizationState::NoAutorizado,
        "RECHAZADA" => AuthorizationState::Rechazada,
        "EN PROCESO" => AuthorizationState::EnProceso,
        other => {
            return Err(Error::SriProtocolError(format!(
                "unexpected authorization estado {other:?}"
            )));
        }
    };
    Ok(AuthorizationRecord {
        state,
        authorization_number: extract_text(xml, "numeroAutorizacion").into_iter().next(),
        authorization_timestamp: extract_text(xml, "fechaAutorizacion").into_iter().next(),
        authorized_xml: extract_text(xml, "comprobante").into_iter().next(),
        messages: extract_text(xml, "mensaje"),
    })
}
