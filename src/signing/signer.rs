//! XML-DSIG enveloped signing. Algorithm URIs are fixed
//! constants, never caller-configurable — SRI rejects anything else.

use base64::Engine;
use openssl::hash::{MessageDigest, hash};
use openssl::sign::Signer as OsslSigner;
use quick_xml::Reader;
use quick_xml::events::Event;

use super::canonicalize::canonicalize;
use super::credential::Credential;
use crate::error::Error;

const C14N_URI: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
const SIGNATURE_METHOD: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
const DIGEST_METHOD: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
const ENVELOPED_TRANSFORM: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
const DS_NS: &str = "http://www.w3.org/2000/09/xmldsig#";
const REFERENCE_URI: &str = "#comprobante";

/// A signed comprobante — the original XML with a `ds:Signature`
/// appended as the last child of the root.
pub struct SignedDocument {
    pub xml: String,
}

pub struct Signer;

impl Signer {
    /// Sign `document_xml`, whose root must carry `id="comprobante"`.
    /// Signing an already-signed document is an error (idempotent, not
    /// re-entrant).
    pub fn sign(document_xml: &str, credential: &Credential) -> Result<SignedDocument, Error> {
        if document_xml.contains("ds:Signature") {
            return Err(Error::SigningError(
                "document already carries a ds:Signature element".into(),
            ));
        }
        if !document_xml.contains(r#"id="comprobante""#) {
            return Err(Error::SchemaViolation(
                "root element has no id=\"comprobante\" attribute to sign".into(),
            ));
        }

        // The ds: namespace must be declared on the root element itself
        // (not just on the ds:Signature subtree it scopes), so it has to
        // be added before the digest is computed, not after.
        let document_xml = ensure_root_declares_ds_namespace(document_xml)?;
        let canonical_document = canonicalize(&document_xml)?;
        let document_digest = hash(MessageDigest::sha256(), &canonical_document)
            .map_err(|e| Error::SigningError(format!("digest computation failed: {e}")))?;
        let document_digest_b64 = base64::engine::general_purpose::STANDARD.encode(document_digest);

        let signed_info = build_signed_info(&document_digest_b64);
        let canonical_signed_info = canonicalize(&signed_info)?;

        let mut signer = OsslSigner::new(MessageDigest::sha256(), &credential.private_key)
            .map_err(|e| Error::SigningError(format!("failed to initialize RSA-SHA256 signer: {e}")))?;
        signer
            .update(&canonical_signed_info)
            .map_err(|e| Error::SigningError(format!("signer update failed: {e}")))?;
        let signature_bytes = signer
            .sign_to_vec()
            .map_err(|e| Error::SigningError(format!("signing failed: {e}")))?;
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(signature_bytes);

        let cert_der = credential
            .certificate
            .to_der()
            .map_err(|e| Error::SigningError(format!("certificate DER encoding failed: {e}")))?;
        let cert_b64 = base64::engine::general_purpose::STANDARD.encode(cert_der);

        let signature_element = format!(
            "<ds:Signature xmlns:ds=\"{DS_NS}\" Id=\"SriSignature\">\
             {signed_info}\
             <ds:SignatureValue>{signature_b64}</ds:SignatureValue>\
             <ds:KeyInfo><ds:X509Data><ds:X509Certificate>{cert_b64}</ds:X509Certificate></ds:X509Data></ds:KeyInfo>\
             </ds:Signature>"
        );

        let signed_xml = insert_before_closing_root(&document_xml, &signature_element)?;
        Ok(SignedDocument { xml: signed_xml })
    }
}

/// Declare `xmlns:ds` on the root element if it isn't already present.
/// Must run before the document digest is computed — the enveloped
/// transform only strips `ds:Signature` itself, so every other byte of
/// the root start tag is part of what gets digested and later verified.
fn ensure_root_declares_ds_namespace(xml: &str) -> Result<String, Error> {
    if xml.contains(&format!("xmlns:ds=\"{DS_NS}\"")) {
        return Ok(xml.to_string());
    }
    let root = root_element_name(xml)?;
    let open_tag_start = xml
        .find(&format!("<{root}"))
        .ok_or_else(|| Error::SchemaViolation(format!("no opening tag found for root element {root}")))?;
    let tag_close = xml[open_tag_start..]
        .find('>')
        .map(|i| open_tag_start + i)
        .ok_or_else(|| Error::SchemaViolation("root opening tag is not closed".into()))?;

    let mut out = String::with_capacity(xml.len() + DS_NS.len() + 16);
    out.push_str(&xml[..tag_close]);
    out.push_str(&format!(" xmlns:ds=\"{DS_NS}\""));
    out.push_str(&xml[tag_close..]);
    Ok(out)
}

fn build_signed_info(digest_b64: &str) -> String {
    format!(
        "<ds:SignedInfo>\
         <ds:CanonicalizationMethod Algorithm=\"{C14N_URI}\"/>\
         <ds:SignatureMethod Algorithm=\"{SIGNATURE_METHOD}\"/>\
         <ds:Reference URI=\"{REFERENCE_URI}\">\
         <ds:Transforms>\
         <ds:Transform Algorithm=\"{ENVELOPED_TRANSFORM}\"/>\
         <ds:Transform Algorithm=\"{C14N_URI}\"/>\
         </ds:Transforms>\
         <ds:DigestMethod Algorithm=\"{DIGEST_METHOD}\"/>\
         <ds:DigestValue>{digest_b64}</ds:DigestValue>\
         </ds:Reference>\
         </ds:SignedInfo>"
    )
}

fn root_element_name(xml: &str) -> Result<String, Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    loop {
        match reader
            .read_event()
            .map_err(|e| Error::SchemaViolation(format!("failed to parse document root: {e}")))?
        {
            Event::Start(start) | Event::Empty(start) => {
                return Ok(String::from_utf8_lossy(start.name().as_ref()).into_owned());
            }
            Event::Eof => {
                return Err(Error::SchemaViolation("document has no root element".into()));
            }
            _ => continue,
        }
    }
}

/// Append `fragment` as the last child of the root element (the
/// signature MUST be the last child, not just appended to the string).
fn insert_before_closing_root(xml: &str, fragment: &str) -> Result<String, Error> {
    let root = root_element_name(xml)?;
    let closing_tag = format!("</{root}>");
    let idx = xml
        .rfind(&closing_tag)
        .ok_or_else(|| Error::SchemaViolation(format!("no closing tag for root element {root}")))?;
    let mut out = String::with_capacity(xml.len() + fragment.len());
    out.push_str(&xml[..idx]);
    out.push_str(fragment);
    out.push_str(&xml[idx..]);
    Ok(out)
}
