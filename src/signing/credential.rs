//! PKCS#12 credential extraction.

use std::path::Path;

use base64::Engine;
use openssl::asn1::Asn1Time;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use zeroize::Zeroizing;

use crate::error::Error;

/// Where the PKCS#12 bytes come from.
pub enum CredentialSource<'a> {
    Path(&'a Path),
    Base64(&'a str),
}

/// A loaded, validated signing credential.
pub struct Credential {
    pub private_key: PKey<Private>,
    pub certificate: X509,
    pub ca_chain: Vec<X509>,
    /// RUC recovered from the titular certificate's subject fields.
    pub ruc_titular: String,
    /// `esFirmaDigital` — whether the certificate's keyUsage marks it
    /// as a qualified digital-signature certificate.
    pub es_firma_digital: bool,
}

pub struct CredentialStore;

impl CredentialStore {
    /// Parse a PKCS#12 container and extract the titular signing credential.
    pub fn load(source: CredentialSource, passphrase: &str) -> Result<Credential, Error> {
        let der: Zeroizing<Vec<u8>> = Zeroizing::new(match source {
            CredentialSource::Path(path) => std::fs::read(path).map_err(|e| {
                Error::InvalidCredential(format!("failed to read {}: {e}", path.display()))
            })?,
            CredentialSource::Base64(b64) => base64::engine::general_purpose::STANDARD
                .decode(b64)
                .map_err(|e| {
                    Error::InvalidCredential(format!("invalid base64 PKCS#12 blob: {e}"))
                })?,
        });

        let pkcs12 = Pkcs12::from_der(&der)
            .map_err(|e| Error::InvalidCredential(format!("malformed PKCS#12 container: {e}")))?;
        let parsed = pkcs12
            .parse2(passphrase)
            .map_err(|_| Error::InvalidCredential("wrong passphrase or corrupt PKCS#12 bags".into()))?;

        let private_key = parsed
            .pkey
            .ok_or_else(|| Error::InvalidCredential("PKCS#12 container has no private key bag".into()))?;
        let main_cert = parsed
            .cert
            .ok_or_else(|| Error::InvalidCredential("PKCS#12 container has no certificate bag".into()))?;
        let ca_chain: Vec<X509> = parsed
            .ca
            .map(|stack| stack.iter().map(|c| c.to_owned()).collect())
            .unwrap_or_default();

        let mut candidates = vec![main_cert.clone()];
        candidates.extend(ca_chain.iter().cloned());

        let titular = select_titular(&candidates, &private_key);
        check_validity(titular)?;

        let ruc_titular = extract_ruc(titular)
            .ok_or_else(|| Error::InvalidCredential("could not recover RUC from certificate subject".into()))?;
        let es_firma_digital = match key_usage_bits(titular) {
            Some(bits) => bits & 0b1100_0000 == 0b1100_0000,
            None => has_subject_name(titular) && !ruc_titular.is_empty(),
        };

        Ok(Credential {
            private_key,
            certificate: titular.clone(),
            ca_chain,
            ruc_titular,
            es_firma_digital,
        })
    }
}

/// Pick the titular certificate: prefer one whose `keyUsage` asserts
/// both `digitalSignature` and `nonRepudiation` and whose public key's
/// RSA modulus matches `private_key`. Falls back to the first candidate
/// only when no certificate satisfies both conditions.
fn select_titular<'a>(candidates: &'a [X509], private_key: &PKey<Private>) -> &'a X509 {
    candidates
        .iter()
        .find(|cert| is_signing_capable(cert) && matches_private_key(cert, private_key))
        .unwrap_or(&candidates[0])
}

/// Whether `cert`'s public key has the same RSA modulus as `private_key`.
fn matches_private_key(cert: &X509, private_key: &PKey<Private>) -> bool {
    let (Ok(priv_rsa), Ok(pub_key)) = (private_key.rsa(), cert.public_key()) else {
        return false;
    };
    let Ok(pub_rsa) = pub_key.rsa() else {
        return false;
    };
    priv_rsa.n() == pub_rsa.n()
}

/// Whether `cert`'s `keyUsage` extension asserts both `digitalSignature`
/// (bit 0) and `nonRepudiation` (bit 1).
fn is_signing_capable(cert: &X509) -> bool {
    match key_usage_bits(cert) {
        Some(bits) => bits & 0b1100_0000 == 0b1100_0000,
        None => false,
    }
}

/// Fallback for `esFirmaDigital` when a certificate carries no
/// `keyUsage` extension at all: true whenever a subject CN was found.
fn has_subject_name(cert: &X509) -> bool {
    cert.subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .is_some()
}

/// Decode the raw DER `BIT STRING` carried by the `keyUsage` extension
/// into its first octet of usage bits.
fn key_usage_bits(cert: &X509) -> Option<u8> {
    let (_, ext) = cert.extension_by_nid(Nid::KEY_USAGE)?;
    let der = ext.data().as_slice();
    if der.len() < 4 || der[0] != 0x03 {
        return None;
    }
    let len = der[1] as usize;
    if len < 2 || der.len() < 2 + len {
        return None;
    }
    Some(der[3])
}

fn check_validity(cert: &X509) -> Result<(), Error> {
    let now = Asn1Time::days_from_now(0)
        .map_err(|e| Error::InvalidCredential(format!("failed to compute current time: {e}")))?;
    if *cert.not_after() < *now {
        return Err(Error::InvalidCredential("certificate has expired".into()));
    }
    if *cert.not_before() > *now {
        return Err(Error::InvalidCredential("certificate is not yet valid".into()));
    }
    Ok(())
}

/// Non-standard extension some SRI-issued certificates carry the RUC in
/// directly, rather than leaving it to be recovered from subject fields.
const SRI_RUC_EXTENSION_OID: &str = "1.3.6.1.4.1.37746.3.11";

/// Scan a certificate's subject fields, the SRI RUC extension, and
/// (failing those) its own serial number for a 10-13 digit run.
fn extract_ruc(cert: &X509) -> Option<String> {
    let subject = cert.subject_name();

    for nid in [Nid::SERIALNUMBER, Nid::UNIQUE_IDENTIFIER] {
        for entry in subject.entries_by_nid(nid) {
            if let Ok(text) = entry.data().as_utf8() {
                if let Some(ruc) = scan_for_digit_run(text.as_ref()) {
                    return Some(ruc);
                }
            }
        }
    }

    if let Some(names) = cert.subject_alt_names() {
        for name in &names {
            if let Some(email) = name.email() {
                if let Some(ruc) = scan_for_digit_run(email) {
                    return Some(ruc);
                }
            }
        }
    }

    if let Some(ruc) = extract_ruc_from_sri_extension(cert) {
        return Some(ruc);
    }

    let serial_dec = cert.serial_number().to_bn().ok()?.to_dec_str().ok()?.to_string();
    scan_for_digit_run(&serial_dec)
}

/// Look up the SRI RUC extension by its raw OID. Custom OIDs have to be
/// registered with OpenSSL's object database before `extension_by_nid`
/// can find them, since certificates carry the extension only as a
/// DER-encoded OID, not a NID.
fn extract_ruc_from_sri_extension(cert: &X509) -> Option<String> {
    let nid = Nid::create(SRI_RUC_EXTENSION_OID, "sriRuc", "SRI RUC Extension").ok()?;
    let (_, ext) = cert.extension_by_nid(nid)?;
    let text = String::from_utf8_lossy(ext.data().as_slice());
    scan_for_digit_run(&text)
}

/// Find the first contiguous run of 10-13 ASCII digits. A 10-digit run
/// (cédula) is right-padded with `"001"` to become a 13-digit RUC.
fn scan_for_digit_run(s: &str) -> Option<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let run_len = i - start;
            if (10..=13).contains(&run_len) {
                let digits: String = chars[start..i].iter().collect();
                return Some(if run_len == 10 {
                    format!("{digits}001")
                } else {
                    digits
                });
            }
        } else {
            i += 1;
        }
    }
    None
}
