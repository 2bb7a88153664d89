//! PKCS#12 credential loading and XML-DSIG enveloped signing — the
//! `signing` feature.

mod canonicalize;
mod credential;
mod signer;

pub use credential::{Credential, CredentialSource, CredentialStore};
pub use signer::{SignedDocument, Signer};
