//! Sign a factura XML with a PKCS#12 credential.
//!
//! Usage: `cargo run --example sign_document --features signing -- <p12-path> <passphrase>`

use std::path::Path;

use sri_facturacion::signing::{CredentialSource, CredentialStore, Signer};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let [_, p12_path, passphrase] = args.as_slice() else {
        eprintln!("usage: sign_document <p12-path> <passphrase>");
        std::process::exit(1);
    };

    let credential = CredentialStore::load(CredentialSource::Path(Path::new(p12_path)), passphrase)
        .expect("failed to load PKCS#12 credential");
    println!("titular RUC: {}", credential.ruc_titular);
    println!("esFirmaDigital: {}", credential.es_firma_digital);

    let document = r#"<?xml version="1.0" encoding="UTF-8"?><factura id="comprobante" version="1.1.0"><infoTributaria/><detalles/></factura>"#;
    let signed = Signer::sign(document, &credential).expect("signing failed");
    println!("{}", signed.xml);
}
