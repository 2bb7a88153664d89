//! End-to-end: build a factura, sign it, and check signature placement.

use chrono::NaiveDate;
use openssl::asn1::Asn1Time;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::{X509Builder, X509NameBuilder};
use rust_decimal_macros::dec;

use sri_facturacion::core::*;
use sri_facturacion::signing::{Credential, Signer};

fn self_signed_credential(ruc: &str) -> Credential {
    let rsa = Rsa::generate(2048).unwrap();
    let private_key = PKey::from_rsa(rsa).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "TEST TITULAR").unwrap();
    name.append_entry_by_text("SN", ruc).unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&private_key).unwrap();
    builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::days_from_now(365).unwrap()).unwrap();
    builder.sign(&private_key, MessageDigest::sha256()).unwrap();
    let certificate = builder.build();

    Credential {
        private_key,
        certificate,
        ca_chain: vec![],
        ruc_titular: ruc.to_string(),
        es_firma_digital: true,
    }
}

fn sample_record() -> InvoiceRecord {
    InvoiceRecord {
        emitter: Emitter {
            ruc: "0918097783001".into(),
            razon_social: "ACME SA".into(),
            nombre_comercial: None,
            dir_matriz: "Av. Amazonas N12-34".into(),
            dir_establecimiento: None,
            cod_establecimiento: "001".into(),
            pto_emision: "001".into(),
            obligado_contabilidad: true,
        },
        ambiente: Environment::Test,
        tipo_emision: EmissionType::Normal,
        secuencial: "000000001".into(),
        fecha_emision: NaiveDate::from_ymd_opt(2025, 8, 7).unwrap(),
        buyer: Buyer {
            id_type: BuyerIdType::ConsumidorFinal,
            identification: "9999999999".into(),
            razon_social: "CONSUMIDOR FINAL".into(),
            direccion: None,
            email: None,
            telefono: None,
        },
        items: vec![Item {
            codigo_principal: "SKU-001".into(),
            descripcion: "Consultoria".into(),
            cantidad: dec!(1),
            precio_unitario: dec!(10.00),
            descuento: dec!(0),
            impuestos: vec![ItemTax {
                codigo: 2,
                codigo_porcentaje: 2,
                base_imponible: dec!(10.00),
                valor: dec!(1.20),
                tarifa: None,
            }],
            precio_total_sin_impuesto: None,
        }],
        payments: vec![],
        propina: dec!(0),
        info_adicional: vec![("Email".into(), "cliente@example.com".into())],
    }
}

#[test]
fn signature_is_the_last_child_of_the_root_after_signing() {
    let key = KeyBuilder::generate(
        NaiveDate::from_ymd_opt(2025, 8, 7).unwrap(),
        DocType::Factura,
        "0918097783001",
        Environment::Test,
        "001001",
        "000000001",
        EmissionType::Normal,
        12_345_678,
    )
    .unwrap();

    let document = build_factura(&sample_record(), &key, 0).unwrap();
    let credential = self_signed_credential("0918097783001");
    let signed = Signer::sign(&document, &credential).unwrap();

    assert!(signed.xml.ends_with("</factura>"));
    let signature_start = signed.xml.find("<ds:Signature").expect("signature present");
    let info_adicional_end = signed.xml.rfind("</infoAdicional>");
    let detalles_end = signed.xml.rfind("</detalles>").expect("detalles present");
    let preceding_end = info_adicional_end.unwrap_or(detalles_end);

    assert!(
        signature_start > preceding_end,
        "ds:Signature must follow infoAdicional (or detalles when absent)"
    );
    assert_eq!(
        signed.xml[signature_start..].matches("<ds:Signature").count(),
        1,
        "signature must appear exactly once"
    );
}
