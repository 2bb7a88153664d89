//! Build an `InvoiceRecord` and render its factura v1.1.0 XML.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use sri_facturacion::core::*;

fn main() {
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
    .expect("valid access key inputs");

    let record = InvoiceRecord {
        emitter: Emitter {
            ruc: "0918097783001".into(),
            razon_social: "ACME SA".into(),
            nombre_comercial: Some("ACME".into()),
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
            id_type: BuyerIdType::Cedula,
            identification: "0912345678".into(),
            razon_social: "Juan Perez".into(),
            direccion: Some("Calle Falsa 123".into()),
            email: None,
            telefono: None,
        },
        items: vec![Item {
            codigo_principal: "SKU-001".into(),
            descripcion: "Consultoria".into(),
            cantidad: dec!(2),
            precio_unitario: dec!(50.00),
            descuento: dec!(0),
            impuestos: vec![ItemTax {
                codigo: 2,
                codigo_porcentaje: 2,
                base_imponible: dec!(100.00),
                valor: dec!(12.00),
                tarifa: None,
            }],
            precio_total_sin_impuesto: None,
        }],
        payments: vec![],
        propina: dec!(0),
        info_adicional: vec![("Email".into(), "juan@example.com".into())],
    };

    let clock_skew_secs = sri_facturacion::config::Config::from_env()
        .map(|c| c.clock_skew_secs)
        .unwrap_or(0);
    let xml = build_factura(&record, &key, clock_skew_secs).expect("valid invoice record");
    println!("{xml}");
}
