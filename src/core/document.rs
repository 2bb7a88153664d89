//! Factura v1.1.0 XML generation.
//!
//! Builds `<factura id="comprobante" version="1.1.0">` with, in order,
//! `infoTributaria`, `infoFactura`, `detalles`, and an optional
//! `infoAdicional` — the SRI XSD uses `sequence`, so element order here
//! is load-bearing.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::types::{AccessKey, InvoiceRecord};
use super::validation::validate_record;
use super::xml_utils::XmlWriter;
use crate::error::Error;
use crate::time;

/// Render the canonical factura v1.1.0 XML for `record`, embedding
/// `key` as `claveAcceso`. `clock_skew_secs` is the tolerance (typically
/// `Config::clock_skew_secs`) applied when deciding whether
/// `fechaEmision` needs clamping to today.
///
/// Given identical `record` and `key`, the output is byte-identical
/// (determinism rule) — required for the signature produced later
/// to remain valid across round-trips.
pub fn build_factura(
    record: &InvoiceRecord,
    key: &AccessKey,
    clock_skew_secs: i64,
) -> Result<String, Error> {
    validate_record(record)?;

    let dir_establecimiento = resolve_dir_establecimiento(record)?;
    let (fecha_emision, was_clamped) = time::clamp_to_now(record.fecha_emision, clock_skew_secs);
    if was_clamped {
        tracing::warn!(
            original = %record.fecha_emision,
            clamped = %fecha_emision,
            "fechaEmision was in the future; clamped to now-in-Ecuador"
        );
    }

    let mut w = XmlWriter::new()?;
    w.start_element_with_attrs("factura", &[("id", "comprobante"), ("version", "1.1.0")])?;

    write_info_tributaria(&mut w, record, key)?;
    write_info_factura(&mut w, record, &fecha_emision, &dir_establecimiento)?;
    write_detalles(&mut w, record)?;
    write_info_adicional(&mut w, record)?;

    w.end_element("factura")?;
    w.into_string()
}

fn resolve_dir_establecimiento(record: &InvoiceRecord) -> Result<String, Error> {
    let candidate = record
        .emitter
        .dir_establecimiento
        .as_deref()
        .filter(|s| !s.trim().is_empty());
    match candidate {
        Some(addr) => Ok(addr.to_string()),
        None if !record.emitter.dir_matriz.trim().is_empty() => {
            Ok(record.emitter.dir_matriz.clone())
        }
        None => Err(Error::InvalidInput(
            "dirEstablecimiento must be non-empty and dirMatriz fallback is also blank".into(),
        )),
    }
}

fn write_info_tributaria(
    w: &mut XmlWriter,
    record: &InvoiceRecord,
    key: &AccessKey,
) -> Result<(), Error> {
    w.start_element("infoTributaria")?;
    w.text_element("ambiente", &record.ambiente.code().to_string())?;
    w.text_element("tipoEmision", record.tipo_emision.code())?;
    w.text_element("razonSocial", &record.emitter.razon_social)?;
    if let Some(nombre) = &record.emitter.nombre_comercial {
        w.text_element("nombreComercial", nombre)?;
    }
    w.text_element("ruc", &record.emitter.ruc)?;
    w.text_element("claveAcceso", key.as_str())?;
    w.text_element("codDoc", "01")?;
    w.text_element("estab", &record.emitter.cod_establecimiento)?;
    w.text_element("ptoEmi", &record.emitter.pto_emision)?;
    w.text_element("secuencial", &record.secuencial)?;
    w.text_element("dirMatriz", &record.emitter.dir_matriz)?;
    w.end_element("infoTributaria")
}

fn write_info_factura(
    w: &mut XmlWriter,
    record: &InvoiceRecord,
    fecha_emision: &chrono::NaiveDate,
    dir_establecimiento: &str,
) -> Result<(), Error> {
    let totals = TaxTotals::compute(record);

    w.start_element("infoFactura")?;
    w.text_element("fechaEmision", &fecha_emision.format("%d/%m/%Y").to_string())?;
    w.text_element("dirEstablecimiento", dir_establecimiento)?;
    w.text_element(
        "obligadoContabilidad",
        if record.emitter.obligado_contabilidad {
            "SI"
        } else {
            "NO"
        },
    )?;
    w.text_element(
        "tipoIdentificacionComprador",
        record.buyer.id_type.code(),
    )?;
    w.text_element("razonSocialComprador", &record.buyer.razon_social)?;
    w.text_element("identificacionComprador", &record.buyer.identification)?;
    w.decimal_element("totalSinImpuestos", totals.total_sin_impuestos)?;
    w.decimal_element("totalDescuento", totals.total_descuento)?;

    w.start_element("totalConImpuestos")?;
    for bucket in &totals.buckets {
        w.start_element("totalImpuesto")?;
        w.text_element("codigo", &bucket.codigo.to_string())?;
        w.text_element("codigoPorcentaje", &bucket.codigo_porcentaje.to_string())?;
        w.decimal_element("baseImponible", bucket.base_imponible)?;
        w.decimal_element("valor", bucket.valor)?;
        w.end_element("totalImpuesto")?;
    }
    w.end_element("totalConImpuestos")?;

    w.decimal_element("propina", record.propina)?;
    w.decimal_element("importeTotal", totals.importe_total)?;
    w.text_element("moneda", "DOLAR")?;

    w.start_element("pagos")?;
    for payment in record.effective_payments() {
        w.start_element("pago")?;
        w.text_element("formaPago", &payment.forma_pago)?;
        w.decimal_element("total", payment.total)?;
        w.end_element("pago")?;
    }
    w.end_element("pagos")?;

    w.end_element("infoFactura")
}

fn write_detalles(w: &mut XmlWriter, record: &InvoiceRecord) -> Result<(), Error> {
    w.start_element("detalles")?;
    for item in &record.items {
        w.start_element("detalle")?;
        w.text_element("codigoPrincipal", &item.codigo_principal)?;
        w.text_element("descripcion", &item.descripcion)?;
        w.decimal_element("cantidad", item.cantidad)?;
        w.decimal_element("precioUnitario", item.precio_unitario)?;
        w.decimal_element("descuento", item.descuento)?;
        w.decimal_element("precioTotalSinImpuesto", item.precio_total_sin_impuesto())?;

        w.start_element("impuestos")?;
        for tax in &item.impuestos {
            w.start_element("impuesto")?;
            w.text_element("codigo", &tax.codigo.to_string())?;
            w.text_element("codigoPorcentaje", &tax.codigo_porcentaje.to_string())?;
            w.decimal_element("tarifa", tax.resolved_tarifa())?;
            w.decimal_element("baseImponible", tax.base_imponible)?;
            w.decimal_element("valor", tax.valor)?;
            w.end_element("impuesto")?;
        }
        w.end_element("impuestos")?;

        w.end_element("detalle")?;
    }
    w.end_element("detalles")
}

fn write_info_adicional(w: &mut XmlWriter, record: &InvoiceRecord) -> Result<(), Error> {
    if record.info_adicional.is_empty() {
        return Ok(());
    }
    w.start_element("infoAdicional")?;
    for (name, value) in &record.info_adicional {
        w.text_element_with_name_attr("campoAdicional", name, value)?;
    }
    w.end_element("infoAdicional")
}

/// Aggregated tax bucket — one per `(codigo, codigoPorcentaje)` pair,
/// summing `baseImponible` and `valor` across all items (tax
/// aggregation rule).
struct TaxBucket {
    codigo: u8,
    codigo_porcentaje: u8,
    base_imponible: Decimal,
    valor: Decimal,
}

struct TaxTotals {
    total_sin_impuestos: Decimal,
    total_descuento: Decimal,
    importe_total: Decimal,
    buckets: Vec<TaxBucket>,
}

impl TaxTotals {
    fn compute(record: &InvoiceRecord) -> Self {
        let mut grouped: BTreeMap<(u8, u8), (Decimal, Decimal)> = BTreeMap::new();
        for item in &record.items {
            for tax in &item.impuestos {
                let entry = grouped
                    .entry((tax.codigo, tax.codigo_porcentaje))
                    .or_insert((Decimal::ZERO, Decimal::ZERO));
                entry.0 += tax.base_imponible;
                entry.1 += tax.valor;
            }
        }
        let buckets = grouped
            .into_iter()
            .map(|((codigo, codigo_porcentaje), (base_imponible, valor))| TaxBucket {
                codigo,
                codigo_porcentaje,
                base_imponible,
                valor,
            })
            .collect();

        TaxTotals {
            total_sin_impuestos: record.total_sin_impuestos(),
            total_descuento: record.total_descuento(),
            importe_total: record.importe_total(),
            buckets,
        }
    }
}

/// Stub for credit-note XML generation (open question —
/// `motivo`/`docModificado` field semantics were not specified in the
/// source this spec was distilled from). Key generation already works
/// for `DocType::CreditNote` via [`super::key::KeyBuilder`]; only the
/// document body is deferred.
pub fn build_nota_credito(_record: &InvoiceRecord, _key: &AccessKey) -> Result<String, Error> {
    Err(Error::InvalidInput(
        "credit note document body not implemented".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::key::KeyBuilder;
    use crate::core::types::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn sample_key() -> AccessKey {
        KeyBuilder::generate(
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            DocType::Factura,
            "0918097783001",
            Environment::Test,
            "001001",
            "000000001",
            EmissionType::Normal,
            1,
        )
        .unwrap()
    }

    fn final_consumer_record() -> InvoiceRecord {
        InvoiceRecord {
            emitter: Emitter {
                ruc: "0918097783001".into(),
                razon_social: "ACME SA".into(),
                nombre_comercial: None,
                dir_matriz: "Av. Principal 123".into(),
                dir_establecimiento: None,
                cod_establecimiento: "001".into(),
                pto_emision: "001".into(),
                obligado_contabilidad: false,
            },
            ambiente: Environment::Test,
            tipo_emision: EmissionType::Normal,
            secuencial: "000000001".into(),
            fecha_emision: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            buyer: Buyer {
                id_type: BuyerIdType::ConsumidorFinal,
                identification: "9999999999".into(),
                razon_social: "CONSUMIDOR FINAL".into(),
                direccion: None,
                email: None,
                telefono: None,
            },
            items: vec![Item {
                codigo_principal: "1".into(),
                descripcion: "Producto".into(),
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
            info_adicional: vec![],
        }
    }

    // Final-consumer factura.
    #[test]
    fn final_consumer_totals_match_spec_example() {
        let record = final_consumer_record();
        assert_eq!(record.total_sin_impuestos(), dec!(10.00));
        assert_eq!(record.importe_total(), dec!(11.20));
        let payments = record.effective_payments();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].forma_pago, "01");
        assert_eq!(payments[0].total, dec!(11.20));
        assert_eq!(
            record.items[0].impuestos[0].resolved_tarifa(),
            dec!(12.00)
        );
    }

    #[test]
    fn xml_is_well_formed_and_embeds_key_once() {
        let record = final_consumer_record();
        let key = sample_key();
        let xml = build_factura(&record, &key, 0).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(r#"<factura id="comprobante" version="1.1.0">"#));

        let occurrences = xml.matches(key.as_str()).count();
        assert_eq!(occurrences, 1, "claveAcceso must appear exactly once");

        // Parses as well-formed XML.
        let mut reader = quick_xml::Reader::from_str(&xml);
        reader.config_mut().trim_text(false);
        loop {
            match reader.read_event().unwrap() {
                quick_xml::events::Event::Eof => break,
                _ => continue,
            }
        }
    }

    #[test]
    fn element_order_is_significant() {
        let record = final_consumer_record();
        let key = sample_key();
        let xml = build_factura(&record, &key, 0).unwrap();

        let info_tributaria = xml.find("<infoTributaria>").unwrap();
        let info_factura = xml.find("<infoFactura>").unwrap();
        let detalles = xml.find("<detalles>").unwrap();
        assert!(info_tributaria < info_factura);
        assert!(info_factura < detalles);
    }

    #[test]
    fn blank_addresses_fail_with_invalid_input() {
        let mut record = final_consumer_record();
        record.emitter.dir_matriz = "".into();
        record.emitter.dir_establecimiento = None;
        let key = sample_key();
        assert!(matches!(
            build_factura(&record, &key, 0),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn establishment_address_falls_back_to_matrix() {
        let mut record = final_consumer_record();
        record.emitter.dir_establecimiento = Some("   ".into());
        let key = sample_key();
        let xml = build_factura(&record, &key, 0).unwrap();
        assert!(xml.contains("<dirEstablecimiento>Av. Principal 123</dirEstablecimiento>"));
    }

    #[test]
    fn sanitizes_descriptions_with_entities() {
        let mut record = final_consumer_record();
        record.items[0].descripcion = "Café & \"Snacks\" <especial>".into();
        let key = sample_key();
        let xml = build_factura(&record, &key, 0).unwrap();
        assert!(xml.contains("Caf\u{e9} &amp; &quot;Snacks&quot; &lt;especial&gt;"));
    }

    #[test]
    fn clock_skew_secs_extends_the_future_date_tolerance() {
        let mut record = final_consumer_record();
        record.fecha_emision = chrono::Utc::now().date_naive() + chrono::Duration::days(1);
        let key = sample_key();

        let clamped_xml = build_factura(&record, &key, 0).unwrap();
        let unclamped_xml = build_factura(&record, &key, 24 * 3600).unwrap();

        let today_tag = format!(
            "<fechaEmision>{}</fechaEmision>",
            chrono::Utc::now().date_naive().format("%d/%m/%Y")
        );
        let future_tag = format!(
            "<fechaEmision>{}</fechaEmision>",
            record.fecha_emision.format("%d/%m/%Y")
        );
        assert!(clamped_xml.contains(&today_tag));
        assert!(unclamped_xml.contains(&future_tag));
    }

    #[test]
    fn determinism_same_record_and_key_yields_identical_bytes() {
        let record = final_consumer_record();
        let key = sample_key();
        let xml1 = build_factura(&record, &key, 0).unwrap();
        let xml2 = build_factura(&record, &key, 0).unwrap();
        assert_eq!(xml1, xml2);
    }

    #[test]
    fn rejects_empty_items() {
        let mut record = final_consumer_record();
        record.items.clear();
        let key = sample_key();
        assert!(matches!(
            build_factura(&record, &key, 0),
            Err(Error::InvalidInput(_))
        ));
    }
}
