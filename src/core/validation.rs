//! InvoiceRecord invariant checks run before XML generation.
//!
//! Kept deliberately fail-fast, rather than accumulating every violation
//! into a `Vec`: this crate's [`crate::error::Error`] carries one
//! failure at a time, so the first violation found wins.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::types::InvoiceRecord;
use crate::error::Error;

/// One cent — the tolerance allowed between a caller-stored
/// `precioTotalSinImpuesto` and the derived value (never trust a stored field).
const CENT_TOLERANCE: Decimal = dec!(0.01);

/// Validate an [`InvoiceRecord`] before rendering it to XML.
pub fn validate_record(record: &InvoiceRecord) -> Result<(), Error> {
    if record.items.is_empty() {
        return Err(Error::InvalidInput(
            "invoice record must have at least one item".into(),
        ));
    }

    if record.emitter.ruc.len() != 13 || !record.emitter.ruc.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::InvalidInput(format!(
            "emitter.ruc must be 13 digits, got {:?}",
            record.emitter.ruc
        )));
    }

    if record.emitter.razon_social.trim().is_empty() {
        return Err(Error::InvalidInput(
            "emitter.razon_social must not be empty".into(),
        ));
    }

    if record.buyer.identification.trim().is_empty() {
        return Err(Error::InvalidInput(
            "buyer.identification must not be empty".into(),
        ));
    }

    for (idx, item) in record.items.iter().enumerate() {
        validate_item(idx, item)?;
    }

    Ok(())
}

fn validate_item(idx: usize, item: &super::types::Item) -> Result<(), Error> {
    if item.cantidad <= Decimal::ZERO {
        return Err(Error::InvalidInput(format!(
            "item[{idx}].cantidad must be positive, got {}",
            item.cantidad
        )));
    }
    if item.precio_unitario < Decimal::ZERO {
        return Err(Error::InvalidInput(format!(
            "item[{idx}].precio_unitario must not be negative, got {}",
            item.precio_unitario
        )));
    }
    if item.descuento < Decimal::ZERO {
        return Err(Error::InvalidInput(format!(
            "item[{idx}].descuento must not be negative, got {}",
            item.descuento
        )));
    }

    if let Some(stored) = item.precio_total_sin_impuesto {
        let derived = item.precio_total_sin_impuesto();
        if (stored - derived).abs() > CENT_TOLERANCE {
            return Err(Error::InvalidInput(format!(
                "item[{idx}] stored precioTotalSinImpuesto {stored} disagrees with \
                 derived value {derived} by more than one cent"
            )));
        }
    }

    for (tidx, tax) in item.impuestos.iter().enumerate() {
        if tax.base_imponible < Decimal::ZERO || tax.valor < Decimal::ZERO {
            return Err(Error::InvalidInput(format!(
                "item[{idx}].impuestos[{tidx}] base_imponible/valor must not be negative"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::*;
    use chrono::NaiveDate;

    fn record_with_item(item: Item) -> InvoiceRecord {
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
            items: vec![item],
            payments: vec![],
            propina: dec!(0),
            info_adicional: vec![],
        }
    }

    fn valid_item() -> Item {
        Item {
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
        }
    }

    #[test]
    fn accepts_valid_record() {
        let record = record_with_item(valid_item());
        assert!(validate_record(&record).is_ok());
    }

    #[test]
    fn rejects_empty_items() {
        let mut record = record_with_item(valid_item());
        record.items.clear();
        assert!(matches!(
            validate_record(&record),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn accepts_stored_total_within_one_cent() {
        let mut item = valid_item();
        item.precio_total_sin_impuesto = Some(dec!(10.01));
        let record = record_with_item(item);
        assert!(validate_record(&record).is_ok());
    }

    #[test]
    fn rejects_stored_total_beyond_one_cent() {
        let mut item = valid_item();
        item.precio_total_sin_impuesto = Some(dec!(10.50));
        let record = record_with_item(item);
        assert!(matches!(
            validate_record(&record),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let mut item = valid_item();
        item.cantidad = dec!(0);
        let record = record_with_item(item);
        assert!(matches!(
            validate_record(&record),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_malformed_ruc() {
        let mut record = record_with_item(valid_item());
        record.emitter.ruc = "123".into();
        assert!(matches!(
            validate_record(&record),
            Err(Error::InvalidInput(_))
        ));
    }
}
