//! Generate and validate a clave de acceso.

use chrono::NaiveDate;
use sri_facturacion::core::{DocType, EmissionType, Environment, KeyBuilder};

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

    println!("clave de acceso: {key}");
    println!("check digit valid: {}", key.validate());
}
