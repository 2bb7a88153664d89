use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Environment a comprobante is issued into. Determines both the digit
/// embedded in the access key and which SOAP endpoints `SriClient` uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    /// `1` — pruebas / certification.
    Test,
    /// `2` — producción.
    Production,
}

impl Environment {
    pub fn code(&self) -> u8 {
        match self {
            Self::Test => 1,
            Self::Production => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Test),
            2 => Some(Self::Production),
            _ => None,
        }
    }
}

/// SRI comprobante document type (only `Factura` has a full XML body in
/// this crate; `CreditNote` shares key generation — see
/// [`crate::core::document::build_nota_credito`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocType {
    /// `01` — Factura.
    Factura,
    /// `04` — Nota de crédito.
    CreditNote,
}

impl DocType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Factura => "01",
            Self::CreditNote => "04",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "01" => Some(Self::Factura),
            "04" => Some(Self::CreditNote),
            _ => None,
        }
    }
}

/// Emission type (only `Normal` is defined by SRI today).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmissionType {
    /// `1` — emisión normal.
    Normal,
}

impl EmissionType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Normal => "1",
        }
    }
}

/// Buyer identification type (`tipoIdentificacionComprador`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuyerIdType {
    /// `04` — RUC.
    Ruc,
    /// `05` — Cédula.
    Cedula,
    /// `06` — Pasaporte.
    Pasaporte,
    /// `07` — Consumidor final.
    ConsumidorFinal,
}

impl BuyerIdType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Ruc => "04",
            Self::Cedula => "05",
            Self::Pasaporte => "06",
            Self::ConsumidorFinal => "07",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "04" => Some(Self::Ruc),
            "05" => Some(Self::Cedula),
            "06" => Some(Self::Pasaporte),
            "07" => Some(Self::ConsumidorFinal),
            _ => None,
        }
    }
}

/// Emitter (taxpayer) identity — present in `infoTributaria`/`infoFactura`
/// on every comprobante.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Emitter {
    pub ruc: String,
    pub razon_social: String,
    pub nombre_comercial: Option<String>,
    pub dir_matriz: String,
    pub dir_establecimiento: Option<String>,
    pub cod_establecimiento: String,
    pub pto_emision: String,
    pub obligado_contabilidad: bool,
}

/// Buyer (comprador) identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Buyer {
    pub id_type: BuyerIdType,
    pub identification: String,
    pub razon_social: String,
    pub direccion: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
}

/// A single `impuesto` on a line item (one tax code/rate combination).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ItemTax {
    /// `codigo` — SRI tax code, e.g. `2` for IVA.
    pub codigo: u8,
    /// `codigoPorcentaje` — SRI tariff code; `tarifa` is derived from this
    /// when not explicitly supplied (tariff resolution rule).
    pub codigo_porcentaje: u8,
    /// `baseImponible` — taxable base for this line.
    pub base_imponible: Decimal,
    /// `valor` — computed tax amount.
    pub valor: Decimal,
    /// Explicit `tarifa` override. `None` derives from `codigo_porcentaje`.
    pub tarifa: Option<Decimal>,
}

impl ItemTax {
    /// Resolve the `tarifa` percentage: explicit value if present,
    /// otherwise derived from `codigo_porcentaje`.
    pub fn resolved_tarifa(&self) -> Decimal {
        self.tarifa.unwrap_or_else(|| match self.codigo_porcentaje {
            2 => Decimal::new(1200, 2),
            3 => Decimal::new(1400, 2),
            8 => Decimal::new(1500, 2),
            _ => Decimal::ZERO,
        })
    }
}

/// A single invoice line (`detalle`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub codigo_principal: String,
    pub descripcion: String,
    pub cantidad: Decimal,
    pub precio_unitario: Decimal,
    pub descuento: Decimal,
    pub impuestos: Vec<ItemTax>,
    /// Caller-supplied `precioTotalSinImpuesto`, if the source system
    /// tracks one. Never trusted directly — validated against
    /// [`Item::precio_total_sin_impuesto`] within a one-cent tolerance
    /// (never trusted on its own); the derived value is always what gets
    /// written to the document.
    pub precio_total_sin_impuesto: Option<Decimal>,
}

impl Item {
    /// `precioTotalSinImpuesto` is always derived: `cantidad * precioUnitario
    /// - descuento` (never trust a stored field).
    pub fn precio_total_sin_impuesto(&self) -> Decimal {
        self.cantidad * self.precio_unitario - self.descuento
    }
}

/// Payment means (`formaPago`) for `infoFactura/pagos`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// SRI `formaPago` code, e.g. `"01"` for cash.
    pub forma_pago: String,
    pub total: Decimal,
}

/// The normalized invoice record consumed by [`crate::core::document`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub emitter: Emitter,
    pub ambiente: Environment,
    pub tipo_emision: EmissionType,
    /// 9-digit zero-padded sequential.
    pub secuencial: String,
    pub fecha_emision: NaiveDate,
    pub buyer: Buyer,
    pub items: Vec<Item>,
    pub payments: Vec<Payment>,
    /// Propina (tip), defaults to zero.
    pub propina: Decimal,
    pub info_adicional: Vec<(String, String)>,
}

impl InvoiceRecord {
    pub fn total_sin_impuestos(&self) -> Decimal {
        self.items
            .iter()
            .map(|i| i.precio_total_sin_impuesto())
            .sum()
    }

    pub fn total_descuento(&self) -> Decimal {
        self.items.iter().map(|i| i.descuento).sum()
    }

    pub fn total_impuestos(&self) -> Decimal {
        self.items
            .iter()
            .flat_map(|i| i.impuestos.iter())
            .map(|t| t.valor)
            .sum()
    }

    /// `importeTotal = totalSinImpuestos − totalDescuento + Σtax.valor + propina`.
    pub fn importe_total(&self) -> Decimal {
        self.total_sin_impuestos() - self.total_descuento() + self.total_impuestos() + self.propina
    }

    /// Payments to use when rendering the document: the caller-supplied
    /// list, or a synthetic `{formaPago=01, total=importeTotal}` when empty.
    pub fn effective_payments(&self) -> Vec<Payment> {
        if self.payments.is_empty() {
            vec![Payment {
                forma_pago: "01".to_string(),
                total: self.importe_total(),
            }]
        } else {
            self.payments.clone()
        }
    }
}

/// A validated 49-digit access key (clave de acceso).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessKey(pub(crate) String);

impl AccessKey {
    /// The raw 49-digit string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Re-run the check-digit algorithm against the embedded digits.
    pub fn validate(&self) -> bool {
        crate::core::key::validate(&self.0)
    }
}

impl std::fmt::Display for AccessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccessKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
