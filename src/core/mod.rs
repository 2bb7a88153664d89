//! Access-key generation, the `InvoiceRecord` domain model, and factura
//! v1.1.0 XML generation — the `core` feature.

mod document;
mod key;
mod types;
mod validation;
mod xml_utils;

pub use document::*;
pub use key::*;
pub use types::*;
pub use validation::*;
pub use xml_utils::{XmlWriter, format_decimal, sanitize_text};
