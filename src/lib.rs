//! # sri-facturacion
//!
//! A protocol engine for issuing Ecuadorian electronic tax documents
//! (SRI — Servicio de Rentas Internas). Given a normalized invoice
//! record, it computes a 49-digit access key (clave de acceso), renders
//! the canonical factura v1.1.0 XML, signs it with an XML-DSIG enveloped
//! signature using a PKCS#12 credential, submits it to SRI's reception
//! SOAP service, polls the authorization service until a terminal state
//! is reached, and persists each artifact by state.
//!
//! All monetary and quantity values use [`rust_decimal::Decimal`] — never
//! floating point. Dates are [`chrono::NaiveDate`]; "now" is always
//! computed in America/Guayaquil (UTC−05, no DST) via [`time::now_in_ecuador`].
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use sri_facturacion::core::*;
//!
//! let key = KeyBuilder::generate(
//!     NaiveDate::from_ymd_opt(2025, 8, 7).unwrap(),
//!     DocType::Factura,
//!     "0918097783001",
//!     Environment::Test,
//!     "001001",
//!     "000000001",
//!     EmissionType::Normal,
//!     12345678,
//! ).unwrap();
//! assert!(key.validate());
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Access key, invoice record types, factura XML generation |
//! | `signing` | PKCS#12 credential loading, XML-DSIG enveloped signing |
//! | `client` | SOAP reception/authorization client, retry, persistence |
//! | `all` | Everything |

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "signing")]
pub mod signing;

#[cfg(feature = "client")]
pub mod client;

pub use crate::error::Error;

#[cfg(feature = "core")]
pub use crate::core::*;
