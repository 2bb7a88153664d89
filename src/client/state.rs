//! Per-comprobante state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle state of one comprobante, in persistence-directory order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComprobanteState {
    Firmado,
    Recibido,
    Rechazado,
    Autorizado,
    Error,
}

impl ComprobanteState {
    /// Directory name this state's artifacts are written under.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Firmado => "FIRMADO",
            Self::Recibido => "RECIBIDO",
            Self::Rechazado => "RECHAZADO",
            Self::Autorizado => "AUTORIZADO",
            Self::Error => "ERROR",
        }
    }

    /// Whether this state is terminal (no further transitions expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rechazado | Self::Autorizado | Self::Error)
    }
}

/// Result of `validarComprobante`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceptionResult {
    pub state: ReceptionState,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceptionState {
    Recibida,
    Devuelta,
}

/// Result of `autorizacionComprobante`. `EnProceso` is always
/// transient and triggers a poll retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRecord {
    pub state: AuthorizationState,
    pub authorization_number: Option<String>,
    pub authorization_timestamp: Option<String>,
    pub authorized_xml: Option<String>,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationState {
    Autorizado,
    NoAutorizado,
    Rechazada,
    EnProceso,
}

impl AuthorizationState {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::EnProceso)
    }
}

/// Outcome of `processOneShot`: `success` iff the comprobante reached
/// `AUTORIZADO`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalResult {
    pub state: ComprobanteState,
    pub success: bool,
    pub authorization_number: Option<String>,
    pub authorized_xml: Option<String>,
    pub messages: Vec<String>,
}
