use thiserror::Error;

/// Crate-wide error taxonomy for the SRI protocol engine.
///
/// Variants map to the recovery behavior of the pipeline: `InvalidInput`,
/// `InvalidCredential`, `SchemaViolation` and `SigningError` are never
/// retried; `TransportError` and `TemporalSriError` are retried per the
/// configured [`crate::client::RetryPolicy`]; `PermanentSriError` surfaces
/// as a terminal `RECHAZADO` result rather than an exception.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration, invoice record, or access key format rejected locally.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// PKCS#12 unreadable, passphrase wrong, expired, or missing required bags.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// XML failed pre-submit structural checks.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// Crypto backend error while signing.
    #[error("signing error: {0}")]
    SigningError(String),

    /// Network, TLS, or timeout talking to an SRI SOAP endpoint.
    #[error("transport error after {attempts} attempt(s): {message}")]
    TransportError { attempts: u32, message: String },

    /// SRI returned a message identifier/text classified as transient.
    #[error("temporal SRI error: {0}")]
    TemporalSriError(String),

    /// SRI returned a business-rule rejection. Not surfaced to callers as
    /// an `Err` in the pipeline — `processOneShot` converts this into a
    /// terminal `RECHAZADO` `FinalResult` instead. Exposed so lower-level
    /// callers of `submit`/`poll` can still observe the classification.
    #[error("permanent SRI error: {0}")]
    PermanentSriError(String),

    /// SRI response envelope missing expected nodes after the retry budget.
    #[error("SRI protocol error: {0}")]
    SriProtocolError(String),

    /// Requested environment value is not `1` (test) or `2` (prod).
    #[error("invalid environment: {0}")]
    InvalidEnvironment(String),

    /// Filesystem error while persisting a comprobante artifact.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl Error {
    /// Stable, user-facing failure category. Used by callers building
    /// surfaces (CLI/HTTP) that need to map an `Error` to a short label
    /// without matching on every variant.
    pub fn category(&self) -> &'static str {
        match self {
            Error::InvalidCredential(_) => "certificate",
            Error::SigningError(_) => "signing",
            Error::TransportError { .. } => "connectivity",
            Error::PermanentSriError(_) => "rejected by SRI",
            Error::InvalidInput(_) | Error::InvalidEnvironment(_) => "configuration",
            Error::SchemaViolation(_) => "signing",
            Error::TemporalSriError(_) => "connectivity",
            Error::SriProtocolError(_) => "connectivity",
            Error::Persistence(_) => "configuration",
        }
    }

    /// True for errors the retry loop should retry (transport
    /// failures and SRI-classified temporal errors).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TransportError { .. } | Error::TemporalSriError(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
