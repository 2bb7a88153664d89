//! SOAP reception/authorization client, retry policy, and content-
//! addressed persistence — the `client` feature.

mod persistence;
mod retry;
mod soap;
mod sri_client;
mod state;

pub use persistence::persist_artifact;
pub use retry::RetryPolicy;
pub use sri_client::SriClient;
pub use state::{AuthorizationRecord, ComprobanteState, FinalResult, ReceptionResult};
