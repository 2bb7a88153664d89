//! The SOAP reception/authorization pipeline — submit, poll,
//! processOneShot, lookup, wired the way `vat::vies::check_vies` builds
//! a timeout-bounded `reqwest` client and classifies response shapes,
//! generalized crate-wide to an explicit linear async pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::persistence::persist_artifact;
use super::retry::{RetryPolicy, is_temporal_message};
use super::soap::{
    build_autorizacion_envelope, build_validar_envelope, parse_authorization_response,
    parse_reception_response,
};
use super::state::{
    AuthorizationRecord, AuthorizationState, ComprobanteState, FinalResult, ReceptionResult,
    ReceptionState,
};
use crate::core::Environment;
use crate::error::Error;
use crate::logging;

const TEST_RECEPCION_URL: &str =
    "https://celcer.sri.gob.ec/comprobantes-electronicos-ws/RecepcionComprobantesOffline?wsdl";
const TEST_AUTORIZACION_URL: &str =
    "https://celcer.sri.gob.ec/comprobantes-electronicos-ws/AutorizacionComprobantesOffline?wsdl";
const PROD_RECEPCION_URL: &str =
    "https://cel.sri.gob.ec/comprobantes-electronicos-ws/RecepcionComprobantesOffline?wsdl";
const PROD_AUTORIZACION_URL: &str =
    "https://cel.sri.gob.ec/comprobantes-electronicos-ws/AutorizacionComprobantesOffline?wsdl";

fn recepcion_url(env: Environment) -> &'static str {
    match env {
        Environment::Test => TEST_RECEPCION_URL,
        Environment::Production => PROD_RECEPCION_URL,
    }
}

fn autorizacion_url(env: Environment) -> &'static str {
    match env {
        Environment::Test => TEST_AUTORIZACION_URL,
        Environment::Production => PROD_AUTORIZACION_URL,
    }
}

fn messages_are_temporal(messages: &[String]) -> bool {
    messages.iter().any(|m| is_temporal_message(m))
}

/// Client for SRI's reception and authorization SOAP services, plus
/// the content-addressed artifact persistence that accompanies every
/// state transition.
pub struct SriClient {
    http: reqwest::Client,
    artifact_dir: PathBuf,
    endpoints: Option<(String, String)>,
}

impl SriClient {
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(RetryPolicy::per_call_timeout())
            .build()
            .map_err(|e| Error::TransportError {
                attempts: 0,
                message: e.to_string(),
            })?;
        Ok(Self {
            http,
            artifact_dir: artifact_dir.into(),
            endpoints: None,
        })
    }

    /// Build a client that talks to the given reception/authorization URLs
    /// instead of SRI's published endpoints, bypassing the
    /// test/production split in [`recepcion_url`]/[`autorizacion_url`].
    /// For integration tests against a mocked transport.
    pub fn with_endpoints(
        artifact_dir: impl Into<PathBuf>,
        recepcion_url: impl Into<String>,
        autorizacion_url: impl Into<String>,
    ) -> Result<Self, Error> {
        let mut client = Self::new(artifact_dir)?;
        client.endpoints = Some((recepcion_url.into(), autorizacion_url.into()));
        Ok(client)
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    fn recepcion_endpoint(&self, env: Environment) -> &str {
        match &self.endpoints {
            Some((recepcion, _)) => recepcion,
            None => recepcion_url(env),
        }
    }

    fn autorizacion_endpoint(&self, env: Environment) -> &str {
        match &self.endpoints {
            Some((_, autorizacion)) => autorizacion,
            None => autorizacion_url(env),
        }
    }

    async fn post_soap(&self, url: &str, body: String, method: &str) -> Result<String, Error> {
        logging::log_wire("request", method, &body);
        let resp = self
            .http
            .post(url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::TransportError {
                attempts: 1,
                message: e.to_string(),
            })?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| Error::TransportError {
            attempts: 1,
            message: e.to_string(),
        })?;
        logging::log_wire("response", method, &text);
        if !status.is_success() {
            return Err(Error::TransportError {
                attempts: 1,
                message: format!("HTTP {status}"),
            });
        }
        Ok(text)
    }

    /// `validarComprobante` — submit a signed document for reception
    /// Retries up to `RetryPolicy::submit()` on transport
    /// failure or a `DEVUELTA` whose messages look transient.
    pub async fn submit(&self, signed_xml: &str, env: Environment) -> Result<ReceptionResult, Error> {
        let policy = RetryPolicy::submit();
        let url = self.recepcion_endpoint(env);
        let body = build_validar_envelope(signed_xml);
        let mut last_err = None;

        for attempt in 1..=policy.max_attempts {
            let outcome = self
                .post_soap(url, body.clone(), "validarComprobante")
                .await
                .and_then(|resp| parse_reception_response(&resp));

            match outcome {
                Ok(result) if result.state == ReceptionState::Devuelta
                    && messages_are_temporal(&result.messages)
                    && attempt < policy.max_attempts =>
                {
                    tokio::time::sleep(policy.backoff).await;
                }
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                    last_err = Some(e);
                    tokio::time::sleep(policy.backoff).await;
                }
                Err(e) => return Err(with_attempts(e, attempt)),
            }
        }

        Err(last_err.unwrap_or_else(|| Error::TransportError {
            attempts: policy.max_attempts,
            message: "submit exhausted its retry budget".into(),
        }))
    }

    /// `autorizacionComprobante`, with the standard poll budget.
    /// `EN_PROCESO` always retries.
    pub async fn poll(&self, access_key: &str, env: Environment) -> Result<AuthorizationRecord, Error> {
        self.poll_with_policy(access_key, env, RetryPolicy::poll()).await
    }

    /// Out-of-band authorization query with a shorter retry budget.
    pub async fn lookup(&self, access_key: &str, env: Environment) -> Result<AuthorizationRecord, Error> {
        self.poll_with_policy(access_key, env, RetryPolicy::lookup()).await
    }

    async fn poll_with_policy(
        &self,
        access_key: &str,
        env: Environment,
        policy: RetryPolicy,
    ) -> Result<AuthorizationRecord, Error> {
        if access_key.len() != 49 || !access_key.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::InvalidInput(format!(
                "access key must be 49 digits, got {access_key:?}"
            )));
        }
        let url = self.autorizacion_endpoint(env);
        let body = build_autorizacion_envelope(access_key);
        let mut last_err = None;

        for attempt in 1..=policy.max_attempts {
            let outcome = self
                .post_soap(url, body.clone(), "autorizacionComprobante")
                .await
                .and_then(|resp| parse_authorization_response(&resp));

            match outcome {
                Ok(record) if record.state.is_transient() && attempt < policy.max_attempts => {
                    tokio::time::sleep(policy.backoff).await;
                }
                Ok(record)
                    if matches!(
                        record.state,
                        AuthorizationState::NoAutorizado | AuthorizationState::Rechazada
                    ) && messages_are_temporal(&record.messages)
                        && attempt < policy.max_attempts =>
                {
                    tokio::time::sleep(policy.backoff).await;
                }
                Ok(record) => return Ok(record),
                Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                    last_err = Some(e);
                    tokio::time::sleep(policy.backoff).await;
                }
                Err(e) => return Err(with_attempts(e, attempt)),
            }
        }

        Err(last_err.unwrap_or_else(|| Error::TransportError {
            attempts: policy.max_attempts,
            message: "poll exhausted its retry budget".into(),
        }))
    }

    /// Orchestrate submit → wait → poll → persist, the way
    /// specifies. Cancellation during submit is safe; cancellation
    /// while awaiting authorization leaves the comprobante `RECIBIDO`
    /// for a later `lookup`.
    pub async fn process_one_shot(
        &self,
        signed_xml: &str,
        access_key: &str,
        env: Environment,
        wait_before_poll: Duration,
        cancel: &CancellationToken,
    ) -> Result<FinalResult, Error> {
        self.persist(ComprobanteState::Firmado, access_key, signed_xml).await?;

        let submit_outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(Error::TransportError {
                    attempts: 0,
                    message: "cancelled before submit completed".into(),
                });
            }
            result = self.submit(signed_xml, env) => result,
        };
        let reception = match submit_outcome {
            Ok(reception) => reception,
            Err(e) => return self.finish_as_error(access_key, signed_xml, e).await,
        };

        match reception.state {
            ReceptionState::Devuelta => {
                self.persist(ComprobanteState::Rechazado, access_key, signed_xml).await?;
                return Ok(FinalResult {
                    state: ComprobanteState::Rechazado,
                    success: false,
                    authorization_number: None,
                    authorized_xml: None,
                    messages: reception.messages,
                });
            }
            ReceptionState::Recibida => {
                self.persist(ComprobanteState::Recibido, access_key, signed_xml).await?;
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(FinalResult {
                    state: ComprobanteState::Recibido,
                    success: false,
                    authorization_number: None,
                    authorized_xml: None,
                    messages: vec!["cancelled while awaiting authorization; call lookup() later".into()],
                });
            }
            _ = tokio::time::sleep(wait_before_poll) => {}
        }

        let authorization = match self.poll(access_key, env).await {
            Ok(authorization) => authorization,
            Err(e) => return self.finish_as_error(access_key, signed_xml, e).await,
        };
        let final_state = match authorization.state {
            AuthorizationState::Autorizado => ComprobanteState::Autorizado,
            AuthorizationState::NoAutorizado | AuthorizationState::Rechazada => ComprobanteState::Rechazado,
            AuthorizationState::EnProceso => ComprobanteState::Recibido,
        };
        let xml_to_persist = authorization
            .authorized_xml
            .clone()
            .unwrap_or_else(|| signed_xml.to_string());
        self.persist(final_state, access_key, &xml_to_persist).await?;

        Ok(FinalResult {
            success: final_state == ComprobanteState::Autorizado,
            state: final_state,
            authorization_number: authorization.authorization_number,
            authorized_xml: authorization.authorized_xml,
            messages: authorization.messages,
        })
    }

    /// Persist `ComprobanteState::Error` and surface it as a terminal
    /// `FinalResult` rather than propagating a transport/protocol error
    /// after an unrecoverable submit or poll failure.
    async fn finish_as_error(
        &self,
        access_key: &str,
        xml: &str,
        cause: Error,
    ) -> Result<FinalResult, Error> {
        self.persist(ComprobanteState::Error, access_key, xml).await?;
        Ok(FinalResult {
            state: ComprobanteState::Error,
            success: false,
            authorization_number: None,
            authorized_xml: None,
            messages: vec![cause.to_string()],
        })
    }

    async fn persist(&self, state: ComprobanteState, access_key: &str, xml: &str) -> Result<(), Error> {
        persist_artifact(&self.artifact_dir, state, access_key, xml)
            .await
            .map(|_| ())
    }
}

fn with_attempts(e: Error, attempts: u32) -> Error {
    match e {
        Error::TransportError { message, .. } => Error::TransportError { attempts, message },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_access_key_before_any_network_call() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let client = SriClient::new(std::env::temp_dir()).unwrap();
        let result = rt.block_on(client.poll("short", Environment::Test));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn endpoints_differ_by_environment() {
        assert_ne!(recepcion_url(Environment::Test), recepcion_url(Environment::Production));
        assert_ne!(
            autorizacion_url(Environment::Test),
            autorizacion_url(Environment::Production)
        );
    }
}
