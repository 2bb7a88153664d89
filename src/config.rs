//! Environment-driven configuration surface.
//!
//! All fields are read once at startup via [`Config::from_env`] and
//! validated eagerly — nothing downstream re-parses an environment
//! variable.

use crate::core::Environment;
use crate::error::Error;

/// Emitter identity and runtime configuration for one taxpayer.
#[derive(Debug, Clone)]
pub struct Config {
    pub ambiente: Environment,
    pub empresa_ruc: String,
    pub empresa_razon_social: String,
    pub empresa_nombre_comercial: Option<String>,
    pub empresa_direccion_matriz: String,
    pub empresa_direccion_establecimiento: Option<String>,
    pub empresa_codigo_establecimiento: String,
    pub empresa_punto_emision: String,
    pub empresa_obligado_contabilidad: bool,
    pub certificado_path: Option<String>,
    pub cert_p12_base64: Option<String>,
    pub certificado_clave: String,
    pub clock_skew_secs: i64,
    pub log_dir: String,
}

impl Config {
    /// Load and validate configuration from the process environment.
    /// See the key table in the crate README for the full set of variables.
    pub fn from_env() -> Result<Self, Error> {
        let get = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        let ambiente_raw = get("SRI_AMBIENTE")
            .ok_or_else(|| Error::InvalidInput("SRI_AMBIENTE is required".into()))?;
        let ambiente = match ambiente_raw.as_str() {
            "1" => Environment::Test,
            "2" => Environment::Production,
            other => {
                return Err(Error::InvalidEnvironment(format!(
                    "SRI_AMBIENTE must be \"1\" or \"2\", got {other:?}"
                )));
            }
        };

        let empresa_ruc = get("EMPRESA_RUC")
            .ok_or_else(|| Error::InvalidInput("EMPRESA_RUC is required".into()))?;
        if empresa_ruc.len() != 13 || !empresa_ruc.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::InvalidInput(
                "EMPRESA_RUC must be exactly 13 digits".into(),
            ));
        }

        let empresa_razon_social = get("EMPRESA_RAZON_SOCIAL")
            .ok_or_else(|| Error::InvalidInput("EMPRESA_RAZON_SOCIAL is required".into()))?;

        let empresa_direccion_matriz = get("EMPRESA_DIRECCION_MATRIZ")
            .ok_or_else(|| Error::InvalidInput("EMPRESA_DIRECCION_MATRIZ is required".into()))?;

        let empresa_codigo_establecimiento = get("EMPRESA_CODIGO_ESTABLECIMIENTO")
            .unwrap_or_else(|| "001".to_string());
        if empresa_codigo_establecimiento.len() != 3 {
            return Err(Error::InvalidInput(
                "EMPRESA_CODIGO_ESTABLECIMIENTO must be 3 digits".into(),
            ));
        }

        let empresa_punto_emision = get("EMPRESA_PUNTO_EMISION").unwrap_or_else(|| "001".to_string());
        if empresa_punto_emision.len() != 3 {
            return Err(Error::InvalidInput(
                "EMPRESA_PUNTO_EMISION must be 3 digits".into(),
            ));
        }

        let empresa_obligado_contabilidad = match get("EMPRESA_OBLIGADO_CONTABILIDAD").as_deref() {
            Some("SI") => true,
            Some("NO") | None => false,
            Some(other) => {
                return Err(Error::InvalidInput(format!(
                    "EMPRESA_OBLIGADO_CONTABILIDAD must be \"SI\" or \"NO\", got {other:?}"
                )));
            }
        };

        let certificado_path = get("CERTIFICADO_PATH");
        let cert_p12_base64 = get("CERT_P12_BASE64");
        if certificado_path.is_none() && cert_p12_base64.is_none() {
            return Err(Error::InvalidInput(
                "one of CERTIFICADO_PATH or CERT_P12_BASE64 is required".into(),
            ));
        }

        let certificado_clave = get("CERTIFICADO_CLAVE")
            .ok_or_else(|| Error::InvalidInput("CERTIFICADO_CLAVE is required".into()))?;

        let clock_skew_secs = get("SRI_CLOCK_SKEW_SECS")
            .map(|v| {
                v.parse::<i64>()
                    .map_err(|_| Error::InvalidInput("SRI_CLOCK_SKEW_SECS must be an integer".into()))
            })
            .transpose()?
            .unwrap_or(0);

        let log_dir = get("SRI_LOG_DIR").unwrap_or_else(|| ".".to_string());

        Ok(Config {
            ambiente,
            empresa_ruc,
            empresa_razon_social,
            empresa_nombre_comercial: get("EMPRESA_NOMBRE_COMERCIAL"),
            empresa_direccion_matriz,
            empresa_direccion_establecimiento: get("EMPRESA_DIRECCION_ESTABLECIMIENTO"),
            empresa_codigo_establecimiento,
            empresa_punto_emision,
            empresa_obligado_contabilidad,
            certificado_path,
            cert_p12_base64,
            certificado_clave,
            clock_skew_secs,
            log_dir,
        })
    }

    /// The 6-digit `serie` (establishment code + emission point) embedded
    /// in the access key and `infoTributaria`.
    pub fn serie(&self) -> String {
        format!(
            "{}{}",
            self.empresa_codigo_establecimiento, self.empresa_punto_emision
        )
    }

    /// Resolve the establishment address, falling back to the matrix
    /// address. Returns `InvalidInput` if both are blank.
    pub fn direccion_establecimiento(&self) -> Result<&str, Error> {
        let candidate = self
            .empresa_direccion_establecimiento
            .as_deref()
            .filter(|s| !s.trim().is_empty());
        match candidate {
            Some(addr) => Ok(addr),
            None if !self.empresa_direccion_matriz.trim().is_empty() => {
                Ok(&self.empresa_direccion_matriz)
            }
            None => Err(Error::InvalidInput(
                "dirEstablecimiento must be non-empty and no matrix address fallback is available"
                    .into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            "SRI_AMBIENTE",
            "EMPRESA_RUC",
            "EMPRESA_RAZON_SOCIAL",
            "EMPRESA_NOMBRE_COMERCIAL",
            "EMPRESA_DIRECCION_MATRIZ",
            "EMPRESA_DIRECCION_ESTABLECIMIENTO",
            "EMPRESA_CODIGO_ESTABLECIMIENTO",
            "EMPRESA_PUNTO_EMISION",
            "EMPRESA_OBLIGADO_CONTABILIDAD",
            "CERTIFICADO_PATH",
            "CERT_P12_BASE64",
            "CERTIFICADO_CLAVE",
            "SRI_CLOCK_SKEW_SECS",
            "SRI_LOG_DIR",
        ] {
            unsafe { std::env::remove_var(key) };
        }
    }

    fn set_minimal_valid_env() {
        unsafe {
            std::env::set_var("SRI_AMBIENTE", "1");
            std::env::set_var("EMPRESA_RUC", "0918097783001");
            std::env::set_var("EMPRESA_RAZON_SOCIAL", "ACME SA");
            std::env::set_var("EMPRESA_DIRECCION_MATRIZ", "Av. Principal 123");
            std::env::set_var("CERTIFICADO_PATH", "/tmp/cert.p12");
            std::env::set_var("CERTIFICADO_CLAVE", "secret");
        }
    }

    #[test]
    fn loads_minimal_valid_config() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        set_minimal_valid_env();
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.ambiente, Environment::Test);
        assert_eq!(cfg.serie(), "001001");
        assert!(!cfg.empresa_obligado_contabilidad);
        clear_env();
    }

    #[test]
    fn rejects_invalid_ambiente() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        set_minimal_valid_env();
        unsafe { std::env::set_var("SRI_AMBIENTE", "3") };
        assert!(matches!(
            Config::from_env(),
            Err(Error::InvalidEnvironment(_))
        ));
        clear_env();
    }

    #[test]
    fn rejects_missing_certificate_source() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        set_minimal_valid_env();
        unsafe { std::env::remove_var("CERTIFICADO_PATH") };
        assert!(matches!(Config::from_env(), Err(Error::InvalidInput(_))));
        clear_env();
    }

    #[test]
    fn establishment_address_falls_back_to_matrix() {
        let cfg = Config {
            ambiente: Environment::Test,
            empresa_ruc: "0918097783001".into(),
            empresa_razon_social: "ACME SA".into(),
            empresa_nombre_comercial: None,
            empresa_direccion_matriz: "Matriz 1".into(),
            empresa_direccion_establecimiento: None,
            empresa_codigo_establecimiento: "001".into(),
            empresa_punto_emision: "001".into(),
            empresa_obligado_contabilidad: false,
            certificado_path: Some("/tmp/c.p12".into()),
            cert_p12_base64: None,
            certificado_clave: "x".into(),
            clock_skew_secs: 0,
            log_dir: ".".into(),
        };
        assert_eq!(cfg.direccion_establecimiento().unwrap(), "Matriz 1");
    }
}
