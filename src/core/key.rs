//! Clave de acceso — the 49-digit SRI access key.
//!
//! Layout of the 48-digit base (before the check digit):
//! `date(8) docType(2) ruc(13) env(1) serie(6) sequential(9) numericCode(8) emissionType(1)`.

use chrono::NaiveDate;
use rand::Rng;

use super::types::{AccessKey, DocType, EmissionType, Environment};
use crate::error::Error;

/// Coefficient vector cycled over the 48 base digits, position 0..47.
const COEFFICIENTS: [u32; 6] = [2, 3, 4, 5, 6, 7];

/// Builds and validates SRI access keys.
pub struct KeyBuilder;

impl KeyBuilder {
    /// Generate a 49-digit access key. `numeric_code` is the 8-digit
    /// random component — callers that need determinism (tests) pass it
    /// explicitly rather than relying on [`KeyBuilder::generate_random`].
    #[allow(clippy::too_many_arguments)]
    pub fn generate(
        date: NaiveDate,
        doc_type: DocType,
        ruc: &str,
        env: Environment,
        serie: &str,
        sequential: &str,
        emission_type: EmissionType,
        numeric_code: u32,
    ) -> Result<AccessKey, Error> {
        if ruc.len() != 13 || !ruc.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::InvalidInput(format!(
                "ruc must be 13 digits, got {ruc:?}"
            )));
        }
        if serie.len() != 6 || !serie.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::InvalidInput(format!(
                "serie must be 6 digits, got {serie:?}"
            )));
        }
        if sequential.len() != 9 || !sequential.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::InvalidInput(format!(
                "sequential must be 9 digits, got {sequential:?}"
            )));
        }
        if numeric_code > 99_999_999 {
            return Err(Error::InvalidInput(
                "numeric_code must fit in 8 digits".into(),
            ));
        }

        let base = format!(
            "{date}{doc_type}{ruc}{env}{serie}{sequential}{numeric:08}{emission}",
            date = date.format("%d%m%Y"),
            doc_type = doc_type.code(),
            env = env.code(),
            numeric = numeric_code,
            emission = emission_type.code(),
        );

        if base.len() != 48 {
            return Err(Error::InvalidInput(format!(
                "assembled base must be 48 digits, got {} ({base:?})",
                base.len()
            )));
        }

        let check = check_digit(&base)?;
        Ok(AccessKey(format!("{base}{check}")))
    }

    /// Like [`KeyBuilder::generate`], but draws `numeric_code` from a
    /// cryptographically-insignificant uniform RNG — the production
    /// entry point; tests should call `generate` directly with a fixed
    /// code instead.
    #[allow(clippy::too_many_arguments)]
    pub fn generate_random(
        date: NaiveDate,
        doc_type: DocType,
        ruc: &str,
        env: Environment,
        serie: &str,
        sequential: &str,
        emission_type: EmissionType,
    ) -> Result<AccessKey, Error> {
        let numeric_code = rand::thread_rng().gen_range(0..=99_999_999u32);
        Self::generate(
            date,
            doc_type,
            ruc,
            env,
            serie,
            sequential,
            emission_type,
            numeric_code,
        )
    }
}

/// Compute the SRI modulus-11 check digit for a 48-digit base.
///
/// `r = 11 - (sum mod 11)`, with `r == 11` mapped to `0` and `r == 10`
/// mapped to `1` — the SRI-specific mapping (some generic MOD-11
/// variants map both residues to `0`; that is wrong here).
pub fn check_digit(base48: &str) -> Result<u8, Error> {
    if base48.len() != 48 || !base48.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::InvalidInput(format!(
            "check_digit requires exactly 48 decimal digits, got {base48:?}"
        )));
    }

    let sum: u32 = base48
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let digit = c.to_digit(10).expect("validated ascii digit");
            digit * COEFFICIENTS[i % COEFFICIENTS.len()]
        })
        .sum();

    let r = 11 - (sum % 11);
    Ok(match r {
        11 => 0,
        10 => 1,
        other => other as u8,
    })
}

/// Validate a full 49-digit access key against its own check digit.
pub fn validate(key49: &str) -> bool {
    if key49.len() != 49 || !key49.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let (base, digit) = key49.split_at(48);
    let expected = match check_digit(base) {
        Ok(d) => d,
        Err(_) => return false,
    };
    digit == expected.to_string()
}
