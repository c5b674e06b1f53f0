//! Builds and verifies Unique Vaccination Certificate Identifiers (UVCI):
//! `URN:UVCI:<version>:<country>:[<issuer>/][<vaccine>/]<unique>[#<check>]`
//! with an optional Luhn-mod-N check character over a 38-symbol alphabet.

use thiserror::Error;

/// `A-Z0-9/:`, in that order — index 0 is `A`, index 37 is `:`.
const ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789/:";

/// Errors building or validating a UVCI.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UvciError {
    /// `country` was not supplied.
    #[error("UVCI requires a country")]
    MissingCountry,
    /// `unique` was not supplied.
    #[error("UVCI requires a unique string component")]
    MissingUnique,
    /// A `vaccine` component was supplied without an `issuer`.
    #[error("UVCI vaccine component requires an issuer component")]
    VaccineWithoutIssuer,
    /// A component contained a character outside `[A-Z0-9/:]`.
    #[error("character '{0}' is not part of the UVCI checksum alphabet")]
    InvalidCharacter(char),
    /// The string being verified did not carry a `#<check>` suffix.
    #[error("UVCI has no checksum suffix to validate")]
    MissingChecksum,
    /// The checksum did not match.
    #[error("UVCI checksum mismatch: expected '{expected}', found '{found}'")]
    ChecksumMismatch {
        /// The checksum character that was actually present.
        found: char,
        /// The checksum character the body hashes to.
        expected: char,
    },
}

fn alphabet_index(c: char) -> Result<u32, UvciError> {
    ALPHABET
        .chars()
        .position(|a| a == c)
        .map(|i| i as u32)
        .ok_or(UvciError::InvalidCharacter(c))
}

/// Computes the Luhn-mod-N check character for `body` (per the Wikipedia
/// reference algorithm): walking right to left, multiply each character's
/// alphabet index alternately by 2 and 1 (starting with 2 at the rightmost
/// character), fold each product into base-`n` digits by summing its
/// quotient and remainder, sum all the folded addends, then the check digit
/// is `(n - sum mod n) mod n` mapped back through the alphabet.
pub fn checksum(body: &str) -> Result<char, UvciError> {
    let n = ALPHABET.chars().count() as u32;
    let mut sum: u32 = 0;
    let mut factor: u32 = 2;
    for c in body.chars().rev() {
        let idx = alphabet_index(c)?;
        let product = idx * factor;
        sum += product / n + product % n;
        factor = if factor == 2 { 1 } else { 2 };
    }
    let check_idx = (n - sum % n) % n;
    Ok(ALPHABET.chars().nth(check_idx as usize).expect("check_idx < n"))
}

/// Appends a `#<check>` suffix computed over `body` to `body`.
pub fn add_checksum(body: &str) -> Result<String, UvciError> {
    let check = checksum(body)?;
    Ok(format!("{body}#{check}"))
}

/// Validates a UVCI that carries a `#<check>` suffix.
///
/// Trims the trailing `#<check>` (when the penultimate character is `#`)
/// and recomputes the checksum over what remains.
pub fn validate_checksum(uvci: &str) -> Result<(), UvciError> {
    let chars: Vec<char> = uvci.chars().collect();
    if chars.len() < 2 || chars[chars.len() - 2] != '#' {
        return Err(UvciError::MissingChecksum);
    }
    let found = chars[chars.len() - 1];
    let body: String = chars[..chars.len() - 2].iter().collect();
    let expected = checksum(&body)?;
    if found == expected {
        Ok(())
    } else {
        Err(UvciError::ChecksumMismatch { found, expected })
    }
}

/// Fluent, owned builder for a UVCI body (without the checksum suffix).
///
/// `version` defaults to `"01"`. `country` and `unique` are required;
/// `vaccine` requires `issuer` to also be set.
#[derive(Debug, Default, Clone)]
pub struct UvciBuilder {
    version: Option<String>,
    country: Option<String>,
    issuer: Option<String>,
    vaccine: Option<String>,
    unique: Option<String>,
}

impl UvciBuilder {
    /// Starts a new, empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the version component (default `"01"` if never called).
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the required country component (ISO-3166).
    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Sets the optional issuer component.
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Sets the optional vaccine component (requires [`Self::issuer`]).
    pub fn vaccine(mut self, vaccine: impl Into<String>) -> Self {
        self.vaccine = Some(vaccine.into());
        self
    }

    /// Sets the required unique-string component.
    pub fn unique(mut self, unique: impl Into<String>) -> Self {
        self.unique = Some(unique.into());
        self
    }

    /// Composes the UVCI body (without a checksum suffix).
    pub fn build(self) -> Result<String, UvciError> {
        let country = self.country.ok_or(UvciError::MissingCountry)?;
        let unique = self.unique.ok_or(UvciError::MissingUnique)?;
        if self.vaccine.is_some() && self.issuer.is_none() {
            return Err(UvciError::VaccineWithoutIssuer);
        }
        let version = self.version.unwrap_or_else(|| String::from("01"));

        let mut body = format!("URN:UVCI:{version}:{country}:");
        if let Some(issuer) = &self.issuer {
            body.push_str(issuer);
            body.push('/');
        }
        if let Some(vaccine) = &self.vaccine {
            body.push_str(vaccine);
            body.push('/');
        }
        body.push_str(&unique);

        let body = body.to_ascii_uppercase();
        for c in body.chars() {
            if c != ':' && c != '/' && alphabet_index(c).is_err() {
                return Err(UvciError::InvalidCharacter(c));
            }
        }

        Ok(body)
    }

    /// Composes the UVCI body and appends its checksum suffix.
    pub fn build_with_checksum(self) -> Result<String, UvciError> {
        let body = self.build()?;
        add_checksum(&body)
    }
}
