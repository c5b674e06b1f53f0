//! The DCC payload model and its CBOR codec.
//!
//! Unlike the claim layers above it, the payload is not handed to `serde`:
//! field order, the tag-0 toggle on `Instant` and the omit-null/omit-empty
//! policy all need to be driven from the call site (a [`crate::config::CborConfig`]),
//! which is awkward to express through `#[derive(Serialize)]`. Instead each
//! type builds and reads a `ciborium::value::Value` tree directly, the same
//! style used for [`crate::cwt::Cwt`] headers.

use crate::config::CborConfig;
use crate::mrz;
use crate::uvci;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use ciborium::value::Value;
use thiserror::Error;

/// Errors decoding or validating a DCC payload.
#[derive(Error, Debug)]
pub enum PayloadError {
    /// The CBOR value at some position was not of the expected shape.
    #[error("unexpected CBOR shape for '{0}'")]
    UnexpectedShape(&'static str),
    /// A required field was missing.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    /// A `LocalDate` string did not parse per the tolerant grammar.
    #[error("invalid date '{0}'")]
    InvalidDate(String),
    /// An `Instant` value was not a recognised shape (tag 0/1, numeric or ISO text).
    #[error("invalid date-time value")]
    InvalidInstant,
    /// A dose number (`dn`/`sd`) fell outside `[1,9]`.
    #[error("dose number {0} is out of range [1,9]")]
    DoseOutOfRange(i64),
    /// `fnt`/`gnt` contained characters outside `[A-Z<]` or exceeded 50 characters.
    #[error("'{0}' is not a valid ICAO transliterated name: {1}")]
    InvalidTransliteratedName(&'static str, String),
    /// Two or more entries in the same DCC shared a UVCI.
    #[error("duplicate UVCI '{0}' within a single DCC")]
    DuplicateUvci(String),
    /// A UVCI carried a `#` checksum suffix that did not validate.
    #[error("invalid checksum in UVCI '{0}'")]
    InvalidChecksum(String),
    /// Exactly one of `v`/`t`/`r` must carry at least one entry.
    #[error("exactly one of v/t/r must be present and non-empty; found {0}")]
    WrongGroupCount(usize),
}

fn map_get<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| k.as_text() == Some(key))
        .map(|(_, v)| v)
}

fn as_map(value: &Value, field: &'static str) -> Result<&Vec<(Value, Value)>, PayloadError> {
    value.as_map().ok_or(PayloadError::UnexpectedShape(field))
}

fn as_text(value: &Value, field: &'static str) -> Result<String, PayloadError> {
    value
        .as_text()
        .map(String::from)
        .ok_or(PayloadError::UnexpectedShape(field))
}

fn text_field(map: &[(Value, Value)], key: &str, field: &'static str) -> Result<String, PayloadError> {
    map_get(map, key)
        .ok_or(PayloadError::MissingField(field))
        .and_then(|v| as_text(v, field))
}

fn opt_text_field(map: &[(Value, Value)], key: &str, field: &'static str) -> Result<Option<String>, PayloadError> {
    match map_get(map, key) {
        None => Ok(None),
        Some(v) => as_text(v, field).map(Some),
    }
}

fn int_field(map: &[(Value, Value)], key: &str, field: &'static str) -> Result<i64, PayloadError> {
    map_get(map, key)
        .ok_or(PayloadError::MissingField(field))?
        .as_integer()
        .and_then(|i| i128::from(i).try_into().ok())
        .ok_or(PayloadError::UnexpectedShape(field))
}

/// A calendar date tolerant of `YYYY`, `YYYY-MM` and `YYYY-MM-DD`.
///
/// Per the open-question resolution recorded in DESIGN.md: a trailing
/// `-XX`/`-xx` placeholder segment truncates the value at that point rather
/// than erroring, so `"1969-XX-XX"` parses to the canonical `"1969"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDate(String);

impl LocalDate {
    /// Parses a date per the tolerant grammar, producing its canonical form.
    pub fn parse(input: &str) -> Result<Self, PayloadError> {
        let parts: Vec<&str> = input.split('-').collect();
        let year = parts.first().copied().unwrap_or("");
        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(PayloadError::InvalidDate(input.to_string()));
        }
        let mut canonical = year.to_string();
        for segment in parts.iter().skip(1).take(2) {
            if segment.eq_ignore_ascii_case("xx") {
                break;
            }
            if segment.len() != 2 || !segment.chars().all(|c| c.is_ascii_digit()) {
                return Err(PayloadError::InvalidDate(input.to_string()));
            }
            canonical.push('-');
            canonical.push_str(segment);
        }
        Ok(LocalDate(canonical))
    }

    /// The canonical `YYYY`/`YYYY-MM`/`YYYY-MM-DD` rendering.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn to_value(&self) -> Value {
        Value::Text(self.0.clone())
    }

    fn from_value(value: &Value) -> Result<Self, PayloadError> {
        let text = value.as_text().ok_or(PayloadError::UnexpectedShape("date"))?;
        LocalDate::parse(text)
    }
}

/// A point in time, serialised as an ISO-8601 string optionally tagged with
/// CBOR tag 0. Decoding is liberal: tag 0 text, tag 1 numeric seconds,
/// untagged numeric seconds and untagged ISO text are all accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instant(i64);

impl Instant {
    /// Builds an `Instant` from seconds since the Unix epoch.
    pub fn from_unix_seconds(seconds: i64) -> Self {
        Instant(seconds)
    }

    /// Seconds since the Unix epoch.
    pub fn unix_seconds(&self) -> i64 {
        self.0
    }

    fn to_value(self, cfg: &CborConfig) -> Value {
        let dt: DateTime<Utc> = Utc.timestamp_opt(self.0, 0).single().unwrap_or_else(Utc::now);
        let text = dt.to_rfc3339_opts(SecondsFormat::Secs, true);
        if cfg.tag_instants {
            Value::Tag(0, Box::new(Value::Text(text)))
        } else {
            Value::Text(text)
        }
    }

    fn from_value(value: &Value) -> Result<Self, PayloadError> {
        match value {
            Value::Tag(0, inner) => {
                let text = inner.as_text().ok_or(PayloadError::InvalidInstant)?;
                Self::parse_iso(text)
            }
            Value::Tag(1, inner) => Self::from_numeric(inner),
            Value::Text(text) => Self::parse_iso(text),
            Value::Integer(_) | Value::Float(_) => Self::from_numeric(value),
            _ => Err(PayloadError::InvalidInstant),
        }
    }

    fn from_numeric(value: &Value) -> Result<Self, PayloadError> {
        if let Some(i) = value.as_integer() {
            let seconds: i64 = i128::from(i)
                .try_into()
                .map_err(|_| PayloadError::InvalidInstant)?;
            Ok(Instant(seconds))
        } else if let Some(f) = value.as_float() {
            Ok(Instant(f as i64))
        } else {
            Err(PayloadError::InvalidInstant)
        }
    }

    fn parse_iso(text: &str) -> Result<Self, PayloadError> {
        DateTime::parse_from_rfc3339(text)
            .map(|dt| Instant(dt.timestamp()))
            .map_err(|_| PayloadError::InvalidInstant)
    }
}

/// Subject name, as `nam` in the DCC payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DgcName {
    /// `fn`: surname(s) as written.
    pub surname: Option<String>,
    /// `fnt`: surname(s) transliterated to ICAO 9303 MRZ form.
    pub surname_standard: Option<String>,
    /// `gn`: forename(s) as written.
    pub forename: Option<String>,
    /// `gnt`: forename(s) transliterated to ICAO 9303 MRZ form.
    pub forename_standard: Option<String>,
}

fn validate_mrz_field(field: &'static str, value: &str) -> Result<(), PayloadError> {
    if value.chars().count() > 50 {
        return Err(PayloadError::InvalidTransliteratedName(
            field,
            "exceeds 50 characters".to_string(),
        ));
    }
    if !value.chars().all(|c| c == '<' || c.is_ascii_uppercase()) {
        return Err(PayloadError::InvalidTransliteratedName(
            field,
            value.to_string(),
        ));
    }
    Ok(())
}

impl DgcName {
    /// Fills `fnt`/`gnt` from `fn`/`gn` via MRZ transliteration when the
    /// corresponding transliterated field is absent.
    ///
    /// An explicit step rather than a mutate-on-setter approach: it is
    /// invoked only from [`crate::service::Encoder::encode`], never
    /// implicitly.
    pub fn normalise(&mut self) {
        if self.surname_standard.is_none() {
            if let Some(surname) = &self.surname {
                self.surname_standard = Some(mrz::transliterate(surname));
            }
        }
        if self.forename_standard.is_none() {
            if let Some(forename) = &self.forename {
                self.forename_standard = Some(mrz::transliterate(forename));
            }
        }
    }

    fn validate(&self) -> Result<(), PayloadError> {
        if let Some(fnt) = &self.surname_standard {
            validate_mrz_field("fnt", fnt)?;
        }
        if let Some(gnt) = &self.forename_standard {
            validate_mrz_field("gnt", gnt)?;
        }
        Ok(())
    }

    fn to_value(&self) -> Value {
        let mut entries = Vec::new();
        if let Some(v) = &self.surname {
            entries.push((Value::Text("fn".into()), Value::Text(v.clone())));
        }
        if let Some(v) = &self.surname_standard {
            entries.push((Value::Text("fnt".into()), Value::Text(v.clone())));
        }
        if let Some(v) = &self.forename {
            entries.push((Value::Text("gn".into()), Value::Text(v.clone())));
        }
        if let Some(v) = &self.forename_standard {
            entries.push((Value::Text("gnt".into()), Value::Text(v.clone())));
        }
        Value::Map(entries)
    }

    fn from_value(value: &Value) -> Result<Self, PayloadError> {
        let map = as_map(value, "nam")?;
        Ok(DgcName {
            surname: opt_text_field(map, "fn", "nam.fn")?,
            surname_standard: opt_text_field(map, "fnt", "nam.fnt")?,
            forename: opt_text_field(map, "gn", "nam.gn")?,
            forename_standard: opt_text_field(map, "gnt", "nam.gnt")?,
        })
    }
}

/// One vaccination entry (`v` group).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vaccination {
    /// `tg`: disease or agent targeted.
    pub targeted_disease: String,
    /// `vp`: vaccine or prophylaxis.
    pub vaccine_prophylaxis: String,
    /// `mp`: vaccine medicinal product.
    pub medicinal_product: String,
    /// `ma`: marketing authorisation holder or manufacturer.
    pub manufacturer: String,
    /// `dn`: dose number, `[1,9]`.
    pub dose_number: i64,
    /// `sd`: total doses in the series, `[1,9]`.
    pub total_doses: i64,
    /// `dt`: date of vaccination.
    pub date: LocalDate,
    /// `co`: country of vaccination (ISO-3166).
    pub country: String,
    /// `is`: certificate issuer.
    pub issuer: String,
    /// `ci`: unique certificate identifier (UVCI).
    pub id: String,
}

impl Vaccination {
    fn validate(&self) -> Result<(), PayloadError> {
        if !(1..=9).contains(&self.dose_number) {
            return Err(PayloadError::DoseOutOfRange(self.dose_number));
        }
        if !(1..=9).contains(&self.total_doses) {
            return Err(PayloadError::DoseOutOfRange(self.total_doses));
        }
        Ok(())
    }

    fn to_value(&self) -> Value {
        Value::Map(vec![
            (Value::Text("tg".into()), Value::Text(self.targeted_disease.clone())),
            (Value::Text("vp".into()), Value::Text(self.vaccine_prophylaxis.clone())),
            (Value::Text("mp".into()), Value::Text(self.medicinal_product.clone())),
            (Value::Text("ma".into()), Value::Text(self.manufacturer.clone())),
            (Value::Text("dn".into()), Value::Integer(self.dose_number.into())),
            (Value::Text("sd".into()), Value::Integer(self.total_doses.into())),
            (Value::Text("dt".into()), self.date.to_value()),
            (Value::Text("co".into()), Value::Text(self.country.clone())),
            (Value::Text("is".into()), Value::Text(self.issuer.clone())),
            (Value::Text("ci".into()), Value::Text(self.id.clone())),
        ])
    }

    fn from_value(value: &Value) -> Result<Self, PayloadError> {
        let map = as_map(value, "v[]")?;
        Ok(Vaccination {
            targeted_disease: text_field(map, "tg", "v.tg")?,
            vaccine_prophylaxis: text_field(map, "vp", "v.vp")?,
            medicinal_product: text_field(map, "mp", "v.mp")?,
            manufacturer: text_field(map, "ma", "v.ma")?,
            dose_number: int_field(map, "dn", "v.dn")?,
            total_doses: int_field(map, "sd", "v.sd")?,
            date: LocalDate::from_value(map_get(map, "dt").ok_or(PayloadError::MissingField("v.dt"))?)?,
            country: text_field(map, "co", "v.co")?,
            issuer: text_field(map, "is", "v.is")?,
            id: text_field(map, "ci", "v.ci")?,
        })
    }
}

/// One test entry (`t` group).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Test {
    /// `tg`: disease or agent targeted.
    pub targeted_disease: String,
    /// `tt`: type of test.
    pub test_type: String,
    /// `nm`: NAA test name.
    pub name: Option<String>,
    /// `ma`: RAT test name and manufacturer.
    pub manufacturer: Option<String>,
    /// `sc`: date-time of sample collection.
    pub sample_collection: Instant,
    /// `dr`: date-time of test result.
    pub result_time: Option<Instant>,
    /// `tr`: test result.
    pub result: String,
    /// `tc`: testing centre.
    pub testing_centre: Option<String>,
    /// `co`: country of test (ISO-3166).
    pub country: String,
    /// `is`: certificate issuer.
    pub issuer: String,
    /// `ci`: unique certificate identifier (UVCI).
    pub id: String,
}

impl Test {
    fn to_value(&self, cfg: &CborConfig) -> Value {
        let mut entries = vec![
            (Value::Text("tg".into()), Value::Text(self.targeted_disease.clone())),
            (Value::Text("tt".into()), Value::Text(self.test_type.clone())),
        ];
        if let Some(v) = &self.name {
            entries.push((Value::Text("nm".into()), Value::Text(v.clone())));
        }
        if let Some(v) = &self.manufacturer {
            entries.push((Value::Text("ma".into()), Value::Text(v.clone())));
        }
        entries.push((Value::Text("sc".into()), self.sample_collection.to_value(cfg)));
        if let Some(v) = &self.result_time {
            entries.push((Value::Text("dr".into()), v.to_value(cfg)));
        }
        entries.push((Value::Text("tr".into()), Value::Text(self.result.clone())));
        if let Some(v) = &self.testing_centre {
            entries.push((Value::Text("tc".into()), Value::Text(v.clone())));
        }
        entries.push((Value::Text("co".into()), Value::Text(self.country.clone())));
        entries.push((Value::Text("is".into()), Value::Text(self.issuer.clone())));
        entries.push((Value::Text("ci".into()), Value::Text(self.id.clone())));
        Value::Map(entries)
    }

    fn from_value(value: &Value) -> Result<Self, PayloadError> {
        let map = as_map(value, "t[]")?;
        Ok(Test {
            targeted_disease: text_field(map, "tg", "t.tg")?,
            test_type: text_field(map, "tt", "t.tt")?,
            name: opt_text_field(map, "nm", "t.nm")?,
            manufacturer: opt_text_field(map, "ma", "t.ma")?,
            sample_collection: Instant::from_value(
                map_get(map, "sc").ok_or(PayloadError::MissingField("t.sc"))?,
            )?,
            result_time: map_get(map, "dr").map(Instant::from_value).transpose()?,
            result: text_field(map, "tr", "t.tr")?,
            testing_centre: opt_text_field(map, "tc", "t.tc")?,
            country: text_field(map, "co", "t.co")?,
            issuer: text_field(map, "is", "t.is")?,
            id: text_field(map, "ci", "t.ci")?,
        })
    }
}

/// One recovery entry (`r` group).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovery {
    /// `tg`: disease or agent targeted.
    pub targeted_disease: String,
    /// `fr`: date of first positive test result.
    pub first_positive_result: LocalDate,
    /// `co`: country of test (ISO-3166).
    pub country: String,
    /// `is`: certificate issuer.
    pub issuer: String,
    /// `df`: certificate valid from.
    pub valid_from: LocalDate,
    /// `du`: certificate valid until.
    pub valid_until: LocalDate,
    /// `ci`: unique certificate identifier (UVCI).
    pub id: String,
}

impl Recovery {
    fn to_value(&self) -> Value {
        Value::Map(vec![
            (Value::Text("tg".into()), Value::Text(self.targeted_disease.clone())),
            (Value::Text("fr".into()), self.first_positive_result.to_value()),
            (Value::Text("co".into()), Value::Text(self.country.clone())),
            (Value::Text("is".into()), Value::Text(self.issuer.clone())),
            (Value::Text("df".into()), self.valid_from.to_value()),
            (Value::Text("du".into()), self.valid_until.to_value()),
            (Value::Text("ci".into()), Value::Text(self.id.clone())),
        ])
    }

    fn from_value(value: &Value) -> Result<Self, PayloadError> {
        let map = as_map(value, "r[]")?;
        Ok(Recovery {
            targeted_disease: text_field(map, "tg", "r.tg")?,
            first_positive_result: LocalDate::from_value(
                map_get(map, "fr").ok_or(PayloadError::MissingField("r.fr"))?,
            )?,
            country: text_field(map, "co", "r.co")?,
            issuer: text_field(map, "is", "r.is")?,
            valid_from: LocalDate::from_value(
                map_get(map, "df").ok_or(PayloadError::MissingField("r.df"))?,
            )?,
            valid_until: LocalDate::from_value(
                map_get(map, "du").ok_or(PayloadError::MissingField("r.du"))?,
            )?,
            id: text_field(map, "ci", "r.ci")?,
        })
    }
}

/// The DCC payload: `ver`, `nam`, `dob`, plus exactly one populated group of
/// `v`/`t`/`r`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dgc {
    /// `ver`: schema version.
    pub version: String,
    /// `nam`: subject name.
    pub name: DgcName,
    /// `dob`: date of birth.
    pub date_of_birth: LocalDate,
    /// `v`: vaccination entries.
    pub vaccinations: Vec<Vaccination>,
    /// `t`: test entries.
    pub tests: Vec<Test>,
    /// `r`: recovery entries.
    pub recoveries: Vec<Recovery>,
}

impl Default for DgcName {
    fn default() -> Self {
        DgcName {
            surname: None,
            surname_standard: None,
            forename: None,
            forename_standard: None,
        }
    }
}

impl Default for LocalDate {
    fn default() -> Self {
        LocalDate(String::new())
    }
}

impl Dgc {
    /// Runs the explicit normalisation step (subject-name transliteration)
    /// that the encoder invokes before serialising.
    pub fn normalise(&mut self) {
        self.name.normalise();
    }

    /// Checks the structural invariants on a payload: transliterated-name
    /// alphabet/length, dose ranges, UVCI uniqueness and exactly-one group.
    pub fn validate(&self) -> Result<(), PayloadError> {
        self.name.validate()?;

        let group_count = [
            !self.vaccinations.is_empty(),
            !self.tests.is_empty(),
            !self.recoveries.is_empty(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count();
        if group_count != 1 {
            return Err(PayloadError::WrongGroupCount(group_count));
        }

        for v in &self.vaccinations {
            v.validate()?;
        }

        let mut seen_uvcis = std::collections::HashSet::new();
        for id in self
            .vaccinations
            .iter()
            .map(|v| &v.id)
            .chain(self.tests.iter().map(|t| &t.id))
            .chain(self.recoveries.iter().map(|r| &r.id))
        {
            if !seen_uvcis.insert(id.as_str()) {
                return Err(PayloadError::DuplicateUvci(id.clone()));
            }
            if uvci::validate_checksum(id).is_err() {
                // A UVCI without a checksum suffix is still legal per §4.8;
                // only a *present but wrong* checksum is a hard failure.
                if id.contains('#') {
                    return Err(PayloadError::InvalidChecksum(id.clone()));
                }
            }
        }

        Ok(())
    }

    /// Serialises the payload to a CBOR `Value`, in field-insertion order.
    pub fn to_value(&self, cfg: &CborConfig) -> Value {
        let mut entries = vec![
            (Value::Text("ver".into()), Value::Text(self.version.clone())),
            (Value::Text("nam".into()), self.name.to_value()),
            (Value::Text("dob".into()), self.date_of_birth.to_value()),
        ];
        if !self.vaccinations.is_empty() {
            entries.push((
                Value::Text("v".into()),
                Value::Array(self.vaccinations.iter().map(Vaccination::to_value).collect()),
            ));
        }
        if !self.tests.is_empty() {
            entries.push((
                Value::Text("t".into()),
                Value::Array(self.tests.iter().map(|t| t.to_value(cfg)).collect()),
            ));
        }
        if !self.recoveries.is_empty() {
            entries.push((
                Value::Text("r".into()),
                Value::Array(self.recoveries.iter().map(Recovery::to_value).collect()),
            ));
        }
        Value::Map(entries)
    }

    /// Parses a CBOR `Value` into a payload. Field order on the wire is not
    /// significant; absence and an empty array are treated equivalently.
    pub fn from_value(value: &Value) -> Result<Self, PayloadError> {
        let map = as_map(value, "dgc")?;
        let vaccinations = match map_get(map, "v") {
            Some(Value::Array(items)) => items
                .iter()
                .map(Vaccination::from_value)
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };
        let tests = match map_get(map, "t") {
            Some(Value::Array(items)) => items
                .iter()
                .map(Test::from_value)
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };
        let recoveries = match map_get(map, "r") {
            Some(Value::Array(items)) => items
                .iter()
                .map(Recovery::from_value)
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };
        Ok(Dgc {
            version: text_field(map, "ver", "ver")?,
            name: DgcName::from_value(map_get(map, "nam").ok_or(PayloadError::MissingField("nam"))?)?,
            date_of_birth: LocalDate::from_value(
                map_get(map, "dob").ok_or(PayloadError::MissingField("dob"))?,
            )?,
            vaccinations,
            tests,
            recoveries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dgc {
        Dgc {
            version: "1.3.0".into(),
            name: DgcName {
                surname: Some("Lindström".into()),
                surname_standard: None,
                forename: Some("Martin".into()),
                forename_standard: None,
            },
            date_of_birth: LocalDate::parse("1969-11-11").unwrap(),
            vaccinations: vec![Vaccination {
                targeted_disease: "840539006".into(),
                vaccine_prophylaxis: "1119349007".into(),
                medicinal_product: "EU/1/20/1507".into(),
                manufacturer: "ORG-100030215".into(),
                dose_number: 1,
                total_doses: 2,
                date: LocalDate::parse("2021-04-17").unwrap(),
                country: "SE".into(),
                issuer: "Swedish eHealth Agency".into(),
                id: "01:SE:JKJKHJGHG6768686HGJGH".into(),
            }],
            tests: vec![],
            recoveries: vec![],
        }
    }

    #[test]
    fn round_trips_through_cbor() {
        let mut dgc = sample();
        dgc.normalise();
        let cfg = CborConfig::default();
        let value = dgc.to_value(&cfg);
        let decoded = Dgc::from_value(&value).unwrap();
        assert_eq!(dgc, decoded);
        assert_eq!(decoded.name.surname_standard.as_deref(), Some("LINDSTROEM"));
    }

    #[test]
    fn tolerant_dob_reduces_to_canonical_year() {
        let date = LocalDate::parse("1969-XX-XX").unwrap();
        assert_eq!(date.as_str(), "1969");
    }

    #[test]
    fn rejects_empty_groups() {
        let mut dgc = sample();
        dgc.vaccinations.clear();
        assert!(matches!(
            dgc.validate(),
            Err(PayloadError::WrongGroupCount(0))
        ));
    }

    #[test]
    fn rejects_a_true_duplicate_uvci_across_groups() {
        let mut dgc = sample();
        let duplicate = dgc.vaccinations[0].clone();
        dgc.vaccinations.push(duplicate);
        assert!(matches!(
            dgc.validate(),
            Err(PayloadError::DuplicateUvci(id)) if id == "01:SE:JKJKHJGHG6768686HGJGH"
        ));
    }

    #[test]
    fn rejects_a_uvci_with_an_invalid_checksum_suffix() {
        let mut dgc = sample();
        dgc.vaccinations[0].id = "URN:UVCI:01:NL:187/37512422923#A".into();
        assert!(matches!(
            dgc.validate(),
            Err(PayloadError::InvalidChecksum(id)) if id == "URN:UVCI:01:NL:187/37512422923#A"
        ));
    }

    #[test]
    fn rejects_dose_number_out_of_range() {
        let mut dgc = sample();
        dgc.vaccinations[0].dose_number = 0;
        assert!(matches!(
            dgc.validate(),
            Err(PayloadError::DoseOutOfRange(0))
        ));
    }

    #[test]
    fn instant_accepts_untagged_numeric_seconds() {
        let value = Value::Integer(1620728835.into());
        let instant = Instant::from_value(&value).unwrap();
        assert_eq!(instant.unix_seconds(), 1620728835);
    }

    #[test]
    fn instant_round_trips_tagged_text() {
        let instant = Instant::from_unix_seconds(1620728835);
        let cfg = CborConfig::default();
        let value = instant.to_value(&cfg);
        assert!(matches!(value, Value::Tag(0, _)));
        let decoded = Instant::from_value(&value).unwrap();
        assert_eq!(decoded, instant);
    }

    #[test]
    fn instant_without_tag_toggle_is_untagged_text() {
        let instant = Instant::from_unix_seconds(1620728835);
        let cfg = CborConfig { tag_instants: false };
        let value = instant.to_value(&cfg);
        assert!(matches!(value, Value::Text(_)));
    }
}
