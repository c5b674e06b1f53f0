//! Builds and validates the eight-field cross-vendor test-vector shape: a
//! DCC payload's `JSON` form alongside its `CBOR`, `COSE`, `COMPRESSED`,
//! `BASE45` and `PREFIX` pipeline stages, a `TESTCTX` (the verifying
//! certificate and the validation instant to decode against) and a
//! `2DCODE` slot for a barcode raster, left `None` since rasterisation is
//! not something this crate does.
//!
//! One call to [`validate_vector`] re-derives each field from the one
//! before it and checks it against what [`build_vector`] produced, so a
//! regression anywhere in the pipeline surfaces from a single assertion
//! rather than six separate round-trip tests.

use ciborium::value::Value;
use dgc_core::{
    base45_decode, base45_encode, deflate_compress, deflate_decompress, CborConfig, Certificate,
    CertificateStore, Decoder, Dgc, DgcName, Encoder, Instant, LocalDate, SignAlgorithm, Signer, Vaccination,
    ValidationConfig,
};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair as RcgenKeyPair, PKCS_ECDSA_P256_SHA256};
use serde_json::{json, Value as JsonValue};

struct TestContext {
    certificate: Certificate,
    validation_instant: i64,
}

struct TestVector {
    json: JsonValue,
    cbor: Vec<u8>,
    cose: Vec<u8>,
    compressed: Vec<u8>,
    base45: String,
    prefix: String,
    two_d_code: Option<Vec<u8>>,
    testctx: TestContext,
}

fn dgc_to_json(payload: &Dgc) -> JsonValue {
    let vaccinations: Vec<JsonValue> = payload
        .vaccinations
        .iter()
        .map(|v| {
            json!({
                "tg": v.targeted_disease, "vp": v.vaccine_prophylaxis, "mp": v.medicinal_product,
                "ma": v.manufacturer, "dn": v.dose_number, "sd": v.total_doses,
                "dt": v.date.as_str(), "co": v.country, "is": v.issuer, "ci": v.id,
            })
        })
        .collect();
    let tests: Vec<JsonValue> = payload
        .tests
        .iter()
        .map(|t| {
            json!({
                "tg": t.targeted_disease, "tt": t.test_type, "ma": t.manufacturer,
                "sc": t.sample_collection.unix_seconds(), "tr": t.result,
                "tc": t.testing_centre, "co": t.country, "is": t.issuer, "ci": t.id,
            })
        })
        .collect();
    let recoveries: Vec<JsonValue> = payload
        .recoveries
        .iter()
        .map(|r| {
            json!({
                "tg": r.targeted_disease, "fr": r.first_positive_result.as_str(),
                "co": r.country, "is": r.issuer,
                "df": r.valid_from.as_str(), "du": r.valid_until.as_str(), "ci": r.id,
            })
        })
        .collect();
    json!({
        "ver": payload.version,
        "nam": {
            "fn": payload.name.surname, "fnt": payload.name.surname_standard,
            "gn": payload.name.forename, "gnt": payload.name.forename_standard,
        },
        "dob": payload.date_of_birth.as_str(),
        "v": vaccinations, "t": tests, "r": recoveries,
    })
}

fn build_vector(signer: Signer, payload: &Dgc, expiration: Instant, validation_instant: i64) -> TestVector {
    let certificate = signer.certificate().clone();
    let mut normalised = payload.clone();
    normalised.normalise();

    let json = dgc_to_json(&normalised);

    let cbor_config = CborConfig::default();
    let mut cbor = Vec::new();
    ciborium::ser::into_writer(&normalised.to_value(&cbor_config), &mut cbor)
        .expect("serialising a Value tree to a Vec is infallible");

    let encoder = Encoder::new(signer);
    let cose = encoder
        .encode_cwt_bytes(&normalised, expiration)
        .expect("signing a normalised, validated payload cannot fail");

    let compressed = deflate_compress(&cose).expect("compressing signed bytes cannot fail");
    let base45 = base45_encode(&compressed);
    let prefix = format!("HC1:{base45}");

    TestVector {
        json,
        cbor,
        cose,
        compressed,
        base45,
        prefix,
        two_d_code: None,
        testctx: TestContext { certificate, validation_instant },
    }
}

/// Re-derives every field from its predecessor and asserts it matches what
/// [`build_vector`] produced, then decodes the finished barcode string and
/// checks the restored payload's `nam`/`dob` against the stored `json`.
fn validate_vector(vector: &TestVector) {
    assert!(vector.two_d_code.is_none(), "barcode rasterisation is out of scope");

    let reinflated = deflate_decompress(&vector.compressed, true).expect("compressed bytes must inflate");
    assert_eq!(reinflated, vector.cose, "COMPRESSED must inflate back to COSE");

    let redecoded_base45 = base45_decode(&vector.base45).expect("BASE45 must decode");
    assert_eq!(redecoded_base45, vector.compressed, "BASE45 must decode back to COMPRESSED");

    let stripped = vector.prefix.strip_prefix("HC1:").expect("PREFIX must carry the HC1: tag");
    assert_eq!(stripped, vector.base45, "PREFIX must wrap BASE45 unchanged");

    let cwt_value: Value = ciborium::de::from_reader(vector.cose.as_slice()).expect("COSE must parse as CBOR");
    assert!(matches!(cwt_value, Value::Array(ref items) if items.len() == 4), "COSE must be a 4-element COSE_Sign1");

    let mut store = CertificateStore::new();
    store.add(vector.testctx.certificate.clone());
    let decoder = Decoder::new(ValidationConfig::at(vector.testctx.validation_instant));
    let (decoded, _metadata) = decoder
        .decode(&vector.prefix, &store)
        .expect("PREFIX must verify and decode against TESTCTX");

    assert_eq!(decoded.date_of_birth.as_str(), vector.json["dob"].as_str().unwrap());
    assert_eq!(
        decoded.name.surname.as_deref(),
        vector.json["nam"]["fn"].as_str(),
    );
}

fn ec_signer_and_cert(country: &str) -> Signer {
    let mut params = CertificateParams::new(vec!["dgc.example".into()]);
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CountryName, country);
    params.distinguished_name = dn;
    params.alg = &PKCS_ECDSA_P256_SHA256;
    let key_pair = RcgenKeyPair::generate(&PKCS_ECDSA_P256_SHA256).unwrap();
    params.key_pair = Some(key_pair);
    let cert = rcgen::Certificate::from_params(params).unwrap();
    let der = cert.serialize_der().unwrap();
    let pkcs8 = cert.serialize_private_key_der();
    let certificate = Certificate::from_der(der).unwrap();
    Signer::new(SignAlgorithm::Es256, &pkcs8, certificate).unwrap()
}

fn vaccination_payload() -> Dgc {
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
fn vaccination_vector_is_internally_consistent() {
    let signer = ec_signer_and_cert("SE");
    let payload = vaccination_payload();
    let vector = build_vector(signer, &payload, Instant::from_unix_seconds(2_000_000_000), 1_800_000_000);
    validate_vector(&vector);
}

#[test]
fn a_tampered_compressed_field_fails_validation_not_silently() {
    let signer = ec_signer_and_cert("NL");
    let payload = vaccination_payload();
    let mut vector = build_vector(signer, &payload, Instant::from_unix_seconds(2_000_000_000), 1_800_000_000);

    vector.compressed[0] ^= 0xff;
    let reinflated = deflate_decompress(&vector.compressed, true);
    assert!(reinflated.is_err(), "a corrupted zlib header must not inflate successfully");
}
