//! Integration tests against the public crate surface, covering named
//! reference vectors (Base45, MRZ, UVCI checksum) and end-to-end
//! encode/decode scenarios.

use ciborium::value::Value;
use dgc_core::{
    base45_decode, base45_encode, mrz_transliterate, uvci_checksum, uvci_validate_checksum, CborConfig,
    Certificate, CertificateStore, Decoder, Dgc, DgcName, Encoder, Error, Instant, LocalDate, SignAlgorithm,
    Signer, Test, Vaccination, ValidationConfig,
};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair as RcgenKeyPair, PKCS_ECDSA_P256_SHA256};

fn ec_signer_and_cert(country: &str) -> (Signer, Certificate) {
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
    let signer = Signer::new(SignAlgorithm::Es256, &pkcs8, certificate.clone()).unwrap();
    (signer, certificate)
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
fn base45_round_trips_the_rfc_draft_vector() {
    assert_eq!(base45_encode(b"base-45"), "UJCLQE7W581");
    assert_eq!(base45_decode("UJCLQE7W581").unwrap(), b"base-45");
}

#[test]
fn mrz_transliterates_named_vectors() {
    assert_eq!(mrz_transliterate("Lindström"), "LINDSTROEM");
    assert_eq!(mrz_transliterate("O'Leary"), "OLEARY");
    assert_eq!(mrz_transliterate("Karl Åke"), "KARL<AAKE");
}

#[test]
fn uvci_checksum_matches_the_official_vector() {
    let body = "URN:UVCI:01:NL:187/37512422923";
    assert_eq!(uvci_checksum(body).unwrap(), "URN:UVCI:01:NL:187/37512422923#Z");
    assert!(uvci_validate_checksum("URN:UVCI:01:NL:187/37512422923#Z").is_ok());
}

#[test]
fn end_to_end_encode_and_decode_restores_the_payload() {
    let (signer, certificate) = ec_signer_and_cert("SE");
    let encoder = Encoder::new(signer);

    let payload = vaccination_payload();
    let expiration = Instant::from_unix_seconds(vaccination_issue_time() + 90 * 24 * 60 * 60);
    let encoded = encoder.encode(&payload, expiration).unwrap();

    assert!(encoded.starts_with("HC1:"));

    let mut store = CertificateStore::new();
    store.add(certificate);
    let decoder = Decoder::new(ValidationConfig::at(vaccination_issue_time() + 1));
    let (decoded, metadata) = decoder.decode(&encoded, &store).unwrap();

    assert_eq!(decoded.version, payload.version);
    assert_eq!(decoded.date_of_birth, payload.date_of_birth);
    assert_eq!(decoded.name.surname, payload.name.surname);
    assert_eq!(decoded.name.surname_standard.as_deref(), Some("LINDSTROEM"));
    assert_eq!(decoded.vaccinations, payload.vaccinations);
    assert_eq!(metadata.country.as_deref(), Some("SE"));
}

fn vaccination_issue_time() -> i64 {
    1_700_000_000
}

#[test]
fn cross_vendor_untagged_numeric_sample_collection_still_decodes() {
    // A peer that emits `sc` as an untagged numeric seconds value (neither
    // tag 0 nor tag 1) must still decode through the full Dgc parse path,
    // not just the Instant primitive in isolation.
    let entries = vec![
        (Value::Text("ver".into()), Value::Text("1.3.0".into())),
        (
            Value::Text("nam".into()),
            Value::Map(vec![
                (Value::Text("fn".into()), Value::Text("Rossi".into())),
                (Value::Text("fnt".into()), Value::Text("ROSSI".into())),
                (Value::Text("gn".into()), Value::Text("Mario".into())),
                (Value::Text("gnt".into()), Value::Text("MARIO".into())),
            ]),
        ),
        (Value::Text("dob".into()), Value::Text("1980-05-01".into())),
        (
            Value::Text("t".into()),
            Value::Array(vec![Value::Map(vec![
                (Value::Text("tg".into()), Value::Text("840539006".into())),
                (Value::Text("tt".into()), Value::Text("LP6464-4".into())),
                (Value::Text("sc".into()), Value::Integer(1_620_728_835i64.into())),
                (Value::Text("tr".into()), Value::Text("260415000".into())),
                (Value::Text("co".into()), Value::Text("IT".into())),
                (Value::Text("is".into()), Value::Text("Ministry of Health".into())),
                (Value::Text("ci".into()), Value::Text("URN:UVCI:01:IT:8K1234567890ABCD".into())),
            ])]),
        ),
    ];

    let dgc = Dgc::from_value(&Value::Map(entries)).unwrap();
    assert_eq!(dgc.tests.len(), 1);
    assert_eq!(dgc.tests[0].sample_collection.unix_seconds(), 1_620_728_835);

    // Normalising and re-encoding with the default (tagged) config must
    // still round-trip through the decoder unchanged.
    let cfg = CborConfig::default();
    let reencoded = Dgc::from_value(&dgc.to_value(&cfg)).unwrap();
    assert_eq!(reencoded, dgc);
}

#[test]
fn resigning_with_a_different_key_surfaces_signature_failure() {
    // Re-signing with a different EC key while presenting the original
    // certificate as the sole lookup candidate must produce
    // SignatureFailure, not Expired or CborError.
    let (_original_signer, original_certificate) = ec_signer_and_cert("DE");
    let other_pkcs8 = {
        let key_pair = RcgenKeyPair::generate(&PKCS_ECDSA_P256_SHA256).unwrap();
        let mut params = CertificateParams::new(vec!["dgc.example".into()]);
        params.alg = &PKCS_ECDSA_P256_SHA256;
        params.key_pair = Some(key_pair);
        rcgen::Certificate::from_params(params)
            .unwrap()
            .serialize_private_key_der()
    };

    // A signer bound to the impostor's private key but presenting the
    // original certificate: the signature it produces will not verify
    // against that certificate's public key.
    let impostor_signer = Signer::new(SignAlgorithm::Es256, &other_pkcs8, original_certificate.clone()).unwrap();
    let encoder = Encoder::new(impostor_signer);
    let encoded = encoder
        .encode(&vaccination_payload(), Instant::from_unix_seconds(vaccination_issue_time() + 90 * 24 * 60 * 60))
        .unwrap();

    let mut store = CertificateStore::new();
    store.add(original_certificate);
    let decoder = Decoder::new(ValidationConfig::at(vaccination_issue_time() + 1));
    let err = decoder.decode(&encoded, &store).unwrap_err();
    assert!(matches!(err, Error::SignatureFailure(_)));
}

#[test]
fn expired_validation_instant_surfaces_after_a_successful_verification() {
    let (signer, certificate) = ec_signer_and_cert("AT");
    let encoder = Encoder::new(signer);
    let expiration = Instant::from_unix_seconds(vaccination_issue_time() + 10);
    let encoded = encoder.encode(&vaccination_payload(), expiration).unwrap();

    let mut store = CertificateStore::new();
    store.add(certificate);
    let decoder = Decoder::new(ValidationConfig::at(vaccination_issue_time() + 20));
    let err = decoder.decode(&encoded, &store).unwrap_err();
    assert!(matches!(err, Error::Expired(_)));
}

#[test]
fn no_certificate_available_surfaces_a_typed_error() {
    let (signer, _certificate) = ec_signer_and_cert("PT");
    let encoder = Encoder::new(signer);
    let encoded = encoder
        .encode(&vaccination_payload(), Instant::from_unix_seconds(vaccination_issue_time() + 1000))
        .unwrap();

    let empty_store = CertificateStore::new();
    let decoder = Decoder::new(ValidationConfig::at(vaccination_issue_time()));
    let err = decoder.decode(&encoded, &empty_store).unwrap_err();
    assert!(matches!(err, Error::NoCertificate));
}

#[test]
fn same_dcc_with_duplicate_uvci_across_groups_is_rejected_on_encode() {
    let mut payload = vaccination_payload();
    let duplicate = payload.vaccinations[0].clone();
    payload.vaccinations.push(duplicate);

    let (signer, _certificate) = ec_signer_and_cert("NL");
    let encoder = Encoder::new(signer);
    let err = encoder
        .encode(&payload, Instant::from_unix_seconds(vaccination_issue_time() + 1000))
        .unwrap_err();
    assert!(matches!(err, Error::SchemaError(_)));
}

#[test]
fn test_group_entries_round_trip_through_the_full_facade() {
    let (signer, certificate) = ec_signer_and_cert("BE");
    let encoder = Encoder::new(signer);

    let payload = Dgc {
        version: "1.3.0".into(),
        name: DgcName {
            surname: Some("Janssens".into()),
            surname_standard: None,
            forename: Some("Eva".into()),
            forename_standard: None,
        },
        date_of_birth: LocalDate::parse("1990-02-02").unwrap(),
        vaccinations: vec![],
        tests: vec![Test {
            targeted_disease: "840539006".into(),
            test_type: "LP217198-3".into(),
            name: None,
            manufacturer: Some("1232".into()),
            sample_collection: Instant::from_unix_seconds(1_620_728_835),
            result_time: None,
            result: "260415000".into(),
            testing_centre: Some("Test centre".into()),
            country: "BE".into(),
            issuer: "Belgian Health Authority".into(),
            id: "URN:UVCI:01:BE:TESTCERT1234567".into(),
        }],
        recoveries: vec![],
    };

    let expiration = Instant::from_unix_seconds(1_620_728_835 + 180 * 24 * 60 * 60);
    let encoded = encoder.encode(&payload, expiration).unwrap();

    let mut store = CertificateStore::new();
    store.add(certificate);
    let decoder = Decoder::new(ValidationConfig::at(1_620_728_836));
    let (decoded, _) = decoder.decode(&encoded, &store).unwrap();
    assert_eq!(decoded.tests, payload.tests);
}
