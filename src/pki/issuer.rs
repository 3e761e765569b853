//! Self-signed certificate issuance.
//!
//! # Stages
//! ```text
//! Uninitialized → KeyGenerated → CertificateSigned → Encoded → Persisted
//! ```
//! Any failure aborts the whole issuance; no partial bundle is returned.

use std::io::Write;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use rand::RngCore;
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, SanType, SerialNumber};
use rsa::pkcs8::EncodePrivateKey;
use rsa::{BigUint, RsaPrivateKey};
use tempfile::NamedTempFile;
use thiserror::Error;
use time::OffsetDateTime;

use crate::observability::metrics;

/// Validity window of every issued certificate.
pub const VALIDITY_DAYS: i64 = 365;

/// RSA public exponent.
pub const PUBLIC_EXPONENT: u32 = 65537;

/// Length of the random serial number in bytes.
const SERIAL_LEN: usize = 16;

/// Issuance progress, used to report where a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceStage {
    Uninitialized,
    KeyGenerated,
    CertificateSigned,
    Encoded,
    Persisted,
}

impl std::fmt::Display for IssuanceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IssuanceStage::Uninitialized => "uninitialized",
            IssuanceStage::KeyGenerated => "key-generated",
            IssuanceStage::CertificateSigned => "certificate-signed",
            IssuanceStage::Encoded => "encoded",
            IssuanceStage::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// Errors that abort certificate issuance. Always fatal to TLS startup.
#[derive(Debug, Error)]
pub enum IssuanceError {
    /// RSA key pair could not be generated.
    #[error("key generation failed: {0}")]
    KeyGeneration(#[source] rsa::Error),

    /// Certificate could not be built or signed.
    #[error("certificate signing failed: {0}")]
    Signing(#[source] rcgen::Error),

    /// Key material could not be serialized.
    #[error("key encoding failed: {0}")]
    Encoding(#[source] rsa::pkcs8::Error),

    /// PEM output could not be written to ephemeral storage.
    #[error("failed to persist {what}: {source}")]
    Persistence {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl IssuanceError {
    /// The stage that was being entered when the failure happened.
    pub fn stage(&self) -> IssuanceStage {
        match self {
            IssuanceError::KeyGeneration(_) => IssuanceStage::KeyGenerated,
            IssuanceError::Signing(_) => IssuanceStage::CertificateSigned,
            IssuanceError::Encoding(_) => IssuanceStage::Encoded,
            IssuanceError::Persistence { .. } => IssuanceStage::Persisted,
        }
    }
}

/// A Subject Alternative Name entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubjectAltName {
    Dns(String),
    Ip(IpAddr),
}

impl SubjectAltName {
    /// IP literals become IP entries, everything else a DNS entry.
    pub fn parse(value: &str) -> Self {
        match value.parse::<IpAddr>() {
            Ok(ip) => SubjectAltName::Ip(ip),
            Err(_) => SubjectAltName::Dns(value.to_string()),
        }
    }

    fn to_rcgen(&self) -> Result<SanType, rcgen::Error> {
        Ok(match self {
            SubjectAltName::Dns(name) => SanType::DnsName(name.as_str().try_into()?),
            SubjectAltName::Ip(ip) => SanType::IpAddress(*ip),
        })
    }
}

impl std::fmt::Display for SubjectAltName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubjectAltName::Dns(name) => write!(f, "DNS:{}", name),
            SubjectAltName::Ip(ip) => write!(f, "IP:{}", ip),
        }
    }
}

/// In-memory certificate and key material.
#[derive(Clone)]
pub struct CertificateBundle {
    pub certificate_pem: String,
    pub private_key_pem: String,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    pub serial: Vec<u8>,
    pub subject_alt_names: Vec<SubjectAltName>,
}

impl std::fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("not_before", &self.not_before)
            .field("not_after", &self.not_after)
            .field("serial", &self.serial)
            .field("subject_alt_names", &self.subject_alt_names)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

/// A bundle whose PEM blobs live in temporary files.
///
/// The files are removed when this value is dropped.
#[derive(Debug)]
pub struct PersistedBundle {
    pub bundle: CertificateBundle,
    cert_file: NamedTempFile,
    key_file: NamedTempFile,
}

impl PersistedBundle {
    pub fn cert_path(&self) -> &Path {
        self.cert_file.path()
    }

    pub fn key_path(&self) -> &Path {
        self.key_file.path()
    }
}

/// Issuer settings.
#[derive(Debug, Clone)]
pub struct IssuerConfig {
    /// RSA modulus size.
    pub key_bits: usize,
    /// Directory for the PEM files. Defaults to the system temp directory.
    pub temp_dir: Option<PathBuf>,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            key_bits: 2048,
            temp_dir: None,
        }
    }
}

/// Mints self-signed certificates for the TLS listener.
#[derive(Debug, Clone, Default)]
pub struct CertificateIssuer {
    config: IssuerConfig,
}

impl CertificateIssuer {
    pub fn new(config: IssuerConfig) -> Self {
        Self { config }
    }

    /// Generate a fresh key pair and a self-signed certificate for `common_name`.
    ///
    /// SANs are `localhost`, `common_name` and `127.0.0.1`, followed by
    /// `extra_sans` with duplicates removed.
    pub fn issue(
        &self,
        common_name: &str,
        extra_sans: &[String],
    ) -> Result<CertificateBundle, IssuanceError> {
        tracing::info!(
            common_name = %common_name,
            key_bits = self.config.key_bits,
            "Issuing self-signed certificate"
        );

        let mut rng = rand::rngs::OsRng;
        let private_key = RsaPrivateKey::new_with_exp(
            &mut rng,
            self.config.key_bits,
            &BigUint::from(PUBLIC_EXPONENT),
        )
        .map_err(IssuanceError::KeyGeneration)?;
        tracing::debug!(stage = %IssuanceStage::KeyGenerated, "Key pair generated");

        // The signer consumes PKCS#8, so the key is serialized before signing.
        let key_der = private_key.to_pkcs8_der().map_err(IssuanceError::Encoding)?;
        let private_key_pem = encode_pem("PRIVATE KEY", key_der.as_bytes());
        let key_pair = KeyPair::from_pem_and_sign_algo(&private_key_pem, &rcgen::PKCS_RSA_SHA256)
            .map_err(IssuanceError::Signing)?;

        let subject_alt_names = subject_alt_names(common_name, extra_sans);
        let serial = random_serial(&mut rng);
        let not_before = now_without_nanos();
        let not_after = not_before + time::Duration::days(VALIDITY_DAYS);

        let params = certificate_params(
            common_name,
            &subject_alt_names,
            &serial,
            not_before,
            not_after,
        )
        .map_err(IssuanceError::Signing)?;
        let certificate = params.self_signed(&key_pair).map_err(IssuanceError::Signing)?;
        tracing::debug!(stage = %IssuanceStage::CertificateSigned, "Certificate signed");

        let certificate_pem = encode_pem("CERTIFICATE", certificate.der());
        tracing::debug!(stage = %IssuanceStage::Encoded, "Certificate and key encoded");

        metrics::record_certificate_issued();

        Ok(CertificateBundle {
            certificate_pem,
            private_key_pem,
            not_before,
            not_after,
            serial,
            subject_alt_names,
        })
    }

    /// Issue a bundle and write both PEM blobs to distinct temporary files.
    pub fn issue_to_temp_files(
        &self,
        common_name: &str,
        extra_sans: &[String],
    ) -> Result<PersistedBundle, IssuanceError> {
        let bundle = self.issue(common_name, extra_sans)?;

        let cert_file = self
            .write_temp("mesh-fixture-cert-", &bundle.certificate_pem)
            .map_err(|source| IssuanceError::Persistence {
                what: "certificate",
                source,
            })?;
        let key_file = self
            .write_temp("mesh-fixture-key-", &bundle.private_key_pem)
            .map_err(|source| IssuanceError::Persistence {
                what: "private key",
                source,
            })?;

        tracing::info!(
            stage = %IssuanceStage::Persisted,
            cert_path = %cert_file.path().display(),
            key_path = %key_file.path().display(),
            not_after = %bundle.not_after,
            "Certificate material written"
        );

        Ok(PersistedBundle {
            bundle,
            cert_file,
            key_file,
        })
    }

    fn write_temp(&self, prefix: &str, contents: &str) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix).suffix(".pem");
        // tempfile creates files with mode 0600 on Unix.
        let mut file = match &self.config.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        Ok(file)
    }
}

fn certificate_params(
    common_name: &str,
    subject_alt_names: &[SubjectAltName],
    serial: &[u8],
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
) -> Result<CertificateParams, rcgen::Error> {
    let mut distinguished_name = DistinguishedName::new();
    distinguished_name.push(DnType::CountryName, "US");
    distinguished_name.push(DnType::StateOrProvinceName, "Local");
    distinguished_name.push(DnType::LocalityName, "Local");
    distinguished_name.push(DnType::OrganizationName, "Test");
    distinguished_name.push(DnType::CommonName, common_name);

    let mut params = CertificateParams::default();
    params.distinguished_name = distinguished_name;
    params.serial_number = Some(SerialNumber::from_slice(serial));
    params.not_before = not_before;
    params.not_after = not_after;
    params.subject_alt_names = subject_alt_names
        .iter()
        .map(SubjectAltName::to_rcgen)
        .collect::<Result<_, _>>()?;
    Ok(params)
}

fn subject_alt_names(common_name: &str, extra_sans: &[String]) -> Vec<SubjectAltName> {
    let mut names = vec![
        SubjectAltName::Dns("localhost".to_string()),
        SubjectAltName::Dns(common_name.to_string()),
        SubjectAltName::Ip(IpAddr::V4(Ipv4Addr::LOCALHOST)),
    ];
    names.extend(extra_sans.iter().map(|s| SubjectAltName::parse(s)));

    let mut unique = Vec::with_capacity(names.len());
    for name in names {
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    unique
}

/// Positive serial whose DER encoding is exactly `SERIAL_LEN` bytes.
fn random_serial(rng: &mut impl RngCore) -> Vec<u8> {
    let mut serial = vec![0u8; SERIAL_LEN];
    rng.fill_bytes(&mut serial);
    serial[0] = (serial[0] & 0x7f) | 0x40;
    serial
}

fn now_without_nanos() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now - time::Duration::nanoseconds(i64::from(now.nanosecond()))
}

pub(crate) fn pem_encode_config() -> pem::EncodeConfig {
    pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF)
}

fn encode_pem(tag: &str, der: &[u8]) -> String {
    pem::encode_config(&pem::Pem::new(tag, der.to_vec()), pem_encode_config())
}
