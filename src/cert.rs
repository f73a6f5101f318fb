use std::path::Path;

use der::{asn1::Ia5String, pem::LineEnding, DecodePem as _};
use eyre::{eyre, WrapErr as _};
use time::{OffsetDateTime, PrimitiveDateTime};
use x509_cert::{
    builder::{Builder, RequestBuilder as CsrBuilder},
    ext::pkix::{name::GeneralName, SubjectAltName},
    name::Name,
};
use zeroize::Zeroizing;

use crate::{
    error::{Error, Result},
    util::{write_atomic, StagedFile},
};

/// File name of the certificate's private key in a persisted bundle.
pub const PRIVATE_KEY_FILE: &str = "privkey.pem";

/// File name of the leaf certificate in a persisted bundle.
pub const CERTIFICATE_FILE: &str = "cert.pem";

/// File name of the issuer chain in a persisted bundle.
pub const CHAIN_FILE: &str = "chain.pem";

/// File name of the leaf certificate followed by the issuer chain in a persisted bundle.
pub const FULLCHAIN_FILE: &str = "fullchain.pem";

/// Make a P-256 private key (from which we can derive a public key).
pub fn create_p256_key() -> p256::ecdsa::SigningKey {
    let csprng = &mut rand::thread_rng();
    ecdsa::SigningKey::from(p256::SecretKey::random(csprng))
}

/// Creates a CSR with `domains` and signs it with `signer`.
///
/// The first item of `domains` is picked for the CSR's Common Name (CN). All domains are added to a
/// Subject Alternative Name (SAN) extension.
pub(crate) fn create_csr(
    signer: &p256::ecdsa::SigningKey,
    domains: &[&str],
) -> eyre::Result<x509_cert::request::CertReq> {
    let primary_domain = domains
        .first()
        .ok_or_else(|| eyre!("no domains for the CSR"))?;
    let subject = format!("CN={primary_domain}")
        .parse::<Name>()
        .wrap_err("CSR subject")?;

    let mut csr = CsrBuilder::new(subject, signer).wrap_err("CSR builder")?;

    let names = domains
        .iter()
        .map(|domain| Ia5String::new(domain).map(GeneralName::DnsName))
        .collect::<Result<Vec<_>, _>>()
        .wrap_err("CSR subject alternative names")?;

    csr.add_extension(&SubjectAltName(names))
        .wrap_err("CSR subject alternative names")?;

    csr.build::<p256::ecdsa::DerSignature>()
        .wrap_err("build csr")
}

/// An issued certificate with its private key and issuer chain, all PEM encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateBundle {
    domains: Vec<String>,
    private_key_pem: Zeroizing<String>,
    certificate: String,
    chain: String,
    fullchain: String,
}

impl CertificateBundle {
    /// Splits a PEM chain as returned by the ACME provider into leaf and issuer chain.
    pub(crate) fn from_pem_chain(
        domains: Vec<String>,
        private_key_pem: Zeroizing<String>,
        pem_chain: &str,
    ) -> Result<Self> {
        let mut rdr = pem_chain.as_bytes();
        let ders = rustls_pemfile::certs(&mut rdr)
            .collect::<Result<Vec<_>, _>>()
            .wrap_err("read certificate chain")
            .map_err(Error::Certificate)?;

        let (leaf, issuers) = ders
            .split_first()
            .ok_or_else(|| Error::Certificate(eyre!("no certificate in response")))?;

        let certificate = encode_certificate(leaf)?;
        let chain = issuers
            .iter()
            .map(|der| encode_certificate(der))
            .collect::<Result<String>>()?;
        let fullchain = format!("{certificate}{chain}");

        Ok(CertificateBundle {
            domains,
            private_key_pem,
            certificate,
            chain,
            fullchain,
        })
    }

    /// Domains the certificate was requested for, primary name first.
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// The private key in PEM format.
    pub fn private_key(&self) -> &str {
        &self.private_key_pem
    }

    /// The leaf certificate in PEM format.
    pub fn certificate(&self) -> &str {
        &self.certificate
    }

    /// The issuer chain in PEM format, without the leaf.
    pub fn chain(&self) -> &str {
        &self.chain
    }

    /// The leaf certificate followed by the issuer chain, in PEM format.
    pub fn fullchain(&self) -> &str {
        &self.fullchain
    }

    /// The full certificate chain in DER format.
    pub fn certificate_chain_der(&self) -> eyre::Result<Vec<Vec<u8>>> {
        let mut rdr = self.fullchain.as_bytes();

        rustls_pemfile::certs(&mut rdr)
            .map(|res| res.map(|cert| cert.to_vec()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Inspect the certificate to count the number of (whole) valid days left.
    ///
    /// It's up to the ACME API provider to decide how long an issued certificate is valid.
    /// Let's Encrypt sets the validity to 90 days. This function reports 89 days for newly
    /// issued cert, since it counts _whole_ days.
    ///
    /// It is possible to get negative days for an expired certificate.
    pub fn valid_days_left(&self) -> eyre::Result<i64> {
        let cert = x509_cert::Certificate::from_pem(self.certificate.as_bytes())?;

        let not_after = cert.tbs_certificate.validity.not_after.to_date_time();
        // notAfter is UTCTime or GeneralizedTime, both in UTC
        let not_after = PrimitiveDateTime::try_from(not_after)
            .map_err(|err| eyre!("certificate notAfter: {err}"))?
            .assume_utc();

        let diff = not_after - OffsetDateTime::now_utc();

        Ok(diff.whole_days())
    }

    /// Writes `privkey.pem`, `cert.pem`, `chain.pem` and `fullchain.pem` into `dir`.
    ///
    /// All four files are first written next to their destination and then renamed into place,
    /// so a failure never leaves a truncated file behind. Files renamed before a failure are not
    /// rolled back. On unix the private key is only readable by its owner.
    pub async fn persist(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;

        write_atomic(
            dir,
            vec![
                StagedFile::private(PRIVATE_KEY_FILE, self.private_key_pem.as_bytes()),
                StagedFile::public(CERTIFICATE_FILE, self.certificate.as_bytes()),
                StagedFile::public(CHAIN_FILE, self.chain.as_bytes()),
                StagedFile::public(FULLCHAIN_FILE, self.fullchain.as_bytes()),
            ],
        )
        .await?;

        log::info!(
            "Wrote certificate bundle for {:?} to {}",
            self.domains,
            dir.display()
        );

        Ok(())
    }
}

fn encode_certificate(der: &[u8]) -> Result<String> {
    pem::encode_string("CERTIFICATE", LineEnding::LF, der)
        .map_err(|err| Error::Certificate(eyre!("encode certificate: {err}")))
}
