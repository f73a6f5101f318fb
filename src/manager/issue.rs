use std::{collections::HashSet, path::Path};

use der::{pem::LineEnding, Encode as _};
use p256::pkcs8::EncodePrivateKey as _;

use super::Manager;
use crate::{
    cert::{create_csr, create_p256_key, CertificateBundle},
    client::AcmeClient,
    error::{ClientError, Error, Result},
};

/// Directory certificate bundles are written to when none is configured.
pub const DEFAULT_SSL_PATH: &str = "config/ssl";

impl<C: AcmeClient, R> Manager<C, R> {
    /// Requests a certificate for `domains` and writes the bundle into `ssl_path`.
    ///
    /// Every domain must have been authorized beforehand. A fresh private key is generated for
    /// each certificate; the first domain becomes the Common Name. Duplicate domains are dropped.
    ///
    /// A refusal because domain control was not proven is reported as
    /// [`Error::UnauthorizedDomain`], in which case nothing is written.
    pub async fn issue_certificate(
        &mut self,
        domains: &[&str],
        ssl_path: impl AsRef<Path>,
    ) -> Result<CertificateBundle> {
        let mut seen = HashSet::new();
        let domains = domains
            .iter()
            .copied()
            .filter(|domain| seen.insert(*domain))
            .collect::<Vec<_>>();

        if domains.is_empty() {
            return Err(Error::EmptyDomainList);
        }

        log::debug!("Request certificate for {domains:?}");

        let cert_key = create_p256_key();
        let csr = create_csr(&cert_key, &domains).map_err(Error::Csr)?;
        let csr_der = csr
            .to_der()
            .map_err(|err| Error::Csr(eyre::eyre!("encode CSR: {err}")))?;

        let pem_chain = match self.client.new_certificate(&csr_der).await {
            Ok(pem_chain) => pem_chain,
            Err(ClientError::Problem(problem)) if problem.is_unauthorized() => {
                return Err(Error::UnauthorizedDomain(problem.message().to_owned()));
            }
            Err(err) => return Err(err.into()),
        };

        let private_key_pem = cert_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|err| Error::Certificate(eyre::eyre!("encode private key: {err}")))?;

        let bundle = CertificateBundle::from_pem_chain(
            domains.iter().map(|domain| (*domain).to_owned()).collect(),
            private_key_pem,
            &pem_chain,
        )?;

        bundle.persist(ssl_path).await?;

        Ok(bundle)
    }
}
