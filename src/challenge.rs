//! Domain level view of authorizations and their challenges.
//!
//! The ACME provider only hands out a token per challenge. What has to be published, a file for
//! `http-01` or a TXT record for `dns-01`, is derived from that token and the account key as
//! described in [RFC 8555 §8.1].
//!
//! [RFC 8555 §8.1]: https://datatracker.ietf.org/doc/html/rfc8555#section-8.1

use std::fmt;

use base64::prelude::*;
use serde::Deserialize;
use sha2::{Digest as _, Sha256};

use crate::{
    acc::AccountKey,
    api::{self, ChallengeStatus},
    jws::JwkThumb,
};

/// Directory, relative to a web root, that `http-01` challenge files are served from.
pub const HTTP_CHALLENGE_DIR: &str = ".well-known/acme-challenge";

/// Label of the TXT record holding a `dns-01` proof, relative to the domain.
pub const DNS_RECORD_NAME: &str = "_acme-challenge";

/// Record type of a `dns-01` proof.
pub const DNS_RECORD_TYPE: &str = "TXT";

/// The way control over a domain is proven.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum ChallengeType {
    /// Serve a file over HTTP.
    #[default]
    #[serde(rename = "http-01", alias = "http")]
    Http01,

    /// Publish a TXT record.
    #[serde(rename = "dns-01", alias = "dns")]
    Dns01,
}

impl fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChallengeType::Http01 => "http-01",
            ChallengeType::Dns01 => "dns-01",
        })
    }
}

/// A challenge that can be submitted to the ACME provider for verification.
pub trait Challenge {
    /// URL identifying the challenge with the ACME provider.
    fn url(&self) -> &str;

    /// Status at the time the challenge was fetched.
    fn status(&self) -> ChallengeStatus;
}

/// Proof-of-control obligations for one domain, as handed out by the ACME provider.
#[derive(Debug, Clone)]
pub struct Authorization {
    domain: String,
    http01: Option<Http01Challenge>,
    dns01: Option<Dns01Challenge>,
}

impl Authorization {
    pub(crate) fn from_api(api_auth: &api::Authorization, key: &AccountKey) -> eyre::Result<Self> {
        let domain = api_auth.identifier.value.clone();
        let thumbprint = JwkThumb::try_from(key)?.thumbprint()?;

        let http01 = api_auth.http_challenge().map(|c| Http01Challenge {
            url: c.url.clone(),
            status: c.status,
            token: c.token.clone(),
            filename: format!("{HTTP_CHALLENGE_DIR}/{}", c.token),
            file_content: key_authorization(&c.token, &thumbprint),
        });

        let dns01 = api_auth.dns_challenge().map(|c| Dns01Challenge {
            url: c.url.clone(),
            status: c.status,
            domain: domain.clone(),
            record_content: BASE64_URL_SAFE_NO_PAD
                .encode(Sha256::digest(key_authorization(&c.token, &thumbprint))),
        });

        Ok(Authorization {
            domain,
            http01,
            dns01,
        })
    }

    /// Domain name for this authorization.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn http01(&self) -> Option<&Http01Challenge> {
        self.http01.as_ref()
    }

    pub fn dns01(&self) -> Option<&Dns01Challenge> {
        self.dns01.as_ref()
    }

    pub(crate) fn into_http01(self) -> Option<Http01Challenge> {
        self.http01
    }

    pub(crate) fn into_dns01(self) -> Option<Dns01Challenge> {
        self.dns01
    }
}

/// An `http-01` challenge: a file to serve under the domain's web root.
///
/// See [RFC 8555 §8.3].
///
/// [RFC 8555 §8.3]: https://datatracker.ietf.org/doc/html/rfc8555#section-8.3
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Http01Challenge {
    url: String,
    status: ChallengeStatus,
    token: String,
    filename: String,
    file_content: String,
}

impl Http01Challenge {
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Path of the file relative to the web root, `.well-known/acme-challenge/<token>`.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn file_content(&self) -> &str {
        &self.file_content
    }
}

impl Challenge for Http01Challenge {
    fn url(&self) -> &str {
        &self.url
    }

    fn status(&self) -> ChallengeStatus {
        self.status
    }
}

/// A `dns-01` challenge: a TXT record to publish under the domain.
///
/// See [RFC 8555 §8.4].
///
/// [RFC 8555 §8.4]: https://datatracker.ietf.org/doc/html/rfc8555#section-8.4
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dns01Challenge {
    url: String,
    status: ChallengeStatus,
    domain: String,
    record_content: String,
}

impl Dns01Challenge {
    /// The domain being authorized.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Record label relative to the domain, `_acme-challenge`.
    pub fn record_name(&self) -> &str {
        DNS_RECORD_NAME
    }

    pub fn record_type(&self) -> &str {
        DNS_RECORD_TYPE
    }

    pub fn record_content(&self) -> &str {
        &self.record_content
    }

    /// Fully qualified name of the record, `_acme-challenge.<domain>`.
    pub fn fqdn(&self) -> String {
        record_fqdn(&self.domain)
    }

    /// Human readable instructions for creating the record by hand.
    pub fn instructions(&self) -> DnsInstructions<'_> {
        DnsInstructions { challenge: self }
    }
}

impl Challenge for Dns01Challenge {
    fn url(&self) -> &str {
        &self.url
    }

    fn status(&self) -> ChallengeStatus {
        self.status
    }
}

/// Display adapter printing the record an operator has to create.
pub struct DnsInstructions<'a> {
    challenge: &'a Dns01Challenge,
}

impl fmt::Display for DnsInstructions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(68);

        writeln!(f, "{rule}")?;
        writeln!(f, "Record:")?;
        writeln!(f)?;
        writeln!(f, " - Name: {}", self.challenge.fqdn())?;
        writeln!(f, " - Type: {}", self.challenge.record_type())?;
        writeln!(f, " - Value: {}", self.challenge.record_content())?;
        writeln!(f)?;
        writeln!(
            f,
            "Create the record; Wait a minute (or two); Request for verification!"
        )?;
        write!(f, "{rule}")
    }
}

/// Name of the TXT record proving control over `domain`.
///
/// A wildcard domain is proven through the record of its base domain.
pub fn record_fqdn(domain: &str) -> String {
    let domain = domain.trim_start_matches("*.").trim_end_matches('.');
    format!("{DNS_RECORD_NAME}.{domain}")
}

fn key_authorization(token: &str, thumbprint: &str) -> String {
    format!("{token}.{thumbprint}")
}
