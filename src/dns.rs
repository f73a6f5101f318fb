//! Waiting for `dns-01` TXT records to become visible.

use std::time::Duration;

use async_trait::async_trait;
use eyre::{eyre, WrapErr as _};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::{
    challenge::record_fqdn,
    error::{Error, Result},
};

/// Default DNS-over-HTTPS endpoint queried by [`DohResolver`].
pub const DEFAULT_DOH_ENDPOINT: &str = "https://dns.google/resolve";

/// DNS RR type number of TXT records.
const TXT_RECORD_TYPE: u16 = 16;

/// Timing of the propagation wait and of the verification that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between two lookups of the TXT record.
    pub interval: Duration,

    /// Upper bound on the whole propagation wait.
    pub timeout: Duration,

    /// Delay between requesting verification and sampling the challenge status.
    pub verification_delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(10 * 60),
            verification_delay: Duration::from_secs(1),
        }
    }
}

/// Looks up TXT records.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// Returns all TXT values of `record_name`, empty if the record does not exist.
    ///
    /// `nameservers` overrides the servers the resolver would query by default.
    async fn lookup_txt(
        &self,
        record_name: &str,
        nameservers: Option<&[String]>,
    ) -> eyre::Result<Vec<String>>;
}

/// Polls a resolver until a `dns-01` record carries the expected value.
pub struct PropagationWait<'a, R: ?Sized> {
    resolver: &'a R,
    nameservers: Option<&'a [String]>,
    policy: PollPolicy,
    verbose: bool,
    cancellation: Option<&'a CancellationToken>,
}

impl<'a, R: DnsResolver + ?Sized> PropagationWait<'a, R> {
    pub fn new(resolver: &'a R) -> Self {
        PropagationWait {
            resolver,
            nameservers: None,
            policy: PollPolicy::default(),
            verbose: false,
            cancellation: None,
        }
    }

    pub fn nameservers(mut self, nameservers: Option<&'a [String]>) -> Self {
        self.nameservers = nameservers;
        self
    }

    pub fn policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Reports every unsuccessful lookup at `info` level instead of `debug`.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn cancellation(mut self, token: Option<&'a CancellationToken>) -> Self {
        self.cancellation = token;
        self
    }

    /// Waits until the TXT record of `domain` equals `expected`.
    ///
    /// The record is looked up once per [`PollPolicy::interval`]. Lookup failures end the wait
    /// immediately; a missing or different record does not.
    pub async fn wait_for_record(&self, domain: &str, expected: &str) -> Result<()> {
        let record = record_fqdn(domain);

        let poll = async {
            loop {
                let values = match self.resolver.lookup_txt(&record, self.nameservers).await {
                    Ok(values) => values,
                    Err(reason) => {
                        return Err(Error::DnsLookup {
                            record: record.clone(),
                            reason,
                        })
                    }
                };

                if values.iter().any(|value| value == expected) {
                    return Ok(());
                }

                if self.verbose {
                    log::info!("DNS record not valid: {record} = {values:?}");
                } else {
                    log::debug!("DNS record not valid: {record} = {values:?}");
                }

                tokio::time::sleep(self.policy.interval).await;
            }
        };

        let cancelled = async {
            match self.cancellation {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            res = poll => res,
            _ = tokio::time::sleep(self.policy.timeout) => Err(Error::DnsPropagationTimeout {
                record: record.clone(),
                timeout: self.policy.timeout,
            }),
            _ = cancelled => Err(Error::Cancelled { record: record.clone() }),
        }
    }
}

/// Resolves TXT records through DNS-over-HTTPS JSON endpoints.
///
/// Custom nameservers passed to [`DnsResolver::lookup_txt()`] are endpoint URLs such as
/// `https://cloudflare-dns.com/dns-query`. They are tried in order until one answers.
#[derive(Debug, Clone)]
pub struct DohResolver {
    client: reqwest::Client,
    endpoints: Vec<String>,
}

impl Default for DohResolver {
    fn default() -> Self {
        DohResolver::new(vec![DEFAULT_DOH_ENDPOINT.to_owned()])
    }
}

impl DohResolver {
    pub fn new(endpoints: Vec<String>) -> Self {
        DohResolver {
            client: reqwest::Client::new(),
            endpoints,
        }
    }

    fn request(&self, endpoint: &str, record_name: &str) -> reqwest::Result<reqwest::Request> {
        self.client
            .get(endpoint)
            .header("accept", "application/dns-json")
            .query(&[("name", record_name), ("type", "TXT")])
            .build()
    }

    async fn query(&self, endpoint: &str, record_name: &str) -> eyre::Result<Vec<String>> {
        let req = self
            .request(endpoint, record_name)
            .wrap_err_with(|| format!("invalid DoH endpoint {endpoint}"))?;
        log::debug!("Query {}", req.url());

        let res = self
            .client
            .execute(req)
            .await
            .and_then(reqwest::Response::error_for_status)
            .wrap_err_with(|| format!("query {endpoint}"))?;

        let body = res.json::<DohResponse>().await?;
        body.txt_values()
    }
}

#[async_trait]
impl DnsResolver for DohResolver {
    async fn lookup_txt(
        &self,
        record_name: &str,
        nameservers: Option<&[String]>,
    ) -> eyre::Result<Vec<String>> {
        let endpoints = nameservers.unwrap_or(&self.endpoints);

        let mut last_err = None;
        for endpoint in endpoints {
            match self.query(endpoint, record_name).await {
                Ok(values) => return Ok(values),
                Err(err) => {
                    log::debug!("TXT lookup via {endpoint} failed: {err}");
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| eyre!("no nameservers to query")))
    }
}

#[derive(Debug, Deserialize)]
struct DohAnswer {
    #[serde(rename = "type")]
    _type: u16,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Status")]
    status: u32,
    #[serde(rename = "Answer")]
    answer: Option<Vec<DohAnswer>>,
}

impl DohResponse {
    fn txt_values(self) -> eyre::Result<Vec<String>> {
        match self.status {
            // NOERROR
            0 => Ok(self
                .answer
                .unwrap_or_default()
                .into_iter()
                .filter(|ans| ans._type == TXT_RECORD_TYPE)
                .filter_map(|ans| ans.data)
                .map(|data| unquote_txt(&data))
                .collect()),
            // NXDOMAIN
            3 => Ok(Vec::new()),
            status => Err(eyre!("resolver answered with DNS status {status}")),
        }
    }
}

/// Joins the character-strings of a presentation format TXT value.
fn unquote_txt(data: &str) -> String {
    let data = data.trim();

    if !data.starts_with('"') {
        return data.to_owned();
    }

    data.split('"')
        .enumerate()
        .filter(|(idx, _)| idx % 2 == 1)
        .map(|(_, part)| part)
        .collect()
}
