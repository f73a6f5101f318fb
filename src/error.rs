use std::time::Duration;

use crate::{api::Problem, challenge::ChallengeType};

/// Failure reported by an [`AcmeClient`](crate::AcmeClient) implementation.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The ACME provider answered with a problem document.
    #[error("{0}")]
    Problem(Problem),

    /// The request never produced an ACME response.
    #[error("ACME transport error: {0}")]
    Transport(eyre::Report),
}

impl ClientError {
    pub fn problem(&self) -> Option<&Problem> {
        match self {
            ClientError::Problem(problem) => Some(problem),
            ClientError::Transport(_) => None,
        }
    }
}

impl From<Problem> for ClientError {
    fn from(problem: Problem) -> Self {
        ClientError::Problem(problem)
    }
}

impl From<eyre::Report> for ClientError {
    fn from(err: eyre::Report) -> Self {
        ClientError::Transport(err)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no contact email for the ACME account")]
    MissingContactEmail,

    #[error("the terms of service of the ACME provider have not been accepted")]
    TermsNotAccepted,

    #[error("no private key for the ACME account")]
    MissingPrivateKey,

    #[error("private key is not a PEM encoded P-256 key")]
    InvalidPrivateKeyFormat,

    #[error("account key: {0}")]
    AccountKey(eyre::Report),

    /// The ACME provider refused issuance because control over a domain has not been proven.
    #[error("unauthorized: {0}")]
    UnauthorizedDomain(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("TXT lookup for {record} failed: {reason}")]
    DnsLookup { record: String, reason: eyre::Report },

    #[error("TXT record {record} did not propagate within {timeout:?}")]
    DnsPropagationTimeout { record: String, timeout: Duration },

    #[error("wait for TXT record {record} was cancelled")]
    Cancelled { record: String },

    #[error("ACME provider offered no {challenge} challenge for {domain}")]
    MissingChallenge {
        domain: String,
        challenge: ChallengeType,
    },

    #[error("no domains to request a certificate for")]
    EmptyDomainList,

    #[error("failed to build certificate signing request: {0}")]
    Csr(eyre::Report),

    #[error("invalid certificate: {0}")]
    Certificate(eyre::Report),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Problem> for Error {
    fn from(problem: Problem) -> Self {
        Error::Client(ClientError::Problem(problem))
    }
}
