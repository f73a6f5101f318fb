//! JSON API payloads.
//!
//! These are the objects exchanged with an [`AcmeClient`](crate::AcmeClient) implementation. They
//! mirror the ACME resources closely so that adapters over an existing ACME client can be thin.

use std::fmt;

use serde::{Deserialize, Serialize};

mod account;
mod authorization;
mod challenge;
mod identifier;

pub use self::{
    account::Account,
    authorization::{Authorization, AuthorizationStatus},
    challenge::{Challenge, ChallengeStatus},
    identifier::Identifier,
};

/// An ACME problem document.
///
/// See [RFC 8555 §6.7].
///
/// [RFC 8555 §6.7]: https://datatracker.ietf.org/doc/html/rfc8555#section-6.7
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub _type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subproblems: Option<Vec<Subproblem>>,
}

impl Problem {
    pub fn new(_type: impl Into<String>, detail: impl Into<String>) -> Self {
        Problem {
            _type: _type.into(),
            detail: Some(detail.into()),
            subproblems: None,
        }
    }

    /// Returns true if the request was malformed.
    pub fn is_malformed(&self) -> bool {
        self._type == "urn:ietf:params:acme:error:malformed"
            || self._type == "urn:acme:error:malformed"
    }

    /// Returns true if the server refused the request because control over an identifier has not
    /// been proven.
    pub fn is_unauthorized(&self) -> bool {
        self._type == "urn:ietf:params:acme:error:unauthorized"
            || self._type == "urn:acme:error:unauthorized"
    }

    /// Returns true if the account key is already bound to an existing account.
    pub fn is_account_key_in_use(&self) -> bool {
        self.is_malformed()
            && self
                .detail
                .as_deref()
                .is_some_and(|detail| detail == "Registration key is already in use")
    }

    /// The human readable part of the problem, falling back to the problem type.
    pub fn message(&self) -> &str {
        self.detail.as_deref().unwrap_or(&self._type)
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {detail}", self._type),
            _ => write!(f, "{}", self._type),
        }
    }
}

impl std::error::Error for Problem {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subproblem {
    #[serde(rename = "type")]
    pub _type: String,
    pub detail: Option<String>,
    pub identifier: Option<identifier::Identifier>,
}
