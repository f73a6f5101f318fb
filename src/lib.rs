//! Domain-validated certificates from ACME (Automatic Certificate Management Environment)
//! providers such as [Let's Encrypt](https://letsencrypt.org/).
//!
//! This crate orchestrates the ACME v2 ([RFC 8555]) issuance workflow for one account: registering
//! the account, proving control over domains and requesting the certificate. The protocol itself
//! (nonces, signed requests, transport) is consumed through the [`AcmeConnector`] and
//! [`AcmeClient`] traits.
//!
//! # Usage
//!
//! 1. Build an [`Account`] from a contact email, acceptance of the provider's terms and a P-256
//!    private key, either directly or from [`Settings`].
//! 2. Create a [`Manager`] with [`Manager::connect()`], which registers the account unless told
//!    otherwise. Registering an already registered key is not an error.
//! 3. Call [`Manager::authorize_for_domain()`] for every domain.
//! 4. Call [`Manager::issue_certificate()`] with all domains. The bundle is written as
//!    `privkey.pem`, `cert.pem`, `chain.pem` and `fullchain.pem`.
//!
//! # Domain Ownership
//!
//! Certificates are only issued for domains the account has proven control over, either through:
//!
//! - `http-01`: a file served by the domain's web server, placed below a web root directory;
//! - `dns-01`: a TXT record at `_acme-challenge.<domain>`.
//!
//! For `dns-01` the record has to be created outside of this library. The manager either hands
//! the challenge back to the caller, or waits until the record is visible through a
//! [`DnsResolver`] and requests verification itself. See [`AuthorizeOptions`].
//!
//! # Rate Limits
//!
//! The ACME API provider Let's Encrypt uses [rate limits] to ensure the API is not being abused.
//! Balance short polling intervals in [`PollPolicy`] against the real risk of having access cut
//! off.
//!
//! ## Use Staging For Development!
//!
//! Accounts default to the Let's Encrypt staging environment, where the rate limits are more
//! relaxed. Only [`DirectoryUrl::LetsEncrypt`] issues trusted certificates.
//!
//! [RFC 8555]: https://datatracker.ietf.org/doc/html/rfc8555
//! [rate limits]: https://letsencrypt.org/docs/rate-limits

#![deny(rust_2018_idioms, nonstandard_style, future_incompatible)]

mod acc;
mod cert;
mod challenge;
mod client;
mod dir;
mod error;
mod jws;
mod manager;
mod util;

pub mod api;
pub mod config;
pub mod dns;


pub use crate::{
    acc::{Account, AccountKey, KeyMaterial},
    api::ChallengeStatus as VerificationStatus,
    cert::{
        create_p256_key, CertificateBundle, CERTIFICATE_FILE, CHAIN_FILE, FULLCHAIN_FILE,
        PRIVATE_KEY_FILE,
    },
    challenge::{
        record_fqdn, Authorization, Challenge, ChallengeType, Dns01Challenge, DnsInstructions,
        Http01Challenge, DNS_RECORD_NAME, DNS_RECORD_TYPE, HTTP_CHALLENGE_DIR,
    },
    client::{AcmeClient, AcmeConnector},
    config::Settings,
    dir::DirectoryUrl,
    dns::{DnsResolver, DohResolver, PollPolicy, PropagationWait},
    error::{ClientError, Error, Result},
    manager::{
        AuthorizeOptions, Authorized, Manager, Registration, DEFAULT_SSL_PATH, DEFAULT_WEB_ROOT,
    },
};
